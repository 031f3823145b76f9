use sqlt::lens::utils::OutputFormat;
use sqlt::SqltConfig;

pub fn run(config: &SqltConfig, output_format: OutputFormat) {
    match output_format {
        OutputFormat::Json => match serde_json::to_string(config) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(config) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config: {}", e),
        },
        _ => {
            println!("sqlt Configuration");
            println!("==================\n");
            println!("{}", config.summary());
        }
    }
}
