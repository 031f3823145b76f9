use clap::Args;
use sqlt::lens::embed::EmbedLens;
use sqlt::lens::utils::OutputFormat;
use sqlt::SqltConfig;
use std::path::PathBuf;
use tracing::info;

use super::{open_manager, report_notices};

/// Arguments for the Render command
#[derive(Args)]
pub struct RenderArgs {
    /// Document containing [[sqlt("table")]] markers
    #[clap(name = "FILE")]
    pub file_path: PathBuf,

    /// Write the rendered document here instead of stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(config: &SqltConfig, args: RenderArgs, output_format: OutputFormat) {
    let RenderArgs { file_path, output } = args;

    let text = match std::fs::read_to_string(&file_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("ERROR: Unable to read {}: {}", file_path.display(), e);
            std::process::exit(1);
        }
    };

    let (manager, log) = open_manager(config);
    if !manager.is_connected() {
        report_notices(&log, output_format);
        std::process::exit(1);
    }

    // bordered tables don't survive inside documents; default to markdown
    let format = match output_format {
        OutputFormat::Table => OutputFormat::Markdown,
        other => other,
    };
    let lens = match EmbedLens::new(&manager) {
        Ok(lens) => lens.with_format(format),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let references = lens.references(&text);
    info!(
        "rendering {} table reference(s) in {}",
        references.len(),
        file_path.display()
    );
    let rendered = lens.render(&text);

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, rendered) {
                eprintln!("ERROR: Unable to write {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => print!("{}", rendered),
    }
}
