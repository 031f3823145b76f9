use clap::{Parser, Subcommand};
use sqlt::lens::utils::OutputFormat;
use sqlt::SqltConfig;
use tracing::Level;

mod commands;

use commands::database::{CreateArgs, DestroyArgs};
use commands::render::RenderArgs;
use commands::table::TableArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.sqlt/sqlt.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the database file, connection state and table sizes
    Status,

    /// Create the configured database file
    Create(CreateArgs),

    /// Delete the configured database file
    Destroy(DestroyArgs),

    /// List tables with their row and column counts
    Tables,

    /// Work with a single table
    Table(TableArgs),

    /// Expand [[sqlt("table")]] markers in a document
    Render(RenderArgs),

    /// Show the active configuration
    Config,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match SqltConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if cli.debug {
        config.debug_mode = true;
    }
    if config.debug_mode {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let output_format = cli.format;

    match cli.command {
        Commands::Status => commands::database::run_status(&config, output_format),
        Commands::Create(args) => commands::database::run_create(&config, args, output_format),
        Commands::Destroy(args) => commands::database::run_destroy(&config, args, output_format),
        Commands::Tables => commands::database::run_tables(&config, output_format),
        Commands::Table(args) => commands::table::run(&config, args, output_format),
        Commands::Render(args) => commands::render::run(&config, args, output_format),
        Commands::Config => commands::config::run(&config, output_format),
    }
}
