use clap::Args;
use sqlt::database::{DatabaseManager, NoticeLog};
use sqlt::lens::status::StatusLens;
use sqlt::lens::utils::OutputFormat;
use sqlt::SqltConfig;
use std::sync::Arc;
use tracing::info;

use super::{confirm, open_manager, report_notices};

/// Arguments for the Create command
#[derive(Args)]
pub struct CreateArgs {
    /// Text encoding of the new database file, e.g. UTF-8 or UTF-16le
    #[clap(short, long)]
    pub encoding: Option<String>,
}

/// Arguments for the Destroy command
#[derive(Args)]
pub struct DestroyArgs {
    /// Skip confirmation prompt
    #[clap(long, short = 'y')]
    pub yes: bool,
}

pub fn run_status(config: &SqltConfig, output_format: OutputFormat) {
    let (manager, log) = open_manager(config);
    // a missing database is a normal state for status
    log.drain();

    let lens = StatusLens::new(&manager);
    match lens.status() {
        Ok(status) => println!("{}", lens.format_status(&status, output_format)),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn run_tables(config: &SqltConfig, output_format: OutputFormat) {
    let (manager, log) = open_manager(config);
    if !manager.is_connected() {
        report_notices(&log, output_format);
        std::process::exit(1);
    }

    let lens = StatusLens::new(&manager);
    match lens.status() {
        Ok(status) => println!("{}", lens.format_tables(&status, output_format)),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn run_create(config: &SqltConfig, args: CreateArgs, output_format: OutputFormat) {
    let CreateArgs { encoding } = args;

    let mut options = config.database_options();
    if let Some(encoding) = encoding {
        options = options.with_encoding(encoding);
    }

    let log = Arc::new(NoticeLog::new());
    let mut manager = DatabaseManager::new(options.clone(), log.clone())
        .with_debug_mode(config.debug_mode);
    let created = manager.create_database(options, |m| {
        info!("create finished, connected: {}", m.is_connected());
    });

    let ok = report_notices(&log, output_format);
    if created {
        println!("{}", manager.options().path().display());
    }
    if !ok {
        std::process::exit(1);
    }
}

pub fn run_destroy(config: &SqltConfig, args: DestroyArgs, output_format: OutputFormat) {
    let DestroyArgs { yes } = args;
    let path = config.database_path();

    if !yes
        && !output_format.is_json()
        && !confirm(&format!("This will delete the database file {}", path.display()))
    {
        return;
    }

    let (mut manager, log) = open_manager(config);
    log.drain();

    let base_dir = manager.options().base_dir.clone();
    let name = manager.options().name.clone();
    let removal = manager.destroy_database(&base_dir, &name, |_| {
        info!("removing {}", path.display());
    });

    if let Some(removal) = removal {
        if let Err(e) = removal.wait() {
            info!("removal failed: {}", e);
        }
    }

    if !report_notices(&log, output_format) {
        std::process::exit(1);
    }
}
