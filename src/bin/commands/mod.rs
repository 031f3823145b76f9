pub mod config;
pub mod database;
pub mod render;
pub mod table;

use sqlt::database::{DatabaseManager, NoticeLog};
use sqlt::lens::utils::OutputFormat;
use sqlt::SqltConfig;
use std::sync::Arc;

/// Build a manager for the configured database and try to connect.
///
/// Lifecycle notices are collected in the returned log so commands can print
/// them once they know the output format.
pub(crate) fn open_manager(config: &SqltConfig) -> (DatabaseManager, Arc<NoticeLog>) {
    let log = Arc::new(NoticeLog::new());
    let mut manager = DatabaseManager::new(config.database_options(), log.clone())
        .with_debug_mode(config.debug_mode);
    manager.connect_database(|_| {});
    (manager, log)
}

/// Print collected notices to stderr. Returns false if any was a failure.
///
/// JSON output stays clean on stdout, so notices always go to stderr.
pub(crate) fn report_notices(log: &NoticeLog, output_format: OutputFormat) -> bool {
    let notices = log.drain();
    let ok = !notices.iter().any(|n| n.is_failure());

    if output_format.is_json() {
        for notice in &notices {
            if let Ok(json) = serde_json::to_string(notice) {
                eprintln!("{}", json);
            }
        }
    } else {
        for notice in &notices {
            if notice.is_failure() {
                eprintln!("ERROR: {}", notice);
            } else {
                eprintln!("{}", notice);
            }
        }
    }
    ok
}

/// Ask for confirmation on stderr; anything but y/yes aborts
pub(crate) fn confirm(prompt: &str) -> bool {
    eprintln!("{}", prompt);
    eprint!("Are you sure? [y/N] ");

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        if input == "y" || input == "yes" {
            return true;
        }
    }
    eprintln!("Aborted.");
    false
}
