//! User-facing outcome notifications
//!
//! The manager reports connect/create/destroy outcomes through a
//! [`Notifier`]. Delivery is fire-and-forget: the manager never waits on it
//! and its state does not depend on what the sink does.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Outcome of a lifecycle operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "notice", content = "reason")]
pub enum Notice {
    Connected,
    ConnectFailed,
    Created,
    AlreadyExists,
    CreateFailed(String),
    Destroyed,
    DestroyFailed(String),
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Notice::ConnectFailed
                | Notice::AlreadyExists
                | Notice::CreateFailed(_)
                | Notice::DestroyFailed(_)
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Connected => write!(f, "Database loaded successfully."),
            Notice::ConnectFailed => write!(
                f,
                "Database could not be loaded. Try reconnecting or using the \"create\" command."
            ),
            Notice::Created => write!(f, "Database created."),
            Notice::AlreadyExists => write!(f, "Database already exists."),
            Notice::CreateFailed(reason) => write!(f, "Database could not be created: {}", reason),
            Notice::Destroyed => write!(f, "Successfully destroyed database."),
            Notice::DestroyFailed(reason) => {
                write!(f, "Database could not be destroyed: {}", reason)
            }
        }
    }
}

/// Sink for [`Notice`]s
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

impl<F> Notifier for F
where
    F: Fn(Notice) + Send + Sync,
{
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// Routes notices to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_failure() {
            warn!("{}", notice);
        } else {
            info!("{}", notice);
        }
    }
}

/// Collects notices in arrival order
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take everything received so far, leaving the log empty
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
