//! Transient user-facing notices
//!
//! Every user action ends in exactly one [`Notice`]; errors are turned into
//! notices at the action boundary and go no further.

use serde::Serialize;

pub const RENDER_OK: &str = "ERD diagram updated successfully";
pub const RENDER_FAILED: &str = "Invalid JSON format. Please check your code.";
pub const GENERATE_OK: &str = "ERD generated from natural language!";
pub const GENERATE_FAILED: &str = "Failed to generate ERD from prompt.";
pub const GENERATE_BUSY: &str = "A diagram is already being generated. Please wait.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Presents notices to the user (toasts in a browser, stderr in a CLI)
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::info!(notice = %notice.message),
            NoticeLevel::Error => tracing::warn!(notice = %notice.message),
        }
    }
}
