use chrono::{DateTime, Utc};

use crate::error::EmissionError;
use crate::models::PermissionState;

pub const REMINDER_TITLE: &str = "Upcoming Event Reminder!";

/// Host notification capability.
pub trait NotificationCapability: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Permission the host reports right now, without prompting.
    fn permission(&self) -> PermissionState;

    /// May show a consent prompt to the user.
    fn request_permission(&self) -> PermissionState;

    fn emit(&self, title: &str, body: &str) -> Result<(), EmissionError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Notifier for headless hosts: every notification goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationCapability for LogNotifier {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn emit(&self, title: &str, body: &str) -> Result<(), EmissionError> {
        log::info!("notify: title={title} body={body}");
        Ok(())
    }
}

pub fn reminder_body(description: &str, label: &str) -> String {
    format!("{description} is in about {label}.")
}
