//! Planner core: event reminders and task progress cohorts.
pub mod aggregate;
pub mod backend;
pub mod calendar;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod permission;
pub mod planner;
pub mod reminder;
pub mod state;
pub mod storage;
pub mod timer;

pub use aggregate::{aggregate_cohorts, Cohort};
pub use backend::PlannerBackend;
#[cfg(feature = "runtime")]
pub use backend::HttpBackend;
pub use error::{EmissionError, PlannerError};
pub use models::{Event, EventDraft, LeadTime, PermissionState, Settings, Task, TaskDraft};
pub use notify::{Clock, LogNotifier, NotificationCapability, SystemClock};
pub use permission::PermissionGate;
pub use planner::Planner;
pub use reminder::{plan_reminders, PlannedReminder, ReminderInputs, ReminderScheduler};
pub use storage::Storage;
pub use timer::{TimerDriver, TokioTimers};
