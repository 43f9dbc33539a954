use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Legacy description key; some records carry it next to `description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Missing or null dates decode as empty, which never parses.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
}

impl Event {
    /// `description`, or the legacy `event` text when the description is blank.
    pub fn reminder_text(&self) -> &str {
        if !self.description.trim().is_empty() {
            return &self.description;
        }
        self.event.as_deref().unwrap_or_default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            description: task.description.clone(),
            start_date: task.start_date.clone(),
            end_date: task.end_date.clone(),
            is_completed: task.is_completed,
        }
    }
}

/// How long before an event's date the reminder should fire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum LeadTime {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "day")]
    OneDay,
    #[serde(rename = "hour")]
    OneHour,
    #[serde(rename = "30min")]
    ThirtyMinutes,
}

impl LeadTime {
    pub const ALL: [LeadTime; 4] = [
        LeadTime::None,
        LeadTime::OneDay,
        LeadTime::OneHour,
        LeadTime::ThirtyMinutes,
    ];

    /// `None` means reminders are switched off.
    pub fn duration(self) -> Option<Duration> {
        match self {
            LeadTime::None => None,
            LeadTime::OneDay => Some(Duration::hours(24)),
            LeadTime::OneHour => Some(Duration::hours(1)),
            LeadTime::ThirtyMinutes => Some(Duration::minutes(30)),
        }
    }

    /// Unit phrase used inside the reminder body ("is in about {label}").
    pub fn label(self) -> &'static str {
        match self {
            LeadTime::None => "",
            LeadTime::OneDay => "day",
            LeadTime::OneHour => "hour",
            LeadTime::ThirtyMinutes => "30 minutes",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            LeadTime::None => "Don't notify",
            LeadTime::OneDay => "1 day before",
            LeadTime::OneHour => "1 hour before",
            LeadTime::ThirtyMinutes => "30 minutes before",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    #[serde(alias = "default")]
    Unknown,
    Granted,
    Denied,
}

/// Parses a calendar date as stored by the backend.
///
/// Accepts plain `YYYY-MM-DD` and RFC 3339 timestamps; for the latter the UTC
/// calendar day is used.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// The instant a backend date string denotes: UTC midnight for a plain
/// `YYYY-MM-DD`, the exact moment for an RFC 3339 timestamp.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Midnight UTC of the given calendar date string.
pub fn utc_midnight(raw: &str) -> Option<DateTime<Utc>> {
    parse_calendar_date(raw)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub lead_time: LeadTime,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            lead_time: LeadTime::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsEnvelope {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksEnvelope {
    #[serde(default)]
    pub tasks: Vec<Task>,
}
