//! Data models for congregation records.
//!
//! This module contains the core data structures shared by the calendar,
//! analysis and reminder modules: event templates and their derived
//! instances, plus the flat dated records (giving, tasks, attendance,
//! interactions, prayer requests).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Category of a calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    Service,
    Meeting,
    Event,
    #[serde(alias = "small_group", alias = "smallgroup")]
    SmallGroup,
    Holiday,
    #[default]
    #[serde(other)]
    Other,
}

impl EventCategory {
    /// Parse a category name; unknown names are [`EventCategory::Other`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "service" => EventCategory::Service,
            "meeting" => EventCategory::Meeting,
            "event" => EventCategory::Event,
            "small-group" | "smallgroup" => EventCategory::SmallGroup,
            "holiday" => EventCategory::Holiday,
            _ => EventCategory::Other,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCategory::Service => write!(f, "Service"),
            EventCategory::Meeting => write!(f, "Meeting"),
            EventCategory::Event => write!(f, "Event"),
            EventCategory::SmallGroup => write!(f, "Small Group"),
            EventCategory::Holiday => write!(f, "Holiday"),
            EventCategory::Other => write!(f, "Other"),
        }
    }
}

/// Repetition rule of an event template.
///
/// Deserialized through [`RepeatRule::parse`], so unrecognized values become
/// [`RepeatRule::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatRule {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    #[default]
    None,
}

impl RepeatRule {
    /// Parse a rule name, treating anything unknown as non-repeating.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "daily" => RepeatRule::Daily,
            "weekly" => RepeatRule::Weekly,
            "biweekly" | "bi-weekly" | "fortnightly" => RepeatRule::Biweekly,
            "monthly" => RepeatRule::Monthly,
            "quarterly" => RepeatRule::Quarterly,
            _ => RepeatRule::None,
        }
    }
}

impl<'de> Deserialize<'de> for RepeatRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw.as_str().map_or(RepeatRule::None, RepeatRule::parse))
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatRule::None => write!(f, "none"),
            RepeatRule::Daily => write!(f, "daily"),
            RepeatRule::Weekly => write!(f, "weekly"),
            RepeatRule::Biweekly => write!(f, "biweekly"),
            RepeatRule::Monthly => write!(f, "monthly"),
            RepeatRule::Quarterly => write!(f, "quarterly"),
        }
    }
}

/// A stored event definition, possibly repeating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    /// Start timestamp. Templates without one never produce instances.
    #[serde(default, with = "lenient_datetime")]
    pub start: Option<NaiveDateTime>,
    #[serde(default, with = "lenient_datetime", skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub category: EventCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatRule>,
    /// Last date (inclusive) on which a repeating event may occur.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_until: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, with = "lenient_datetime", skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Creates a one-off event starting at `start`.
    #[cfg(test)]
    pub fn new(id: impl Into<String>, title: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start: Some(start),
            end: None,
            all_day: false,
            category: EventCategory::default(),
            repeat: None,
            repeat_until: None,
            capacity: None,
            registration_deadline: None,
            location: None,
        }
    }

    /// Effective repetition rule (absent means none).
    pub fn rule(&self) -> RepeatRule {
        self.repeat.unwrap_or_default()
    }

    pub fn is_repeating(&self) -> bool {
        self.rule() != RepeatRule::None
    }

    /// Whether registration is still accepted at `now`.
    pub fn registration_open(&self, now: NaiveDateTime) -> bool {
        match self.registration_deadline {
            Some(deadline) => now <= deadline,
            None => true,
        }
    }
}

/// One concrete occurrence of an event template. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventInstance {
    /// `{templateId}_{occurrence}` for repeating events, the template id otherwise.
    pub id: String,
    /// Back-reference to the originating template for repeating events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<u32>,
    /// Template fields with `start` (and `end`) moved to this occurrence.
    pub event: CalendarEvent,
}

impl EventInstance {
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.event.start
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.event.start.map(|s| s.date())
    }

    pub fn title(&self) -> &str {
        &self.event.title
    }

    pub fn category(&self) -> EventCategory {
        self.event.category
    }
}

/// A single contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Giving {
    pub id: String,
    #[serde(default)]
    pub member: String,
    pub fund: String,
    pub amount: f64,
    #[serde(default, with = "lenient_datetime")]
    pub date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Status of an administrative task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "pending")]
    Todo,
    #[serde(alias = "in_progress")]
    InProgress,
    #[serde(alias = "completed")]
    Done,
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "To Do"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Done => write!(f, "Done"),
            TaskStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, with = "lenient_datetime")]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl Task {
    /// Open and past its due date.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        matches!(self.status, TaskStatus::Todo | TaskStatus::InProgress)
            && self.due_date.is_some_and(|due| due < now)
    }
}

/// A check-in record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: String,
    pub member: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, with = "lenient_datetime")]
    pub checked_in_at: Option<NaiveDateTime>,
}

/// A pastoral-care touchpoint (call, visit, email, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub member: String,
    pub kind: String,
    #[serde(default, with = "lenient_datetime")]
    pub date: Option<NaiveDateTime>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerStatus {
    #[default]
    Active,
    Answered,
    Archived,
}

impl fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrayerStatus::Active => write!(f, "Active"),
            PrayerStatus::Answered => write!(f, "Answered"),
            PrayerStatus::Archived => write!(f, "Archived"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequest {
    pub id: String,
    #[serde(default)]
    pub member: String,
    #[serde(default)]
    pub status: PrayerStatus,
    #[serde(default, with = "lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub request: String,
}

/// A record carrying its own timestamp field.
pub trait Dated {
    fn timestamp(&self) -> Option<NaiveDateTime>;
}

impl Dated for Giving {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.date
    }
}

impl Dated for Task {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.due_date
    }
}

impl Dated for Attendance {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.checked_in_at
    }
}

impl Dated for Interaction {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.date
    }
}

impl Dated for PrayerRequest {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.created_at
    }
}

impl Dated for EventInstance {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.event.start
    }
}

impl<T: Dated> Dated for &T {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        (*self).timestamp()
    }
}

/// Parse the timestamp shapes found in exported records.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM[:SS]` and a
/// bare `YYYY-MM-DD` (midnight). Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    const FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Serde adapter that maps missing or malformed timestamps to `None`.
pub mod lenient_datetime {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Strings go through [`super::parse_timestamp`]; integers are epoch
    /// milliseconds. Any other value is `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(match raw {
            Value::String(s) => super::parse_timestamp(&s),
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.naive_utc()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_repeat_rule_parse_fails_open() {
        assert_eq!(RepeatRule::parse("weekly"), RepeatRule::Weekly);
        assert_eq!(RepeatRule::parse("Bi-Weekly"), RepeatRule::Biweekly);
        assert_eq!(RepeatRule::parse("yearly"), RepeatRule::None);
        assert_eq!(RepeatRule::parse(""), RepeatRule::None);
    }

    #[test]
    fn test_unknown_rule_deserializes_to_none() {
        let json = r#"{"id":"e1","title":"Picnic","start":"2024-06-01","repeat":"every-full-moon"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.repeat, Some(RepeatRule::None));
        assert!(!event.is_repeating());
    }

    #[test]
    fn test_rule_deserializes_case_insensitively() {
        let json = r#"{"id":"e1","title":"Youth night","start":"2024-06-01","repeat":"Bi-Weekly"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.repeat, Some(RepeatRule::Biweekly));
        assert!(event.is_repeating());

        let json = r#"{"id":"e2","title":"Picnic","start":"2024-06-01","repeat":7}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.rule(), RepeatRule::None);
    }

    #[test]
    fn test_rule_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RepeatRule::Quarterly).unwrap(), r#""quarterly""#);
        assert_eq!(serde_json::to_string(&RepeatRule::None).unwrap(), r#""none""#);
    }

    #[test]
    fn test_category_aliases() {
        let json = r#"{"id":"e1","title":"Home group","category":"small_group"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.category, EventCategory::SmallGroup);

        let json = r#"{"id":"e2","title":"Concert","category":"concert"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.category, EventCategory::Other);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(EventCategory::parse("Small Group"), EventCategory::SmallGroup);
        assert_eq!(EventCategory::parse("small_group"), EventCategory::SmallGroup);
        assert_eq!(EventCategory::parse("HOLIDAY"), EventCategory::Holiday);
        assert_eq!(EventCategory::parse("bake sale"), EventCategory::Other);
    }

    #[test]
    fn test_malformed_dates_are_none() {
        let json = r#"{"id":"g1","fund":"tithe","amount":20.0,"date":"last sunday"}"#;
        let giving: Giving = serde_json::from_str(json).unwrap();
        assert_eq!(giving.date, None);
    }

    #[test]
    fn test_non_string_dates_are_lenient() {
        let json = r#"{"id":"g1","fund":"tithe","amount":20.0,"date":1704067200000}"#;
        let giving: Giving = serde_json::from_str(json).unwrap();
        assert_eq!(
            giving.date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0)
        );

        let json = r#"{"id":"g2","fund":"tithe","amount":20.0,"date":{}}"#;
        let giving: Giving = serde_json::from_str(json).unwrap();
        assert_eq!(giving.date, None);

        let json = r#"{"id":"g3","fund":"tithe","amount":20.0,"date":null}"#;
        let giving: Giving = serde_json::from_str(json).unwrap();
        assert_eq!(giving.date, None);
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-10T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10 09:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T09:30:00Z"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-10"),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("10/03/2024"), None);
    }

    #[test]
    fn test_registration_deadline() {
        let mut event = CalendarEvent::new("e1", "Retreat", at(2024, 5, 1));
        event.capacity = Some(20);
        event.registration_deadline = Some(at(2024, 4, 20));

        assert!(event.registration_open(at(2024, 4, 19)));
        assert!(!event.registration_open(at(2024, 4, 21)));

        event.registration_deadline = None;
        assert!(event.registration_open(at(2024, 4, 21)));
    }

    #[test]
    fn test_task_overdue() {
        let task = Task {
            id: "t1".to_string(),
            title: "Order hymnals".to_string(),
            status: TaskStatus::Todo,
            due_date: Some(at(2024, 1, 5)),
            assignee: None,
        };
        assert!(task.is_overdue(at(2024, 1, 6)));
        assert!(!task.is_overdue(at(2024, 1, 4)));

        let done = Task {
            status: TaskStatus::Done,
            ..task
        };
        assert!(!done.is_overdue(at(2024, 1, 6)));
    }
}
