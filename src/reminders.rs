//! Event reminder rules.
//!
//! A rule fires for an event instance when the instance starts exactly
//! `days_before` days after the day being evaluated.

use crate::models::{EventCategory, EventInstance};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    #[default]
    Sms,
    Email,
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderChannel::Sms => write!(f, "SMS"),
            ReminderChannel::Email => write!(f, "Email"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRule {
    pub id: String,
    pub name: String,
    pub days_before: u32,
    #[serde(default)]
    pub channel: ReminderChannel,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Categories the rule applies to. Empty means every category.
    #[serde(default)]
    pub categories: Vec<EventCategory>,
}

fn default_enabled() -> bool {
    true
}

impl ReminderRule {
    pub fn applies_to(&self, category: EventCategory) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }
}

/// A rule that fires today for one instance.
#[derive(Debug, Clone, Serialize)]
pub struct DueReminder<'a> {
    pub rule: &'a ReminderRule,
    pub instance: &'a EventInstance,
}

/// Rule id derived from a rule name: lowercase ASCII words joined by `-`.
///
/// Empty when the name has no ASCII letters or digits.
pub fn rule_id(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Reminders that fire on `today`, ordered by instance start.
pub fn due_reminders<'a>(
    instances: &'a [EventInstance],
    rules: &'a [ReminderRule],
    today: NaiveDate,
) -> Vec<DueReminder<'a>> {
    let mut due: Vec<DueReminder<'a>> = rules
        .iter()
        .filter(|rule| rule.enabled)
        .flat_map(|rule| {
            let target = today.checked_add_signed(Duration::days(rule.days_before as i64));
            instances
                .iter()
                .filter(move |instance| {
                    target.is_some()
                        && instance.date() == target
                        && rule.applies_to(instance.category())
                })
                .map(move |instance| DueReminder { rule, instance })
        })
        .collect();

    due.sort_by(|a, b| {
        a.instance
            .start()
            .cmp(&b.instance.start())
            .then_with(|| a.rule.id.cmp(&b.rule.id))
    });

    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use crate::models::{CalendarEvent, RepeatRule};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(id: &str, days_before: u32, categories: Vec<EventCategory>) -> ReminderRule {
        ReminderRule {
            id: id.to_string(),
            name: id.to_string(),
            days_before,
            channel: ReminderChannel::Sms,
            enabled: true,
            categories,
        }
    }

    fn instances() -> Vec<EventInstance> {
        let mut service = CalendarEvent::new(
            "svc",
            "Worship",
            date(2024, 1, 7).and_hms_opt(10, 0, 0).unwrap(),
        );
        service.repeat = Some(RepeatRule::Weekly);
        service.category = EventCategory::Service;

        let mut meeting = CalendarEvent::new(
            "board",
            "Board meeting",
            date(2024, 1, 10).and_hms_opt(19, 0, 0).unwrap(),
        );
        meeting.category = EventCategory::Meeting;

        calendar::expand_all(&[service, meeting], date(2024, 1, 1), date(2024, 1, 31))
    }

    #[test]
    fn test_due_reminders_match_days_before() {
        let instances = instances();
        let rules = vec![rule("day-before", 1, vec![]), rule("four-days", 4, vec![])];

        let due = due_reminders(&instances, &rules, date(2024, 1, 6));
        let pairs: Vec<_> = due
            .iter()
            .map(|d| (d.rule.id.as_str(), d.instance.id.as_str()))
            .collect();

        assert_eq!(pairs, vec![("day-before", "svc_0"), ("four-days", "board")]);
    }

    #[test]
    fn test_category_filter_and_disabled_rules() {
        let instances = instances();
        let mut disabled = rule("off", 3, vec![]);
        disabled.enabled = false;
        let rules = vec![rule("meetings", 3, vec![EventCategory::Meeting]), disabled];

        let due = due_reminders(&instances, &rules, date(2024, 1, 7));

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].instance.id, "board");
    }

    #[test]
    fn test_rule_defaults_when_deserializing() {
        let rule: ReminderRule =
            serde_json::from_str(r#"{"id":"r","name":"Day before","days_before":1}"#).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.channel, ReminderChannel::Sms);
        assert!(rule.applies_to(EventCategory::Holiday));
    }

    #[test]
    fn test_rule_id() {
        assert_eq!(rule_id("Day before"), "day-before");
        assert_eq!(rule_id("  One WEEK -- out! "), "one-week-out");
        assert_eq!(rule_id("!!!"), "");
    }
}
