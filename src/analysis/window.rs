//! Reporting periods and time-window filtering.

use crate::models::Dated;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named trailing reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "365d")]
    Year,
    #[serde(rename = "all")]
    AllTime,
}

impl Period {
    /// Parse a period selector such as `30d`, `90`, `year` or `all`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "7" | "7d" | "week" => Some(Period::Week),
            "30" | "30d" | "month" => Some(Period::Month),
            "90" | "90d" | "quarter" => Some(Period::Quarter),
            "365" | "365d" | "year" => Some(Period::Year),
            "all" | "all-time" | "alltime" => Some(Period::AllTime),
            _ => None,
        }
    }

    /// Length in days, `None` for all time.
    pub fn days(self) -> Option<i64> {
        match self {
            Period::Week => Some(7),
            Period::Month => Some(30),
            Period::Quarter => Some(90),
            Period::Year => Some(365),
            Period::AllTime => None,
        }
    }

    /// Earliest timestamp still inside the period ending at `now`.
    pub fn threshold(self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.days()
            .and_then(|days| now.checked_sub_signed(Duration::days(days)))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Week => write!(f, "Last 7 days"),
            Period::Month => write!(f, "Last 30 days"),
            Period::Quarter => write!(f, "Last 90 days"),
            Period::Year => write!(f, "Last 365 days"),
            Period::AllTime => write!(f, "All time"),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s).ok_or_else(|| {
            format!("Unknown period '{}', expected one of 7d, 30d, 90d, 365d, all", s)
        })
    }
}

/// Records dated on or after `now - period`.
///
/// `AllTime` returns every record, including undated ones. Bounded periods
/// drop records without a timestamp.
pub fn filter_period<T: Dated>(records: &[T], period: Period, now: NaiveDateTime) -> Vec<&T> {
    match period.threshold(now) {
        None => records.iter().collect(),
        Some(threshold) => records
            .iter()
            .filter(|r| r.timestamp().is_some_and(|ts| ts >= threshold))
            .collect(),
    }
}

/// Records whose date falls in `[from, to]`, both inclusive.
pub fn filter_range<T: Dated>(records: &[T], from: NaiveDate, to: NaiveDate) -> Vec<&T> {
    records
        .iter()
        .filter(|r| {
            r.timestamp()
                .map(|ts| ts.date())
                .is_some_and(|d| d >= from && d <= to)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Giving;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn gift(id: &str, date: Option<NaiveDateTime>) -> Giving {
        Giving {
            id: id.to_string(),
            member: "m1".to_string(),
            fund: "tithe".to_string(),
            amount: 10.0,
            date,
            method: None,
        }
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse("7d"), Some(Period::Week));
        assert_eq!(Period::parse("90"), Some(Period::Quarter));
        assert_eq!(Period::parse("ALL"), Some(Period::AllTime));
        assert_eq!(Period::parse("fortnight"), None);
        assert!("6d".parse::<Period>().is_err());
    }

    #[test]
    fn test_all_time_is_identity() {
        let records = vec![
            gift("a", Some(at(2001, 1, 1))),
            gift("b", None),
            gift("c", Some(at(2024, 5, 1))),
        ];

        let filtered = filter_period(&records, Period::AllTime, at(2024, 6, 1));
        let ids: Vec<_> = filtered.iter().map(|g| g.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let now = at(2024, 6, 30);
        let records = vec![
            gift("edge", Some(at(2024, 6, 23))),
            gift("before", Some(at(2024, 6, 23) - Duration::seconds(1))),
            gift("recent", Some(at(2024, 6, 29))),
            gift("undated", None),
        ];

        let filtered = filter_period(&records, Period::Week, now);
        let ids: Vec<_> = filtered.iter().map(|g| g.id.as_str()).collect();

        assert_eq!(ids, vec!["edge", "recent"]);
    }

    #[test]
    fn test_filter_range() {
        let records = vec![
            gift("a", Some(at(2024, 1, 1))),
            gift("b", Some(at(2024, 1, 31))),
            gift("c", Some(at(2024, 2, 1))),
        ];

        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(filter_range(&records, from, to).len(), 2);
    }
}
