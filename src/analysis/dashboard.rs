//! Dashboard statistics.
//!
//! Composes the window filter and the aggregator into the figures shown on
//! the congregation dashboard. Recomputed from scratch on every call.

use crate::analysis::aggregator::{count_by, monthly_count, monthly_sum, sum_by, Buckets};
use crate::analysis::window::{filter_period, filter_range, Period};
use crate::models::Dated;
use crate::calendar;
use crate::data::Dataset;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;

/// Inputs that shape a dashboard besides the dataset.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub period: Period,
    /// Months shown on the attendance chart.
    pub trailing_months: u32,
    /// Months shown on the giving chart.
    pub giving_months: u32,
    /// How far ahead upcoming events are counted.
    pub lookahead_months: u32,
    /// Explicit inclusive date range; replaces `period` when set.
    pub range: Option<(NaiveDate, NaiveDate)>,
}

impl DashboardOptions {
    /// Records inside the reporting window ending at `now`.
    fn scope<'a, T: Dated>(&self, records: &'a [T], now: NaiveDateTime) -> Vec<&'a T> {
        match self.range {
            Some((from, to)) => filter_range(records, from, to),
            None => filter_period(records, self.period, now),
        }
    }
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            period: Period::default(),
            trailing_months: 6,
            giving_months: 12,
            lookahead_months: 3,
            range: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub today: NaiveDate,

    pub giving_total: f64,
    pub gift_count: usize,
    pub unique_givers: usize,
    pub average_gift: f64,
    pub giving_by_fund: Buckets,
    pub giving_by_month: Buckets,

    pub check_ins: usize,
    pub attendance_by_month: Buckets,
    /// Consecutive trailing months with at least one check-in.
    pub attendance_streak: usize,

    pub tasks_by_status: Buckets,
    pub overdue_tasks: usize,

    pub interactions_by_kind: Buckets,
    pub prayer_by_status: Buckets,

    pub upcoming_events: usize,
    pub upcoming_by_category: Buckets,
}

/// Build the dashboard for the period ending at `now`.
///
/// Period-scoped figures use the window filter (or the explicit range); the monthly charts use their
/// own pre-seeded trailing windows. Tasks are counted regardless of period
/// since their dates are due dates.
pub fn build(dataset: &Dataset, options: &DashboardOptions, now: NaiveDateTime) -> Dashboard {
    let today = now.date();
    let period = options.period;

    let gifts = options.scope(&dataset.giving, now);
    let giving_by_fund = sum_by(gifts.iter(), |g| g.fund.clone(), |g| g.amount);
    let giving_total = giving_by_fund.total();
    let gift_count = gifts.len();
    let unique_givers = gifts
        .iter()
        .filter(|g| !g.member.is_empty())
        .map(|g| g.member.as_str())
        .collect::<HashSet<_>>()
        .len();
    let average_gift = if gift_count == 0 {
        0.0
    } else {
        giving_total / gift_count as f64
    };

    let giving_by_month = monthly_sum(&dataset.giving, options.giving_months, today, |g| g.amount);

    let check_ins = options.scope(&dataset.attendance, now).len();
    let attendance_by_month = monthly_count(&dataset.attendance, options.trailing_months, today);
    let attendance_streak = attendance_by_month.streak();

    let tasks_by_status = count_by(&dataset.tasks, |t| t.status.to_string());
    let overdue_tasks = dataset.tasks.iter().filter(|t| t.is_overdue(now)).count();

    let interactions_by_kind = count_by(
        options.scope(&dataset.interactions, now),
        |i| i.kind.to_lowercase(),
    );
    let prayer_by_status = count_by(
        options.scope(&dataset.prayer_requests, now),
        |p| p.status.to_string(),
    );

    let upcoming = calendar::upcoming(&dataset.events, today, options.lookahead_months);
    let upcoming_by_category = count_by(&upcoming, |i| i.category().to_string());

    Dashboard {
        period,
        range: options.range,
        today,
        giving_total,
        gift_count,
        unique_givers,
        average_gift,
        giving_by_fund,
        giving_by_month,
        check_ins,
        attendance_by_month,
        attendance_streak,
        tasks_by_status,
        overdue_tasks,
        interactions_by_kind,
        prayer_by_status,
        upcoming_events: upcoming.len(),
        upcoming_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Attendance, CalendarEvent, EventCategory, Giving, Interaction, RepeatRule, Task,
        TaskStatus,
    };

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn gift(member: &str, fund: &str, amount: f64, date: NaiveDateTime) -> Giving {
        Giving {
            id: format!("{}-{}-{}", member, fund, date),
            member: member.to_string(),
            fund: fund.to_string(),
            amount,
            date: Some(date),
            method: None,
        }
    }

    fn sample() -> Dataset {
        let mut service = CalendarEvent::new("svc", "Worship", at(2024, 1, 7));
        service.repeat = Some(RepeatRule::Weekly);
        service.category = EventCategory::Service;

        Dataset {
            events: vec![service],
            giving: vec![
                gift("ann", "tithe", 100.0, at(2024, 6, 20)),
                gift("bob", "missions", 50.0, at(2024, 6, 25)),
                gift("ann", "tithe", 30.0, at(2024, 3, 1)),
            ],
            tasks: vec![
                Task {
                    id: "t1".to_string(),
                    title: "Order chairs".to_string(),
                    status: TaskStatus::Todo,
                    due_date: Some(at(2024, 6, 1)),
                    assignee: None,
                },
                Task {
                    id: "t2".to_string(),
                    title: "Print bulletins".to_string(),
                    status: TaskStatus::Done,
                    due_date: Some(at(2024, 6, 1)),
                    assignee: None,
                },
            ],
            attendance: vec![Attendance {
                id: "a1".to_string(),
                member: "ann".to_string(),
                event_id: Some("svc_24".to_string()),
                checked_in_at: Some(at(2024, 6, 23)),
            }],
            interactions: vec![Interaction {
                id: "i1".to_string(),
                member: "bob".to_string(),
                kind: "Visit".to_string(),
                date: Some(at(2024, 6, 10)),
                notes: String::new(),
            }],
            prayer_requests: Vec::new(),
        }
    }

    #[test]
    fn test_build_dashboard() {
        let dashboard = build(&sample(), &DashboardOptions::default(), at(2024, 6, 30));

        assert_eq!(dashboard.giving_total, 150.0);
        assert_eq!(dashboard.gift_count, 2);
        assert_eq!(dashboard.unique_givers, 2);
        assert_eq!(dashboard.average_gift, 75.0);
        assert_eq!(dashboard.giving_by_fund.get("tithe"), Some(100.0));

        assert_eq!(dashboard.giving_by_month.len(), 12);
        assert_eq!(dashboard.giving_by_month.total(), 180.0);

        assert_eq!(dashboard.check_ins, 1);
        assert_eq!(dashboard.attendance_by_month.len(), 6);
        assert_eq!(dashboard.attendance_streak, 1);

        assert_eq!(dashboard.tasks_by_status.get("To Do"), Some(1.0));
        assert_eq!(dashboard.overdue_tasks, 1);
        assert_eq!(dashboard.interactions_by_kind.get("visit"), Some(1.0));
        assert!(dashboard.prayer_by_status.is_empty());

        // Sundays from Jun 30 through Sep 30.
        assert_eq!(dashboard.upcoming_events, 14);
        assert_eq!(dashboard.upcoming_by_category.get("Service"), Some(14.0));
    }

    #[test]
    fn test_explicit_range_replaces_period() {
        let options = DashboardOptions {
            range: Some((
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            )),
            ..DashboardOptions::default()
        };
        let dashboard = build(&sample(), &options, at(2024, 6, 30));

        assert_eq!(dashboard.giving_total, 30.0);
        assert_eq!(dashboard.gift_count, 1);
        assert_eq!(dashboard.check_ins, 0);
        assert!(dashboard.interactions_by_kind.is_empty());
        // Monthly charts keep their own trailing windows.
        assert_eq!(dashboard.giving_by_month.total(), 180.0);
    }

    #[test]
    fn test_empty_dataset_is_all_zero() {
        let dashboard = build(
            &Dataset::default(),
            &DashboardOptions::default(),
            at(2024, 6, 30),
        );

        assert_eq!(dashboard.giving_total, 0.0);
        assert_eq!(dashboard.average_gift, 0.0);
        assert_eq!(dashboard.attendance_streak, 0);
        assert_eq!(dashboard.upcoming_events, 0);
    }
}
