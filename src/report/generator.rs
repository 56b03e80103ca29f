//! Markdown and JSON report generation.
//!
//! This module renders dashboards, event listings and due reminders for
//! the terminal or a file.

use crate::analysis::{percent, Buckets, Dashboard};
use crate::models::EventInstance;
use crate::reminders::DueReminder;
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Width of a full-length bar.
const BAR_WIDTH: usize = 24;

/// Generate the complete dashboard in Markdown.
pub fn generate_markdown_dashboard(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Congregation Dashboard\n\n");
    let scope = match dashboard.range {
        Some((from, to)) => format!("{} to {}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d")),
        None => dashboard.period.to_string(),
    };
    output.push_str(&format!(
        "*{} (as of {})*\n\n",
        scope,
        dashboard.today.format("%Y-%m-%d")
    ));

    output.push_str(&generate_giving_section(dashboard));
    output.push_str(&generate_attendance_section(dashboard));
    output.push_str(&generate_care_section(dashboard));
    output.push_str(&generate_calendar_section(dashboard));

    // Footer
    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Report generated by Flockbook v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

fn generate_giving_section(dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Giving\n\n");
    section.push_str("| Total | Gifts | Givers | Average |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | {} | {} | {} |\n\n",
        money(dashboard.giving_total),
        dashboard.gift_count,
        dashboard.unique_givers,
        money(dashboard.average_gift)
    ));

    if !dashboard.giving_by_fund.is_empty() {
        section.push_str("### By Fund\n\n");
        section.push_str("| Fund | Amount | Share | |\n");
        section.push_str("|:---|---:|---:|:---|\n");

        let total = dashboard.giving_by_fund.total();
        let max = dashboard.giving_by_fund.max();
        for bucket in dashboard.giving_by_fund.sorted_desc() {
            section.push_str(&format!(
                "| {} | {} | {:.1}% | `{}` |\n",
                bucket.label,
                money(bucket.value),
                percent(bucket.value, total),
                bar(bucket.value, max)
            ));
        }
        section.push('\n');
    }

    section.push_str(&format!(
        "### By Month (last {})\n\n",
        dashboard.giving_by_month.len()
    ));
    section.push_str(&generate_chart(&dashboard.giving_by_month, money));

    section
}

fn generate_attendance_section(dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Attendance\n\n");
    section.push_str(&format!(
        "- **Check-ins in period:** {}\n",
        dashboard.check_ins
    ));
    section.push_str(&format!(
        "- **Active streak:** {} month{}\n\n",
        dashboard.attendance_streak,
        if dashboard.attendance_streak == 1 { "" } else { "s" }
    ));
    section.push_str(&generate_chart(&dashboard.attendance_by_month, |v| {
        format!("{}", v as u64)
    }));

    section
}

fn generate_care_section(dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Care & Administration\n\n");

    section.push_str("### Tasks\n\n");
    section.push_str(&generate_count_table("Status", &dashboard.tasks_by_status));
    if dashboard.overdue_tasks > 0 {
        section.push_str(&format!(
            "> ⚠️ **{} overdue task{}**\n\n",
            dashboard.overdue_tasks,
            if dashboard.overdue_tasks == 1 { "" } else { "s" }
        ));
    }

    section.push_str("### Interactions\n\n");
    section.push_str(&generate_count_table("Type", &dashboard.interactions_by_kind));

    section.push_str("### Prayer Requests\n\n");
    section.push_str(&generate_count_table("Status", &dashboard.prayer_by_status));

    section
}

fn generate_calendar_section(dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Upcoming Events\n\n");
    section.push_str(&format!(
        "- **Occurrences:** {}\n\n",
        dashboard.upcoming_events
    ));
    section.push_str(&generate_count_table(
        "Category",
        &dashboard.upcoming_by_category,
    ));

    section
}

/// Table of counts with percentage shares, largest first.
fn generate_count_table(heading: &str, buckets: &Buckets) -> String {
    if buckets.is_empty() {
        return "*None in this period.*\n\n".to_string();
    }

    let mut table = String::new();
    table.push_str(&format!("| {} | Count | Share |\n", heading));
    table.push_str("|:---|:---:|---:|\n");

    for bucket in buckets.sorted_desc() {
        table.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            bucket.label,
            bucket.value as u64,
            buckets.share(&bucket.key)
        ));
    }
    table.push('\n');

    table
}

/// Chronological bar chart for seeded month buckets.
fn generate_chart(buckets: &Buckets, fmt_value: impl Fn(f64) -> String) -> String {
    let mut chart = String::new();
    let max = buckets.max();

    chart.push_str("```\n");
    for bucket in buckets.entries() {
        chart.push_str(&format!(
            "{:<9} {:<width$} {}\n",
            bucket.label,
            bar(bucket.value, max),
            fmt_value(bucket.value),
            width = BAR_WIDTH
        ));
    }
    chart.push_str("```\n\n");

    chart
}

/// Proportional bar relative to `max`; empty when `max` is 0.
pub fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round().max(1.0) as usize;
    "█".repeat(len.min(BAR_WIDTH))
}

fn money(value: f64) -> String {
    format!("${:.2}", value)
}

/// Generate an event listing in Markdown.
///
/// Registration status is evaluated at `now`.
pub fn generate_markdown_events(
    instances: &[EventInstance],
    from: NaiveDate,
    to: NaiveDate,
    now: NaiveDateTime,
) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Events {} to {}\n\n",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    ));

    if instances.is_empty() {
        output.push_str("No events in this window.\n");
        return output;
    }

    output.push_str("| Date | Time | Event | Category | Series | Registration |\n");
    output.push_str("|:---|:---|:---|:---|:---|:---|\n");

    for instance in instances {
        let Some(start) = instance.start() else {
            continue;
        };
        let time = if instance.event.all_day {
            "All day".to_string()
        } else {
            match instance.event.end {
                Some(end) => format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")),
                None => start.format("%H:%M").to_string(),
            }
        };

        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            start.format("%a %Y-%m-%d"),
            time,
            instance.title(),
            instance.category(),
            instance.series_id.as_deref().unwrap_or("-"),
            registration(instance, now)
        ));
    }

    output.push_str(&format!("\n*{} occurrences*\n", instances.len()));
    output
}

fn registration(instance: &EventInstance, now: NaiveDateTime) -> String {
    let event = &instance.event;
    if event.capacity.is_none() && event.registration_deadline.is_none() {
        return "-".to_string();
    }

    let status = if event.registration_open(now) {
        "Open"
    } else {
        "Closed"
    };
    match event.capacity {
        Some(capacity) => format!("{} ({} seats)", status, capacity),
        None => status.to_string(),
    }
}

/// Generate the reminders due on `date` in Markdown.
pub fn generate_markdown_reminders(due: &[DueReminder<'_>], date: NaiveDate) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Reminders for {}\n\n", date.format("%Y-%m-%d")));

    if due.is_empty() {
        output.push_str("No reminders due.\n");
        return output;
    }

    for reminder in due {
        let when = reminder
            .instance
            .start()
            .map(|s| s.format("%a %Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        output.push_str(&format!(
            "- **{}** ({}): {} on {}\n",
            reminder.rule.name,
            reminder.rule.channel,
            reminder.instance.title(),
            when
        ));
    }

    output
}

/// Generate a pretty-printed JSON document.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
