//! Recurring event expansion.
//!
//! Turns event templates into the dated instances that fall inside a query
//! window. Occurrence `n` is always computed from the template's original
//! start, so an instance keeps the same identifier no matter which window
//! produced it.
//!
//! Month-based rules add `n * k` calendar months to the original start and
//! clamp to the last day of the target month: a template on Jan 31 occurs on
//! Feb 29 (or 28), Mar 31, Apr 30, ... without drifting.

use crate::models::{CalendarEvent, EventInstance, RepeatRule};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Calendar increment between two occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Days(i64),
    Months(u32),
}

impl Step {
    fn for_rule(rule: RepeatRule) -> Option<Self> {
        match rule {
            RepeatRule::None => None,
            RepeatRule::Daily => Some(Step::Days(1)),
            RepeatRule::Weekly => Some(Step::Days(7)),
            RepeatRule::Biweekly => Some(Step::Days(14)),
            RepeatRule::Monthly => Some(Step::Months(1)),
            RepeatRule::Quarterly => Some(Step::Months(3)),
        }
    }

    /// Start of occurrence `n`, or `None` once dates overflow.
    fn nth(self, start: NaiveDateTime, n: u32) -> Option<NaiveDateTime> {
        match self {
            Step::Days(k) => start.checked_add_signed(Duration::days(k.checked_mul(n as i64)?)),
            Step::Months(k) => start.checked_add_months(Months::new(k.checked_mul(n)?)),
        }
    }

    /// Lowest occurrence index that can land on or after `window_start`.
    ///
    /// Skips the occurrences that are certainly before the window; the caller
    /// still checks each emitted date.
    fn first_candidate(self, start: NaiveDate, window_start: NaiveDate) -> u32 {
        if window_start <= start {
            return 0;
        }

        match self {
            Step::Days(k) => {
                let gap = (window_start - start).num_days();
                u32::try_from(gap / k).unwrap_or(u32::MAX)
            }
            Step::Months(k) => {
                let whole = (window_start.year() - start.year()) as i64 * 12
                    + window_start.month() as i64
                    - start.month() as i64;
                u32::try_from(whole.max(0) / k as i64).unwrap_or(u32::MAX)
            }
        }
    }
}

/// Expand one template into the instances whose start date lies in
/// `[window_start, window_end]` (and on or before `repeat_until`, if set).
///
/// Templates without a start yield nothing. Non-repeating templates yield
/// themselves, unmodified, when their start date is inside the window.
pub fn expand(
    template: &CalendarEvent,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<EventInstance> {
    let Some(start) = template.start else {
        debug!("Event {} has no start date, skipping", template.id);
        return Vec::new();
    };

    if window_end < window_start {
        return Vec::new();
    }

    let Some(step) = Step::for_rule(template.rule()) else {
        let date = start.date();
        if date >= window_start && date <= window_end {
            return vec![EventInstance {
                id: template.id.clone(),
                series_id: None,
                occurrence: None,
                event: template.clone(),
            }];
        }
        return Vec::new();
    };

    let last = match template.repeat_until {
        Some(until) => until.min(window_end),
        None => window_end,
    };

    let mut instances = Vec::new();
    let mut n = step.first_candidate(start.date(), window_start);

    while let Some(occurrence_start) = step.nth(start, n) {
        let date = occurrence_start.date();
        if date > last {
            break;
        }

        if date >= window_start {
            instances.push(instance(template, start, occurrence_start, n));
        }

        n = match n.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    instances
}

fn instance(
    template: &CalendarEvent,
    original_start: NaiveDateTime,
    occurrence_start: NaiveDateTime,
    n: u32,
) -> EventInstance {
    let offset = occurrence_start - original_start;

    let mut event = template.clone();
    event.start = Some(occurrence_start);
    event.end = template.end.and_then(|end| end.checked_add_signed(offset));

    EventInstance {
        id: format!("{}_{}", template.id, n),
        series_id: Some(template.id.clone()),
        occurrence: Some(n),
        event,
    }
}

/// Expand every template over the same window, ordered by start then id.
pub fn expand_all(
    templates: &[CalendarEvent],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<EventInstance> {
    let mut instances: Vec<EventInstance> = templates
        .iter()
        .flat_map(|t| expand(t, window_start, window_end))
        .collect();

    instances.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id.cmp(&b.id)));

    debug!(
        "Expanded {} templates ({} repeating) into {} instances ({} to {})",
        templates.len(),
        templates.iter().filter(|t| t.is_repeating()).count(),
        instances.len(),
        window_start,
        window_end
    );

    instances
}

/// Instances from `today` through the same day `months` calendar months later.
pub fn upcoming(templates: &[CalendarEvent], today: NaiveDate, months: u32) -> Vec<EventInstance> {
    let end = today
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX);
    expand_all(templates, today, end)
}
