//! Record aggregation and derived statistics.
//!
//! This module folds filtered records into keyed buckets (counts or summed
//! amounts) and derives the totals, maxima, shares and streaks used by the
//! dashboard charts.

use crate::models::Dated;
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// One keyed slot of an aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// Grouping key (fund name, status, `YYYY-MM`, ...).
    pub key: String,
    /// Display label; equal to the key except for month buckets.
    pub label: String,
    /// Running count or sum.
    pub value: f64,
}

/// Ordered buckets with keyed lookup.
///
/// Buckets keep the order in which their keys were first seen (or seeded).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Buckets {
    entries: Vec<Bucket>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buckets pre-seeded at zero, in the given order.
    pub fn seeded<I, K, L>(keys: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        let mut buckets = Self::new();
        for (key, label) in keys {
            buckets.slot(key.into(), label.into());
        }
        buckets
    }

    fn slot(&mut self, key: String, label: String) -> &mut Bucket {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.index.insert(key.clone(), idx);
                self.entries.push(Bucket {
                    key,
                    label,
                    value: 0.0,
                });
                idx
            }
        };
        &mut self.entries[idx]
    }

    /// Add `amount` to the bucket for `key`, creating it at zero if unseen.
    pub fn add(&mut self, key: impl Into<String>, amount: f64) {
        let key = key.into();
        let label = key.clone();
        self.slot(key, label).value += amount;
    }

    /// Add to an existing bucket only. Returns false if `key` was never seeded.
    pub fn add_existing(&mut self, key: &str, amount: f64) -> bool {
        match self.index.get(key) {
            Some(&idx) => {
                self.entries[idx].value += amount;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.index.get(key).map(|&idx| self.entries[idx].value)
    }

    pub fn entries(&self) -> &[Bucket] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all bucket values.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|b| b.value).sum()
    }

    /// Largest bucket value, 0 when empty.
    pub fn max(&self) -> f64 {
        self.entries.iter().map(|b| b.value).fold(0.0, f64::max)
    }

    /// Percentage share of `key` in the total; 0 for unknown keys or a zero total.
    pub fn share(&self, key: &str) -> f64 {
        self.get(key).map_or(0.0, |value| percent(value, self.total()))
    }

    /// Buckets sorted by value, largest first; ties keep bucket order.
    pub fn sorted_desc(&self) -> Vec<&Bucket> {
        let mut sorted: Vec<&Bucket> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Consecutive non-zero buckets counted backward from the last one.
    ///
    /// Stops at the first zero.
    pub fn streak(&self) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|b| b.value > 0.0)
            .count()
    }
}

/// `part / total` as a percentage, 0 when the total is 0.
pub fn percent(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Count records per key.
pub fn count_by<I, F>(records: I, key: F) -> Buckets
where
    I: IntoIterator,
    F: Fn(&I::Item) -> String,
{
    let mut buckets = Buckets::new();
    for record in records {
        buckets.add(key(&record), 1.0);
    }
    buckets
}

/// Sum an amount per key.
pub fn sum_by<I, F, A>(records: I, key: F, amount: A) -> Buckets
where
    I: IntoIterator,
    F: Fn(&I::Item) -> String,
    A: Fn(&I::Item) -> f64,
{
    let mut buckets = Buckets::new();
    for record in records {
        buckets.add(key(&record), amount(&record));
    }
    buckets
}

/// Key of the calendar month containing `date`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// `(key, label)` for the trailing `months` calendar months ending with the
/// month of `today`, oldest first.
pub fn trailing_months(months: u32, today: NaiveDate) -> Vec<(String, String)> {
    let Some(first_of_month) = today.with_day(1) else {
        return Vec::new();
    };

    (0..months)
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
        .map(|month| (month_key(month), month.format("%b %Y").to_string()))
        .collect()
}

/// Count records per month over a pre-seeded trailing window.
///
/// Records dated outside the seeded months are not counted.
pub fn monthly_count<I>(records: I, months: u32, today: NaiveDate) -> Buckets
where
    I: IntoIterator,
    I::Item: Dated,
{
    monthly_sum(records, months, today, |_| 1.0)
}

/// Sum an amount per month over a pre-seeded trailing window.
pub fn monthly_sum<I, A>(records: I, months: u32, today: NaiveDate, amount: A) -> Buckets
where
    I: IntoIterator,
    I::Item: Dated,
    A: Fn(&I::Item) -> f64,
{
    let mut buckets = Buckets::seeded(trailing_months(months, today));

    for record in records {
        if let Some(ts) = record.timestamp() {
            buckets.add_existing(&month_key(ts.date()), amount(&record));
        }
    }

    buckets
}
