//! Typed preference repository over a [`KeyValueStore`].

use super::{KeyValueStore, StoreError};
use crate::analysis::Period;
use crate::reminders::ReminderRule;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const REMINDER_RULES_KEY: &str = "reminder_rules";
const VIEW_PREFERENCES_KEY: &str = "view_preferences";
const SAVED_FILTERS_KEY: &str = "saved_filters";

/// How the calendar is laid out by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    List,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPreferences {
    #[serde(default)]
    pub default_period: Period,
    #[serde(default)]
    pub calendar_view: CalendarView,
}

/// A named member-search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub name: String,
    pub query: String,
}

/// Preferences stored as JSON values under fixed keys.
pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        Ok(self.read_opt(key)?.unwrap_or_default())
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw)
    }

    pub fn reminder_rules(&self) -> Result<Vec<ReminderRule>, StoreError> {
        self.read(REMINDER_RULES_KEY)
    }

    pub fn set_reminder_rules(&mut self, rules: &[ReminderRule]) -> Result<(), StoreError> {
        self.write(REMINDER_RULES_KEY, &rules)
    }

    /// Append a rule, replacing any existing rule with the same id.
    pub fn add_reminder_rule(&mut self, rule: ReminderRule) -> Result<(), StoreError> {
        let mut rules = self.reminder_rules()?;
        rules.retain(|r| r.id != rule.id);
        rules.push(rule);
        self.set_reminder_rules(&rules)
    }

    pub fn view_preferences(&self) -> Result<ViewPreferences, StoreError> {
        self.read(VIEW_PREFERENCES_KEY)
    }

    /// View preferences only if they have been saved.
    pub fn stored_view_preferences(&self) -> Result<Option<ViewPreferences>, StoreError> {
        self.read_opt(VIEW_PREFERENCES_KEY)
    }

    pub fn set_view_preferences(&mut self, prefs: &ViewPreferences) -> Result<(), StoreError> {
        self.write(VIEW_PREFERENCES_KEY, prefs)
    }

    pub fn saved_filters(&self) -> Result<Vec<SavedFilter>, StoreError> {
        self.read(SAVED_FILTERS_KEY)
    }

    /// Insert or update a filter by name.
    pub fn save_filter(&mut self, filter: SavedFilter) -> Result<(), StoreError> {
        let mut filters = self.saved_filters()?;
        match filters.iter_mut().find(|f| f.name == filter.name) {
            Some(existing) => existing.query = filter.query,
            None => filters.push(filter),
        }
        self.write(SAVED_FILTERS_KEY, &filters)
    }

    /// Remove every stored preference.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        for key in [REMINDER_RULES_KEY, VIEW_PREFERENCES_KEY, SAVED_FILTERS_KEY] {
            self.store.remove(key)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> S {
        self.store
    }
}
