//! Dataset loading.
//!
//! Records are read from a single JSON file or from a directory of JSON
//! files. Each file holds any subset of the collections; directory files
//! are merged in path order.

use crate::models::{Attendance, CalendarEvent, Giving, Interaction, PrayerRequest, Task};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Every collection the analyses work on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub giving: Vec<Giving>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub attendance: Vec<Attendance>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub prayer_requests: Vec<PrayerRequest>,
}

impl Dataset {
    /// Load from a JSON file or a directory of JSON files.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Data path does not exist: {}", path.display());
        }

        let dataset = if path.is_dir() {
            Self::load_dir(path)?
        } else {
            Self::load_file(path)?
        };

        info!(
            "Loaded {} events, {} gifts, {} tasks, {} check-ins, {} interactions, {} prayer requests",
            dataset.events.len(),
            dataset.giving.len(),
            dataset.tasks.len(),
            dataset.attendance.len(),
            dataset.interactions.len(),
            dataset.prayer_requests.len()
        );

        Ok(dataset)
    }

    /// Load a single JSON file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse data file: {}", path.display()))
    }

    fn load_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut dataset = Self::default();
        for path in paths {
            debug!("Reading {}", path.display());
            dataset.merge(Self::load_file(&path)?);
        }

        Ok(dataset)
    }

    /// Append every collection of `other`.
    pub fn merge(&mut self, other: Dataset) {
        self.events.extend(other.events);
        self.giving.extend(other.giving);
        self.tasks.extend(other.tasks);
        self.attendance.extend(other.attendance);
        self.interactions.extend(other.interactions);
        self.prayer_requests.extend(other.prayer_requests);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{
                "events": [{"id": "svc", "title": "Worship", "start": "2024-01-07T10:00:00", "repeat": "weekly", "category": "service"}],
                "giving": [{"id": "g1", "fund": "tithe", "amount": 25.5, "date": "2024-01-07"}]
            }"#,
        )
        .unwrap();

        let dataset = Dataset::load(&path).unwrap();

        assert_eq!(dataset.events.len(), 1);
        assert_eq!(dataset.giving[0].amount, 25.5);
        assert!(dataset.tasks.is_empty());
    }

    #[test]
    fn test_load_directory_merges_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"tasks": [{"id": "t1", "title": "Book venue", "status": "done"}]}"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("care")).unwrap();
        std::fs::write(
            dir.path().join("care").join("b.json"),
            r#"{"interactions": [{"id": "i1", "member": "m1", "kind": "visit", "date": "2024-02-02"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not json").unwrap();

        let dataset = Dataset::load(dir.path()).unwrap();

        assert_eq!(dataset.tasks.len(), 1);
        assert_eq!(dataset.interactions.len(), 1);
    }

    #[test]
    fn test_numeric_and_unknown_values_keep_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(
            &path,
            r#"{
                "events": [{"id": "e1", "title": "Retreat", "start": 1704067200000, "repeat": "yearly"}],
                "giving": [
                    {"id": "g1", "fund": "tithe", "amount": 10.0, "date": 1704067200000},
                    {"id": "g2", "fund": "tithe", "amount": 20.0, "date": "2024-01-02"},
                    {"id": "g3", "fund": "tithe", "amount": 30.0, "date": {}}
                ]
            }"#,
        )
        .unwrap();

        let dataset = Dataset::load(&path).unwrap();

        assert_eq!(dataset.giving.len(), 3);
        assert!(dataset.giving[0].date.is_some());
        assert!(dataset.giving[1].date.is_some());
        assert!(dataset.giving[2].date.is_none());
        assert_eq!(dataset.events[0].rule(), crate::models::RepeatRule::None);
        assert!(dataset.events[0].start.is_some());
    }

    #[test]
    fn test_missing_path_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(Dataset::load(&dir.path().join("nope.json")).is_err());
    }
}
