//! In-memory schedule store
//!
//! Holds entries in a `Vec` and evaluates filters directly. Used by tests
//! and by callers that already have the schedule loaded.

use anyhow::Result;
use async_trait::async_trait;
use sdk::ScheduleEntry;
use std::collections::BTreeSet;

use super::schedule::ScheduleStore;
use crate::query::ScheduleFilter;

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Vec<ScheduleEntry>,
}

impl InMemoryStore {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn distinct_subjects(&self, confirmed_status: &str) -> Result<Vec<String>> {
        let subjects: BTreeSet<&str> = self
            .entries
            .iter()
            .filter(|e| e.is_confirmed(confirmed_status))
            .map(|e| e.subject.as_str())
            .collect();
        Ok(subjects.into_iter().map(str::to_string).collect())
    }

    async fn find(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use chrono::{NaiveDate, NaiveTime};

    fn entry(subject: &str, status: &str) -> ScheduleEntry {
        ScheduleEntry {
            subject: subject.into(),
            campus: "Campus Sul".into(),
            building: "Bloco A".into(),
            room: "12".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status: status.into(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_filters() {
        let store = InMemoryStore::new(vec![
            entry("Física", "confirmed"),
            entry("Cálculo I", "confirmed"),
            entry("Física", "confirmed"),
            entry("Química", "cancelled"),
        ]);
        assert_eq!(store.len(), 4);

        assert_eq!(
            store.distinct_subjects("confirmed").await.unwrap(),
            vec!["Cálculo I", "Física"]
        );

        let filter = ScheduleFilter::new().with(Predicate::SubjectContains("FÍS".into()));
        assert_eq!(store.find(&filter).await.unwrap().len(), 2);
    }
}
