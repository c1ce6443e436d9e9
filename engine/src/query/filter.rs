//! Schedule filters
//!
//! A [`ScheduleFilter`] is a conjunction of [`Predicate`]s. Predicates carry
//! values, never SQL; the store decides which ones it can push down and the
//! rest are evaluated with [`ScheduleFilter::matches`].

use chrono::NaiveDate;
use sdk::{Intent, ScheduleEntry, TimeWindow};
use std::fmt;

use crate::config::TimeFilter;

/// One condition an entry must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact, case-sensitive status match
    StatusEquals(String),

    /// Case-insensitive substring of the subject
    SubjectContains(String),

    /// Case-insensitive substring of the room
    RoomContains(String),

    /// Case-insensitive substring of the building
    BuildingContains(String),

    DateEquals(NaiveDate),

    /// Entry's `[start, end)` overlaps the window's time range
    TimeOverlaps(TimeWindow),
}

impl Predicate {
    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        match self {
            Predicate::StatusEquals(status) => entry.status == *status,
            Predicate::SubjectContains(needle) => contains_folded(&entry.subject, needle),
            Predicate::RoomContains(needle) => contains_folded(&entry.room, needle),
            Predicate::BuildingContains(needle) => contains_folded(&entry.building, needle),
            Predicate::DateEquals(date) => entry.date == *date,
            Predicate::TimeOverlaps(window) => window.overlaps(entry.start_time, entry.end_time),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::StatusEquals(s) => write!(f, "status = {:?}", s),
            Predicate::SubjectContains(s) => write!(f, "subject ~ {:?}", s),
            Predicate::RoomContains(s) => write!(f, "room ~ {:?}", s),
            Predicate::BuildingContains(s) => write!(f, "building ~ {:?}", s),
            Predicate::DateEquals(d) => write!(f, "date = {}", d),
            Predicate::TimeOverlaps(window) => write!(
                f,
                "time overlaps {}-{}",
                window.start.format("%H:%M"),
                window.end.format("%H:%M")
            ),
        }
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Conjunction of predicates; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    predicates: Vec<Predicate>,
}

impl ScheduleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Build the lookup for an intent and its resolved window.
    ///
    /// Always restricted to `confirmed_status` and the window's date. Subject,
    /// room and building are added only when the intent carries them. The
    /// time range is added only with [`TimeFilter::Overlap`] and when the
    /// question actually named a time.
    pub fn for_intent(
        intent: &Intent,
        window: &TimeWindow,
        confirmed_status: &str,
        time_filter: TimeFilter,
    ) -> Self {
        let mut filter = Self::new()
            .with(Predicate::StatusEquals(confirmed_status.to_string()))
            .with(Predicate::DateEquals(window.date));

        if let Some(subject) = &intent.subject {
            filter.push(Predicate::SubjectContains(subject.clone()));
        }
        if let Some(room) = &intent.room {
            filter.push(Predicate::RoomContains(room.clone()));
        }
        if let Some(building) = &intent.building {
            filter.push(Predicate::BuildingContains(building.clone()));
        }
        if time_filter == TimeFilter::Overlap && intent.time_expression.is_some() {
            filter.push(Predicate::TimeOverlaps(*window));
        }

        filter
    }

    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        self.predicates.iter().all(|p| p.matches(entry))
    }

    /// Statuses the filter requires; used by stores to push down
    pub fn statuses(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::StatusEquals(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Dates the filter requires; used by stores to push down
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::DateEquals(d) => Some(*d),
            _ => None,
        })
    }
}

impl fmt::Display for ScheduleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "(all)");
        }
        let parts: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}
