//! Domain types for schedule questions
//!
//! An [`Intent`] is what a question asks for, a [`TimeWindow`] is the concrete
//! date and time-of-day range its temporal words resolve to, and a
//! [`ScheduleEntry`] is one read-only row of the class schedule.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What kind of lookup a question asks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// "Where is my Calculus class?"
    LookupBySubject,

    /// "What is happening in room 203?"
    LookupByRoom,
}

impl IntentKind {
    pub fn as_str(&self) -> &str {
        match self {
            IntentKind::LookupBySubject => "lookup_by_subject",
            IntentKind::LookupByRoom => "lookup_by_room",
        }
    }

    /// Parse an intent label, accepting the Portuguese labels as well.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "lookup_by_subject" | "consultar_aula" => Some(IntentKind::LookupBySubject),
            "lookup_by_room" | "consultar_sala" => Some(IntentKind::LookupByRoom),
            _ => None,
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured form of a question
///
/// Every field except `kind` is optional; `None` means unconstrained.
/// Constructors trim values and turn blank strings into `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,

    /// Subject name, possibly misspelled or partial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Raw date words, e.g. "today", "amanhã", "10/10"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expression: Option<String>,

    /// Raw time words, e.g. "morning", "19h"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
}

impl Intent {
    /// Create an unconstrained intent of the given kind
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            subject: None,
            date_expression: None,
            time_expression: None,
            room: None,
            building: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = non_empty(subject);
        self
    }

    pub fn with_date(mut self, expression: impl Into<String>) -> Self {
        self.date_expression = non_empty(expression);
        self
    }

    pub fn with_time(mut self, expression: impl Into<String>) -> Self {
        self.time_expression = non_empty(expression);
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = non_empty(room);
        self
    }

    pub fn with_building(mut self, building: impl Into<String>) -> Self {
        self.building = non_empty(building);
        self
    }
}

/// Trim a value and drop it if nothing is left.
pub fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A calendar date plus a half-open time-of-day range `[start, end)`
///
/// Invariant: `start < end`. Windows never cross midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Build a window, returning `None` when the range is empty or inverted.
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<Self> {
        if start < end {
            Some(Self { date, start, end })
        } else {
            None
        }
    }

    /// True when `[start, end)` shares at least one instant with this window.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.end && self.start < end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date.format("%Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// One scheduled class session, as stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub subject: String,
    pub campus: String,
    pub building: String,
    pub room: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
}

impl ScheduleEntry {
    pub fn is_confirmed(&self, confirmed_status: &str) -> bool {
        self.status == confirmed_status
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}, {}, room {}, {}-{} on {}",
            self.subject,
            self.campus,
            self.building,
            self.room,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M"),
            self.date.format("%d/%m")
        )
    }
}

/// Known subject names, loaded once per session
///
/// Kept sorted and de-duplicated so prompts built from it are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectCatalog {
    subjects: BTreeSet<String>,
}

impl SubjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(String::as_str)
    }

    /// Case-insensitive membership test
    pub fn contains(&self, subject: &str) -> bool {
        let needle = subject.to_lowercase();
        self.subjects.iter().any(|s| s.to_lowercase() == needle)
    }

    /// Catalog subjects containing `fragment`, case-insensitively
    pub fn matching(&self, fragment: &str) -> Vec<&str> {
        let needle = fragment.to_lowercase();
        self.subjects
            .iter()
            .filter(|s| s.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for SubjectCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            subjects: iter.into_iter().filter_map(non_empty).collect(),
        }
    }
}
