/// Schedule lookups
///
/// `ScheduleRepository` reads `class_reservations`. Status and date
/// predicates are pushed down to SQL as bound parameters; the text
/// predicates are then applied in Rust because SQLite's `LIKE` and `lower()`
/// only fold ASCII ("CÁLCULO" would not match "cálculo").
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sdk::ScheduleEntry;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::query::ScheduleFilter;

/// Read-only access to the class schedule
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Distinct subject names of entries with `confirmed_status`, sorted
    async fn distinct_subjects(&self, confirmed_status: &str) -> Result<Vec<String>>;

    /// Entries satisfying every predicate of `filter`
    async fn find(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>>;
}

/// Schedule repository for database operations
pub struct ScheduleRepository {
    pool: SqlitePool,
}

impl ScheduleRepository {
    /// Create a new schedule repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Build the pushed-down part of a lookup
    fn build_query(filter: &ScheduleFilter) -> QueryBuilder<'_, Sqlite> {
        let mut builder = QueryBuilder::new(
            "SELECT subject, campus, building, room, class_date, start_time, end_time, status \
             FROM class_reservations WHERE 1 = 1",
        );

        for status in filter.statuses() {
            builder.push(" AND status = ").push_bind(status);
        }
        for date in filter.dates() {
            builder
                .push(" AND date(class_date) = ")
                .push_bind(date.format("%Y-%m-%d").to_string());
        }

        builder.push(" ORDER BY class_date, start_time, subject, room");
        builder
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn distinct_subjects(&self, confirmed_status: &str) -> Result<Vec<String>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire schedule connection")?;

        let subjects: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT subject FROM class_reservations WHERE status = ? ORDER BY subject",
        )
        .bind(confirmed_status)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to load subject catalog")?;

        debug!("Loaded {} distinct subjects", subjects.len());
        Ok(subjects)
    }

    async fn find(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>> {
        // One connection per lookup; returned to the pool when dropped,
        // including on the error paths below
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire schedule connection")?;

        let mut builder = Self::build_query(filter);
        let rows = builder
            .build()
            .fetch_all(&mut *conn)
            .await
            .context("Failed to query schedule")?;

        let fetched = rows.len();
        let entries: Vec<ScheduleEntry> = rows
            .iter()
            .filter_map(row_to_entry)
            .filter(|entry| filter.matches(entry))
            .collect();

        debug!(
            "Schedule lookup [{}]: {} rows fetched, {} matched",
            filter,
            fetched,
            entries.len()
        );
        Ok(entries)
    }
}

/// Map a row onto an entry, skipping rows whose date or times don't parse
fn row_to_entry(row: &SqliteRow) -> Option<ScheduleEntry> {
    let raw_date: String = row.get("class_date");
    let raw_start: String = row.get("start_time");
    let raw_end: String = row.get("end_time");

    let parsed = (
        parse_date(&raw_date),
        parse_time(&raw_start),
        parse_time(&raw_end),
    );
    let (Some(date), Some(start_time), Some(end_time)) = parsed else {
        warn!(
            "Skipping schedule row with unreadable date/time: {} {}-{}",
            raw_date, raw_start, raw_end
        );
        return None;
    };

    Some(ScheduleEntry {
        subject: row.get("subject"),
        campus: row.get("campus"),
        building: row.get("building"),
        room: row.get("room"),
        date,
        start_time,
        end_time,
        status: row.get("status"),
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}
