use chrono::{Local, NaiveDateTime};
use sdk::errors::EngineError;
use sdk::{Intent, ScheduleEntry, SubjectCatalog, TimeWindow};
use std::time::Instant;

use super::filter::ScheduleFilter;
use crate::config::{QueryConfig, TimeFilter};
use crate::db::ScheduleStore;
use crate::time_normalizer;

/// Outcome of resolving one intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Window the question's date and time words resolved to
    pub window: TimeWindow,

    /// Matching confirmed entries, ordered by start time, subject, room
    pub entries: Vec<ScheduleEntry>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves intents against a schedule store
///
/// Read-only: the store is only ever queried.
pub struct QueryResolver {
    store: Box<dyn ScheduleStore>,
    confirmed_status: String,
    time_filter: TimeFilter,
}

impl QueryResolver {
    pub fn new(
        store: Box<dyn ScheduleStore>,
        confirmed_status: impl Into<String>,
        query: &QueryConfig,
    ) -> Self {
        Self {
            store,
            confirmed_status: confirmed_status.into(),
            time_filter: query.time_filter,
        }
    }

    /// Load the subject catalog: distinct subjects of confirmed entries
    pub async fn load_catalog(&self) -> Result<SubjectCatalog, EngineError> {
        let subjects = self
            .store
            .distinct_subjects(&self.confirmed_status)
            .await
            .map_err(store_error)?;

        let catalog: SubjectCatalog = subjects.into_iter().collect();
        tracing::info!("Loaded subject catalog with {} subjects", catalog.len());
        Ok(catalog)
    }

    /// Resolve relative to the current local time
    pub async fn resolve(
        &self,
        intent: &Intent,
        catalog: &SubjectCatalog,
    ) -> Result<Vec<ScheduleEntry>, EngineError> {
        let resolution = self
            .resolve_at(intent, catalog, Local::now().naive_local())
            .await?;
        Ok(resolution.entries)
    }

    /// Resolve relative to `reference`
    ///
    /// An empty result is a normal outcome, not an error. Errors mean the
    /// store could not be queried.
    pub async fn resolve_at(
        &self,
        intent: &Intent,
        catalog: &SubjectCatalog,
        reference: NaiveDateTime,
    ) -> Result<Resolution, EngineError> {
        let window = time_normalizer::normalize(
            intent.date_expression.as_deref(),
            intent.time_expression.as_deref(),
            reference,
        );

        if let Some(subject) = &intent.subject {
            let known = catalog.matching(subject);
            if known.is_empty() {
                tracing::debug!("Subject {:?} matches no catalog subject", subject);
            } else {
                tracing::debug!("Subject {:?} matches catalog subjects {:?}", subject, known);
            }
        }

        let filter =
            ScheduleFilter::for_intent(intent, &window, &self.confirmed_status, self.time_filter);

        let start = Instant::now();
        let mut entries = self.store.find(&filter).await.map_err(store_error)?;
        entries.sort_by(|a, b| {
            (a.date, a.start_time, &a.subject, &a.room).cmp(&(
                b.date,
                b.start_time,
                &b.subject,
                &b.room,
            ))
        });

        tracing::info!(
            window = %window,
            time_filter = ?self.time_filter,
            hits = entries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Resolved query"
        );

        Ok(Resolution { window, entries })
    }
}

/// Classify a store failure: unreachable store vs. a failing query
fn store_error(err: anyhow::Error) -> EngineError {
    let unreachable = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .is_some_and(|e| {
            matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
            )
        });

    if unreachable {
        EngineError::Connectivity(format!("{:#}", err))
    } else {
        EngineError::Database(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use sdk::IntentKind;

    struct ClosedStore;

    #[async_trait]
    impl ScheduleStore for ClosedStore {
        async fn distinct_subjects(&self, _: &str) -> anyhow::Result<Vec<String>> {
            Err(anyhow::Error::new(sqlx::Error::PoolClosed).context("Failed to acquire"))
        }

        async fn find(&self, _: &ScheduleFilter) -> anyhow::Result<Vec<ScheduleEntry>> {
            Err(anyhow::Error::new(sqlx::Error::RowNotFound).context("Failed to query"))
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn entry(subject: &str, room: &str, day: u32, start: NaiveTime, status: &str) -> ScheduleEntry {
        ScheduleEntry {
            subject: subject.into(),
            campus: "Campus Norte".into(),
            building: "Pavilhão D".into(),
            room: room.into(),
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(100),
            status: status.into(),
        }
    }

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn resolver(entries: Vec<ScheduleEntry>) -> QueryResolver {
        QueryResolver::new(
            Box::new(InMemoryStore::new(entries)),
            "confirmed",
            &QueryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_results_are_ordered() {
        let resolver = resolver(vec![
            entry("Física", "2", 17, t(10, 0), "confirmed"),
            entry("Cálculo I", "9", 17, t(8, 0), "confirmed"),
            entry("Cálculo I", "1", 17, t(8, 0), "confirmed"),
        ]);
        let intent = Intent::new(IntentKind::LookupByRoom).with_date("hoje");

        let resolution = resolver
            .resolve_at(&intent, &SubjectCatalog::new(), reference())
            .await
            .unwrap();
        let order: Vec<(&str, &str)> = resolution
            .entries
            .iter()
            .map(|e| (e.subject.as_str(), e.room.as_str()))
            .collect();
        assert_eq!(order, vec![("Cálculo I", "1"), ("Cálculo I", "9"), ("Física", "2")]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let resolver = resolver(vec![entry("Física", "2", 17, t(10, 0), "confirmed")]);
        let intent = Intent::new(IntentKind::LookupBySubject).with_subject("Cálculo");

        let resolution = resolver
            .resolve_at(&intent, &SubjectCatalog::new(), reference())
            .await
            .unwrap();
        assert!(resolution.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_load_excludes_unconfirmed() {
        let resolver = resolver(vec![
            entry("Física", "2", 17, t(10, 0), "confirmed"),
            entry("Química", "3", 17, t(10, 0), "cancelled"),
        ]);

        let catalog = resolver.load_catalog().await.unwrap();
        assert!(catalog.contains("física"));
        assert!(!catalog.contains("Química"));
    }

    #[tokio::test]
    async fn test_store_failures_are_classified() {
        let resolver = QueryResolver::new(Box::new(ClosedStore), "confirmed", &QueryConfig::default());

        let catalog = resolver.load_catalog().await;
        assert!(matches!(catalog, Err(EngineError::Connectivity(_))));

        let intent = Intent::new(IntentKind::LookupByRoom);
        let lookup = resolver.resolve(&intent, &SubjectCatalog::new()).await;
        assert!(matches!(lookup, Err(EngineError::Database(_))));
    }
}
