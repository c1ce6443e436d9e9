//! Integration tests for query resolution against a real SQLite schedule
//!
//! Covers both time-window policies: `ignore` (date only, the default) and
//! `overlap`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tempfile::TempDir;

use aula_engine::config::{QueryConfig, TimeFilter};
use aula_engine::db::Database;
use aula_engine::query::QueryResolver;
use sdk::{Intent, IntentKind, SubjectCatalog};

/// Saturday 2026-10-17, 10:30
fn reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 17)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn seeded_database(dir: &TempDir) -> Database {
    let db = Database::new(&dir.path().join("schedule.db")).await.unwrap();

    let rows = [
        ("Cálculo I", "Campus Norte", "Pavilhão D", "203", "2026-10-18", "08:00", "09:40", "confirmed"),
        ("Cálculo I", "Campus Norte", "Pavilhão D", "203", "2026-10-18", "19:00", "20:40", "confirmed"),
        ("Cálculo II", "Campus Norte", "Pavilhão D", "105", "2026-10-18", "10:00", "11:40", "confirmed"),
        ("Cálculo I", "Campus Norte", "Pavilhão D", "204", "2026-10-18", "08:00", "09:40", "cancelled"),
        ("Física", "Campus Sul", "Bloco A", "12", "2026-10-18", "13:00", "14:40", "confirmed"),
        ("Física", "Campus Sul", "Bloco A", "12", "2026-10-17", "08:00", "09:40", "confirmed"),
        ("Química", "Campus Sul", "Bloco A", "14", "2026-10-18", "08:00", "09:40", "pending"),
    ];

    for (subject, campus, building, room, date, start, end, status) in rows {
        sqlx::query(
            "INSERT INTO class_reservations \
             (subject, campus, building, room, class_date, start_time, end_time, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(subject)
        .bind(campus)
        .bind(building)
        .bind(room)
        .bind(date)
        .bind(start)
        .bind(end)
        .bind(status)
        .execute(db.pool())
        .await
        .unwrap();
    }

    db
}

fn resolver(db: &Database, time_filter: TimeFilter) -> QueryResolver {
    QueryResolver::new(
        Box::new(db.schedule()),
        "confirmed",
        &QueryConfig { time_filter },
    )
}

#[tokio::test]
async fn test_calculus_tomorrow_morning_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Ignore);

    let catalog = resolver.load_catalog().await.unwrap();
    assert!(catalog.contains("Cálculo I"));

    let intent = Intent::new(IntentKind::LookupBySubject)
        .with_subject("Cálculo")
        .with_date("amanhã")
        .with_time("manhã");

    let resolution = resolver
        .resolve_at(&intent, &catalog, reference())
        .await
        .unwrap();

    assert_eq!(resolution.window.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    assert_eq!((resolution.window.start, resolution.window.end), (t(8, 0), t(12, 0)));

    // Date only: the evening class is still returned
    let found: Vec<(&str, NaiveTime)> = resolution
        .entries
        .iter()
        .map(|e| (e.subject.as_str(), e.start_time))
        .collect();
    assert_eq!(
        found,
        vec![
            ("Cálculo I", t(8, 0)),
            ("Cálculo II", t(10, 0)),
            ("Cálculo I", t(19, 0)),
        ]
    );
    assert!(resolution.entries.iter().all(|e| e.status == "confirmed"));

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_overlap_mode_applies_window() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Overlap);

    let intent = Intent::new(IntentKind::LookupBySubject)
        .with_subject("cálculo")
        .with_date("amanhã")
        .with_time("manhã");

    let entries = resolver
        .resolve_at(&intent, &SubjectCatalog::new(), reference())
        .await
        .unwrap()
        .entries;

    let starts: Vec<NaiveTime> = entries.iter().map(|e| e.start_time).collect();
    assert_eq!(starts, vec![t(8, 0), t(10, 0)]);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_overlap_mode_without_time_words_is_date_only() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Overlap);

    let intent = Intent::new(IntentKind::LookupBySubject)
        .with_subject("Cálculo")
        .with_date("amanhã");

    let entries = resolver
        .resolve_at(&intent, &SubjectCatalog::new(), reference())
        .await
        .unwrap()
        .entries;
    assert_eq!(entries.len(), 3);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_unconstrained_intent_returns_all_confirmed_for_date() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Ignore);

    let intent = Intent::new(IntentKind::LookupByRoom).with_date("18/10");
    let entries = resolver
        .resolve_at(&intent, &SubjectCatalog::new(), reference())
        .await
        .unwrap()
        .entries;

    let expected: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM class_reservations WHERE status = 'confirmed' AND class_date = '2026-10-18'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();

    assert_eq!(entries.len() as i64, expected);
    assert_eq!(entries.len(), 4);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_room_and_building_lookup() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Ignore);

    let intent = Intent::new(IntentKind::LookupByRoom)
        .with_room("12")
        .with_building("bloco a")
        .with_date("hoje");
    let entries = resolver
        .resolve_at(&intent, &SubjectCatalog::new(), reference())
        .await
        .unwrap()
        .entries;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].subject, "Física");
    assert_eq!(
        entries[0].to_string(),
        "Física - Campus Sul, Bloco A, room 12, 08:00-09:40 on 17/10"
    );

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_date_falls_back_to_today() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Ignore);

    let intent = Intent::new(IntentKind::LookupBySubject)
        .with_subject("Física")
        .with_date("semana que vem");
    let resolution = resolver
        .resolve_at(&intent, &SubjectCatalog::new(), reference())
        .await
        .unwrap();

    assert_eq!(resolution.window.date, reference().date());
    assert_eq!(resolution.entries.len(), 1);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_no_match_is_empty() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir).await;
    let resolver = resolver(&db, TimeFilter::Ignore);

    let intent = Intent::new(IntentKind::LookupBySubject)
        .with_subject("Química")
        .with_date("amanhã");
    let resolution = resolver
        .resolve_at(&intent, &SubjectCatalog::new(), reference())
        .await
        .unwrap();

    assert!(resolution.is_empty());

    db.close().await.unwrap();
}
