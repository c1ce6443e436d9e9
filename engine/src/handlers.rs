//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Interactive question session
//! - ask: Answer one question
//! - subjects: List the subject catalog
//! - setup: Write default config, create the schema, store the API key
//! - doctor: Validate configuration and check dependencies

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use tokio::io::BufReader;

use crate::config::Config;
use crate::db::{Database, ScheduleStore};
use crate::intent::LlmIntentExtractor;
use crate::llm::{build_provider, LLMProvider};
use crate::query::QueryResolver;
use crate::secrets::{resolve_api_key, SecretManager, SecretString};
use crate::session::{Session, TurnOutcome};

/// Keychain service name
const KEYCHAIN_SERVICE: &str = "aula";

/// Keychain entry for the OpenAI API key
const OPENAI_KEY_NAME: &str = "openai_api_key";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Start an interactive session on stdin/stdout
pub async fn handle_chat(config: &Config) -> Result<()> {
    let session = build_session(config).await?;
    tracing::info!(
        "Session started with {} known subjects",
        session.catalog().len()
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    session
        .run(stdin, &mut stdout)
        .await
        .context("Session I/O failed")?;

    Ok(())
}

/// Answer a single question
///
/// No match is a normal answer; the command still succeeds.
pub async fn handle_ask(question: &str, config: &Config, format: OutputFormat) -> Result<()> {
    let session = build_session(config).await?;
    let outcome = session.handle_turn(question).await;

    match format {
        OutputFormat::Text => println!("{}", outcome.render()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if let TurnOutcome::Unavailable { .. } = outcome {
        tracing::warn!("Question could not be answered: service unavailable");
    }

    Ok(())
}

/// List the subject catalog
pub async fn handle_subjects(config: &Config, format: OutputFormat) -> Result<()> {
    let resolver = open_resolver(config).await?;
    let catalog = resolver.load_catalog().await?;

    match format {
        OutputFormat::Text => {
            if catalog.is_empty() {
                println!("No subjects found.");
            } else {
                for subject in catalog.iter() {
                    println!("{}", subject);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "count": catalog.len(),
                "subjects": catalog.iter().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Validate configuration and check the store and provider
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&'static str, String)> = Vec::new();

    checks.push((
        "Version",
        format!(
            "{} ({}, built {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_COMMIT_HASH"),
            env!("BUILD_TIMESTAMP")
        ),
    ));

    // Check 1: Configuration validation
    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));

    // Check 2: Data directory
    if config.core.data_dir.exists() {
        checks.push(("Data directory", "Exists".to_string()));
    } else {
        checks.push(("Data directory", "Missing".to_string()));
        issues.push(format!(
            "Data directory does not exist: {:?}",
            config.core.data_dir
        ));
    }

    // Check 3: Schedule database
    check_store(config, &mut checks, &mut issues).await;

    // Check 4: LLM provider
    let provider_name = config.llm.default_provider.as_str();
    match openai_key(config).and_then(|key| build_provider(&config.llm, key)) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("LLM provider", format!("{} (available)", provider_name)));
            } else {
                checks.push(("LLM provider", format!("{} (not available)", provider_name)));
                issues.push(unavailable_hint(provider.as_ref()));
            }
        }
        Err(e) => {
            checks.push(("LLM provider", format!("{} (not configured)", provider_name)));
            issues.push(e.to_string());
        }
    }

    // Output results
    match format {
        OutputFormat::Text => {
            println!("Aula System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Database and catalog checks for `doctor`
async fn check_store(
    config: &Config,
    checks: &mut Vec<(&'static str, String)>,
    issues: &mut Vec<String>,
) {
    let db_path = &config.store.database_path;
    if db_path.exists() {
        checks.push(("Database", "Exists".to_string()));

        match Database::open(db_path).await {
            Ok(db) => {
                let repo = db.schedule();
                match repo.distinct_subjects(&config.store.confirmed_status).await {
                    Ok(subjects) => {
                        checks.push(("Subject catalog", format!("{} subjects", subjects.len())));
                        if subjects.is_empty() {
                            issues.push(format!(
                                "No entries with status '{}' in the schedule",
                                config.store.confirmed_status
                            ));
                        }
                    }
                    Err(e) => {
                        checks.push(("Subject catalog", "Failed".to_string()));
                        issues.push(format!("Cannot query schedule: {:#}", e));
                    }
                }
                if let Err(e) = db.close().await {
                    issues.push(format!("Database did not close cleanly: {:#}", e));
                }
            }
            Err(e) => {
                checks.push(("Database connection", "Failed".to_string()));
                issues.push(format!("Cannot connect to database: {:#}", e));
            }
        }
    } else {
        checks.push(("Database", "Not found".to_string()));
        issues.push(format!(
            "Schedule database not found at {:?}. Run 'aula setup' or set store.database_path.",
            db_path
        ));
    }
}

/// Non-interactive setup
///
/// Loads (or writes) the configuration, creates the schedule schema if the
/// database doesn't exist yet, and optionally stores the OpenAI key in the
/// keychain.
pub async fn handle_setup(
    config_path: Option<&Path>,
    openai_api_key: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let (config, path) = match config_path {
        Some(path) if path.exists() => (Config::load_from_path(path)?, path.to_path_buf()),
        Some(path) => (Config::create_default(path)?, path.to_path_buf()),
        None => (Config::load_or_create()?, Config::default_config_path()?),
    };

    let db = Database::new(&config.store.database_path)
        .await
        .context("Failed to create schedule database")?;
    db.close().await?;

    let mut key_stored = false;
    if let Some(key) = openai_api_key {
        SecretManager::new(KEYCHAIN_SERVICE).set_secret(OPENAI_KEY_NAME, &key)?;
        key_stored = true;
    }

    match format {
        OutputFormat::Text => {
            println!("Configuration: {}", path.display());
            println!("Database:      {}", config.store.database_path.display());
            if key_stored {
                println!("OpenAI API key stored in the system keychain.");
            }
            println!();
            println!("Setup complete. Try: aula ask \"where is my class today?\"");
        }
        OutputFormat::Json => {
            let output = json!({
                "config_path": path.display().to_string(),
                "database_path": config.store.database_path.display().to_string(),
                "openai_key_stored": key_stored,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Open the schedule and wire the resolver
async fn open_resolver(config: &Config) -> Result<QueryResolver> {
    let db = Database::open(&config.store.database_path)
        .await
        .context("Schedule database unavailable")?;

    Ok(QueryResolver::new(
        Box::new(db.schedule()),
        config.store.confirmed_status.clone(),
        &config.query,
    ))
}

/// Build a session: schedule, catalog and language model
async fn build_session(config: &Config) -> Result<Session> {
    let resolver = open_resolver(config).await?;

    let provider = build_provider(&config.llm, openai_key(config)?)?;
    tracing::debug!(
        "Using provider '{}' (local: {})",
        provider.name(),
        provider.is_local()
    );
    let extractor = LlmIntentExtractor::new(provider);

    let session = Session::start(
        Box::new(extractor),
        resolver,
        config.session.exit_words.clone(),
    )
    .await?;

    Ok(session)
}

/// Resolve the OpenAI key, only when OpenAI is the configured provider
fn openai_key(config: &Config) -> Result<Option<SecretString>, sdk::EngineError> {
    if config.llm.default_provider != "openai" {
        return Ok(None);
    }

    let manager = SecretManager::new(KEYCHAIN_SERVICE);
    resolve_api_key(&config.llm.openai.api_key_env, &manager, OPENAI_KEY_NAME)
}

fn unavailable_hint(provider: &dyn LLMProvider) -> String {
    if provider.is_local() {
        format!("{} is not running. Start it to answer questions.", provider.name())
    } else {
        format!("{} is not reachable or has no API key.", provider.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default_config();
        config.core.data_dir = dir.to_path_buf();
        config.store.database_path = dir.join("schedule.db");
        config
    }

    #[tokio::test]
    async fn test_check_store_reports_missing_database() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let mut checks = Vec::new();
        let mut issues = Vec::new();
        check_store(&config, &mut checks, &mut issues).await;

        assert_eq!(checks, vec![("Database", "Not found".to_string())]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("aula setup"));
    }

    #[tokio::test]
    async fn test_check_store_counts_confirmed_subjects() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let db = Database::new(&config.store.database_path).await.unwrap();
        for (subject, status) in [("Cálculo I", "confirmed"), ("Física", "cancelled")] {
            sqlx::query(
                "INSERT INTO class_reservations \
                 (subject, class_date, start_time, end_time, status) \
                 VALUES (?, '2026-10-18', '08:00', '09:40', ?)",
            )
            .bind(subject)
            .bind(status)
            .execute(db.pool())
            .await
            .unwrap();
        }
        db.close().await.unwrap();

        let mut checks = Vec::new();
        let mut issues = Vec::new();
        check_store(&config, &mut checks, &mut issues).await;

        assert!(checks.contains(&("Subject catalog", "1 subjects".to_string())));
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[tokio::test]
    async fn test_check_store_flags_empty_schedule() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        Database::new(&config.store.database_path)
            .await
            .unwrap()
            .close()
            .await
            .unwrap();

        let mut checks = Vec::new();
        let mut issues = Vec::new();
        check_store(&config, &mut checks, &mut issues).await;

        assert!(checks.contains(&("Subject catalog", "0 subjects".to_string())));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("status 'confirmed'"));
    }
}
