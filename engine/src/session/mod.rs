//! Question/answer session
//!
//! Drives one question at a time through extraction and resolution. Every
//! failure is converted into a [`TurnOutcome`] at the turn boundary, so only
//! an exit word or end of input ends [`Session::run`].

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use sdk::errors::{AulaErrorExt, EngineError};
use sdk::{Intent, SubjectCatalog, TimeWindow};

use crate::intent::IntentExtractor;
use crate::query::{QueryResolver, Resolution};
use crate::secrets::scrub;

const GREETING: &str = "Ask me about your classes (e.g. \"where is my Calculus class tomorrow morning?\").";
const FAREWELL: &str = "Bye!";
const NO_MATCH: &str = "No classes found for these criteria.";

/// Result of one question
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// At least one confirmed entry matched
    Matches {
        intent: Intent,
        window: TimeWindow,
        entries: Vec<sdk::ScheduleEntry>,
    },

    /// The question was understood but nothing matched
    NoMatch { intent: Intent, window: TimeWindow },

    /// The language model's answer was unusable
    NotUnderstood { message: String },

    /// The language model or the schedule could not be reached
    Unavailable { message: String },
}

impl TurnOutcome {
    fn from_resolution(intent: Intent, resolution: Resolution) -> Self {
        if resolution.is_empty() {
            TurnOutcome::NoMatch {
                intent,
                window: resolution.window,
            }
        } else {
            TurnOutcome::Matches {
                intent,
                window: resolution.window,
                entries: resolution.entries,
            }
        }
    }

    fn from_error(err: EngineError) -> Self {
        tracing::warn!("Turn failed: {}", scrub(&err.to_string()));

        let message = err.user_hint().to_string();
        match err {
            EngineError::Extraction(_) => TurnOutcome::NotUnderstood { message },
            _ => TurnOutcome::Unavailable { message },
        }
    }

    /// Text shown to the person asking
    pub fn render(&self) -> String {
        match self {
            TurnOutcome::Matches { entries, .. } => entries
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            TurnOutcome::NoMatch { .. } => NO_MATCH.to_string(),
            TurnOutcome::NotUnderstood { message } | TurnOutcome::Unavailable { message } => {
                message.clone()
            }
        }
    }
}

/// One interactive session
///
/// The subject catalog is loaded once when the session starts and is not
/// refreshed.
pub struct Session {
    extractor: Box<dyn IntentExtractor>,
    resolver: QueryResolver,
    catalog: SubjectCatalog,
    exit_words: Vec<String>,
}

impl Session {
    pub fn new(
        extractor: Box<dyn IntentExtractor>,
        resolver: QueryResolver,
        catalog: SubjectCatalog,
        exit_words: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            catalog,
            exit_words: exit_words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .collect(),
        }
    }

    /// Load the catalog from the resolver's store and build a session
    pub async fn start(
        extractor: Box<dyn IntentExtractor>,
        resolver: QueryResolver,
        exit_words: Vec<String>,
    ) -> Result<Self, EngineError> {
        let catalog = resolver.load_catalog().await?;
        Ok(Self::new(extractor, resolver, catalog, exit_words))
    }

    pub fn catalog(&self) -> &SubjectCatalog {
        &self.catalog
    }

    pub fn is_exit_word(&self, line: &str) -> bool {
        let word = line.trim().to_lowercase();
        self.exit_words.iter().any(|w| *w == word)
    }

    /// Answer one question relative to the current local time
    pub async fn handle_turn(&self, question: &str) -> TurnOutcome {
        self.handle_turn_at(question, Local::now().naive_local())
            .await
    }

    /// Answer one question relative to `reference`
    pub async fn handle_turn_at(&self, question: &str, reference: NaiveDateTime) -> TurnOutcome {
        let intent = match self.extractor.extract(question, &self.catalog).await {
            Ok(intent) => intent,
            Err(e) => return TurnOutcome::from_error(e.into()),
        };

        match self
            .resolver
            .resolve_at(&intent, &self.catalog, reference)
            .await
        {
            Ok(resolution) => TurnOutcome::from_resolution(intent, resolution),
            Err(e) => TurnOutcome::from_error(e),
        }
    }

    /// Read questions line by line until an exit word or end of input
    ///
    /// Returns the number of questions answered.
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut answered = 0;

        output
            .write_all(format!("{}\n", GREETING).as_bytes())
            .await?;

        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if self.is_exit_word(question) {
                break;
            }

            let outcome = self.handle_turn(question).await;
            answered += 1;

            output
                .write_all(format!("{}\n", outcome.render()).as_bytes())
                .await?;
        }

        output
            .write_all(format!("{}\n", FAREWELL).as_bytes())
            .await?;
        output.flush().await?;

        tracing::info!("Session ended after {} questions", answered);
        Ok(answered)
    }
}
