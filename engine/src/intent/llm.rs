//! Language-model backed intent extraction
//!
//! One prompt, one round trip. The model is asked for a JSON object with six
//! keys; the reply is validated strictly so a half-understood question is
//! reported as not understood rather than run as an unconstrained lookup.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Instant;

use sdk::{Intent, IntentKind, SubjectCatalog};

use super::{ExtractionError, IntentExtractor};
use crate::llm::{extract_json_object, LLMProvider, Message};

/// Response keys, with the Portuguese alias accepted for each
const FIELDS: [(&str, &str); 6] = [
    ("intent", "intencao"),
    ("subject", "disciplina"),
    ("date", "data"),
    ("time", "hora"),
    ("room", "sala"),
    ("building", "pavilhao"),
];

const SYSTEM_PROMPT: &str = r#"You interpret questions about a university class schedule.
Questions may be in Portuguese or English.

Reply with ONE JSON object and nothing else, using exactly these keys:
{
  "intent": "lookup_by_subject" | "lookup_by_room",
  "subject": string or null,
  "date": string or null,
  "time": string or null,
  "room": string or null,
  "building": string or null
}

Rules:
- "lookup_by_subject" when the question asks where or when a class happens,
  "lookup_by_room" when it asks what happens in a room or building.
- "subject": if the question names a subject, return the closest name from the
  list of known subjects below, correcting spelling. Otherwise null.
- "date": copy the date words as written ("hoje", "amanhã", "tomorrow",
  "terça", "10/10"). Do not convert them. null if none.
- "time": copy the time words as written ("manhã", "tarde", "noite",
  "morning", "19h", "agora"). null if none.
- "room" and "building": copy as written ("203", "Pavilhão D"). null if none."#;

/// Intent extractor backed by an [`LLMProvider`]
pub struct LlmIntentExtractor {
    provider: Box<dyn LLMProvider>,
}

impl LlmIntentExtractor {
    pub fn new(provider: Box<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    fn build_messages(question: &str, catalog: &SubjectCatalog) -> Vec<Message> {
        let subjects = if catalog.is_empty() {
            "(none)".to_string()
        } else {
            catalog
                .iter()
                .map(|s| format!("- {}", s))
                .collect::<Vec<_>>()
                .join("\n")
        };

        vec![
            Message::system(format!("{}\n\nKnown subjects:\n{}", SYSTEM_PROMPT, subjects)),
            Message::user(question.trim()),
        ]
    }
}

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn extract(
        &self,
        question: &str,
        catalog: &SubjectCatalog,
    ) -> Result<Intent, ExtractionError> {
        let messages = Self::build_messages(question, catalog);

        let start = Instant::now();
        let content = self.provider.generate(&messages).await.map_err(|e| {
            if e.is_connectivity() {
                ExtractionError::Unavailable(e)
            } else {
                ExtractionError::Malformed(e.to_string())
            }
        })?;

        tracing::info!(
            provider = self.provider.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Intent extraction round trip complete"
        );

        let intent = parse_response(&content)?;
        tracing::debug!(?intent, "Extracted intent");
        Ok(intent)
    }
}

/// Validate a model reply and map it onto an [`Intent`].
///
/// All six keys must be present (English or Portuguese spelling) and every
/// value must be a string or null. The intent label must be a known one.
pub fn parse_response(content: &str) -> Result<Intent, ExtractionError> {
    let json = extract_json_object(content)
        .ok_or_else(|| ExtractionError::Malformed("no JSON object in response".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ExtractionError::Malformed(format!("invalid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| ExtractionError::Malformed("response is not a JSON object".to_string()))?;

    let mut fields: Vec<Option<String>> = Vec::with_capacity(FIELDS.len());
    for (key, alias) in FIELDS {
        fields.push(read_field(object, key, alias)?);
    }

    let [kind, subject, date, time, room, building]: [Option<String>; 6] = fields
        .try_into()
        .map_err(|_| ExtractionError::Malformed("unexpected field count".to_string()))?;

    let label = kind.ok_or_else(|| ExtractionError::Malformed("intent is null".to_string()))?;
    let kind = IntentKind::parse(&label)
        .ok_or_else(|| ExtractionError::Malformed(format!("unknown intent '{}'", label)))?;

    let mut intent = Intent::new(kind);
    if let Some(subject) = subject {
        intent = intent.with_subject(subject);
    }
    if let Some(date) = date {
        intent = intent.with_date(date);
    }
    if let Some(time) = time {
        intent = intent.with_time(time);
    }
    if let Some(room) = room {
        intent = intent.with_room(room);
    }
    if let Some(building) = building {
        intent = intent.with_building(building);
    }

    Ok(intent)
}

fn read_field(
    object: &Map<String, Value>,
    key: &str,
    alias: &str,
) -> Result<Option<String>, ExtractionError> {
    match object.get(key).or_else(|| object.get(alias)) {
        None => Err(ExtractionError::Malformed(format!(
            "missing field '{}'",
            key
        ))),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ExtractionError::Malformed(format!(
            "field '{}' must be a string or null, got {}",
            key, other
        ))),
    }
}
