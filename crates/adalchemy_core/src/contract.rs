use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ValidationError;

pub const NOTIFICATION_SUBJECT: &str = "AdAlchemyAI: Initial Research Completed";

/// Snapshot of a company record carried on the work queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessage {
    pub business_name: String,
    #[serde(alias = "personas")]
    pub persona: Value,
    #[serde(alias = "email")]
    pub contact_email: String,
}

impl QueueMessage {
    /// Validates a raw company document read from the store.
    ///
    /// Stored documents may use `personas` and `email` for the persona and
    /// contact fields; both spellings are accepted, the canonical name wins.
    pub fn from_company_document(document: &Value) -> Result<Self, ValidationError> {
        let Some(fields) = document.as_object() else {
            return Err(ValidationError::new("company document must be an object"));
        };

        let business_name = non_blank_string(fields, &["business_name"])
            .ok_or_else(|| ValidationError::new("business_name is missing or blank"))?;

        let persona = ["persona", "personas"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find(|value| persona_is_present(value))
            .cloned()
            .ok_or_else(|| {
                ValidationError::new(format!("persona is missing for {business_name}"))
            })?;

        let contact_email = non_blank_string(fields, &["contact_email", "email"])
            .ok_or_else(|| {
                ValidationError::new(format!("contact_email is missing for {business_name}"))
            })?;

        Ok(Self {
            business_name,
            persona,
            contact_email,
        })
    }

    /// Persona as the single prompt string the agent expects.
    pub fn rendered_persona(&self) -> String {
        match &self.persona {
            Value::String(text) => text.clone(),
            Value::Array(items) if items.iter().all(Value::is_string) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        }
    }
}

fn non_blank_string(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn persona_is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchRequest {
    pub persona: String,
    pub business_name: String,
}

impl ResearchRequest {
    pub fn for_message(message: &QueueMessage) -> Self {
        Self {
            persona: message.rendered_persona(),
            business_name: message.business_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyRequest {
    pub business_name: String,
}

/// Input handed to the delayed decision workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowInput {
    pub business_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn research_completed(message: &QueueMessage) -> Self {
        Self {
            to: message.contact_email.clone(),
            subject: NOTIFICATION_SUBJECT.to_string(),
            body: format!(
                "The initial research carried out by the Initial Market Researcher AI Agent for {} is complete. \
                 Please review the research using the /paths and /business slash commands in your Discord bot.",
                message.business_name
            ),
        }
    }
}

/// Document upserted by the processor, keyed by `business_name`.
pub fn research_document(message: &QueueMessage, result: Value, now: DateTime<Utc>) -> Value {
    json!({
        "business_name": message.business_name,
        "persona": message.persona,
        "result": result,
        "date_written": {
            "year": now.year(),
            "month": now.month(),
            "day": now.day(),
        },
    })
}

/// Document inserted by the decision maker into the per-business collection.
///
/// Object results are stored as-is with a `last_update` stamp; any other
/// result shape is nested under `result`.
pub fn decision_document(result: Value, now: DateTime<Utc>) -> Value {
    let last_update = Value::from(now.to_rfc3339_opts(SecondsFormat::Secs, true));
    match result {
        Value::Object(mut fields) => {
            fields.insert("last_update".to_string(), last_update);
            Value::Object(fields)
        }
        other => json!({ "result": other, "last_update": last_update }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl HandlerResponse {
    pub fn json(status_code: u16, payload: &Value) -> Self {
        Self {
            status_code,
            headers: json!({"Content-Type": "application/json"}),
            body: payload.to_string(),
        }
    }

    pub fn error(status_code: u16, error: &str, message: &str) -> Self {
        Self::json(status_code, &json!({ "error": error, "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn accepts_legacy_field_names() {
        let message = QueueMessage::from_company_document(&json!({
            "business_name": "Crumb & Co",
            "personas": ["young professionals", "students"],
            "email": "owner@crumb.example",
        }))
        .expect("document should validate");

        assert_eq!(message.business_name, "Crumb & Co");
        assert_eq!(message.contact_email, "owner@crumb.example");
        assert_eq!(message.rendered_persona(), "young professionals, students");
    }

    #[test]
    fn rejects_documents_missing_required_fields() {
        let cases = [
            json!({"persona": "p", "contact_email": "a@b.example"}),
            json!({"business_name": "  ", "persona": "p", "contact_email": "a@b.example"}),
            json!({"business_name": "Shop", "contact_email": "a@b.example"}),
            json!({"business_name": "Shop", "persona": null, "contact_email": "a@b.example"}),
            json!({"business_name": "Shop", "persona": [], "contact_email": "a@b.example"}),
            json!({"business_name": "Shop", "persona": "p"}),
            json!({"business_name": "Shop", "persona": "p", "contact_email": 7}),
            json!("not a document"),
        ];

        for document in cases {
            assert!(
                QueueMessage::from_company_document(&document).is_err(),
                "expected rejection for {document}"
            );
        }
    }

    #[test]
    fn object_persona_renders_as_compact_json() {
        let message = QueueMessage {
            business_name: "Bakery".to_string(),
            persona: json!({"industry": "bakery"}),
            contact_email: "owner@bakery.example".to_string(),
        };

        assert_eq!(message.rendered_persona(), r#"{"industry":"bakery"}"#);
    }

    #[test]
    fn decision_document_stamps_object_results() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let document = decision_document(json!({"keywords": ["fresh bread"]}), now);

        assert_eq!(document["keywords"], json!(["fresh bread"]));
        assert_eq!(document["last_update"], json!("2026-03-01T12:00:00Z"));
    }

    #[test]
    fn research_document_records_write_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let message = QueueMessage {
            business_name: "Bakery".to_string(),
            persona: json!("locals"),
            contact_email: "owner@bakery.example".to_string(),
        };
        let document = research_document(&message, json!({"keywords": []}), now);

        assert_eq!(document["business_name"], json!("Bakery"));
        assert_eq!(
            document["date_written"],
            json!({"year": 2026, "month": 3, "day": 1})
        );
    }
}
