use adalchemy_core::config::{EnvSource, ProcessConfig};
use adalchemy_core::contract::{
    research_document, Notification, QueueMessage, ResearchRequest, WorkflowInput,
};
use adalchemy_core::error::PipelineError;
use adalchemy_core::sanitize::parse_agent_output;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::agent::GenerationAgent;
use crate::adapters::notify::Notifier;
use crate::adapters::store::{ScopedSession, StoreConnector, StoreSession};
use crate::adapters::workflow::WorkflowTrigger;

const COMPONENT: &str = "processor";

pub struct ProcessDependencies<'a, C: StoreConnector> {
    pub store: &'a C,
    pub agent: &'a dyn GenerationAgent,
    pub notifier: &'a dyn Notifier,
    pub workflow: &'a dyn WorkflowTrigger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessSummary {
    pub business_name: String,
}

impl ProcessSummary {
    pub fn to_body(&self) -> Value {
        json!({
            "message": "Company processed successfully",
            "business_name": self.business_name,
        })
    }
}

/// Handles one SQS delivery carrying a single company message.
///
/// A failure fails the whole invocation, leaving redelivery and
/// dead-lettering to the queue. Deliveries with more than one record are
/// refused before any side effect.
pub fn handle_process_event<C: StoreConnector>(
    event: &Value,
    env: &(impl EnvSource + ?Sized),
    deps: &ProcessDependencies<'_, C>,
    now: DateTime<Utc>,
) -> Result<ProcessSummary, PipelineError> {
    let config = ProcessConfig::from_env(env)?;
    let messages = decode_queue_messages(event)?;
    let [message]: [QueueMessage; 1] = messages.try_into().map_err(|messages: Vec<_>| {
        PipelineError::MalformedMessage(format!(
            "SQS event carries {} records, expected batch size 1",
            messages.len()
        ))
    })?;

    let session = ScopedSession::open(deps.store, &config.mongo_uri, config.store_timeout)
        .map_err(PipelineError::Store)?;

    if let Err(error) = process_message(&message, &config, &*session, deps, now) {
        tracing::error!(
            component = COMPONENT,
            event = "company_failed",
            business_name = %message.business_name,
            dead_letter_queue = %config.dlq_url,
            error = %error,
            "company processing failed; message will be redelivered"
        );
        return Err(error);
    }

    Ok(ProcessSummary {
        business_name: message.business_name,
    })
}

fn process_message<C: StoreConnector>(
    message: &QueueMessage,
    config: &ProcessConfig,
    session: &impl StoreSession,
    deps: &ProcessDependencies<'_, C>,
    now: DateTime<Utc>,
) -> Result<(), PipelineError> {
    tracing::info!(
        component = COMPONENT,
        event = "company_started",
        business_name = %message.business_name,
        "calling generation agent"
    );

    let request = json!(ResearchRequest::for_message(message));
    let raw_output = deps
        .agent
        .generate(&config.agent_url, &request, config.agent_timeout)
        .map_err(PipelineError::Upstream)?;
    let result = parse_agent_output(&raw_output)?;

    session
        .upsert_by_key(
            &config.database,
            &config.collection,
            "business_name",
            &message.business_name,
            &research_document(message, result, now),
        )
        .map_err(PipelineError::Store)?;

    deps.notifier
        .send(&config.sender_email, &Notification::research_completed(message))
        .map_err(PipelineError::Notify)?;

    tracing::info!(
        component = COMPONENT,
        event = "company_completed",
        business_name = %message.business_name,
        "research stored and owner notified"
    );

    if let Some(workflow_arn) = &config.workflow_arn {
        start_decision_workflow(workflow_arn, message, deps.workflow);
    }
    Ok(())
}

// Results are stored and the owner notified by now, so a failed start is
// logged instead of failing the invocation into a duplicate notification.
fn start_decision_workflow(workflow_arn: &str, message: &QueueMessage, trigger: &dyn WorkflowTrigger) {
    let input = json!(WorkflowInput {
        business_name: message.business_name.clone(),
        email: message.contact_email.clone(),
    });

    match trigger.start(workflow_arn, &input.to_string()) {
        Ok(execution) => tracing::info!(
            component = COMPONENT,
            event = "decision_workflow_started",
            business_name = %message.business_name,
            execution = %execution,
            "started decision workflow"
        ),
        Err(error) => tracing::warn!(
            component = COMPONENT,
            event = "decision_workflow_failed",
            business_name = %message.business_name,
            error = %error,
            "failed to start decision workflow"
        ),
    }
}

pub fn decode_queue_messages(event: &Value) -> Result<Vec<QueueMessage>, PipelineError> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PipelineError::MalformedMessage("SQS event must include Records array".to_string())
        })?;
    if records.is_empty() {
        return Err(PipelineError::MalformedMessage(
            "SQS event contains no records".to_string(),
        ));
    }

    let mut messages = Vec::with_capacity(records.len());
    for record in records {
        let body = record.get("body").and_then(Value::as_str).ok_or_else(|| {
            PipelineError::MalformedMessage("SQS record body must be a string".to_string())
        })?;
        let payload: Value = serde_json::from_str(body).map_err(|error| {
            PipelineError::MalformedMessage(format!("invalid company message: {error}"))
        })?;
        let message = QueueMessage::from_company_document(&payload)
            .map_err(|error| PipelineError::MalformedMessage(error.message().to_string()))?;
        messages.push(message);
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use adalchemy_core::config::{
        DLQ_URL, EMAIL, MONGO_COLLECTION_NAME, MONGO_URI, STEP_FUNCTION_ARN, WEBSITE_URL,
    };
    use adalchemy_core::contract::NOTIFICATION_SUBJECT;
    use chrono::TimeZone;

    use super::*;
    use crate::test_helpers::{
        test_env, CapturingNotifier, CapturingWorkflow, MemoryStore, ScriptedAgent,
    };

    const AGENT_URL: &str = "https://agent.example/research";
    const WORKFLOW_ARN: &str = "arn:aws:states:us-east-2:123456789012:stateMachine:decision";

    fn env_with(extra: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
        let mut env = test_env(&[
            (MONGO_URI, "mongodb://localhost:27017"),
            (WEBSITE_URL, AGENT_URL),
            (DLQ_URL, "https://sqs.us-east-2.amazonaws.com/123456789012/companies-dlq"),
            (MONGO_COLLECTION_NAME, "research"),
            (EMAIL, "research@adalchemy.example"),
        ]);
        env.extend(test_env(extra));
        env
    }

    fn sqs_event(bodies: &[Value]) -> Value {
        let records: Vec<Value> = bodies
            .iter()
            .map(|body| json!({"eventSource": "aws:sqs", "body": body.to_string()}))
            .collect();
        json!({ "Records": records })
    }

    fn bakery_message() -> Value {
        json!({
            "business_name": "Crumb & Co",
            "persona": {"industry": "bakery"},
            "contact_email": "owner@crumb.example",
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn stores_sanitized_result_then_notifies_owner() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding("```json\n{\"keywords\":[\"fresh bread\"]}\n```");
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        let summary = handle_process_event(&sqs_event(&[bakery_message()]), &env_with(&[]), &deps, now())
            .expect("processing should succeed");

        assert_eq!(summary.business_name, "Crumb & Co");

        let calls = agent.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, AGENT_URL);
        assert_eq!(
            calls[0].1,
            json!({"persona": r#"{"industry":"bakery"}"#, "business_name": "Crumb & Co"})
        );

        let state = store.state();
        assert_eq!(state.upserts.len(), 1);
        assert_eq!(state.upserts[0].database, "adalchemy");
        assert_eq!(state.upserts[0].collection, "research");
        assert_eq!(state.upserts[0].document["result"], json!({"keywords": ["fresh bread"]}));
        assert_eq!(state.closes, 1);
        drop(state);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "research@adalchemy.example");
        assert_eq!(sent[0].1.to, "owner@crumb.example");
        assert_eq!(sent[0].1.subject, NOTIFICATION_SUBJECT);
        assert!(workflow.starts().is_empty());
    }

    #[test]
    fn store_failure_skips_notification() {
        let store = MemoryStore::failing_writes();
        let agent = ScriptedAgent::responding(r#"{"keywords":["fresh bread"]}"#);
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        let error = handle_process_event(&sqs_event(&[bakery_message()]), &env_with(&[]), &deps, now())
            .expect_err("store failure should fail the invocation");

        assert!(matches!(error, PipelineError::Store(_)));
        assert!(!error.is_fatal());
        assert!(notifier.sent().is_empty());
        assert_eq!(store.state().closes, 1);
    }

    #[test]
    fn agent_failure_is_left_to_redelivery() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::failing("generation agent returned 503 Service Unavailable");
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        let error = handle_process_event(&sqs_event(&[bakery_message()]), &env_with(&[]), &deps, now())
            .expect_err("agent failure should fail the invocation");

        assert!(matches!(error, PipelineError::Upstream(_)));
        assert_eq!(agent.calls().len(), 1);
        assert!(store.state().upserts.is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn unparseable_output_stores_nothing() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding("I could not come up with keywords today.");
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        let error = handle_process_event(&sqs_event(&[bakery_message()]), &env_with(&[]), &deps, now())
            .expect_err("parse failure should fail the invocation");

        assert!(matches!(error, PipelineError::Parse(_)));
        assert!(store.state().upserts.is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn notification_failure_fails_the_invocation() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding(r#"{"keywords":["fresh bread"]}"#);
        let notifier = CapturingNotifier::failing();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        let error = handle_process_event(
            &sqs_event(&[bakery_message()]),
            &env_with(&[(STEP_FUNCTION_ARN, WORKFLOW_ARN)]),
            &deps,
            now(),
        )
        .expect_err("notification failure should fail the invocation");

        assert!(matches!(error, PipelineError::Notify(_)));
        assert_eq!(store.state().upserts.len(), 1);
        assert!(workflow.starts().is_empty());
    }

    #[test]
    fn missing_configuration_makes_no_calls() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding(r#"{"keywords":[]}"#);
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };
        let env = test_env(&[(MONGO_URI, "mongodb://localhost:27017"), (WEBSITE_URL, AGENT_URL)]);

        let error = handle_process_event(&sqs_event(&[bakery_message()]), &env, &deps, now())
            .expect_err("config should be rejected");

        assert!(matches!(error, PipelineError::Configuration(_)));
        assert!(error.is_fatal());
        assert_eq!(store.state().connects, 0);
        assert!(agent.calls().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn starts_decision_workflow_when_configured() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding(r#"{"keywords":["fresh bread"]}"#);
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        handle_process_event(
            &sqs_event(&[bakery_message()]),
            &env_with(&[(STEP_FUNCTION_ARN, WORKFLOW_ARN)]),
            &deps,
            now(),
        )
        .expect("processing should succeed");

        let starts = workflow.starts();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].0, WORKFLOW_ARN);
        let input: Value = serde_json::from_str(&starts[0].1).expect("input should be JSON");
        assert_eq!(
            input,
            json!({"business_name": "Crumb & Co", "email": "owner@crumb.example"})
        );
    }

    #[test]
    fn workflow_failure_does_not_fail_processing() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding(r#"{"keywords":["fresh bread"]}"#);
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::failing();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };

        let summary = handle_process_event(
            &sqs_event(&[bakery_message()]),
            &env_with(&[(STEP_FUNCTION_ARN, WORKFLOW_ARN)]),
            &deps,
            now(),
        )
        .expect("workflow failure should be tolerated");

        assert_eq!(summary.business_name, "Crumb & Co");
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn multi_record_delivery_is_refused_before_side_effects() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding(r#"{"keywords":["fresh bread"]}"#);
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };
        let second = json!({
            "business_name": "Velo Repairs",
            "persona": "commuters",
            "contact_email": "hello@velo.example",
        });

        let error = handle_process_event(
            &sqs_event(&[bakery_message(), second]),
            &env_with(&[]),
            &deps,
            now(),
        )
        .expect_err("batch should be refused");

        assert!(matches!(error, PipelineError::MalformedMessage(_)));
        assert!(!error.is_fatal());
        assert_eq!(store.state().connects, 0);
        assert!(agent.calls().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn redelivered_message_overwrites_previous_result() {
        let store = MemoryStore::default();
        let agent = ScriptedAgent::responding(r#"{"keywords":["fresh bread"]}"#);
        let notifier = CapturingNotifier::new();
        let workflow = CapturingWorkflow::new();
        let deps = ProcessDependencies {
            store: &store,
            agent: &agent,
            notifier: &notifier,
            workflow: &workflow,
        };
        let event = sqs_event(&[bakery_message()]);

        handle_process_event(&event, &env_with(&[]), &deps, now()).expect("first delivery");
        handle_process_event(&event, &env_with(&[]), &deps, now()).expect("second delivery");

        assert_eq!(store.state().upserts.len(), 1);
    }

    #[test]
    fn decodes_legacy_message_fields() {
        let event = sqs_event(&[json!({
            "business_name": "Velo Repairs",
            "personas": "[\"commuters\"]",
            "email": "hello@velo.example",
        })]);

        let messages = decode_queue_messages(&event).expect("legacy message should decode");

        assert_eq!(messages[0].contact_email, "hello@velo.example");
        assert_eq!(messages[0].rendered_persona(), "[\"commuters\"]");
    }

    #[test]
    fn rejects_malformed_events() {
        let cases = [
            json!({}),
            json!({"Records": []}),
            json!({"Records": [{"eventSource": "aws:sqs", "body": 42}]}),
            json!({"Records": [{"eventSource": "aws:sqs", "body": "not json"}]}),
            json!({"Records": [{"eventSource": "aws:sqs", "body": "{\"business_name\":\"x\"}"}]}),
        ];

        for event in cases {
            let error = decode_queue_messages(&event).expect_err("event should be rejected");
            assert!(matches!(error, PipelineError::MalformedMessage(_)), "{event}");
        }
    }
}
