use adalchemy_core::config::{DecisionConfig, EnvSource};
use adalchemy_core::contract::{decision_document, StrategyRequest};
use adalchemy_core::error::PipelineError;
use adalchemy_core::sanitize::parse_agent_output;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::agent::GenerationAgent;
use crate::adapters::store::{ScopedSession, StoreConnector, StoreSession};

const COMPONENT: &str = "decision_maker";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionSummary {
    pub business_name: String,
    pub database: String,
}

impl DecisionSummary {
    pub fn to_body(&self) -> Value {
        json!({
            "message": "Strategy generated successfully",
            "business_name": self.business_name,
        })
    }
}

/// Reads `business_name` from the event. Blank names are rejected, but the
/// name is otherwise kept verbatim since it doubles as the collection name.
pub fn business_name_from_event(event: &Value) -> Result<String, PipelineError> {
    event
        .get("business_name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::BadRequest("Missing business_name parameter".to_string()))
}

/// Generates strategy output for one business and stores it in the
/// collection named after it.
///
/// The store session is released exactly once on every exit path. Retries
/// and failure recording belong to the orchestrating workflow.
pub fn handle_decision_event(
    event: &Value,
    env: &(impl EnvSource + ?Sized),
    store: &impl StoreConnector,
    agent: &dyn GenerationAgent,
    now: DateTime<Utc>,
) -> Result<DecisionSummary, PipelineError> {
    let business_name = business_name_from_event(event)?;
    let config = DecisionConfig::from_env(env)?;

    let session = ScopedSession::open(store, &config.mongo_uri, config.store_timeout)
        .map_err(PipelineError::Store)?;
    session
        .ensure_collection(&config.database, &business_name)
        .map_err(PipelineError::Store)?;

    tracing::info!(
        component = COMPONENT,
        event = "strategy_requested",
        business_name = %business_name,
        "calling generation agent"
    );
    let request = json!(StrategyRequest {
        business_name: business_name.clone(),
    });
    let raw_output = agent
        .generate(&config.agent_url, &request, config.agent_timeout)
        .map_err(PipelineError::Upstream)?;
    let result = parse_agent_output(&raw_output)?;

    session
        .insert(&config.database, &business_name, &decision_document(result, now))
        .map_err(PipelineError::Store)?;

    tracing::info!(
        component = COMPONENT,
        event = "strategy_stored",
        business_name = %business_name,
        database = %config.database,
        "stored strategy output"
    );
    Ok(DecisionSummary {
        business_name,
        database: config.database,
    })
}
