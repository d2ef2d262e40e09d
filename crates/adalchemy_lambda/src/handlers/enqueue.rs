use adalchemy_core::config::{EnqueueConfig, EnvSource};
use adalchemy_core::contract::QueueMessage;
use adalchemy_core::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::queue::QueuePublisher;
use crate::adapters::store::{ScopedSession, StoreConnector, StoreSession};

const COMPONENT: &str = "enqueuer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnqueueSummary {
    pub enqueued: usize,
    pub skipped: usize,
    pub message_ids: Vec<String>,
}

impl EnqueueSummary {
    pub fn to_body(&self) -> Value {
        json!({
            "message": "All companies enqueued successfully",
            "enqueued": self.enqueued,
            "skipped": self.skipped,
        })
    }
}

/// Publishes one queue message per valid company record.
///
/// Invalid records are skipped. A publish failure aborts the run; messages
/// already published stay on the queue.
pub fn handle_enqueue(
    env: &(impl EnvSource + ?Sized),
    store: &impl StoreConnector,
    queue: &impl QueuePublisher,
) -> Result<EnqueueSummary, PipelineError> {
    let config = EnqueueConfig::from_env(env)?;

    let companies = {
        let session = ScopedSession::open(store, &config.mongo_uri, config.store_timeout)
            .map_err(PipelineError::Store)?;
        session
            .find_all(&config.database, &config.collection)
            .map_err(PipelineError::Store)?
    };

    if companies.is_empty() {
        return Err(PipelineError::EmptyCollection {
            collection: config.collection,
        });
    }

    let mut summary = EnqueueSummary {
        enqueued: 0,
        skipped: 0,
        message_ids: Vec::with_capacity(companies.len()),
    };

    for document in &companies {
        let message = match QueueMessage::from_company_document(document) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(
                    component = COMPONENT,
                    event = "company_skipped",
                    reason = error.message(),
                    "skipping invalid company record"
                );
                summary.skipped += 1;
                continue;
            }
        };

        let body = serde_json::to_string(&message)
            .map_err(|error| PipelineError::MalformedMessage(error.to_string()))?;
        let message_id = queue
            .publish(&config.queue_url, &body)
            .map_err(PipelineError::Upstream)?;

        tracing::info!(
            component = COMPONENT,
            event = "company_enqueued",
            business_name = %message.business_name,
            message_id = %message_id,
            "enqueued company"
        );
        summary.enqueued += 1;
        summary.message_ids.push(message_id);
    }

    tracing::info!(
        component = COMPONENT,
        event = "enqueue_completed",
        enqueued = summary.enqueued,
        skipped = summary.skipped,
        "enqueue run completed"
    );
    Ok(summary)
}
