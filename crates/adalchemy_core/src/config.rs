//! Environment configuration for the three functions.
//!
//! Every required variable is checked before any client is used, and all
//! missing names are reported together. Empty or whitespace-only values
//! count as missing.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use thiserror::Error;

pub const MONGO_URI: &str = "MONGO_URI";
pub const MONGO_DB_NAME: &str = "MONGO_DB_NAME";
pub const MONGO_COLLECTION_NAME: &str = "MONGO_COLLECTION_NAME";
pub const SQS_QUEUE_URL: &str = "SQS_QUEUE_URL";
pub const WEBSITE_URL: &str = "WEBSITE_URL";
pub const DLQ_URL: &str = "DLQ_URL";
pub const EMAIL: &str = "EMAIL";
pub const STEP_FUNCTION_ARN: &str = "STEP_FUNCTION_ARN";
pub const DECISION_DB_NAME: &str = "DECISION_DB_NAME";
pub const AGENT_TIMEOUT_SECS: &str = "AGENT_TIMEOUT_SECS";
pub const STORE_TIMEOUT_SECS: &str = "STORE_TIMEOUT_SECS";

pub const DEFAULT_RESULTS_DB_NAME: &str = "adalchemy";
pub const DEFAULT_DECISION_DB_NAME: &str = "judge_data";
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);
pub const AWS_OPERATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("{key} must be a whole number of seconds, got {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Source of configuration values, the process environment in production.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

struct Resolver<'a, E: EnvSource + ?Sized> {
    env: &'a E,
    missing: Vec<&'static str>,
}

impl<'a, E: EnvSource + ?Sized> Resolver<'a, E> {
    fn new(env: &'a E) -> Self {
        Self {
            env,
            missing: Vec::new(),
        }
    }

    fn optional(&self, key: &'static str) -> Option<String> {
        self.env
            .var(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key);
                String::new()
            }
        }
    }

    fn seconds(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidValue { key, value }),
        }
    }

    /// Missing variables are reported ahead of malformed optional values.
    fn finish(self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(self.missing))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueConfig {
    pub mongo_uri: String,
    pub database: String,
    pub collection: String,
    pub queue_url: String,
    pub store_timeout: Duration,
}

impl EnqueueConfig {
    pub fn from_env(env: &(impl EnvSource + ?Sized)) -> Result<Self, ConfigError> {
        let mut resolver = Resolver::new(env);
        let mongo_uri = resolver.required(MONGO_URI);
        let database = resolver.required(MONGO_DB_NAME);
        let collection = resolver.required(MONGO_COLLECTION_NAME);
        let queue_url = resolver.required(SQS_QUEUE_URL);
        let store_timeout = resolver.seconds(STORE_TIMEOUT_SECS, DEFAULT_STORE_TIMEOUT);
        resolver.finish()?;

        Ok(Self {
            mongo_uri,
            database,
            collection,
            queue_url,
            store_timeout: store_timeout?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    pub mongo_uri: String,
    pub agent_url: String,
    pub dlq_url: String,
    pub database: String,
    pub collection: String,
    pub sender_email: String,
    pub workflow_arn: Option<String>,
    pub agent_timeout: Duration,
    pub store_timeout: Duration,
}

impl ProcessConfig {
    pub fn from_env(env: &(impl EnvSource + ?Sized)) -> Result<Self, ConfigError> {
        let mut resolver = Resolver::new(env);
        let mongo_uri = resolver.required(MONGO_URI);
        let agent_url = resolver.required(WEBSITE_URL);
        let dlq_url = resolver.required(DLQ_URL);
        let collection = resolver.required(MONGO_COLLECTION_NAME);
        let sender_email = resolver.required(EMAIL);
        let database = resolver
            .optional(MONGO_DB_NAME)
            .unwrap_or_else(|| DEFAULT_RESULTS_DB_NAME.to_string());
        let workflow_arn = resolver.optional(STEP_FUNCTION_ARN);
        let agent_timeout = resolver.seconds(AGENT_TIMEOUT_SECS, DEFAULT_AGENT_TIMEOUT);
        let store_timeout = resolver.seconds(STORE_TIMEOUT_SECS, DEFAULT_STORE_TIMEOUT);
        resolver.finish()?;

        Ok(Self {
            mongo_uri,
            agent_url,
            dlq_url,
            database,
            collection,
            sender_email,
            workflow_arn,
            agent_timeout: agent_timeout?,
            store_timeout: store_timeout?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionConfig {
    pub mongo_uri: String,
    pub agent_url: String,
    pub database: String,
    pub agent_timeout: Duration,
    pub store_timeout: Duration,
}

impl DecisionConfig {
    pub fn from_env(env: &(impl EnvSource + ?Sized)) -> Result<Self, ConfigError> {
        let mut resolver = Resolver::new(env);
        let mongo_uri = resolver.required(MONGO_URI);
        let agent_url = resolver.required(WEBSITE_URL);
        let database = resolver
            .optional(DECISION_DB_NAME)
            .unwrap_or_else(|| DEFAULT_DECISION_DB_NAME.to_string());
        let agent_timeout = resolver.seconds(AGENT_TIMEOUT_SECS, DEFAULT_AGENT_TIMEOUT);
        let store_timeout = resolver.seconds(STORE_TIMEOUT_SECS, DEFAULT_STORE_TIMEOUT);
        resolver.finish()?;

        Ok(Self {
            mongo_uri,
            agent_url,
            database,
            agent_timeout: agent_timeout?,
            store_timeout: store_timeout?,
        })
    }
}
