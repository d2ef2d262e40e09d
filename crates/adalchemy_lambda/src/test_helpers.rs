//! In-memory adapters for handler tests.
//!
//! Every fake records what it was asked to do so tests can assert on call
//! counts and ordering without AWS, MongoDB or an agent endpoint.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use adalchemy_core::contract::Notification;
use serde_json::Value;

use crate::adapters::agent::GenerationAgent;
use crate::adapters::notify::Notifier;
use crate::adapters::queue::QueuePublisher;
use crate::adapters::store::{StoreConnector, StoreSession};
use crate::adapters::workflow::WorkflowTrigger;

/// Builds an environment map from key/value pairs.
pub fn test_env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub database: String,
    pub collection: String,
    pub document: Value,
}

#[derive(Debug, Default)]
pub struct StoreState {
    pub companies: Vec<Value>,
    pub collections: BTreeSet<(String, String)>,
    pub upserts: Vec<StoredDocument>,
    pub inserts: Vec<StoredDocument>,
    pub connects: usize,
    pub closes: usize,
    pub fail_connect: bool,
    pub fail_writes: bool,
}

/// Connector and session share one state so tests can inspect it afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn with_companies(companies: Vec<Value>) -> Self {
        let store = Self::default();
        store.state().companies = companies;
        store
    }

    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.state().fail_writes = true;
        store
    }

    pub fn unreachable() -> Self {
        let store = Self::default();
        store.state().fail_connect = true;
        store
    }

    pub fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("poisoned mutex")
    }
}

impl StoreConnector for MemoryStore {
    type Session = MemoryStore;

    fn connect(&self, _uri: &str, _timeout: Duration) -> Result<MemoryStore, String> {
        let mut state = self.state();
        if state.fail_connect {
            return Err("simulated connection failure".to_string());
        }
        state.connects += 1;
        Ok(self.clone())
    }
}

impl StoreSession for MemoryStore {
    fn find_all(&self, _database: &str, _collection: &str) -> Result<Vec<Value>, String> {
        Ok(self.state().companies.clone())
    }

    fn upsert_by_key(
        &self,
        database: &str,
        collection: &str,
        key_field: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), String> {
        let mut state = self.state();
        if state.fail_writes {
            return Err("simulated write failure".to_string());
        }
        state.upserts.retain(|existing| {
            !(existing.database == database
                && existing.collection == collection
                && existing.document.get(key_field).and_then(Value::as_str) == Some(key))
        });
        state.upserts.push(StoredDocument {
            database: database.to_string(),
            collection: collection.to_string(),
            document: document.clone(),
        });
        Ok(())
    }

    fn ensure_collection(&self, database: &str, collection: &str) -> Result<(), String> {
        self.state()
            .collections
            .insert((database.to_string(), collection.to_string()));
        Ok(())
    }

    fn insert(&self, database: &str, collection: &str, document: &Value) -> Result<(), String> {
        let mut state = self.state();
        if state.fail_writes {
            return Err("simulated write failure".to_string());
        }
        state.inserts.push(StoredDocument {
            database: database.to_string(),
            collection: collection.to_string(),
            document: document.clone(),
        });
        Ok(())
    }

    fn close(&self) {
        self.state().closes += 1;
    }
}

#[derive(Debug, Default)]
pub struct CapturingQueue {
    messages: Mutex<Vec<(String, String)>>,
    fail_after: Option<usize>,
}

impl CapturingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `accepted` messages, then refuses every further publish.
    pub fn failing_after(accepted: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_after: Some(accepted),
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("poisoned mutex").clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.messages()
            .into_iter()
            .map(|(_, body)| serde_json::from_str(&body).expect("queued body should be JSON"))
            .collect()
    }
}

impl QueuePublisher for CapturingQueue {
    fn publish(&self, queue_url: &str, body: &str) -> Result<String, String> {
        let mut messages = self.messages.lock().expect("poisoned mutex");
        if self.fail_after.is_some_and(|limit| messages.len() >= limit) {
            return Err("simulated queue failure".to_string());
        }
        messages.push((queue_url.to_string(), body.to_string()));
        Ok(format!("message-{}", messages.len()))
    }
}

#[derive(Debug)]
pub struct ScriptedAgent {
    response: Result<String, String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedAgent {
    pub fn responding(body: impl Into<String>) -> Self {
        Self {
            response: Ok(body.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("poisoned mutex").clone()
    }
}

impl GenerationAgent for ScriptedAgent {
    fn generate(
        &self,
        endpoint: &str,
        payload: &Value,
        _timeout: Duration,
    ) -> Result<String, String> {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push((endpoint.to_string(), payload.clone()));
        self.response.clone()
    }
}

#[derive(Debug, Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
    fail: bool,
}

impl CapturingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().expect("poisoned mutex").clone()
    }
}

impl Notifier for CapturingNotifier {
    fn send(&self, from: &str, notification: &Notification) -> Result<(), String> {
        self.sent
            .lock()
            .expect("poisoned mutex")
            .push((from.to_string(), notification.clone()));
        if self.fail {
            Err("simulated email failure".to_string())
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct CapturingWorkflow {
    starts: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl CapturingWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            starts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn starts(&self) -> Vec<(String, String)> {
        self.starts.lock().expect("poisoned mutex").clone()
    }
}

impl WorkflowTrigger for CapturingWorkflow {
    fn start(&self, workflow_arn: &str, input: &str) -> Result<String, String> {
        let mut starts = self.starts.lock().expect("poisoned mutex");
        starts.push((workflow_arn.to_string(), input.to_string()));
        if self.fail {
            Err("simulated workflow failure".to_string())
        } else {
            Ok(format!("{workflow_arn}:execution-{}", starts.len()))
        }
    }
}
