use std::ops::Deref;
use std::time::Duration;

use serde_json::Value;

pub trait StoreConnector {
    type Session: StoreSession;

    fn connect(&self, uri: &str, timeout: Duration) -> Result<Self::Session, String>;
}

pub trait StoreSession {
    /// Every document of `collection`, without the `_id` field.
    fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Value>, String>;

    /// Replaces the document whose `key_field` equals `key`, inserting it when absent.
    fn upsert_by_key(
        &self,
        database: &str,
        collection: &str,
        key_field: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), String>;

    fn ensure_collection(&self, database: &str, collection: &str) -> Result<(), String>;

    fn insert(&self, database: &str, collection: &str, document: &Value) -> Result<(), String>;

    fn close(&self);
}

/// Store session that is closed exactly once, when the guard is dropped.
pub struct ScopedSession<S: StoreSession> {
    session: S,
}

impl<S: StoreSession> ScopedSession<S> {
    pub fn open<C>(connector: &C, uri: &str, timeout: Duration) -> Result<Self, String>
    where
        C: StoreConnector<Session = S>,
    {
        connector
            .connect(uri, timeout)
            .map(|session| Self { session })
    }
}

impl<S: StoreSession> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: StoreSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}
