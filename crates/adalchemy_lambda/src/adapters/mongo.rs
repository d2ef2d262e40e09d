use std::time::Duration;

use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde_json::Value;

use super::block_on;
use super::store::{StoreConnector, StoreSession};

const NAMESPACE_EXISTS: i32 = 48;

#[derive(Debug, Default, Clone, Copy)]
pub struct MongoConnector;

impl StoreConnector for MongoConnector {
    type Session = MongoSession;

    fn connect(&self, uri: &str, timeout: Duration) -> Result<MongoSession, String> {
        let connection_string = uri.to_string();

        block_on(async move {
            let mut options = ClientOptions::parse(connection_string)
                .await
                .map_err(|error| format!("invalid MongoDB connection string: {error}"))?;
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);

            Client::with_options(options)
                .map(|client| MongoSession { client })
                .map_err(|error| format!("failed to create MongoDB client: {error}"))
        })
    }
}

pub struct MongoSession {
    client: Client,
}

impl MongoSession {
    fn collection(&self, database: &str, collection: &str) -> mongodb::Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

fn to_document(value: &Value) -> Result<Document, String> {
    bson::to_document(value).map_err(|error| format!("document is not BSON-encodable: {error}"))
}

impl StoreSession for MongoSession {
    fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Value>, String> {
        let collection = self.collection(database, collection);

        block_on(async move {
            let cursor = collection
                .find(doc! {})
                .projection(doc! { "_id": 0 })
                .await
                .map_err(|error| format!("failed to query companies: {error}"))?;
            let documents: Vec<Document> = cursor
                .try_collect()
                .await
                .map_err(|error| format!("failed to read companies: {error}"))?;

            Ok(documents
                .into_iter()
                .map(|document| Bson::Document(document).into_relaxed_extjson())
                .collect())
        })
    }

    fn upsert_by_key(
        &self,
        database: &str,
        collection: &str,
        key_field: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), String> {
        let collection = self.collection(database, collection);
        let replacement = to_document(document)?;
        let mut filter = Document::new();
        filter.insert(key_field, key);

        block_on(async move {
            collection
                .replace_one(filter, replacement)
                .upsert(true)
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to write research result: {error}"))
        })
    }

    fn ensure_collection(&self, database: &str, collection: &str) -> Result<(), String> {
        let db = self.client.database(database);
        let name = collection.to_string();

        block_on(async move {
            let existing = db
                .list_collection_names()
                .await
                .map_err(|error| format!("failed to list collections: {error}"))?;
            if existing.iter().any(|candidate| candidate == &name) {
                return Ok(());
            }

            match db.create_collection(&name).await {
                Ok(()) => Ok(()),
                // Lost a creation race with a concurrent invocation.
                Err(error)
                    if matches!(&*error.kind, ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS) =>
                {
                    Ok(())
                }
                Err(error) => Err(format!("failed to create collection {name}: {error}")),
            }
        })
    }

    fn insert(&self, database: &str, collection: &str, document: &Value) -> Result<(), String> {
        let collection = self.collection(database, collection);
        let document = to_document(document)?;

        block_on(async move {
            collection
                .insert_one(document)
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to insert document: {error}"))
        })
    }

    fn close(&self) {
        let client = self.client.clone();
        block_on(async move { client.shutdown().await });
    }
}
