//! MongoDB change stream adapter.
//!
//! Watches the account collection with `fullDocument: updateLookup`, so every
//! insert, update and replace carries the complete record after the change.
//! The last seen resume token is kept across subscriptions: after a
//! disruption the next subscription resumes where the previous one stopped.
//! If the store rejects the token (for example once the oplog has rolled past
//! it), the token is dropped and the following attempt opens a fresh watch.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    Client, Collection,
    bson::{Bson, Document, doc},
    change_stream::event::{ChangeStreamEvent, ResumeToken},
    options::FullDocumentType,
};
use serde_json::Value;

use crate::domain::{
    AccountChange, AccountChangeSource, AccountChangeStream, AccountDocument, ChangeStreamError,
    UserId,
};

/// Connection settings for the account store
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection string
    pub uri: String,
    /// Database holding the account collection
    pub db_name: String,
    /// Account collection name
    pub collection: String,
}

/// AccountChangeSource backed by a MongoDB change stream
pub struct MongoAccountChangeSource {
    collection: Collection<Document>,
    resume_point: ResumePoint<ResumeToken>,
}

/// Last seen position in the change stream, shared with the live stream
#[derive(Debug)]
struct ResumePoint<T> {
    last: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for ResumePoint<T> {
    fn clone(&self) -> Self {
        Self {
            last: self.last.clone(),
        }
    }
}

impl<T: Clone> ResumePoint<T> {
    fn new() -> Self {
        Self {
            last: Arc::new(Mutex::new(None)),
        }
    }

    fn current(&self) -> Option<T> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, token: T) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn forget(&self) -> Option<T> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Open a subscription, resuming from the last seen position if there is
    /// one. A failed resume forgets the position.
    async fn open<S, F, Fut>(&self, open: F) -> Result<S, ChangeStreamError>
    where
        F: FnOnce(Option<T>) -> Fut,
        Fut: Future<Output = Result<S, ChangeStreamError>>,
    {
        let resume_after = self.current();
        let resumed = resume_after.is_some();
        if resumed {
            tracing::info!("Resuming account change stream from last seen event");
        }

        let result = open(resume_after).await;
        if resumed && let Err(e) = &result {
            self.forget();
            tracing::warn!(
                "Cannot resume account change stream ({}); next attempt starts from now, changes in between are lost",
                e
            );
        }
        result
    }
}

impl MongoAccountChangeSource {
    /// Build a client for `config`.
    ///
    /// The driver connects lazily; an unreachable server surfaces on the
    /// first `subscribe`, not here.
    ///
    /// # Errors
    ///
    /// Returns `ChangeStreamError::Subscribe` if the connection string is invalid
    pub async fn connect(config: &MongoConfig) -> Result<Self, ChangeStreamError> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| ChangeStreamError::Subscribe(e.to_string()))?;
        let collection = client
            .database(&config.db_name)
            .collection::<Document>(&config.collection);

        tracing::info!(
            "Account change source ready: {}.{}",
            config.db_name,
            config.collection
        );

        Ok(Self {
            collection,
            resume_point: ResumePoint::new(),
        })
    }
}

#[async_trait]
impl AccountChangeSource for MongoAccountChangeSource {
    async fn subscribe(&self) -> Result<AccountChangeStream, ChangeStreamError> {
        let pipeline = [doc! {
            "$match": { "operationType": { "$in": ["insert", "update", "replace"] } }
        }];
        let stream = self
            .resume_point
            .open(|resume_after| async move {
                let mut watch = self
                    .collection
                    .watch()
                    .pipeline(pipeline)
                    .full_document(FullDocumentType::UpdateLookup);
                if let Some(token) = resume_after {
                    watch = watch.resume_after(token);
                }
                watch
                    .await
                    .map_err(|e| ChangeStreamError::Subscribe(e.to_string()))
            })
            .await?;

        let resume_point = self.resume_point.clone();
        let changes = stream.map(move |event| {
            let event = event.map_err(|e| ChangeStreamError::Stream(e.to_string()))?;
            resume_point.record(event.id.clone());
            account_change_from_event(event)
        });
        Ok(changes.boxed())
    }
}

fn account_change_from_event(
    event: ChangeStreamEvent<Document>,
) -> Result<AccountChange, ChangeStreamError> {
    let document = event.full_document.ok_or_else(|| {
        ChangeStreamError::MalformedEvent(format!(
            "{:?} event without full document",
            event.operation_type
        ))
    })?;
    account_change_from_document(document)
}

/// Build an AccountChange from a full account record.
///
/// The record's `_id` identifies its owner. The record is rendered the way
/// the platform's own API renders it: ObjectIds as hex strings and dates as
/// ISO-8601 strings.
pub fn account_change_from_document(document: Document) -> Result<AccountChange, ChangeStreamError> {
    let raw_id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => {
            return Err(ChangeStreamError::MalformedEvent(
                "account document without _id".to_string(),
            ));
        }
    };
    let user_id =
        UserId::new(raw_id).map_err(|e| ChangeStreamError::MalformedEvent(e.to_string()))?;

    let value = normalize_extended_json(Bson::Document(document).into_relaxed_extjson());
    Ok(AccountChange::new(user_id, AccountDocument::new(value)))
}

fn normalize_extended_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                let wrapped = map
                    .get("$oid")
                    .or_else(|| map.get("$date"))
                    .or_else(|| map.get("$numberDecimal"));
                if let Some(Value::String(inner)) = wrapped {
                    return Value::String(inner.clone());
                }
                if let Some(Value::String(inner)) = map.get("$numberLong")
                    && let Ok(number) = inner.parse::<i64>()
                {
                    return Value::from(number);
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(key, inner)| (key, normalize_extended_json(inner)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_extended_json).collect()),
        other => other,
    }
}
