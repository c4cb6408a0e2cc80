use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use super::{ListQuery, Page, Record, RecordStore, StoreError, StoreResult, take_record_id};
use crate::consts::field;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout: Duration::from_secs(5),
            delay: Duration::from_millis(100),
        }
    }
}

/// Bounds every store call with a timeout and retries once on transient failure.
///
/// Reads retry on timeouts and aborts. Writes retry only on aborts: a write
/// that timed out may still have been applied.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Read,
    Write,
}

impl<S: RecordStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        RetryingStore { inner, policy }
    }

    async fn once<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }

    async fn attempt<T, F, Fut>(&self, op: &str, kind: Kind, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        match self.once(call()).await {
            Err(e) if retryable(&e, kind) => {
                warn!("Store {op} failed ({e}), retrying once");
                tokio::time::sleep(self.policy.delay).await;
                self.once(call()).await
            }
            other => other,
        }
    }
}

fn retryable(error: &StoreError, kind: Kind) -> bool {
    match kind {
        Kind::Read => error.is_transient(),
        Kind::Write => matches!(error, StoreError::Aborted(_)),
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for RetryingStore<S> {
    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Record> {
        self.attempt("get_one", Kind::Read, || self.inner.get_one(collection, id))
            .await
    }

    async fn get_list(&self, collection: &str, query: &ListQuery) -> StoreResult<Page<Record>> {
        self.attempt("get_list", Kind::Read, || {
            self.inner.get_list(collection, query)
        })
        .await
    }

    /// The id is fixed before the first attempt, so a retried create either
    /// finds the record the aborted attempt wrote or fails as a duplicate.
    async fn create(&self, collection: &str, mut fields: Map<String, Value>) -> StoreResult<Record> {
        let id = take_record_id(&mut fields);
        fields.insert(field::ID.to_string(), Value::String(id.clone()));

        match self.once(self.inner.create(collection, fields.clone())).await {
            Err(e) if retryable(&e, Kind::Write) => {
                warn!("Store create failed ({e}), retrying once");
                tokio::time::sleep(self.policy.delay).await;
                if let Ok(record) = self.once(self.inner.get_one(collection, &id)).await {
                    return Ok(record);
                }
                self.once(self.inner.create(collection, fields)).await
            }
            other => other,
        }
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Record> {
        self.attempt("update", Kind::Write, || {
            self.inner.update(collection, id, fields.clone())
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.attempt("delete", Kind::Write, || self.inner.delete(collection, id))
            .await
    }
}
