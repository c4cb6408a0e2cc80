//! Shared fixtures for in-crate tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{
    config::{AppConfig, StoreBackend},
    consts::{field, store_const::USER_TABLE},
    fields,
    models::meetme::NewMeetme,
    store::{ListQuery, Page, Record, RecordStore, StoreResult},
};

/// Yields to the scheduler around every call so that unsynchronized
/// read-then-write sequences interleave.
pub struct YieldingStore<S> {
    inner: S,
}

impl<S> YieldingStore<S> {
    pub fn new(inner: S) -> Self {
        YieldingStore { inner }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for YieldingStore<S> {
    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Record> {
        tokio::task::yield_now().await;
        let record = self.inner.get_one(collection, id).await;
        tokio::task::yield_now().await;
        record
    }

    async fn get_list(&self, collection: &str, query: &ListQuery) -> StoreResult<Page<Record>> {
        tokio::task::yield_now().await;
        let page = self.inner.get_list(collection, query).await;
        tokio::task::yield_now().await;
        page
    }

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Record> {
        tokio::task::yield_now().await;
        self.inner.create(collection, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Record> {
        tokio::task::yield_now().await;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.delete(collection, id).await
    }
}

/// Creates a user record and returns its id.
pub async fn seed_user(store: &dyn RecordStore, email: &str, is_admin: bool) -> String {
    store
        .create(
            USER_TABLE,
            fields! {
                field::EMAIL => email,
                field::IS_ADMIN => is_admin,
                field::VERIFIED => true,
            },
        )
        .await
        .expect("seed user")
        .id
}

pub fn new_meetme(name: &str, phone: &str, message: &str) -> NewMeetme {
    NewMeetme {
        name: name.to_string(),
        phone: phone.to_string(),
        message: message.to_string(),
    }
}

/// Config for an in-memory deployment with fixed secrets.
pub fn memory_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Memory;
    config.auth.jwt_secret = "test-jwt-secret".to_string();
    config.auth.oauth_secret = "test-oauth-secret".to_string();
    config.auth.admin_email = "admin@meetme.local".to_string();
    config.auth.admin_password = "desk-admin-pass".to_string();
    config
}
