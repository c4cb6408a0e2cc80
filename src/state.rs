use std::sync::Arc;

use tracing::warn;

use crate::{
    config::{AppConfig, StoreBackend},
    errors::{Error, Result},
    services::{auth::AuthService, identity::IdentityResolver, meetme::MeetmeService},
    store::{RecordStore, memory::MemoryStore, retry::RetryingStore, surreal::SurrealStore},
    utils::jwt::JwtKeys,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: Arc<IdentityResolver>,
    pub auth: Arc<AuthService>,
    pub meetmes: Arc<MeetmeService>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> Result<Self> {
        config.check_secrets().map_err(Error::InsecureConfig)?;
        let policy = config.store.retry_policy();
        let store: Arc<dyn RecordStore> = match config.store.backend {
            StoreBackend::Surreal => Arc::new(RetryingStore::new(
                SurrealStore::connect(&config.store).await?,
                policy,
            )),
            StoreBackend::Memory => {
                warn!("Using the in-memory store, nothing will be persisted");
                Arc::new(RetryingStore::new(MemoryStore::new(), policy))
            }
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn RecordStore>) -> Result<Self> {
        let keys = JwtKeys::new(
            &config.auth.jwt_secret,
            &config.auth.issuer,
            config.auth.token_ttl_hours,
        );
        let identity = Arc::new(IdentityResolver::new(keys, store.clone()));
        let auth = Arc::new(AuthService::new(&config.auth, identity.clone(), store.clone())?);
        let meetmes = Arc::new(MeetmeService::new(store));
        Ok(Self {
            config: Arc::new(config),
            identity,
            auth,
            meetmes,
        })
    }
}
