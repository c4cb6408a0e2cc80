use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::AuthConfig,
    consts::{field, store_const::USER_TABLE},
    errors::{Error, Result},
    fields,
    models::user::{User, UserView},
    services::identity::IdentityResolver,
    store::{Filter, ListQuery, RecordStore, StoreError},
    utils::{jwt::decode_jwt, pwd},
};

/// Claims the identity provider puts in the tokens it hands to the browser.
#[derive(Debug, Deserialize)]
struct ProviderClaims {
    id: String,
}

/// A freshly issued desk credential and the user it belongs to.
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserView,
}

pub struct AuthService {
    identity: Arc<IdentityResolver>,
    store: Arc<dyn RecordStore>,
    /// `None` when no provider secret is configured; provider logins are refused.
    provider_key: Option<DecodingKey>,
    admin_email: String,
    admin_password_hash: Option<String>,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        identity: Arc<IdentityResolver>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        let admin_password_hash = if config.admin_password.is_empty() {
            warn!("No admin password configured, admin login is disabled");
            None
        } else {
            Some(pwd::hash(config.admin_password.as_bytes())?)
        };
        let provider_key = if config.oauth_secret.is_empty() {
            warn!("No oauth secret configured, provider logins are disabled");
            None
        } else {
            Some(DecodingKey::from_secret(config.oauth_secret.as_bytes()))
        };
        Ok(AuthService {
            identity,
            store,
            provider_key,
            admin_email: config.admin_email.clone(),
            admin_password_hash,
        })
    }

    /// Exchanges an identity-provider token for a desk credential.
    pub async fn oauth_login(&self, provider_token: &str) -> Result<Session> {
        let provider_token = provider_token.trim();
        if provider_token.is_empty() {
            return Err(Error::InvalidInput("Token is required".to_string()));
        }
        let Some(provider_key) = self.provider_key.as_ref() else {
            warn!("Provider login attempted while disabled");
            return Err(Error::InvalidProviderToken);
        };
        let claims = decode_jwt::<ProviderClaims>(
            provider_token,
            provider_key,
            &Validation::default(),
        )
        .map_err(|_| Error::InvalidProviderToken)?
        .claims;

        let user: User = match self.store.get_one(USER_TABLE, &claims.id).await {
            Ok(record) => record.decode()?,
            Err(StoreError::NotFound { .. }) => return Err(Error::InvalidProviderToken),
            Err(e) => return Err(e.into()),
        };
        let token = self.identity.issue_token(&user.id, user.is_admin)?;
        info!("User {} signed in through the identity provider", user.id);
        Ok(Session {
            token,
            user: user.into(),
        })
    }

    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
        let Some(hash) = self.admin_password_hash.as_deref() else {
            warn!("Admin login attempted while disabled");
            return Err(Error::InvalidAdminCredentials);
        };
        if !email.eq_ignore_ascii_case(&self.admin_email) || !pwd::validate(password.as_bytes(), hash)? {
            warn!("Rejected admin login");
            return Err(Error::InvalidAdminCredentials);
        }

        let user = self.admin_user().await?;
        let token = self.identity.issue_token(&user.id, true)?;
        info!("Admin {} signed in", user.id);
        Ok(Session {
            token,
            user: user.into(),
        })
    }

    /// The user record of the configured admin, created or promoted on demand.
    async fn admin_user(&self) -> Result<User> {
        let query = ListQuery::new(Filter::eq(field::EMAIL, self.admin_email.as_str())).page(1, 1);
        let existing = self.store.get_list(USER_TABLE, &query).await?;

        let record = match existing.items.into_iter().next() {
            Some(record) if record.get(field::IS_ADMIN) == Some(serde_json::Value::Bool(true)) => {
                record
            }
            Some(record) => {
                info!("Promoting user {} to admin", record.id);
                self.store
                    .update(USER_TABLE, &record.id, fields! { field::IS_ADMIN => true })
                    .await?
            }
            None => {
                let record = self
                    .store
                    .create(
                        USER_TABLE,
                        fields! {
                            field::EMAIL => self.admin_email.as_str(),
                            field::IS_ADMIN => true,
                            field::VERIFIED => true,
                        },
                    )
                    .await?;
                info!("Created admin user {}", record.id);
                record
            }
        };
        Ok(record.decode()?)
    }
}
