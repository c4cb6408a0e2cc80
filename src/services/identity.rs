use std::sync::Arc;

use crate::{
    consts::store_const::USER_TABLE,
    errors::{Error, Result},
    models::user::{Principal, User},
    store::{RecordStore, StoreError},
    utils::jwt::JwtKeys,
};

/// Turns a bearer credential into the principal it speaks for.
pub struct IdentityResolver {
    keys: JwtKeys,
    store: Arc<dyn RecordStore>,
}

impl IdentityResolver {
    pub fn new(keys: JwtKeys, store: Arc<dyn RecordStore>) -> Self {
        IdentityResolver { keys, store }
    }

    pub fn issue_token(&self, user_id: &str, is_admin: bool) -> Result<String> {
        self.keys.issue(user_id, is_admin)
    }

    /// The subject must still exist; the admin flag is the claim or the stored
    /// flag, whichever grants.
    pub async fn resolve(&self, token: &str) -> Result<Principal> {
        let claims = self.keys.verify(token)?.claims;
        let user: User = match self.store.get_one(USER_TABLE, &claims.id).await {
            Ok(record) => record.decode()?,
            Err(StoreError::NotFound { .. }) => return Err(Error::SubjectNotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(Principal {
            user_id: user.id,
            is_admin: claims.is_admin || user.is_admin,
        })
    }
}
