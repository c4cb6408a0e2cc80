use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
    errors::ErrorKind,
};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub id: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

/// Signing material for desk credentials.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, issuer: &str, ttl_hours: u64) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            ttl: Duration::hours(i64::try_from(ttl_hours).unwrap_or(i64::MAX / 3600)),
        }
    }

    pub fn claims_for(&self, user_id: &str, is_admin: bool) -> Claims {
        let now = Utc::now();
        Claims {
            id: user_id.to_string(),
            is_admin,
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: self.issuer.clone(),
        }
    }

    pub fn issue(&self, user_id: &str, is_admin: bool) -> Result<String> {
        encode_jwt(&self.claims_for(user_id, is_admin), &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<TokenData<Claims>> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);
        decode_jwt(token, &self.decoding, &validation)
    }
}

pub fn encode_jwt(claim: &Claims, key: &EncodingKey) -> Result<String> {
    let token = encode(&Header::default(), claim, key)?;
    Ok(token)
}

pub fn decode_jwt<T: serde::de::DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<TokenData<T>> {
    decode::<T>(token, key, validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => {
            tracing::debug!("Token rejected: {e}");
            Error::InvalidToken
        }
    })
}
