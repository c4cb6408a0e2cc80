use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::errors::{Error, Result};

pub fn hash(password: &[u8]) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2.hash_password(password, &salt)?.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
pub fn validate(password: &[u8], hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)?;
    let argon2 = Argon2::default();

    match argon2.verify_password(password, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Argon2Error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_password_hash_verifies() {
        let hashed = hash(b"desk-admin-pass").expect("Failed to hash password");
        assert!(hashed.starts_with("$argon2"));

        assert!(validate(b"desk-admin-pass", &hashed).expect("Validation failed"));
        assert!(!validate(b"desk-admin-pas", &hashed).expect("Validation failed"));
        assert!(!validate(b"", &hashed).expect("Validation failed"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(validate(b"anything", "not-a-phc-string").is_err());
    }
}
