use rand::{Rng, distr::Alphanumeric};

pub const RECORD_ID_LEN: usize = 15;

/// Random lowercase alphanumeric record id.
pub fn generate_record_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RECORD_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_lowercase_alphanumeric() {
        let id = generate_record_id();
        assert_eq!(id.len(), RECORD_ID_LEN);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
        assert_ne!(id, generate_record_id());
    }
}
