use chrono::{SecondsFormat, Utc};

/// Fixed-width RFC 3339 UTC timestamp, so string order equals time order.
pub fn time_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width_and_ordered() {
        let a = time_now();
        let b = time_now();
        assert_eq!(a.len(), "2026-01-01T00:00:00.000000Z".len());
        assert!(a.ends_with('Z'));
        assert!(a <= b);
    }
}
