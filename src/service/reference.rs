use chrono::{DateTime, Utc};
use rand::Rng;

/// Human-readable unique reference such as `TXN-20250314-9F2C41AB`.
/// Uniqueness is finally enforced by the column's unique constraint.
pub fn new_reference(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{}-{}-{:08X}", prefix, now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reference_has_prefix_date_and_hex_suffix() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let reference = new_reference("TXN", now);
        assert!(reference.starts_with("TXN-20250314-"));
        let suffix = reference.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
