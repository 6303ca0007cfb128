use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use validator::ValidationError;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern is valid"))
}

/// Strips markup from user supplied free text.
pub fn sanitize(text: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(text)
        .to_string()
        .trim()
        .to_string()
}

pub fn sanitize_opt(text: Option<String>) -> Option<String> {
    text.map(|t| sanitize(&t)).filter(|t| !t.is_empty())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number must be entered in the format '+999999999'. Up to 15 digits allowed.".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_is_removed() {
        assert_eq!(sanitize("Nice <b>flat</b> <script>x()</script>"), "Nice flat");
    }

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(sanitize_opt(Some("   ".to_string())), None);
        assert_eq!(sanitize_opt(Some("ok".to_string())), Some("ok".to_string()));
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone("+237677889900").is_ok());
        assert!(validate_phone("677889900").is_ok());
        assert!(validate_phone("12-34").is_err());
    }
}
