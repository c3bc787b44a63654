//! Number and domain normalization helpers for call classification.

use std::sync::LazyLock;

use regex::Regex;

/// Ten-digit NANP destination, optionally prefixed with `1` or `+1`.
/// Capture group 2 is the bare ten digits.
pub static NANP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?1?)?(\d{10})$").unwrap()
});

/// Any plausible external number an internal caller may dial.
pub static EXTERNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?\d{10,15}$").unwrap()
});

/// Comparison form of a domain or extension token: ASCII
/// alphanumerics only, lowercased.
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The caller's domain as carried in a channel name like
/// `sofia/internal/1001@b.example`. Everything after the last `@`,
/// cut at the first port/parameter separator.
pub fn caller_domain(channel_name: &str) -> Option<&str> {
    let (_, tail) = channel_name.rsplit_once('@')?;
    let host = tail
        .split(|c| c == ':' || c == '/' || c == ';' || c == ' ')
        .next()
        .unwrap_or(tail);
    if host.is_empty() { None } else { Some(host) }
}

/// The ten NANP digits of an outbound PSTN destination, if it is one.
pub fn nanp_ten_digits(destination: &str) -> Option<String> {
    NANP.captures(destination)
        .map(|caps| caps[2].to_string())
}

/// Display normalization for inbound caller identity: strip a leading
/// `+1`.
pub fn strip_nanp_prefix(raw: &str) -> &str {
    raw.strip_prefix("+1").unwrap_or(raw)
}

/// Condition expression matching exactly this destination: `^…$` with
/// every regex metacharacter backslash-escaped.
pub fn anchored_literal(destination: &str) -> String {
    format!("^{}$", regex::escape(destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanp_matches_all_prefix_forms() {
        for dest in ["5125559999", "15125559999", "+15125559999", "+5125559999"] {
            assert_eq!(
                nanp_ten_digits(dest).as_deref(),
                Some("5125559999"),
                "destination {dest}"
            );
        }
        assert_eq!(nanp_ten_digits("1001"), None);
        assert_eq!(nanp_ten_digits("+442071234567"), None);
    }

    #[test]
    fn external_matches_long_numbers() {
        assert!(EXTERNAL.is_match("+442071234567"));
        assert!(EXTERNAL.is_match("5125559999"));
        assert!(!EXTERNAL.is_match("1001"));
        assert!(!EXTERNAL.is_match("sales"));
    }

    #[test]
    fn token_normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_token("A.Example"), "aexample");
        assert_eq!(normalize_token("a-example"), "aexample");
        assert_ne!(normalize_token("a.example"), normalize_token("b.example"));
    }

    #[test]
    fn caller_domain_comes_from_channel_name() {
        assert_eq!(
            caller_domain("sofia/internal/1001@b.example"),
            Some("b.example")
        );
        assert_eq!(
            caller_domain("sofia/internal/1001@b.example:5060"),
            Some("b.example")
        );
        assert_eq!(caller_domain("sofia/internal/1001"), None);
    }

    #[test]
    fn anchored_literal_escapes_metacharacters() {
        assert_eq!(anchored_literal("*98"), r"^\*98$");
        assert_eq!(anchored_literal("1001"), "^1001$");
        assert_eq!(anchored_literal("+1512"), r"^\+1512$");
    }
}
