//! Domain name validation
//!
//! Purely syntactic: no DNS lookup. A name must have at least two labels,
//! each 1-63 characters of `[a-z0-9-]` that neither starts nor ends with a hyphen.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i)[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$",
    )
    .unwrap()
});

/// Check that `s` is a multi-label DNS hostname safe to hand to the issuance script
pub fn is_valid_domain(s: &str) -> bool {
    RE_HOSTNAME.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_hostnames() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("www.example.co.uk"));
        assert!(is_valid_domain("EXAMPLE.COM"));
        assert!(is_valid_domain("a-b.c9"));
        assert!(is_valid_domain("1.2"));
        assert!(is_valid_domain("xn--bcher-kva.example"));
    }

    #[test]
    fn test_rejects_single_label() {
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("com"));
        assert!(!is_valid_domain(""));
    }

    #[test]
    fn test_rejects_empty_labels() {
        assert!(!is_valid_domain("example..com"));
        assert!(!is_valid_domain(".example.com"));
        assert!(!is_valid_domain("example.com."));
    }

    #[test]
    fn test_rejects_hyphen_edges() {
        assert!(!is_valid_domain("-example.com"));
        assert!(!is_valid_domain("example-.com"));
        assert!(!is_valid_domain("example.-com"));
    }

    #[test]
    fn test_label_length_limit() {
        let ok = format!("{}.com", "a".repeat(63));
        let too_long = format!("{}.com", "a".repeat(64));
        assert!(is_valid_domain(&ok));
        assert!(!is_valid_domain(&too_long));
    }

    #[test]
    fn test_rejects_injection_attempts() {
        assert!(!is_valid_domain("example.com; rm -rf /"));
        assert!(!is_valid_domain("example.com\n--run-all"));
        assert!(!is_valid_domain("--run-all"));
        assert!(!is_valid_domain("*.example.com"));
        assert!(!is_valid_domain(" example.com"));
        assert!(!is_valid_domain("../etc/passwd"));
    }
}
