//! Shared-Secret Authorization Gate
//!
//! The WHM wrapper may export `SSL_HUB_SHARED_SECRET`; if the operator also
//! writes the same value to the secret file, every action request must
//! present it. With no secret file (or an empty one) the gate is open,
//! which leaves access control to WHM itself.
//!
//! Comparison is constant-time so response latency reveals nothing about
//! how much of a guess matched.

use std::path::Path;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// The configured secret as loaded from disk
#[derive(Default)]
pub enum SharedSecret {
    /// No secret configured; gate disabled
    #[default]
    Disabled,
    /// Secret file present and non-empty
    Configured(Zeroizing<String>),
    /// Secret file exists but could not be read; deny everything
    Unreadable,
}

impl SharedSecret {
    /// Read the configured secret from `path`
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let content = Zeroizing::new(content);
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    debug!(path = %path.display(), "Shared secret file empty - gate disabled");
                    Self::Disabled
                } else {
                    Self::Configured(Zeroizing::new(trimmed.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::Disabled,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Cannot read shared secret file - denying all actions"
                );
                Self::Unreadable
            }
        }
    }

    /// Check a presented secret against this configuration
    pub fn authorize(&self, presented: &str) -> bool {
        match self {
            Self::Disabled => true,
            Self::Configured(secret) => authorize(presented, Some(secret.as_str())),
            Self::Unreadable => false,
        }
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Configured(_) => f.write_str("Configured(..)"),
            Self::Unreadable => f.write_str("Unreadable"),
        }
    }
}

/// Compare `presented` to the `configured` secret.
///
/// An absent or empty configured secret grants access. Otherwise the two
/// must be byte-equal.
pub fn authorize(presented: &str, configured: Option<&str>) -> bool {
    match configured {
        None => true,
        Some(configured) if configured.is_empty() => true,
        Some(configured) => presented.as_bytes().ct_eq(configured.as_bytes()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_no_secret_always_allows() {
        assert!(authorize("", None));
        assert!(authorize("anything", None));
        assert!(authorize("", Some("")));
        assert!(authorize("anything", Some("")));
    }

    #[test]
    fn test_exact_match_required() {
        assert!(authorize("s3cret-value", Some("s3cret-value")));
        assert!(!authorize("s3cret-valuE", Some("s3cret-value")));
        assert!(!authorize("", Some("s3cret-value")));
    }

    #[test]
    fn test_prefix_and_suffix_rejected() {
        let configured = Some("s3cret-value");
        assert!(!authorize("s3cret", configured));
        assert!(!authorize("value", configured));
        assert!(!authorize("s3cret-value-extra", configured));
        assert!(!authorize("xs3cret-value", configured));
    }

    #[test]
    fn test_load_missing_file_disables_gate() {
        let dir = tempdir().unwrap();
        let secret = SharedSecret::load(&dir.path().join("secret"));
        assert!(matches!(secret, SharedSecret::Disabled));
        assert!(secret.authorize(""));
    }

    #[test]
    fn test_load_trims_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "  hunter2\n").unwrap();

        let secret = SharedSecret::load(&path);
        assert!(secret.authorize("hunter2"));
        assert!(!secret.authorize(" hunter2"));
        assert!(!secret.authorize(""));
    }

    #[test]
    fn test_blank_file_disables_gate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "\n \n").unwrap();

        assert!(SharedSecret::load(&path).authorize(""));
    }

    #[test]
    fn test_unreadable_denies() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a string
        let secret = SharedSecret::load(dir.path());
        assert!(matches!(secret, SharedSecret::Unreadable));
        assert!(!secret.authorize("anything"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let secret = SharedSecret::Configured(Zeroizing::new("hunter2".to_string()));
        assert_eq!(format!("{secret:?}"), "Configured(..)");
    }
}
