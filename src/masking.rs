//! Display-safe redaction of credential strings

/// Character used in place of hidden secret characters
pub const REDACTION_MARK: char = '•';

/// Number of trailing characters left visible for secrets longer than this
const VISIBLE_SUFFIX: usize = 4;

/// Mask a secret for display.
///
/// Secrets of up to four characters are fully redacted; longer ones keep
/// their last four characters so an operator can tell which key is stored.
pub fn mask_secret(s: &str) -> String {
    let len = s.chars().count();
    if len <= VISIBLE_SUFFIX {
        return std::iter::repeat(REDACTION_MARK).take(len).collect();
    }

    let hidden = len - VISIBLE_SUFFIX;
    let mut masked: String = std::iter::repeat(REDACTION_MARK).take(hidden).collect();
    masked.extend(s.chars().skip(hidden));
    masked
}
