//! Request Input Parsing
//!
//! Normalises whatever the transport delivered (CGI environment + stdin, or
//! an HTTP request) into a flat list of form fields.

use std::collections::HashMap;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request parsing errors
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { declared: usize, limit: usize },
    #[error("failed to read request body: {0}")]
    Read(#[from] std::io::Error),
    #[error("malformed form data: {0}")]
    Decode(#[from] serde_urlencoded::de::Error),
}

/// Decoded form fields in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRequest {
    fields: Vec<(String, String)>,
}

impl FormRequest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode `application/x-www-form-urlencoded` data
    pub fn parse(encoded: &[u8]) -> Result<Self, RequestError> {
        let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(encoded)?;
        Ok(Self { fields })
    }

    /// Pick the field source by method: the query string for GET, a
    /// url-encoded body for POST, nothing otherwise.
    pub fn from_parts(
        method: &str,
        query: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Self, RequestError> {
        match method {
            "GET" => Self::parse(query.as_bytes()),
            "POST" if content_type.starts_with(FORM_CONTENT_TYPE) => Self::parse(body),
            _ => Ok(Self::empty()),
        }
    }

    /// First value submitted for `name`, `""` if absent
    pub fn get(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields as a map; the first occurrence of a repeated name wins
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(self.fields.len());
        for (k, v) in &self.fields {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        map
    }
}

/// Read a CGI request body of the declared `CONTENT_LENGTH`.
///
/// A missing or non-numeric length means no body.
pub async fn read_body<R>(
    reader: &mut R,
    content_length: &str,
    limit: usize,
) -> Result<Vec<u8>, RequestError>
where
    R: AsyncRead + Unpin,
{
    let declared: usize = content_length.trim().parse().unwrap_or(0);
    if declared == 0 {
        return Ok(Vec::new());
    }
    if declared > limit {
        return Err(RequestError::BodyTooLarge { declared, limit });
    }

    let mut body = vec![0u8; declared];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_uses_query() {
        let form = FormRequest::from_parts("GET", "tab=zerossl&action=", "", b"ignored=1").unwrap();
        assert_eq!(form.get("tab"), "zerossl");
        assert_eq!(form.get("action"), "");
        assert_eq!(form.get("ignored"), "");
    }

    #[test]
    fn test_post_form_body() {
        let form = FormRequest::from_parts(
            "POST",
            "tab=ignored",
            "application/x-www-form-urlencoded; charset=utf-8",
            b"action=zerossl_issue&domain=example.com",
        )
        .unwrap();
        assert_eq!(form.get("action"), "zerossl_issue");
        assert_eq!(form.get("domain"), "example.com");
        assert_eq!(form.get("tab"), "");
    }

    #[test]
    fn test_post_other_content_type_is_empty() {
        let form =
            FormRequest::from_parts("POST", "", "multipart/form-data; boundary=x", b"a=b").unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_other_methods_are_empty() {
        let form = FormRequest::from_parts("PUT", "action=zerossl_run_all", "", b"").unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_percent_decoding() {
        let form = FormRequest::parse(b"eab_kid=a%2Bb+c&eab_hmac=%3D%3D").unwrap();
        assert_eq!(form.get("eab_kid"), "a+b c");
        assert_eq!(form.get("eab_hmac"), "==");
    }

    #[test]
    fn test_first_value_wins() {
        let form = FormRequest::parse(b"domain=first.com&domain=second.com").unwrap();
        assert_eq!(form.get("domain"), "first.com");
        assert_eq!(form.to_map().get("domain").map(String::as_str), Some("first.com"));
    }

    #[tokio::test]
    async fn test_read_body_exact_length() {
        let mut input: &[u8] = b"action=zerossl_run_all&extra";
        let body = read_body(&mut input, "22", 1024).await.unwrap();
        assert_eq!(body, b"action=zerossl_run_all");
    }

    #[tokio::test]
    async fn test_read_body_missing_length() {
        let mut input: &[u8] = b"action=zerossl_run_all";
        assert!(read_body(&mut input, "", 1024).await.unwrap().is_empty());
        assert!(read_body(&mut input, "abc", 1024).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_body_limits() {
        let mut input: &[u8] = b"0123456789";
        let err = read_body(&mut input, "100", 10).await.unwrap_err();
        assert!(matches!(err, RequestError::BodyTooLarge { declared: 100, limit: 10 }));

        let body = read_body(&mut input, "10", 10).await.unwrap();
        assert_eq!(body.len(), 10);
    }

    #[tokio::test]
    async fn test_read_body_truncated() {
        let mut input: &[u8] = b"short";
        let err = read_body(&mut input, "50", 1024).await.unwrap_err();
        assert!(matches!(err, RequestError::Read(_)));
    }
}
