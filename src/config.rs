//! Configuration management

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default state directory holding the EAB credentials and the shared secret
pub const DEFAULT_STATE_DIR: &str = "/root/.ssl-hub";

/// Environment variable carrying the caller's shared secret (set by the WHM wrapper)
pub const SHARED_SECRET_ENV: &str = "SSL_HUB_SHARED_SECRET";

/// External tool locations and the arguments they are invoked with
#[derive(Debug, Clone)]
pub struct ToolPaths {
    /// Provider configuration CLI (`whmapi1`)
    pub whmapi: PathBuf,
    /// AutoSSL check CLI
    pub autossl_check: PathBuf,
    /// ZeroSSL issuance script
    pub issue_script: PathBuf,
    /// Provider identifier for the bundled default provider
    pub default_provider: String,
    /// Provider identifier for the Let's Encrypt provider
    pub acme_provider: String,
    /// Terms of service reference sent when enabling the ACME provider
    pub tos_url: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            whmapi: PathBuf::from("/usr/local/cpanel/bin/whmapi1"),
            autossl_check: PathBuf::from("/usr/local/cpanel/bin/autossl_check"),
            issue_script: PathBuf::from(
                "/usr/local/cpanel/whostmgr/docroot/cgi/ssl-hub/zerossl.sh",
            ),
            default_provider: "cPanel".to_string(),
            acme_provider: "LetsEncrypt".to_string(),
            tos_url: "https://letsencrypt.org/documents/LE-SA-v1.4-April-3-2024.pdf".to_string(),
        }
    }
}

/// SSL Hub configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Private directory for the EAB credential files
    pub state_dir: PathBuf,

    /// File holding the configured shared secret (optional)
    pub secret_file: PathBuf,

    /// External tools
    pub tools: ToolPaths,

    /// Pass kid/hmac to the issuance script as arguments instead of relying on the store files
    pub inline_credentials: bool,

    /// Kill external tools after this long (None = wait forever)
    pub command_timeout: Option<Duration>,

    /// Largest accepted request body
    pub max_body_bytes: usize,

    /// Listen address for `--serve`
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = PathBuf::from(DEFAULT_STATE_DIR);
        Self {
            secret_file: state_dir.join("secret"),
            state_dir,
            tools: ToolPaths::default(),
            inline_credentials: false,
            command_timeout: None,
            max_body_bytes: 64 * 1024,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let state_dir = std::env::var("SSL_HUB_STATE_DIR")
            .map(|p| PathBuf::from(shellexpand::tilde(&p).as_ref()))
            .unwrap_or(defaults.state_dir);

        let secret_file = std::env::var("SSL_HUB_SECRET_FILE")
            .map(|p| PathBuf::from(shellexpand::tilde(&p).as_ref()))
            .unwrap_or_else(|_| state_dir.join("secret"));

        let mut tools = defaults.tools;
        if let Ok(path) = std::env::var("SSL_HUB_WHMAPI") {
            tools.whmapi = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SSL_HUB_AUTOSSL_CHECK") {
            tools.autossl_check = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SSL_HUB_ISSUE_SCRIPT") {
            tools.issue_script = PathBuf::from(path);
        }
        if let Ok(provider) = std::env::var("SSL_HUB_DEFAULT_PROVIDER") {
            tools.default_provider = provider;
        }
        if let Ok(provider) = std::env::var("SSL_HUB_ACME_PROVIDER") {
            tools.acme_provider = provider;
        }
        if let Ok(url) = std::env::var("SSL_HUB_TOS_URL") {
            tools.tos_url = url;
        }

        let inline_credentials = std::env::var("SSL_HUB_INLINE_CREDENTIALS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let command_timeout = match std::env::var("SSL_HUB_COMMAND_TIMEOUT_SECS") {
            Ok(v) => parse_timeout(&v)?,
            Err(_) => None,
        };

        let max_body_bytes = match std::env::var("SSL_HUB_MAX_BODY_BYTES") {
            Ok(v) => v
                .trim()
                .parse()
                .with_context(|| format!("invalid SSL_HUB_MAX_BODY_BYTES: {v:?}"))?,
            Err(_) => defaults.max_body_bytes,
        };

        let bind_addr = match std::env::var("SSL_HUB_BIND") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("invalid SSL_HUB_BIND: {v:?}"))?,
            Err(_) => defaults.bind_addr,
        };

        Ok(Self {
            state_dir,
            secret_file,
            tools,
            inline_credentials,
            command_timeout,
            max_body_bytes,
            bind_addr,
        })
    }

    /// Config rooted at a custom state directory (tests, local runs)
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            secret_file: state_dir.join("secret"),
            state_dir,
            ..Self::default()
        }
    }
}

/// Seconds to wait for an external tool; `0` means no limit
fn parse_timeout(value: &str) -> Result<Option<Duration>> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid SSL_HUB_COMMAND_TIMEOUT_SECS: {value:?}"))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
