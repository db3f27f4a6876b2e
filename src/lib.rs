//! SSL Hub
//!
//! WHM control plane for picking the AutoSSL provider and running ZeroSSL
//! issuance, without handing out a shell.
//!
//! # Features
//!
//! - **Action dispatch**: six fixed actions, each mapped to one argv-invoked tool
//! - **Credential custody**: ZeroSSL EAB kid/hmac stored 0600, shown masked
//! - **Input validation**: DNS hostname syntax check before anything runs
//! - **Shared-secret gate**: constant-time comparison against an optional secret file
//! - **Two transports**: CGI (one process per request) or a local HTTP server
//!
//! # Architecture
//!
//! ```text
//! WHM ──► CGI / HTTP ──► FormRequest ──► SharedSecret ──► Dispatcher ──► whmapi1
//!                                                            │          autossl_check
//!                                                            │          zerossl.sh
//!                                                            ├── is_valid_domain
//!                                                            ├── CredentialStore
//!                                                            └── mask_secret
//! ```

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod exec;
pub mod masking;
pub mod request;
pub mod vault;
pub mod web;

pub use auth::{authorize, SharedSecret};
pub use config::{Config, ToolPaths};
pub use dispatch::{Action, ActionRequest, Dispatcher, Outcome};
pub use domain::is_valid_domain;
pub use exec::{CommandExecutor, CommandResult, ExecError, SystemExecutor};
pub use masking::mask_secret;
pub use request::{FormRequest, RequestError};
pub use vault::{CredentialStore, EabCredentials, StoreError};
