//! Action Dispatcher
//!
//! Maps one of six named actions to at most one external call:
//!
//! | Action | Precondition | Call |
//! |---|---|---|
//! | `autossl_enable_cpanel` | - | `whmapi1 set_autossl_provider provider=cPanel` |
//! | `autossl_enable_le` | `tos=on` | `whmapi1 set_autossl_provider provider=LetsEncrypt x_terms_of_service_accepted=<url>` |
//! | `autossl_run_all` | - | `autossl_check --all` |
//! | `zerossl_save_eab` | kid + hmac non-empty | credential store write |
//! | `zerossl_issue` | valid domain, EAB saved | `zerossl.sh <domain>` |
//! | `zerossl_run_all` | EAB saved | `zerossl.sh --run-all` |
//!
//! Authorization happens before a request reaches the dispatcher. Nothing
//! is retried: a failed call is reported once with its transcript.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::{Config, ToolPaths};
use crate::domain::is_valid_domain;
use crate::exec::CommandExecutor;
use crate::request::FormRequest;
use crate::vault::{CredentialStore, EabCredentials};

pub const MSG_TOS_REQUIRED: &str = "Please accept the Let’s Encrypt Terms of Service.";
pub const MSG_EAB_MISSING_FIELDS: &str =
    "Please provide both the ZeroSSL External Account Binding KID and HMAC.";
pub const MSG_EAB_SAVED: &str =
    "Saved ZeroSSL External Account Binding credentials securely for future runs.";
pub const MSG_INVALID_DOMAIN: &str = "Invalid domain.";
pub const MSG_SAVE_BEFORE_ISSUE: &str =
    "Please save your ZeroSSL EAB credentials before issuing certificates.";
pub const MSG_SAVE_BEFORE_RUN: &str =
    "Please save your ZeroSSL EAB credentials before running AutoSSL.";

/// Flag the check and issuance tools take to cover every account
const CHECK_ALL_FLAG: &str = "--all";
const ISSUE_ALL_FLAG: &str = "--run-all";

/// The closed set of operator actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Switch AutoSSL to the bundled default provider
    EnableDefaultProvider,
    /// Switch AutoSSL to Let's Encrypt (ToS acknowledgement required)
    EnableAcmeProvider,
    /// Run the active AutoSSL provider for every account
    RunAllDefault,
    /// Store the ZeroSSL EAB kid/hmac pair
    SaveEabCredentials,
    /// Issue and install a ZeroSSL certificate for one domain
    IssueCertificate,
    /// Run ZeroSSL issuance for every account
    RunAllAcme,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::EnableDefaultProvider,
        Action::EnableAcmeProvider,
        Action::RunAllDefault,
        Action::SaveEabCredentials,
        Action::IssueCertificate,
        Action::RunAllAcme,
    ];

    /// Form value submitted by the UI
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::EnableDefaultProvider => "autossl_enable_cpanel",
            Action::EnableAcmeProvider => "autossl_enable_le",
            Action::RunAllDefault => "autossl_run_all",
            Action::SaveEabCredentials => "zerossl_save_eab",
            Action::IssueCertificate => "zerossl_issue",
            Action::RunAllAcme => "zerossl_run_all",
        }
    }

    /// Descriptive alias, also accepted on input
    pub fn alias(&self) -> &'static str {
        match self {
            Action::EnableDefaultProvider => "enable-default-provider",
            Action::EnableAcmeProvider => "enable-acme-provider",
            Action::RunAllDefault => "run-all-default",
            Action::SaveEabCredentials => "save-eab-credentials",
            Action::IssueCertificate => "issue-certificate",
            Action::RunAllAcme => "run-all-acme",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised action name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s || a.alias() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// One action invocation with its raw parameters
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub action: Action,
    pub params: HashMap<String, String>,
}

impl ActionRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Build from a parsed form. `None` when no known action was submitted.
    pub fn from_form(form: &FormRequest) -> Option<Self> {
        let name = form.get("action");
        if name.is_empty() {
            return None;
        }
        match name.parse::<Action>() {
            Ok(action) => Some(Self {
                action,
                params: form.to_map(),
            }),
            Err(e) => {
                debug!(error = %e, "Ignoring unknown action");
                None
            }
        }
    }

    /// Parameter value, `""` if absent
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }

    /// Parameter value with surrounding whitespace removed
    pub fn trimmed(&self, name: &str) -> &str {
        self.param(name).trim()
    }
}

/// What the operator gets to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An external command ran; `text` is its combined output
    Output { text: String, succeeded: bool },
    /// Input was rejected before anything ran
    Notice(String),
    /// Completed without an external command
    Confirmed(String),
    /// Storage or process-level failure
    Failure(String),
    /// The authorization gate refused the request
    Unauthorized,
}

impl Outcome {
    fn notice(msg: &str) -> Self {
        Outcome::Notice(msg.to_string())
    }

    /// Whether the action did what was asked
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Output { succeeded, .. } => *succeeded,
            Outcome::Confirmed(_) => true,
            Outcome::Notice(_) | Outcome::Failure(_) | Outcome::Unauthorized => false,
        }
    }
}

/// Stateless per-request dispatcher
pub struct Dispatcher<E> {
    tools: ToolPaths,
    inline_credentials: bool,
    store: CredentialStore,
    executor: E,
}

impl<E: CommandExecutor> Dispatcher<E> {
    pub fn new(config: &Config, executor: E) -> Self {
        Self {
            tools: config.tools.clone(),
            inline_credentials: config.inline_credentials,
            store: CredentialStore::new(&config.state_dir),
            executor,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run one action to completion
    pub async fn dispatch(&self, request: &ActionRequest) -> Outcome {
        let action = request.action;
        info!(action = %action, "Dispatching action");

        let outcome = match action {
            Action::EnableDefaultProvider => {
                let args = vec![
                    "set_autossl_provider".to_string(),
                    format!("provider={}", self.tools.default_provider),
                ];
                self.run(&self.tools.whmapi, &args).await
            }
            Action::EnableAcmeProvider => {
                if request.param("tos") != "on" {
                    debug!(action = %action, "Terms of service not acknowledged");
                    return Outcome::notice(MSG_TOS_REQUIRED);
                }
                let args = vec![
                    "set_autossl_provider".to_string(),
                    format!("provider={}", self.tools.acme_provider),
                    format!("x_terms_of_service_accepted={}", self.tools.tos_url),
                ];
                self.run(&self.tools.whmapi, &args).await
            }
            Action::RunAllDefault => {
                let args = vec![CHECK_ALL_FLAG.to_string()];
                self.run(&self.tools.autossl_check, &args).await
            }
            Action::SaveEabCredentials => self.save_credentials(request).await,
            Action::IssueCertificate => self.issue(request).await,
            Action::RunAllAcme => match self.require_credentials(MSG_SAVE_BEFORE_RUN).await {
                Ok(_) => {
                    let args = vec![ISSUE_ALL_FLAG.to_string()];
                    self.run(&self.tools.issue_script, &args).await
                }
                Err(outcome) => outcome,
            },
        };

        if !outcome.is_success() {
            debug!(action = %action, "Action did not complete");
        }
        outcome
    }

    async fn save_credentials(&self, request: &ActionRequest) -> Outcome {
        let kid = request.trimmed("eab_kid");
        let hmac = request.trimmed("eab_hmac");
        if kid.is_empty() || hmac.is_empty() {
            return Outcome::notice(MSG_EAB_MISSING_FIELDS);
        }

        match self.store.save_blocking(kid, hmac).await {
            Ok(()) => Outcome::Confirmed(MSG_EAB_SAVED.to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to save EAB credentials");
                Outcome::Failure(e.to_string())
            }
        }
    }

    async fn issue(&self, request: &ActionRequest) -> Outcome {
        let domain = request.trimmed("domain");
        if !is_valid_domain(domain) {
            debug!("Rejected invalid domain");
            return Outcome::notice(MSG_INVALID_DOMAIN);
        }

        let creds = match self.require_credentials(MSG_SAVE_BEFORE_ISSUE).await {
            Ok(creds) => creds,
            Err(outcome) => return outcome,
        };

        let mut args = Zeroizing::new(vec![domain.to_string()]);
        if self.inline_credentials {
            args.push(creds.kid.clone());
            args.push(creds.hmac.clone());
        }

        info!(domain = %domain, "Issuing certificate");
        self.run(&self.tools.issue_script, args.as_slice()).await
    }

    /// Load a complete EAB pair, or the outcome to return instead
    async fn require_credentials(&self, missing_msg: &str) -> Result<EabCredentials, Outcome> {
        match self.store.load_configured_blocking().await {
            Ok(Some(creds)) => Ok(creds),
            Ok(None) => Err(Outcome::notice(missing_msg)),
            Err(e) => {
                warn!(error = %e, "Failed to read EAB credentials");
                Err(Outcome::Failure(e.to_string()))
            }
        }
    }

    async fn run(&self, program: &Path, args: &[String]) -> Outcome {
        match self.executor.execute(program, args).await {
            Ok(result) => {
                if !result.succeeded {
                    warn!(program = %program.display(), "External command failed");
                }
                Outcome::Output {
                    text: result.output,
                    succeeded: result.succeeded,
                }
            }
            Err(e) => {
                warn!(error = %e, "External command could not run");
                Outcome::Failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
            assert_eq!(action.alias().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = "rm_everything".parse::<Action>().unwrap_err();
        assert_eq!(err, UnknownAction("rm_everything".to_string()));
        assert!("".parse::<Action>().is_err());
        assert!("ZEROSSL_ISSUE".parse::<Action>().is_err());
    }

    #[test]
    fn test_request_params() {
        let request = ActionRequest::new(Action::IssueCertificate)
            .with_param("domain", "  example.com \n");
        assert_eq!(request.trimmed("domain"), "example.com");
        assert_eq!(request.param("missing"), "");
    }

    #[test]
    fn test_outcome_success() {
        let ran = |succeeded| Outcome::Output {
            text: String::new(),
            succeeded,
        };
        assert!(ran(true).is_success());
        assert!(!ran(false).is_success());
        assert!(Outcome::Confirmed(MSG_EAB_SAVED.to_string()).is_success());
        assert!(!Outcome::notice(MSG_INVALID_DOMAIN).is_success());
        assert!(!Outcome::Unauthorized.is_success());
    }
}
