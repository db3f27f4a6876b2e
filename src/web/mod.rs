//! Web Transport Layer
//!
//! Two ways in, one pipeline:
//!
//! ```text
//! CGI (WHM, one process per request) ─┐
//!                                      ├─► FormRequest ─► SharedSecret gate ─► Dispatcher ─► HTML
//! HTTP (--serve, local operation)  ───┘
//! ```
//!
//! Neither transport keeps state between requests: the secret file and the
//! credential store are re-read every time.

pub mod cgi;
pub mod render;
pub mod server;

pub use cgi::{run_cgi, write_internal_error, CgiEnv};
pub use render::{html_escape, render_outcome, render_page, render_tab, Tab};
pub use server::{router, HubServer};

use tracing::{error, warn};

use crate::auth::SharedSecret;
use crate::dispatch::{ActionRequest, Dispatcher, Outcome};
use crate::exec::CommandExecutor;
use crate::request::FormRequest;

/// Authorize, dispatch (or pick a tab), and render a full page
pub async fn respond<E: CommandExecutor>(
    dispatcher: &Dispatcher<E>,
    secret: &SharedSecret,
    form: &FormRequest,
    presented: &str,
) -> String {
    if !secret.authorize(presented) {
        warn!("Rejected request with missing or wrong shared secret");
        return render_page(&render_outcome(&Outcome::Unauthorized));
    }

    let body = match ActionRequest::from_form(form) {
        Some(request) => render_outcome(&dispatcher.dispatch(&request).await),
        None => {
            let tab = Tab::from_param(form.get("tab"));
            let store = dispatcher.store().clone();
            // Tab rendering reads the credential files
            match tokio::task::spawn_blocking(move || render_tab(tab, &store)).await {
                Ok(html) => html,
                Err(e) => {
                    error!(error = %e, "Tab rendering task failed");
                    return render::render_internal_error();
                }
            }
        }
    };
    render_page(&body)
}
