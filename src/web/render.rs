//! HTML rendering for action results and the two tab pages
//!
//! Every piece of operator- or tool-supplied text goes through [`html_escape`].

use crate::dispatch::{Action, Outcome};
use crate::vault::CredentialStore;

const STYLE: &str = concat!(
    "<style>body{font-family:system-ui,Segoe UI,Arial;margin:24px}",
    "nav a{margin-right:12px}",
    ".provider-grid{display:flex;flex-wrap:wrap;gap:16px;margin:16px 0}",
    ".provider-card{flex:1 1 260px;border:1px solid #d0d7de;border-radius:8px;padding:16px;box-shadow:0 1px 2px rgba(15,23,42,.08)}",
    ".provider-card h4{margin:0 0 8px;font-size:18px}",
    ".provider-card p{margin:0 0 12px;color:#334155;font-size:14px}",
    ".provider-actions form{margin:0 0 8px}",
    ".provider-actions button,.provider-actions a.button{display:inline-block;background:#1d4ed8;color:#fff;border:none;border-radius:4px;padding:6px 12px;font-size:14px;text-decoration:none;cursor:pointer}",
    ".provider-actions a.button{background:#0f172a}",
    ".provider-actions .secondary{background:#475569}",
    "</style>",
);

const HEADER: &str = concat!(
    "<h2>SSL Hub</h2><nav>",
    "<a href=\"?tab=autossl\">AutoSSL Providers</a>",
    "<a href=\"?tab=zerossl\">ZeroSSL AutoSSL</a>",
    "</nav><hr/>",
);

/// Which page to show when no action was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Providers,
    ZeroSsl,
}

impl Tab {
    /// Anything other than `zerossl` falls back to the provider overview
    pub fn from_param(tab: &str) -> Self {
        match tab {
            "zerossl" => Tab::ZeroSsl,
            _ => Tab::Providers,
        }
    }
}

/// Escape text for safe inclusion in HTML content or attribute values
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a body fragment in the common page chrome
pub fn render_page(body: &str) -> String {
    let mut page = String::with_capacity(STYLE.len() + HEADER.len() + body.len());
    page.push_str(STYLE);
    page.push_str(HEADER);
    page.push_str(body);
    page
}

/// Fragment describing the result of a dispatched action
pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Output { text, succeeded: true } => format!("<pre>{}</pre>", html_escape(text)),
        Outcome::Output { text, succeeded: false } | Outcome::Failure(text) => {
            format!("<pre>ERROR:\n{}</pre>", html_escape(text))
        }
        Outcome::Notice(msg) | Outcome::Confirmed(msg) => format!("<p>{}</p>", html_escape(msg)),
        Outcome::Unauthorized => "<p>Unauthorized.</p>".to_string(),
    }
}

/// Generic body for internal failures; carries no request detail
pub fn render_internal_error() -> String {
    render_page("<p>Internal error.</p>")
}

/// Fragment for a tab page, reflecting the current EAB status
pub fn render_tab(tab: Tab, store: &CredentialStore) -> String {
    match tab {
        Tab::Providers => render_providers(store),
        Tab::ZeroSsl => render_zerossl(store),
    }
}

fn hidden_action(action: Action) -> String {
    format!(
        "<input type=\"hidden\" name=\"action\" value=\"{}\"/>",
        action.as_str()
    )
}

fn render_zerossl(store: &CredentialStore) -> String {
    let mut html = String::from("<h3>ZeroSSL AutoSSL</h3>");

    match store.load() {
        Err(e) => html.push_str(&format!(
            "<p style=\"color:#c00\">Unable to read stored credentials: {}</p>",
            html_escape(&e.to_string())
        )),
        Ok(Some(creds)) if creds.is_configured() => html.push_str(&format!(
            "<p>Stored ZeroSSL EAB KID: {} &mdash; HMAC: {}.</p>",
            html_escape(&creds.masked_kid()),
            html_escape(&creds.masked_hmac())
        )),
        Ok(_) => html.push_str("<p>No ZeroSSL External Account Binding credentials saved yet.</p>"),
    }

    html.push_str("<form method=\"post\"><div>");
    html.push_str("<label>EAB KID:</label><br/><input name=\"eab_kid\" autocomplete=\"off\" required />");
    html.push_str("</div><div style=\"margin-top:8px\">");
    html.push_str("<label>EAB HMAC:</label><br/><input name=\"eab_hmac\" autocomplete=\"off\" required />");
    html.push_str("</div>");
    html.push_str(&hidden_action(Action::SaveEabCredentials));
    html.push_str("<div style=\"margin-top:12px\"><button>Save ZeroSSL credentials</button></div></form>");

    html.push_str("<form method=\"post\" style=\"margin-top:16px\">");
    html.push_str(&hidden_action(Action::RunAllAcme));
    html.push_str("<button>Run ZeroSSL AutoSSL for all cPanel accounts</button></form>");

    html.push_str("<form method=\"post\" style=\"margin-top:16px\"><div>");
    html.push_str("<label>Primary domain (wildcard included):</label><br/>");
    html.push_str("<input name=\"domain\" placeholder=\"example.com\" required />");
    html.push_str("</div>");
    html.push_str(&hidden_action(Action::IssueCertificate));
    html.push_str("<div style=\"margin-top:12px\"><button>Issue &amp; Install for this domain</button></div>");
    html.push_str("<p style=\"font-size:12px;color:#555\">The script will automatically include *.domain for wildcard coverage.</p>");
    html.push_str("</form>");

    html
}

fn render_providers(store: &CredentialStore) -> String {
    let mut html = String::from("<h3>AutoSSL Providers</h3><div class=\"provider-grid\">");

    html.push_str("<div class=\"provider-card\"><h4>cPanel (powered by Sectigo)</h4>");
    html.push_str("<p>The default AutoSSL provider included with WHM.</p>");
    html.push_str("<div class=\"provider-actions\"><form method=\"post\">");
    html.push_str(&hidden_action(Action::EnableDefaultProvider));
    html.push_str("<button class=\"secondary\">Enable cPanel provider</button></form></div></div>");

    html.push_str("<div class=\"provider-card\"><h4>Let’s Encrypt</h4>");
    html.push_str("<p>Issue certificates from Let’s Encrypt via the official AutoSSL provider.</p>");
    html.push_str("<div class=\"provider-actions\"><form method=\"post\">");
    html.push_str("<label style=\"display:block;margin-bottom:6px\"><input type=\"checkbox\" name=\"tos\"/> I agree to the Let’s Encrypt Terms of Service</label>");
    html.push_str(&hidden_action(Action::EnableAcmeProvider));
    html.push_str("<button>Enable Let’s Encrypt provider</button></form></div></div>");

    html.push_str("<div class=\"provider-card\"><h4>ZeroSSL (via SSL Hub)</h4>");
    let ready = match store.load() {
        Err(e) => {
            html.push_str(&format!(
                "<p style=\"color:#b91c1c\">Unable to read stored ZeroSSL credentials: {}.</p>",
                html_escape(&e.to_string())
            ));
            false
        }
        Ok(Some(creds)) if creds.is_configured() => {
            html.push_str(&format!(
                "<p>Ready to issue certificates with ZeroSSL. Stored EAB KID {} and HMAC {}.</p>",
                html_escape(&creds.masked_kid()),
                html_escape(&creds.masked_hmac())
            ));
            true
        }
        Ok(_) => {
            html.push_str("<p>ZeroSSL External Account Binding credentials are not saved yet. Configure them before enabling ZeroSSL.</p>");
            false
        }
    };
    html.push_str("<div class=\"provider-actions\">");
    if ready {
        html.push_str("<form method=\"post\">");
        html.push_str(&hidden_action(Action::RunAllAcme));
        html.push_str("<button>Run ZeroSSL AutoSSL now</button></form>");
    }
    html.push_str("<a class=\"button\" href=\"?tab=zerossl\">Manage ZeroSSL provider</a></div></div>");
    html.push_str("</div>");

    html.push_str("<form method=\"post\">");
    html.push_str(&hidden_action(Action::RunAllDefault));
    html.push_str("<button>Run active AutoSSL provider for all users</button></form>");

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_render_outcome_variants() {
        let ok = Outcome::Output {
            text: "<ok>".into(),
            succeeded: true,
        };
        assert_eq!(render_outcome(&ok), "<pre>&lt;ok&gt;</pre>");

        let failed = Outcome::Output {
            text: "boom & bust".into(),
            succeeded: false,
        };
        assert_eq!(render_outcome(&failed), "<pre>ERROR:\nboom &amp; bust</pre>");

        let failure = Outcome::Failure("permission denied".into());
        assert_eq!(render_outcome(&failure), "<pre>ERROR:\npermission denied</pre>");

        assert_eq!(
            render_outcome(&Outcome::Notice("Invalid domain.".into())),
            "<p>Invalid domain.</p>"
        );
        assert_eq!(render_outcome(&Outcome::Unauthorized), "<p>Unauthorized.</p>");
    }

    #[test]
    fn test_tab_param() {
        assert_eq!(Tab::from_param("zerossl"), Tab::ZeroSsl);
        assert_eq!(Tab::from_param("autossl"), Tab::Providers);
        assert_eq!(Tab::from_param(""), Tab::Providers);
    }

    #[test]
    fn test_tabs_show_masked_credentials() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.save("kid-secret-ABCD", "hmac-secret-WXYZ").unwrap();

        for tab in [Tab::Providers, Tab::ZeroSsl] {
            let html = render_tab(tab, &store);
            assert!(html.contains("ABCD"));
            assert!(html.contains("WXYZ"));
            assert!(!html.contains("kid-secret"));
            assert!(!html.contains("hmac-secret"));
        }
    }

    #[test]
    fn test_providers_tab_without_credentials() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("missing"));

        let html = render_tab(Tab::Providers, &store);
        assert!(html.contains("not saved yet"));
        assert!(!html.contains("Run ZeroSSL AutoSSL now"));
        assert!(html.contains("value=\"autossl_enable_le\""));
    }

    #[test]
    fn test_page_chrome() {
        let page = render_page("<p>body</p>");
        assert!(page.starts_with("<style>"));
        assert!(page.contains("<h2>SSL Hub</h2>"));
        assert!(page.ends_with("<p>body</p>"));
    }
}
