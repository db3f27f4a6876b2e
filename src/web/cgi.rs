//! CGI adapter
//!
//! WHM runs the binary once per request with the request line in the
//! environment and the body on stdin. The response is written to stdout as
//! CGI headers followed by the HTML page.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::error;
use zeroize::Zeroizing;

use super::{render::render_internal_error, respond};
use crate::auth::SharedSecret;
use crate::config::{Config, SHARED_SECRET_ENV};
use crate::dispatch::Dispatcher;
use crate::exec::CommandExecutor;
use crate::request::{read_body, FormRequest, RequestError};

const HTML_CONTENT_TYPE: &str = "Content-Type: text/html; charset=utf-8\r\n";
const INTERNAL_ERROR_STATUS: &str = "Status: 500 Internal Server Error\r\n";

/// The CGI variables this program looks at
#[derive(Default, Clone)]
pub struct CgiEnv {
    pub request_method: String,
    pub query_string: String,
    pub content_type: String,
    pub content_length: String,
    /// Secret exported by the wrapper; empty when unset
    pub presented_secret: Zeroizing<String>,
}

impl CgiEnv {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            request_method: var("REQUEST_METHOD"),
            query_string: var("QUERY_STRING"),
            content_type: var("CONTENT_TYPE"),
            content_length: var("CONTENT_LENGTH"),
            presented_secret: Zeroizing::new(var(SHARED_SECRET_ENV)),
        }
    }
}

impl std::fmt::Debug for CgiEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CgiEnv")
            .field("request_method", &self.request_method)
            .field("query_string", &self.query_string)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("presented_secret", &!self.presented_secret.is_empty())
            .finish()
    }
}

async fn parse_request<R>(
    env: &CgiEnv,
    stdin: &mut R,
    limit: usize,
) -> Result<FormRequest, RequestError>
where
    R: AsyncRead + Unpin,
{
    let body = if env.request_method == "POST" {
        read_body(stdin, &env.content_length, limit).await?
    } else {
        Vec::new()
    };
    FormRequest::from_parts(&env.request_method, &env.query_string, &env.content_type, &body)
}

/// Serve exactly one CGI request
pub async fn run_cgi<E, R, W>(
    config: &Config,
    executor: E,
    env: &CgiEnv,
    stdin: &mut R,
    stdout: &mut W,
) -> std::io::Result<()>
where
    E: CommandExecutor,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let form = match parse_request(env, stdin, config.max_body_bytes).await {
        Ok(form) => form,
        Err(e) => {
            error!(error = %e, method = %env.request_method, "Failed to parse CGI request");
            return write_internal_error(stdout).await;
        }
    };

    let dispatcher = Dispatcher::new(config, executor);
    let secret = SharedSecret::load(&config.secret_file);
    let page = respond(&dispatcher, &secret, &form, &env.presented_secret).await;
    write_response(stdout, None, &page).await
}

/// Emit a 500 response with the generic error page
pub async fn write_internal_error<W>(stdout: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_response(stdout, Some(INTERNAL_ERROR_STATUS), &render_internal_error()).await
}

async fn write_response<W>(stdout: &mut W, status: Option<&str>, page: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut response = String::with_capacity(page.len() + 96);
    if let Some(status) = status {
        response.push_str(status);
    }
    response.push_str(HTML_CONTENT_TYPE);
    response.push_str("\r\n");
    response.push_str(page);

    stdout.write_all(response.as_bytes()).await?;
    stdout.flush().await
}
