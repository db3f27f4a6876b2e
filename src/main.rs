//! SSL Hub - Entry Point
//!
//! Modes:
//! - Default: serve one CGI request (stdin/stdout)
//! - --serve / -s: standalone HTTP server

use anyhow::Context;
use ssl_hub::web::{run_cgi, write_internal_error, CgiEnv, HubServer};
use ssl_hub::{Config, SystemExecutor};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let serve_mode = args.iter().any(|a| a == "--serve" || a == "-s");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("SSL Hub v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: ssl-hub [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --serve, -s   Run as a standalone HTTP server");
        println!("  --help, -h    Show this help");
        println!();
        println!("Default: handle a single CGI request");
        println!();
        println!("Environment variables:");
        println!("  SSL_HUB_SHARED_SECRET          Secret presented to the gate (CGI)");
        println!("  SSL_HUB_STATE_DIR              Credential directory (default: /root/.ssl-hub)");
        println!("  SSL_HUB_SECRET_FILE            Configured secret (default: <state dir>/secret)");
        println!("  SSL_HUB_ISSUE_SCRIPT           ZeroSSL issuance script");
        println!("  SSL_HUB_INLINE_CREDENTIALS     Pass kid/hmac to the script as arguments");
        println!("  SSL_HUB_COMMAND_TIMEOUT_SECS   Kill external tools after N seconds");
        println!("  SSL_HUB_BIND                   --serve address (default: 127.0.0.1:8787)");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if serve_mode {
        // Interactive mode - log to stdout with colors
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // CGI mode - stdout is the HTTP response, log to stderr as JSON
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) if !serve_mode => {
            // WHM still expects a response
            error!(error = %format!("{e:#}"), "Invalid SSL Hub configuration");
            write_internal_error(&mut tokio::io::stdout()).await?;
            return Ok(());
        }
        Err(e) => return Err(e.context("Invalid SSL Hub configuration")),
    };
    let executor = SystemExecutor::with_timeout(config.command_timeout);

    if serve_mode {
        info!("SSL Hub HTTP server v{}", env!("CARGO_PKG_VERSION"));
        HubServer::new(config, executor).run().await?;
    } else {
        let env = CgiEnv::from_process();
        let mut stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        run_cgi(&config, executor, &env, &mut stdin, &mut stdout)
            .await
            .context("Failed to write CGI response")?;
    }

    Ok(())
}
