//! Paystack Webhook Receiver
//!
//! Serves the webhook endpoint, or signs a payload file for local testing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use paystack_webhook::config::{secret_key_from_env, ServerConfig};
use paystack_webhook::webhook::{
    LoggingListener, SignatureVerifier, WebhookDispatcher, WebhookHandler,
    SIGNATURE_HEADER,
};

/// Paystack Webhook Receiver
#[derive(Parser, Debug)]
#[command(name = "paystack-webhook")]
#[command(version)]
#[command(about = "Verified Paystack webhook receiver")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the webhook receiver (secret from PAYSTACK_SECRET_KEY)
    Serve {
        /// Address to bind to, overrides PAYSTACK_WEBHOOK_BIND
        #[arg(short = 'H', long)]
        bind: Option<SocketAddr>,

        /// Webhook route, overrides PAYSTACK_WEBHOOK_PATH
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Print the signature header Paystack would send for a payload file
    Sign {
        /// File containing the exact request body
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match args.command {
        Command::Serve { bind, path } => serve(bind, path),
        Command::Sign { file } => sign(&file),
    }
}

fn serve(bind: Option<SocketAddr>, path: Option<String>) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env().context("loading configuration")?;
    if let Some(bind) = bind {
        config = config.with_bind_addr(bind);
    }
    if let Some(path) = path {
        config = config
            .with_webhook_path(path)
            .context("invalid --path")?;
    }

    let mut dispatcher = WebhookDispatcher::with_handler(WebhookHandler::with_key(
        config.secret_key.clone(),
    ));
    dispatcher.add_listener(Arc::new(LoggingListener));

    tracing::info!(
        "{} v{} starting",
        paystack_webhook::NAME,
        paystack_webhook::VERSION
    );

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(paystack_webhook::server::serve(&config, Arc::new(dispatcher)))?;
    Ok(())
}

fn sign(file: &Path) -> anyhow::Result<()> {
    let verifier = SignatureVerifier::with_key(secret_key_from_env()?);

    let body = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let signature = verifier
        .sign(&body)
        .context("computing signature")?;

    println!("{}: {}", SIGNATURE_HEADER, signature);
    Ok(())
}
