#![forbid(unsafe_code)]

//! `agent-relay`: streams a conversation with an upstream coding agent.
//!
//! Bootstraps configuration, opens one session against the configured
//! upstream endpoint, submits the prompt from the command line, and then
//! queues every further stdin line. Ctrl-C cancels the in-flight request.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use agent_relay::config::GlobalConfig;
use agent_relay::driver::http::HttpBackend;
use agent_relay::mode::ExecutionMode;
use agent_relay::models::message::Role;
use agent_relay::session::ledger::BroadcastSink;
use agent_relay::session::{EnqueueOutcome, Session, SessionOptions, SessionUpdate};
use agent_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "agent-relay",
    about = "Stream a conversation with a coding agent",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured execution mode.
    #[arg(long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Override the configured workspace root.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Override the configured model.
    #[arg(long)]
    model: Option<String>,

    /// Initial prompt; further prompts are read from stdin.
    prompt: Vec<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(ws) = &args.workspace {
        config.set_workspace_root(ws)?;
    }
    if let Some(mode) = args.mode {
        config.default_mode = mode;
    }
    if let Some(model) = args.model {
        config.upstream.model = model;
    }
    info!(url = config.upstream.url.as_str(), mode = %config.default_mode, "configuration loaded");

    // ── Build session ───────────────────────────────────
    let backend = Arc::new(HttpBackend::from_config(&config)?);
    let sink = Arc::new(BroadcastSink::default());
    let mut file_changes = sink.subscribe();
    let session = Session::builder(SessionOptions::from_config(&config), backend)
        .file_sink(sink)
        .build()?;
    let mut updates = session.subscribe();

    let watcher = tokio::spawn(async move {
        loop {
            match file_changes.recv().await {
                Ok(change) => info!(
                    path = %change.path.display(),
                    change = ?change.change_type,
                    "file changed"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "file change notifications lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let printer_session = session.clone();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(SessionUpdate::RequestFinished { outcome, .. }) => {
                    print_last_reply(&printer_session);
                    info!(?outcome, "request finished");
                }
                Ok(SessionUpdate::QueueDiscarded { text }) => {
                    warn!(discarded = text.as_str(), "queued message replaced by a newer one");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "session updates lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // ── Submit prompts ──────────────────────────────────
    let prompt = args.prompt.join(" ");
    if !prompt.trim().is_empty() {
        session.start(prompt)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match session.enqueue(line) {
                    Ok(EnqueueOutcome::Queued { .. }) => {
                        info!("message queued until the current request finishes");
                    }
                    Ok(EnqueueOutcome::Dispatched(_)) => {}
                    Err(err) => error!(%err, "failed to submit message"),
                },
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "stdin read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                if !session.cancel() {
                    info!("nothing to cancel, exiting");
                    break;
                }
            }
        }
    }

    // ── Drain ───────────────────────────────────────────
    tokio::select! {
        () = session.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
        }
    }
    drop(session);
    printer.abort();
    watcher.abort();
    info!("agent-relay shut down");

    Ok(())
}

fn print_last_reply(session: &Session) {
    let transcript = session.transcript();
    // A queued message may already have opened the next turn pair.
    let skip = if transcript.last().is_some_and(|m| m.is_streaming) {
        2
    } else {
        0
    };
    let replies = transcript
        .iter()
        .rev()
        .skip(skip)
        .take_while(|m| m.role != Role::User)
        .collect::<Vec<_>>();
    for message in replies.into_iter().rev() {
        println!("{}\n", message.content);
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
