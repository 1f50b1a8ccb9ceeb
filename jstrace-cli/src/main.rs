//! jstrace CLI - コマンドラインインターフェース
//!
//! DevToolsエンドポイントに接続し、実行されたJavaScriptのソース行を出力します。

mod reporter;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jstrace_core::{FailurePolicy, Session, SessionConfig, TargetPattern};
use jstrace_target::protocol::{NavigateParams, NoParams};
use jstrace_target::{methods, CdpConnection, EventDispatcher, Gate};
use reporter::ConsoleReporter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// jstrace - line-level JavaScript execution tracer
#[derive(Parser)]
#[command(name = "jstrace")]
#[command(version = "0.1.0")]
#[command(about = "Prints every JavaScript source line as it executes", long_about = None)]
struct Cli {
    /// DevTools WebSocket endpoint (ws://host:port/devtools/page/<id>)
    endpoint: String,

    /// Page to load after attaching
    #[arg(short, long)]
    url: Option<String>,

    /// Only hook scripts whose URL matches this regex
    #[arg(short, long, default_value = ".*", value_parser = parse_pattern)]
    pattern: TargetPattern,

    /// What to do when installing breakpoints into a script fails
    #[arg(long, value_enum, default_value_t = OnFailure::Recover)]
    on_install_failure: OnFailure,

    /// Do not show installation progress
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnFailure {
    /// Resume the engine and leave the script untracked
    Recover,
    /// Stop tracing and exit
    Halt,
}

impl From<OnFailure> for FailurePolicy {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Recover => FailurePolicy::Recover,
            OnFailure::Halt => FailurePolicy::Halt,
        }
    }
}

fn parse_pattern(pattern: &str) -> Result<TargetPattern, regex::Error> {
    TargetPattern::new(pattern)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let gate = Gate::new();
    let (dispatcher, mut events) = EventDispatcher::new(gate.clone());
    let connection = CdpConnection::connect(&cli.endpoint, dispatcher).await?;

    let config = SessionConfig {
        pattern: cli.pattern,
        on_install_failure: cli.on_install_failure.into(),
    };
    let mut session = Session::new(connection, gate, config, ConsoleReporter::new(cli.quiet));
    session.attach().await?;

    if let Some(url) = cli.url {
        load_target(&session, url).await?;
    }

    let interrupted = tokio::select! {
        result = session.run(&mut events) => {
            result.context("Tracing stopped")?;
            false
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            true
        }
    };

    if interrupted {
        info!("Interrupted, detaching");
        if let Err(e) = session.detach().await {
            warn!("Failed to detach: {}", e);
        }
    }

    Ok(())
}

/// ログ出力を初期化する（標準出力はトレース行専用）
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// ページを読み込ませ、ライフサイクルイベントを購読する
async fn load_target(
    session: &Session<CdpConnection, ConsoleReporter>,
    url: String,
) -> Result<()> {
    let channel = session.channel();
    channel.send(methods::PAGE_ENABLE, &NoParams {}).await?;
    channel.send(methods::INSPECTOR_ENABLE, &NoParams {}).await?;

    info!("Loading {}", url);
    channel
        .send(methods::PAGE_NAVIGATE, &NavigateParams { url })
        .await?;
    Ok(())
}
