//! daimon - heartbeat collector, assistant hooks, and the Daimon service
//!
//! Usage:
//!   daimon hook                  -> answer one assistant hook (JSON on stdin)
//!   daimon collect               -> batch NDJSON heartbeats from stdin to the service
//!   daimon serve                 -> run the Daimon HTTP service
//!   daimon classify <text>       -> classify text locally
//!   daimon health                -> check the remote service
//!   daimon dump-config           -> print the default config

use daimon_gateway::start_gateway;
use daimon_heartbeat::config::DaimonConfig;
use daimon_heartbeat::{hooks, record_lines, Aggregator, EmergencePolicy, RiskClassifier};
use daimon_sink::HttpSink;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "~/.daimon/daimon.toml";
const LOG_DIR: &str = "~/.daimon/logs";
const DEFAULT_FILTER: &str = "daimon=info,daimon_heartbeat=info,daimon_sink=info,daimon_gateway=info,tower_http=info";

#[derive(Parser)]
#[command(
    name = "daimon",
    about = "Heartbeat aggregation and emergence hooks for coding sessions",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one assistant hook invocation read from stdin
    Hook,
    /// Read newline-delimited JSON heartbeats from stdin and deliver them in batches
    Collect,
    /// Run the Daimon HTTP service
    Serve {
        /// Port (overrides gateway.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Bind address (overrides gateway.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Classify text with the local keyword classifier
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Check that the remote service is reachable
    Health,
    /// Print the default configuration as TOML
    DumpConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG));

    match cli.command {
        Commands::Hook => {
            // stdout belongs to the hook protocol
            let _guard = init_file_tracing(&expand_tilde(LOG_DIR));
            // Hooks always exit 0; failures only reach the log.
            if let Err(e) = run_hook(&config_path).await {
                error!("Hook failed: {:#}", e);
            }
        }
        Commands::Collect => {
            init_tracing();
            let config = DaimonConfig::load(&config_path)?;
            run_collect(&config).await?;
        }
        Commands::Serve { port, bind } => {
            init_tracing();
            let config = DaimonConfig::load(&config_path)?;
            let mut gateway = config.gateway.clone();
            if let Some(port) = port {
                gateway.port = port;
            }
            if let Some(bind) = bind {
                gateway.bind = bind;
            }
            start_gateway(&gateway, RiskClassifier::new(&config.classifier)).await?;
        }
        Commands::Classify { text } => {
            let config = DaimonConfig::load(&config_path)?;
            let classifier = RiskClassifier::new(&config.classifier);
            let classification = classifier.classify(&text.join(" "));
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Commands::Health => {
            init_tracing();
            let config = DaimonConfig::load(&config_path)?;
            let sink = http_sink(&config);
            match sink.health().await {
                Ok(health) => println!("{} {} ({} endpoints)", sink.base_url(), health.status, health.endpoints.len()),
                Err(e) => anyhow::bail!("{} is unreachable: {}", sink.base_url(), e),
            }
        }
        Commands::DumpConfig => {
            print!("{}", DaimonConfig::default().to_toml());
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Log to `<dir>/hook.log`. Without a writable log directory the hook runs unlogged.
fn init_file_tracing(dir: &Path) -> Option<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("hook.log")
        .build(dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Some(guard)
}

fn http_sink(config: &DaimonConfig) -> HttpSink {
    HttpSink::new(&config.remote.base_url)
        .with_timeouts(config.remote.quick_check_timeout(), config.remote.batch_timeout())
}

async fn run_hook(config_path: &Path) -> anyhow::Result<()> {
    let config = DaimonConfig::load(config_path)?;
    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;

    let input: hooks::HookInput = match serde_json::from_str(&raw) {
        Ok(input) => input,
        Err(e) => {
            warn!("Ignoring unparseable hook payload: {}", e);
            return Ok(());
        }
    };

    let policy = EmergencePolicy::new(
        Arc::new(RiskClassifier::new(&config.classifier)),
        Arc::new(http_sink(&config)),
        config.remote.quick_check_timeout(),
    );
    if let Some(output) = hooks::dispatch(&policy, &input).await {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}

async fn run_collect(config: &DaimonConfig) -> anyhow::Result<()> {
    let sink = Arc::new(http_sink(config));
    info!("Collecting heartbeats for {}", sink.base_url());
    let (aggregator, worker) = Aggregator::spawn(&config.aggregator, sink, config.remote.batch_timeout());

    let input = record_lines(BufReader::new(tokio::io::stdin()), &aggregator).await;

    aggregator.flush();
    let dropped = aggregator.dropped_batches();
    drop(aggregator);
    let stats = worker.await?;
    info!(
        "Collector done: {} recorded, {} skipped, {} delivered, {} failed, {} dropped",
        input.recorded, input.skipped, stats.delivered, stats.failed, dropped
    );
    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
