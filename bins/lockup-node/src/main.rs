//! Lockup engine daemon.
//!
//! Loads the engine configuration, starts an engine over the in-memory
//! settlement ledger and the wall clock, and republishes every position's
//! state on each clock tick until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use lockup_engine::clock::SystemClock;
use lockup_engine::settlement::LedgerSettlement;
use lockup_engine::{EngineConfig, LockupEngine, fanout};

#[derive(Parser, Debug)]
#[command(
    name = "lockup-node",
    version,
    about = "Liquidity lockup engine with periodic reward notifications"
)]
struct Args {
    /// Configuration file (TOML). Defaults to <config dir>/lockup/lockup.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the fan-out tick interval in seconds
    #[arg(long)]
    tick_interval: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Validate the configuration, print it as JSON and exit
    #[arg(long)]
    check: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl Args {
    fn config_path(&self) -> Option<PathBuf> {
        if self.config.is_some() {
            return self.config.clone();
        }
        let default = dirs::config_dir()?.join("lockup").join("lockup.toml");
        default.exists().then_some(default)
    }

    fn load_config(&self) -> Result<EngineConfig> {
        let path = self.config_path();
        let mut config = EngineConfig::load(path.as_deref()).with_context(|| match &path {
            Some(p) => format!("loading {}", p.display()),
            None => "loading configuration from the environment".to_string(),
        })?;
        if let Some(secs) = self.tick_interval {
            config.tick_interval_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_format)?;

    let config = args.load_config()?;
    if args.check {
        config.validate().context("invalid configuration")?;
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("lockup-node v{}", env!("CARGO_PKG_VERSION"));
    let settlement = Arc::new(LedgerSettlement::new());
    let clock = Arc::new(SystemClock::new());
    let (engine, _operator) =
        LockupEngine::start(&config, settlement, clock).context("starting lockup engine")?;
    info!(tick_interval_secs = engine.tick_interval_secs(), "fan-out scheduled");

    let fanout_task = fanout::spawn(Arc::clone(&engine));

    tokio::select! {
        joined = fanout_task => {
            if let Err(e) = joined {
                warn!(error = %e, "fan-out task ended abnormally");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("installing Ctrl+C handler")?;
            info!("received Ctrl+C, shutting down");
        }
    }

    let pool = engine.pool_ledger();
    info!(
        live_positions = engine.live_positions(),
        pool_available = pool.available,
        pool_disbursed = pool.disbursed,
        "lockup-node shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG`, when set, overrides `level`.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("bad log level {level:?}"))?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(true).try_init(),
    };
    installed.map_err(|e| anyhow!("installing log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_overrides() {
        let args = Args::parse_from([
            "lockup-node",
            "--tick-interval",
            "60",
            "--log-format",
            "json",
            "--check",
        ]);
        assert_eq!(args.tick_interval, Some(60));
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.check);
    }

    #[test]
    fn unknown_log_format_rejected() {
        assert!(Args::try_parse_from(["lockup-node", "--log-format", "xml"]).is_err());
        assert_eq!(Args::parse_from(["lockup-node"]).log_format, LogFormat::Text);
    }

    #[test]
    fn explicit_config_path_wins() {
        let args = Args::parse_from(["lockup-node", "--config", "/etc/lockup.toml"]);
        assert_eq!(args.config_path(), Some(PathBuf::from("/etc/lockup.toml")));
    }
}
