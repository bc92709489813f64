//! Pankha iLO agent entry point: CLI dispatch, signal handlers, async runtime.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::{error, info, warn};

use pankha_agent_ilo::app::cli::{Args, HELP_TEXT};
use pankha_agent_ilo::app::logging::{filter_for_level, init_tracing, reload_log_level};
use pankha_agent_ilo::config::options::run_options_flow;
use pankha_agent_ilo::config::persistence::{load_config, resolve_config_path};
use pankha_agent_ilo::config::setup::run_setup_wizard;
use pankha_agent_ilo::config::AgentConfig;
use pankha_agent_ilo::ilo::Connector;
use pankha_agent_ilo::metrics::{test_connection, ThrottledFetcher};
use pankha_agent_ilo::poller::Poller;

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if err.kind() == clap::error::ErrorKind::DisplayHelp {
                print!("{}", HELP_TEXT);
                std::process::exit(0);
            }
            if err.kind() == clap::error::ErrorKind::DisplayVersion {
                println!("\x1b[32mpankha-agent-ilo {} ({})\x1b[0m", env!("CARGO_PKG_VERSION"), std::env::consts::ARCH);
                std::process::exit(0);
            }
            eprintln!("{}", err);
            print!("{}", HELP_TEXT);
            std::process::exit(1);
        }
    };

    if !args.has_command() {
        eprintln!("ERROR: No command specified. You must specify a command.");
        eprintln!();
        let _ = Args::command().print_help();
        eprintln!();
        eprintln!("Common commands:");
        eprintln!("  ./pankha-agent-ilo --setup     Configure the iLO connection");
        eprintln!("  ./pankha-agent-ilo --run       Start polling");
        eprintln!("  ./pankha-agent-ilo --once      Print all readings once");
        std::process::exit(1);
    }

    let config_path = resolve_config_path(args.config_file.as_deref())?;

    // Setup and options are interactive, keep the terminal quiet
    if args.setup {
        init_tracing("warn");
        return run_setup_wizard(&config_path).await;
    }
    if args.options {
        init_tracing("warn");
        return run_options_flow(&config_path).await;
    }

    // Priority: 1. --log-level flag, 2. LOG_LEVEL env, 3. config file, 4. info
    let config = if config_path.exists() {
        Some(load_config(&config_path).await?)
    } else {
        None
    };
    let requested = args
        .log_level
        .clone()
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .or_else(|| config.as_ref().map(|c| c.agent.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let filter = filter_for_level(&requested).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}'. Using INFO. Valid levels: TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL", requested);
        "info"
    });
    init_tracing(filter);

    let Some(config) = config else {
        eprintln!("ERROR: Configuration file not found: {:?}", config_path);
        eprintln!("\nPlease run the setup wizard first:");
        eprintln!("  ./pankha-agent-ilo --setup");
        std::process::exit(1);
    };

    if args.config {
        println!("\n{}", serde_json::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    config.validate().context("Configuration is incomplete, run --setup")?;
    let connector: Arc<dyn Connector> = Arc::new(config.ilo.build_connector()?);

    if args.test {
        let ok = test_connection(connector.as_ref(), &config.ilo.descriptor()).await;
        if ok {
            println!("✅ Connected to iLO at {}:{}", config.ilo.host, config.ilo.port);
            return Ok(());
        }
        eprintln!("❌ cannot connect to iLO at {}:{}", config.ilo.host, config.ilo.port);
        std::process::exit(1);
    }

    let poller = Arc::new(build_poller(&config, connector));

    if args.once {
        let summary = poller.poll_once().await;
        info!("{} updated, {} stale, {} failed", summary.updated, summary.stale, summary.failed);
        println!("{}", serde_json::to_string_pretty(&poller.readings().await)?);
        return Ok(());
    }

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!(
        "Pankha iLO Agent v{} starting on {} (iLO {}:{})",
        env!("CARGO_PKG_VERSION"),
        host,
        config.ilo.host,
        config.ilo.port
    );

    #[cfg(unix)]
    spawn_sighup_reload(config_path.clone());

    let poller_clone = Arc::clone(&poller);
    let shutdown_signal = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received (Ctrl+C)");
        poller_clone.stop().await;
    });

    tokio::select! {
        result = poller.run() => {
            if let Err(e) = result {
                error!("Poller error: {}", e);
            }
        }
        _ = shutdown_signal => {
            info!("Shutdown signal handled");
        }
    }

    info!("Agent shutdown complete");
    Ok(())
}

fn build_poller(config: &AgentConfig, connector: Arc<dyn Connector>) -> Poller {
    let fetcher = Arc::new(ThrottledFetcher::new(
        connector,
        config.ilo.descriptor(),
        config.ilo.min_refresh_interval(),
    ));
    Poller::new(fetcher, &config.agent.name, config.agent.scan_interval())
        .with_snapshot_file(config.agent.snapshot_file.as_ref().map(PathBuf::from))
}

/// Re-read the log level from the config file on SIGHUP.
#[cfg(unix)]
fn spawn_sighup_reload(config_path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        while sighup.recv().await.is_some() {
            info!("SIGHUP received, reloading log level configuration");
            match reload_from(&config_path).await {
                Ok(level) => info!("Log level reloaded: {}", level.to_uppercase()),
                Err(e) => error!("Failed to reload log level: {:#}", e),
            }
        }
    });
}

#[cfg(unix)]
async fn reload_from(config_path: &std::path::Path) -> Result<String> {
    let config = load_config(config_path).await?;
    reload_log_level(&config.agent.log_level)?;
    Ok(config.agent.log_level)
}
