//! Options flow: revise host/port of an existing configuration without
//! going through the full setup again.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::config::persistence::{load_config, save_config};
use crate::config::setup::Prompter;
use crate::config::types::AgentConfig;

/// Apply a host/port revision. Returns whether anything changed.
pub fn apply_options(config: &mut AgentConfig, host: Option<String>, port: Option<u16>) -> bool {
    let mut changed = false;

    if let Some(host) = host.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
        if host != config.ilo.host {
            info!("iLO host changed: {} -> {}", config.ilo.host, host);
            config.ilo.host = host;
            changed = true;
        }
    }

    if let Some(port) = port.filter(|p| *p != 0) {
        if port != config.ilo.port {
            info!("iLO port changed: {} -> {}", config.ilo.port, port);
            config.ilo.port = port;
            changed = true;
        }
    }

    changed
}

/// Ask for the new values, current ones as defaults.
pub fn options_flow<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    config: &mut AgentConfig,
) -> Result<bool> {
    let host = prompter.ask("iLO Host", Some(config.ilo.host.as_str()))?;
    let port = prompter.ask_parsed("iLO Port", config.ilo.port)?;
    Ok(apply_options(config, Some(host), Some(port)))
}

pub async fn run_options_flow(config_file: &Path) -> Result<()> {
    if !config_file.exists() {
        return Err(anyhow!(
            "Configuration file not found: {:?}. Run the setup wizard first (--setup)",
            config_file
        ));
    }

    let mut config = load_config(config_file).await?;
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    prompter.say("\n⚙️  iLO connection options (Enter keeps the current value)\n")?;
    if options_flow(&mut prompter, &mut config)? {
        save_config(&config, config_file).await?;
        println!("\n✅ Options saved. Restart the agent to apply them.");
    } else {
        println!("\nNothing changed.");
    }
    Ok(())
}
