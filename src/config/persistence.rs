//! Config file location, load and save.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::types::AgentConfig;

/// Explicit path, else `config.json` next to the executable.
pub fn resolve_config_path(path: Option<&str>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(PathBuf::from(p));
    }
    let exe_dir = std::env::current_exe()?
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine executable directory"))?
        .to_path_buf();
    Ok(exe_dir.join("config.json"))
}

pub async fn load_config(config_path: &Path) -> Result<AgentConfig> {
    if !config_path.exists() {
        info!("Config file not found. Please run the setup wizard ('--setup') to generate one.");
        return Ok(AgentConfig::default());
    }

    let content = tokio::fs::read_to_string(config_path)
        .await
        .with_context(|| format!("Failed to read {:?}", config_path))?;
    let config: AgentConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid configuration in {:?}", config_path))?;

    if let Err(e) = config.validate() {
        warn!("⚠️ {} in {:?}. Agent will fail to connect.", e, config_path);
        warn!("Please run the setup wizard ('--setup') or edit the config file manually.");
    }

    info!("Loaded configuration from: {:?}", config_path);
    Ok(config)
}

pub async fn save_config(config: &AgentConfig, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(config)?;

    // credentials live in this file, it is never readable by others
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(config_path)
        .await
        .with_context(|| format!("Failed to open {:?}", config_path))?;

    // mode() only applies on creation, tighten files saved by older versions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
    }

    file.write_all(content.as_bytes())
        .await
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    file.flush().await?;

    info!("Configuration saved to: {:?}", config_path);
    Ok(())
}
