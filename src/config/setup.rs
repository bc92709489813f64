//! Interactive setup wizard: collect the iLO record, probe it, save it.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::config::persistence::{load_config, save_config};
use crate::config::types::AgentConfig;
use crate::ilo::Connector;
use crate::metrics::test_connection;

/// Line-based question/answer helper over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    /// Ask for a value; empty input takes the default when there is one.
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        loop {
            match default {
                Some(d) if !d.is_empty() => write!(self.output, "{} [{}]: ", label, d)?,
                _ => write!(self.output, "{}: ", label)?,
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(anyhow!("Input closed while waiting for '{}'", label));
            }
            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
            writeln!(self.output, "   A value is required.")?;
        }
    }

    /// Ask for a secret. The current value is never shown; empty input keeps it.
    pub fn ask_secret(&mut self, label: &str, current: &str) -> Result<String> {
        loop {
            if current.is_empty() {
                write!(self.output, "{}: ", label)?;
            } else {
                write!(self.output, "{} [********]: ", label)?;
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(anyhow!("Input closed while waiting for '{}'", label));
            }
            let answer = line.trim_end_matches(['\r', '\n']);
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
            if !current.is_empty() {
                return Ok(current.to_string());
            }
            writeln!(self.output, "   A value is required.")?;
        }
    }

    /// Ask for a number, re-asking on garbage.
    pub fn ask_parsed<T>(&mut self, label: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + ToString,
    {
        let default_text = default.to_string();
        loop {
            let answer = self.ask(label, Some(default_text.as_str()))?;
            match answer.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "   '{}' is not a valid value.", answer)?,
            }
        }
    }

    pub fn confirm(&mut self, label: &str, default_yes: bool) -> Result<bool> {
        let hint = if default_yes { "Y/n" } else { "y/N" };
        write!(self.output, "{} ({}): ", label, hint)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(anyhow!("Input closed while waiting for '{}'", label));
        }
        Ok(match line.trim().to_ascii_lowercase().as_str() {
            "" => default_yes,
            "y" | "yes" => true,
            _ => false,
        })
    }
}

pub type ConnectorFactory<'a> = dyn Fn(&AgentConfig) -> Result<Arc<dyn Connector>> + 'a;

/// The question flow. Returns the validated config, or `None` if the user gave up.
pub async fn setup_flow<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    existing: Option<AgentConfig>,
    connector_for: &ConnectorFactory<'_>,
) -> Result<Option<AgentConfig>> {
    let mut config = existing.unwrap_or_default();

    prompter.say("\n📋 Configuration:\n")?;
    prompter.say("Values in [brackets] are defaults - press Enter to use them.\n")?;

    loop {
        config.ilo.host = prompter.ask(
            "iLO Host",
            Some(config.ilo.host.as_str()).filter(|h| !h.is_empty()),
        )?;
        config.ilo.port = prompter.ask_parsed("iLO Port", config.ilo.port)?;
        config.ilo.username = prompter.ask(
            "Username",
            Some(config.ilo.username.as_str()).filter(|u| !u.is_empty()),
        )?;
        config.ilo.password = prompter.ask_secret("Password", &config.ilo.password)?;

        prompter.say("\n🔍 Testing connection to the iLO...")?;
        let connector = connector_for(&config)?;
        if test_connection(connector.as_ref(), &config.ilo.descriptor()).await {
            prompter.say("✅ Connected")?;
            break;
        }

        prompter.say("❌ cannot connect")?;
        if !prompter.confirm("Try again?", true)? {
            return Ok(None);
        }
    }

    config.agent.name = prompter.ask("Device Name", Some(config.agent.name.as_str()))?;
    config.agent.scan_interval = prompter.ask_parsed("Scan Interval (seconds)", config.agent.scan_interval)?;

    Ok(Some(config))
}

pub async fn run_setup_wizard(config_file: &Path) -> Result<()> {
    println!("\n╔══════════════════════════════════════════╗");
    println!("║    Pankha HP iLO Agent Setup Wizard      ║");
    println!("╚══════════════════════════════════════════╝");
    println!("Build: \x1b[32mpankha-agent-ilo v{} ({})\x1b[0m\n", env!("CARGO_PKG_VERSION"), std::env::consts::ARCH);

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    let existing = if config_file.exists() {
        prompter.say(&format!("⚠️  Config file already exists: {:?}", config_file))?;
        if !prompter.confirm("Overwrite?", false)? {
            println!("Config unchanged.");
            return Ok(());
        }
        Some(load_config(config_file).await?)
    } else {
        None
    };

    let factory = |config: &AgentConfig| -> Result<Arc<dyn Connector>> {
        Ok(Arc::new(config.ilo.build_connector()?))
    };

    match setup_flow(&mut prompter, existing, &factory).await? {
        Some(config) => {
            save_config(&config, config_file).await?;
            println!("\n✅ Configuration saved to: {:?}", config_file);
            println!("\n✨ Setup complete! Start polling with: ./pankha-agent-ilo --run");
        }
        None => println!("\nSetup aborted, nothing saved."),
    }

    Ok(())
}
