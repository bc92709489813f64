//! Command-line argument definitions (clap) and help text.

use clap::Parser;

pub const HELP_TEXT: &str = "
Pankha HP iLO Agent
Usage: pankha-agent-ilo [OPTIONS]

Options:
  -h, --help                    Print help
  -V, --version                 Print version
Setup:
  -e, --setup                   Run interactive setup wizard (tests the connection)
  -o, --options                 Change iLO host/port of an existing configuration
Polling:
  -r, --run                     Poll the iLO in the foreground until Ctrl+C
      --once                    Poll every metric once and print the readings as JSON
      --test                    Test the iLO connection and exit
Config & Logs:
  -c, --config                  Show current configuration (password masked)
  -f, --config-file <PATH>      Use this config file instead of ./config.json
      --log-level <LOG_LEVEL>   Set log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
";

#[derive(Parser, Debug)]
#[command(name = "pankha-agent-ilo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pankha HP iLO Agent", long_about = None)]
pub struct Args {
    // === Setup ===
    /// Run interactive setup wizard
    #[arg(short = 'e', long, help_heading = "Setup")]
    pub setup: bool,

    /// Change iLO host/port of an existing configuration
    #[arg(short = 'o', long, help_heading = "Setup")]
    pub options: bool,

    // === Polling ===
    /// Poll the iLO in the foreground until Ctrl+C
    #[arg(short = 'r', long, help_heading = "Polling")]
    pub run: bool,

    /// Poll every metric once and print the readings as JSON
    #[arg(long, help_heading = "Polling")]
    pub once: bool,

    /// Test the iLO connection and exit
    #[arg(long, help_heading = "Polling")]
    pub test: bool,

    // === Config & Logs ===
    /// Show current configuration
    #[arg(short = 'c', long, help_heading = "Config & Logs")]
    pub config: bool,

    /// Config file path
    #[arg(short = 'f', long = "config-file", help_heading = "Config & Logs")]
    pub config_file: Option<String>,

    /// Set log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
    #[arg(long = "log-level", help_heading = "Config & Logs")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn has_command(&self) -> bool {
        self.setup || self.options || self.run || self.once || self.test || self.config
    }
}
