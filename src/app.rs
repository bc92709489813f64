//! Command line and logging.

pub mod cli;
pub mod logging;
