//! Agent configuration: types, persistence, setup wizard and options flow.

pub mod options;
pub mod persistence;
pub mod setup;
pub mod types;

pub use types::AgentConfig;
