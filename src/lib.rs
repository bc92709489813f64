//! Pankha HP iLO agent: polls an iLO management controller over Redfish and
//! publishes a fixed set of hardware health metrics, reconnecting no more
//! often than a configured minimum interval.

pub mod app;
pub mod config;
pub mod ilo;
pub mod metrics;
pub mod poller;
