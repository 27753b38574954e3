//! High-cost workflow monitor.
//!
//! One invocation scans the workflow platform's billing data, decides which
//! workflows are newly alert-worthy, notifies the configured channels, and
//! rewrites the persisted alert log. The decision core lives in
//! [`filter`]; [`pipeline`] owns the collect -> filter -> notify -> log
//! sequencing.

pub mod config;
pub mod filter;
pub mod pipeline;
pub mod retry;

pub use config::MonitorConfig;
pub use pipeline::{Pipeline, PipelineSettings, RunSummary};
