//! Workflow platform billing source.
//!
//! This crate talks to the workflow execution platform's REST API and
//! flattens its namespace -> workspace -> submission -> workflow hierarchy
//! into [`WorkflowCostRecord`]s for the cost monitor.
//!
//! The [`WorkbenchClient`] is thin request/response glue; the
//! [`Collector`] owns the enumeration policy, including partial-failure
//! tolerance (one failing workspace or submission never blocks the rest
//! of the scan).

pub mod client;
pub mod collector;
pub mod models;
pub mod types;

pub use client::{SourceError, WorkbenchClient};
pub use collector::Collector;
pub use types::{parse_api_timestamp, WorkflowCostRecord, WorkflowStatus};
