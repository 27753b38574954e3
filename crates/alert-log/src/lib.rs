//! Persisted alert log for the cost monitor.
//!
//! Every alert the monitor emits is recorded in an external table so later
//! runs can suppress duplicates. This crate defines the [`AlertLogStore`]
//! trait the pipeline depends on, plus [`BigQueryStore`], the production
//! implementation over the BigQuery REST API.
//!
//! The store follows a read-window / rewrite-whole-table protocol: callers
//! read the retained window at the start of a run and rewrite the table
//! with `retained + new` at the end. Under concurrent invocation the
//! rewrite is a last-writer-wins race; the trait boundary exists so a
//! transactional or append-only store can be substituted without touching
//! the pipeline.

pub mod bigquery;
pub mod store;

pub use bigquery::BigQueryStore;
pub use store::{AlertLogEntry, AlertLogError, AlertLogStore, TableId};
