//! Run orchestration: collect -> filter -> notify -> log.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use costwatch_alert_log::{AlertLogEntry, AlertLogStore};
use costwatch_notify::{AlertReport, Notifier};
use costwatch_source::Collector;

use crate::filter::filter_new_alerts;
use crate::retry::{with_retry, RetryConfig};

/// Decision parameters for one run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Alert threshold in currency units.
    pub cost_limit_per_workflow: f64,
    /// Rolling monitoring window, hours.
    pub monitor_interval_hour: f64,
    /// Suppress notification delivery and the log write.
    pub dry_run: bool,
}

/// Result of a single run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Workflow records collected from the platform.
    pub collected: usize,
    /// Log entries inside the monitoring window before this run.
    pub known_alerts: usize,
    /// Newly-detected alert-worthy workflows.
    pub new_alerts: usize,
    /// Channels that accepted the notification.
    pub delivered_channels: usize,
    /// Whether the alert log was rewritten.
    pub log_updated: bool,
}

/// One-shot monitoring pipeline.
///
/// Stages run strictly in order, and the notifier always runs before the
/// log write: a delivery failure must not mark events as already alerted.
/// Re-running on a duplicate trigger is safe only through the persisted
/// log's duplicate test, so a lost log write re-alerts on the next run.
pub struct Pipeline {
    collector: Collector,
    store: Arc<dyn AlertLogStore>,
    notifier: Notifier,
    settings: PipelineSettings,
    retry: RetryConfig,
}

impl Pipeline {
    /// Assemble a pipeline from its three collaborators.
    #[must_use]
    pub fn new(
        collector: Collector,
        store: Arc<dyn AlertLogStore>,
        notifier: Notifier,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            collector,
            store,
            notifier,
            settings,
            retry: RetryConfig::default(),
        }
    }

    /// Override the log write retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Execute one full run.
    ///
    /// # Errors
    ///
    /// Fails on unclassified alert log read errors and on a log write that
    /// exhausts its retries; all other collaborator failures degrade to
    /// logged skips.
    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            cost_limit = self.settings.cost_limit_per_workflow,
            window_hours = self.settings.monitor_interval_hour,
            dry_run = self.settings.dry_run,
            "Starting monitor run"
        );

        let records = self.collector.collect().await;
        let entries = self
            .store
            .recent_entries(self.settings.monitor_interval_hour)
            .await
            .context("reading alert log")?;

        let now = Utc::now();
        let new_alerts = filter_new_alerts(
            &records,
            &entries,
            self.settings.cost_limit_per_workflow,
            self.settings.monitor_interval_hour,
            now,
        );

        let mut summary = RunSummary {
            collected: records.len(),
            known_alerts: entries.len(),
            new_alerts: new_alerts.len(),
            delivered_channels: 0,
            log_updated: false,
        };

        if new_alerts.is_empty() {
            info!(
                collected = summary.collected,
                known = summary.known_alerts,
                "No new high-cost workflows"
            );
            return Ok(summary);
        }

        info!(
            collected = summary.collected,
            known = summary.known_alerts,
            new = summary.new_alerts,
            "New high-cost workflows detected"
        );

        let report = AlertReport::new(new_alerts.clone(), now);
        if self.settings.dry_run {
            info!(subject = %report.subject(), "Dry run: suppressing notification");
        } else {
            summary.delivered_channels = self.notifier.send(&report).await;
        }

        if self.settings.dry_run {
            info!(
                entries = entries.len() + new_alerts.len(),
                "Dry run: suppressing alert log write"
            );
            return Ok(summary);
        }

        // The rewritten log is the retained window plus the new alerts;
        // older entries age out at read time.
        let mut updated = entries;
        updated.extend(
            new_alerts
                .into_iter()
                .map(|record| AlertLogEntry::new(record, now)),
        );

        with_retry(&self.retry, "alert log write", || {
            let updated = &updated;
            async move { self.store.replace(updated).await }
        })
        .await
        .context("writing alert log")?;
        summary.log_updated = true;

        info!(
            new = summary.new_alerts,
            delivered = summary.delivered_channels,
            "Monitor run complete"
        );
        Ok(summary)
    }
}
