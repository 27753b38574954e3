//! Environment-based configuration.
//!
//! The trigger passes no payload; every parameter comes from the process
//! environment, matching the deployment's cloud-function contract.

use anyhow::{bail, Context, Result};

use costwatch_alert_log::TableId;

/// Slack channel settings (both values required together).
#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub bot_token: String,
    pub channel: String,
}

/// Email channel settings (all values required together).
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

/// Full monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Billing namespace to scan.
    pub namespace: String,
    /// Restrict the scan to one workspace; `None` scans the namespace.
    pub workspace: Option<String>,
    /// Alert threshold in currency units.
    pub cost_limit_per_workflow: f64,
    /// Rolling monitoring window, hours.
    pub monitor_interval_hour: f64,
    /// Fully qualified alert log table.
    pub alert_log_table: TableId,
    /// Workflow platform API base URL.
    pub api_url: Option<String>,
    /// Workflow platform bearer token.
    pub api_token: String,
    /// BigQuery OAuth bearer token.
    pub bigquery_token: String,
    /// Slack channel, when configured.
    pub slack: Option<SlackSettings>,
    /// Email channel, when configured.
    pub email: Option<EmailSettings>,
    /// Suppress notification delivery and the log write.
    pub dry_run: bool,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending variable when a required
    /// value is missing, unparseable, or half of a channel pair is set.
    pub fn from_env() -> Result<Self> {
        let namespace = required("WORKSPACE_NAMESPACE")?;
        let workspace = optional("WORKSPACE");

        let cost_limit_per_workflow: f64 = required("COST_LIMIT_PER_WORKFLOW")?
            .parse()
            .context("COST_LIMIT_PER_WORKFLOW is not a number")?;
        if cost_limit_per_workflow < 0.0 {
            bail!("COST_LIMIT_PER_WORKFLOW must be non-negative");
        }

        let monitor_interval_hour: f64 = required("MONITOR_INTERVAL_HOUR")?
            .parse()
            .context("MONITOR_INTERVAL_HOUR is not a number")?;
        if monitor_interval_hour <= 0.0 {
            bail!("MONITOR_INTERVAL_HOUR must be positive");
        }

        let alert_log_table = TableId::parse(&required("ALERT_LOG_TABLE_ID")?)
            .context("ALERT_LOG_TABLE_ID is not a project.dataset.table identifier")?;

        let api_url = optional("WORKBENCH_API_URL");
        let api_token = required("WORKBENCH_TOKEN")?;
        let bigquery_token = required("BIGQUERY_TOKEN")?;

        let slack = match (optional("SLACK_BOT_TOKEN"), optional("SLACK_CHANNEL")) {
            (Some(bot_token), Some(channel)) => Some(SlackSettings { bot_token, channel }),
            (None, None) => None,
            _ => bail!("SLACK_BOT_TOKEN and SLACK_CHANNEL must be set together"),
        };

        let email = match (
            optional("SENDGRID_API_KEY"),
            optional("SENDER_EMAIL"),
            optional("RECIPIENT_EMAILS"),
        ) {
            (Some(api_key), Some(sender), Some(recipients)) => {
                let recipients: Vec<String> = recipients
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect();
                if recipients.is_empty() {
                    bail!("RECIPIENT_EMAILS contains no addresses");
                }
                Some(EmailSettings {
                    api_key,
                    sender,
                    recipients,
                })
            }
            (None, None, None) => None,
            _ => bail!("SENDGRID_API_KEY, SENDER_EMAIL, and RECIPIENT_EMAILS must be set together"),
        };

        let dry_run = optional("DRY_RUN")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if slack.is_none() && email.is_none() && !dry_run {
            bail!("at least one notification channel must be configured (Slack or email)");
        }

        Ok(Self {
            namespace,
            workspace,
            cost_limit_per_workflow,
            monitor_interval_hour,
            alert_log_table,
            api_url,
            api_token,
            bigquery_token,
            slack,
            email,
            dry_run,
        })
    }

    /// Human-readable summary with secrets redacted.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("namespace: {}", self.namespace),
            format!(
                "workspace: {}",
                self.workspace.as_deref().unwrap_or("(all in namespace)")
            ),
            format!("cost limit: ${:.2}", self.cost_limit_per_workflow),
            format!("window: {} h", self.monitor_interval_hour),
            format!("alert log: {}", self.alert_log_table),
            format!(
                "platform API: {}",
                self.api_url.as_deref().unwrap_or("(default)")
            ),
            format!("dry run: {}", self.dry_run),
        ];
        match &self.slack {
            Some(slack) => lines.push(format!("slack: {} (token redacted)", slack.channel)),
            None => lines.push("slack: not configured".to_string()),
        }
        match &self.email {
            Some(email) => lines.push(format!(
                "email: {} -> {} (key redacted)",
                email.sender,
                email.recipients.join(", ")
            )),
            None => lines.push("email: not configured".to_string()),
        }
        lines.join("\n")
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} environment variable not set"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: &[&str] = &[
        "WORKSPACE_NAMESPACE",
        "WORKSPACE",
        "COST_LIMIT_PER_WORKFLOW",
        "MONITOR_INTERVAL_HOUR",
        "ALERT_LOG_TABLE_ID",
        "WORKBENCH_API_URL",
        "WORKBENCH_TOKEN",
        "BIGQUERY_TOKEN",
        "SLACK_BOT_TOKEN",
        "SLACK_CHANNEL",
        "SENDGRID_API_KEY",
        "SENDER_EMAIL",
        "RECIPIENT_EMAILS",
        "DRY_RUN",
    ];

    fn set_minimal() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
        std::env::set_var("WORKSPACE_NAMESPACE", "billing-ns");
        std::env::set_var("COST_LIMIT_PER_WORKFLOW", "10.0");
        std::env::set_var("MONITOR_INTERVAL_HOUR", "24");
        std::env::set_var("ALERT_LOG_TABLE_ID", "proj.billing.alert_log");
        std::env::set_var("WORKBENCH_TOKEN", "platform-token");
        std::env::set_var("BIGQUERY_TOKEN", "bq-token");
        std::env::set_var("SLACK_BOT_TOKEN", "xoxb-token");
        std::env::set_var("SLACK_CHANNEL", "#billing-alerts");
    }

    #[test]
    #[serial]
    fn test_minimal_slack_configuration() {
        set_minimal();
        let config = MonitorConfig::from_env().unwrap();

        assert_eq!(config.namespace, "billing-ns");
        assert!(config.workspace.is_none());
        assert!((config.cost_limit_per_workflow - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.alert_log_table.to_string(), "proj.billing.alert_log");
        assert!(config.slack.is_some());
        assert!(config.email.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    #[serial]
    fn test_recipient_list_is_split_and_trimmed() {
        set_minimal();
        std::env::set_var("SENDGRID_API_KEY", "SG.key");
        std::env::set_var("SENDER_EMAIL", "alerts@example.org");
        std::env::set_var("RECIPIENT_EMAILS", "a@example.org, b@example.org ,");

        let config = MonitorConfig::from_env().unwrap();
        let email = config.email.unwrap();
        assert_eq!(email.recipients, vec!["a@example.org", "b@example.org"]);
    }

    #[test]
    #[serial]
    fn test_half_configured_slack_is_rejected() {
        set_minimal();
        std::env::remove_var("SLACK_CHANNEL");
        std::env::set_var("DRY_RUN", "true");

        let err = MonitorConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("SLACK_BOT_TOKEN and SLACK_CHANNEL"));
    }

    #[test]
    #[serial]
    fn test_missing_channels_rejected_unless_dry_run() {
        set_minimal();
        std::env::remove_var("SLACK_BOT_TOKEN");
        std::env::remove_var("SLACK_CHANNEL");

        assert!(MonitorConfig::from_env().is_err());

        std::env::set_var("DRY_RUN", "1");
        let config = MonitorConfig::from_env().unwrap();
        assert!(config.dry_run);
        assert!(config.slack.is_none());
    }

    #[test]
    #[serial]
    fn test_negative_cost_limit_rejected() {
        set_minimal();
        std::env::set_var("COST_LIMIT_PER_WORKFLOW", "-1");
        assert!(MonitorConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_summary_redacts_secrets() {
        set_minimal();
        let config = MonitorConfig::from_env().unwrap();
        let summary = config.summary();

        assert!(summary.contains("#billing-alerts"));
        assert!(!summary.contains("xoxb-token"));
        assert!(!summary.contains("bq-token"));
        assert!(!summary.contains("platform-token"));
    }
}
