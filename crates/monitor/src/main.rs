//! costwatch CLI - high-cost workflow alerting.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use costwatch_alert_log::BigQueryStore;
use costwatch_monitor::config::MonitorConfig;
use costwatch_monitor::pipeline::{Pipeline, PipelineSettings};
use costwatch_notify::{EmailChannel, Notifier, NotifyChannel, SlackChannel};
use costwatch_source::{Collector, WorkbenchClient};

/// High-cost workflow monitor for the workflow platform.
#[derive(Parser)]
#[command(name = "costwatch")]
#[command(about = "Scan workflow billing data and alert on new high-cost workflows")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one monitoring run (the unit a scheduler or queue trigger
    /// invokes)
    Run {
        /// Suppress notification delivery and the alert log write
        #[arg(long)]
        dry_run: bool,
    },

    /// Load the environment configuration and print it with secrets
    /// redacted
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { dry_run } => run(dry_run).await,
        Commands::CheckConfig => check_config(),
    }
}

async fn run(dry_run: bool) -> Result<()> {
    let mut config = MonitorConfig::from_env().context("loading configuration")?;
    config.dry_run = config.dry_run || dry_run;

    let client = match &config.api_url {
        Some(url) => WorkbenchClient::with_base_url(url, &config.api_token),
        None => WorkbenchClient::new(&config.api_token),
    }
    .context("building platform client")?;
    let collector = Collector::new(client, &config.namespace, config.workspace.clone());

    let store = BigQueryStore::new(config.alert_log_table.clone(), &config.bigquery_token)
        .context("building alert log store")?;

    let pipeline = Pipeline::new(
        collector,
        Arc::new(store),
        build_notifier(&config),
        PipelineSettings {
            cost_limit_per_workflow: config.cost_limit_per_workflow,
            monitor_interval_hour: config.monitor_interval_hour,
            dry_run: config.dry_run,
        },
    );

    let summary = pipeline.run().await?;

    println!("\nMonitor run summary");
    println!("   Collected: {}", summary.collected);
    println!("   Known alerts in window: {}", summary.known_alerts);
    println!("   New alerts: {}", summary.new_alerts);
    println!("   Channels notified: {}", summary.delivered_channels);
    println!("   Log updated: {}", summary.log_updated);

    Ok(())
}

/// Build the notifier from the configured channels.
fn build_notifier(config: &MonitorConfig) -> Notifier {
    let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

    if let Some(slack) = &config.slack {
        channels.push(Arc::new(SlackChannel::new(
            slack.bot_token.clone(),
            slack.channel.clone(),
        )));
    }

    if let Some(email) = &config.email {
        channels.push(Arc::new(EmailChannel::new(
            email.api_key.clone(),
            email.sender.clone(),
            email.recipients.clone(),
        )));
    }

    if channels.is_empty() {
        // Only reachable in dry-run mode; config loading rejects it
        // otherwise.
        tracing::warn!("No notification channels configured");
    }

    Notifier::with_channels(channels)
}

fn check_config() -> Result<()> {
    let config = MonitorConfig::from_env().context("loading configuration")?;
    println!("{}", config.summary());
    Ok(())
}
