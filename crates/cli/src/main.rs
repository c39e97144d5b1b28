//! jira-slack-nudge binary entrypoint.
//!
//! Loads the rule set and credentials, runs every rule once and exits
//! non-zero when any rule failed or was canceled.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use nudge_common::config::AppConfig;
use nudge_common::rules::RuleSet;
use nudge_engine::{MessageRenderer, NotificationRunner, RuleOutcome, RuleProcessor, RunReport};
use nudge_notifier::{ChatNotifier, ConsoleNotifier, ConsoleStream, SlackWebhookNotifier};
use nudge_tracker::{JiraClient, JiraCredentials};

const DEFAULT_LOG_FILTER: &str =
    "jira_slack_nudge=info,nudge_engine=info,nudge_tracker=info,nudge_notifier=info,nudge_common=info";

/// Send Slack digests of Jira issues matching configured queries.
#[derive(Debug, Parser)]
#[command(name = "jira-slack-nudge", version)]
struct Cli {
    /// Path to the rule-set YAML file
    config: PathBuf,

    /// Print messages instead of posting them to Slack (to stderr with --report-json)
    #[arg(long)]
    dry_run: bool,

    /// Maximum number of rules evaluated at once (overrides NUDGE_CONCURRENCY)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    report_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    tracing::info!(config = %cli.config.display(), "jira-slack-nudge starting...");

    // Everything here is fatal: nothing has been sent yet
    let config = AppConfig::from_env()?;
    let rule_set = RuleSet::load(&cli.config)?;
    let default_destination = rule_set.resolve_default(config.slack_webhook_url.as_deref());
    rule_set.validate(default_destination.as_deref())?;

    let tracker = JiraClient::new(JiraCredentials::from_config(&config), config.request_timeout)?
        .with_max_pages(config.max_pages);

    let notifier: Arc<dyn ChatNotifier> = if cli.dry_run {
        tracing::info!("Dry run: messages are printed, not sent");
        Arc::new(ConsoleNotifier::new(dry_run_stream(cli.report_json)))
    } else {
        Arc::new(SlackWebhookNotifier::new(config.request_timeout)?)
    };

    let processor = RuleProcessor::new(Arc::new(tracker), notifier)
        .with_renderer(MessageRenderer::new().with_config_url(config.config_url.clone()))
        .with_default_destination(default_destination)
        .with_timeout(config.request_timeout)
        .with_search_pages(config.max_pages);

    let concurrency = cli
        .concurrency
        .map(usize::from)
        .unwrap_or(config.concurrency);
    let runner = NotificationRunner::new(processor).with_concurrency(concurrency);

    // Cancel in-flight rules on Ctrl+C
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal, canceling remaining rules...");
            signal_cancel.cancel();
        }
    });

    let report = runner.run(&rule_set.rules, cancel).await;

    log_summary(&report);
    if cli.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Dry-run payloads stay off stdout when stdout carries the JSON report.
fn dry_run_stream(report_json: bool) -> ConsoleStream {
    if report_json {
        ConsoleStream::Stderr
    } else {
        ConsoleStream::Stdout
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn log_summary(report: &RunReport) {
    for entry in &report.rules {
        match &entry.outcome {
            RuleOutcome::Delivered {
                issues,
                groups,
                partial,
            } => tracing::info!(rule = %entry.rule, issues, groups, partial, "delivered"),
            RuleOutcome::SkippedEmpty => tracing::info!(rule = %entry.rule, "skipped (no issues)"),
            RuleOutcome::Failed { stage, error } => tracing::error!(
                rule = %entry.rule,
                stage = %stage.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()),
                kind = %error.kind(),
                error = %error,
                "failed"
            ),
            RuleOutcome::Canceled { stage } => {
                tracing::warn!(rule = %entry.rule, stage = %stage, "canceled")
            }
        }
    }

    tracing::info!(
        delivered = report.delivered(),
        skipped = report.skipped(),
        failed = report.failed(),
        canceled = report.canceled(),
        "jira-slack-nudge finished"
    );
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_path_is_required() {
        assert!(Cli::try_parse_from(["jira-slack-nudge"]).is_err());
    }

    #[test]
    fn test_parses_flags() {
        let cli = Cli::try_parse_from([
            "jira-slack-nudge",
            "rules.yaml",
            "--dry-run",
            "--concurrency",
            "3",
            "--report-json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("rules.yaml"));
        assert!(cli.dry_run);
        assert_eq!(cli.concurrency, Some(3));
        assert!(cli.report_json);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_dry_run_payloads_leave_stdout_to_the_report() {
        assert_eq!(dry_run_stream(true), ConsoleStream::Stderr);
        assert_eq!(dry_run_stream(false), ConsoleStream::Stdout);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(
            Cli::try_parse_from(["jira-slack-nudge", "rules.yaml", "--concurrency", "0"]).is_err()
        );
    }
}
