//! `logscope reputation` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use logscope_core::config::LogscopeConfig;
use logscope_log_analyzer::{AnalyzerBuilder, AnalyzerConfig, EnrichmentReport};

use crate::cli::ReputationArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `reputation` command.
///
/// Lookups are spaced by `reputation.delay_secs`. Ctrl-C stops the batch
/// after the in-flight lookup finishes; the partial report is still printed.
pub async fn execute(
    args: ReputationArgs,
    config: LogscopeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let analyzer_config = AnalyzerConfig::from_core(&config);
    if analyzer_config.reputation.api_key.is_empty() {
        return Err(CliError::Config(
            "reputation lookups require reputation.api_key (or LOGSCOPE_REPUTATION_API_KEY)"
                .to_owned(),
        ));
    }

    let analyzer = AnalyzerBuilder::new()
        .config(analyzer_config)
        .with_virustotal()?
        .build()?;

    info!(domains = args.domains.len(), "looking up domain reputation");
    let report = analyzer
        .enrich(&args.domains, &super::shutdown_token())
        .await?;

    writer.render(&ReputationOutput { report })
}

/// `reputation` command output.
#[derive(Serialize)]
pub struct ReputationOutput {
    #[serde(flatten)]
    pub report: EnrichmentReport,
}

impl Render for ReputationOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Reputation: {} scored, {} failed",
            self.report.scored_count(),
            self.report.failed_count()
        )?;
        for verdict in &self.report.verdicts {
            if verdict.is_scored() {
                writeln!(w, "  {}", verdict)?;
            } else {
                writeln!(w, "  {}", verdict.to_string().red())?;
            }
        }
        if self.report.cancelled {
            writeln!(w, "{}", "Cancelled. Not looked up:".yellow())?;
            for domain in &self.report.skipped {
                writeln!(w, "  {}", domain)?;
            }
        }
        Ok(())
    }
}
