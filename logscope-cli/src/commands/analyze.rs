//! `logscope analyze` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use logscope_core::config::LogscopeConfig;
use logscope_core::types::FlaggedIp;
use logscope_log_analyzer::{AnalysisReport, AnalyzerBuilder, AnalyzerConfig, RecordStore};

use crate::cli::{AnalyzeArgs, InputFormat};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `analyze` command.
pub async fn execute(
    args: AnalyzeArgs,
    config: LogscopeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut analyzer_config = AnalyzerConfig::from_core(&config);
    if let Some(top_n) = args.top_n {
        analyzer_config.top_n = top_n;
    }
    if args.enrich && analyzer_config.reputation.api_key.is_empty() {
        return Err(CliError::Config(
            "--enrich requires reputation.api_key (or LOGSCOPE_REPUTATION_API_KEY)".to_owned(),
        ));
    }

    let mut builder = AnalyzerBuilder::new().config(analyzer_config);
    if args.enrich {
        builder = builder.with_virustotal()?;
    }
    let analyzer = builder.build()?;

    info!(path = %args.file.display(), format = ?args.format, "loading records");
    let store = match args.format {
        InputFormat::Combined => {
            RecordStore::from_outcome(analyzer.parser().parse_file(&args.file).await?)
        }
        InputFormat::Jsonl => RecordStore::read_json_lines(&args.file).await?,
    };

    if let Some(export) = &args.export {
        store.write_json_lines(export).await?;
        info!(path = %export.display(), records = store.len(), "exported records");
    }

    let mut report = analyzer.analyze(store).await?;
    if args.enrich {
        analyzer
            .enrich_report(&mut report, &super::shutdown_token())
            .await?;
    }

    writer.render(&AnalyzeOutput {
        source: args.file.display().to_string(),
        report,
    })
}

/// `analyze` command output.
#[derive(Serialize)]
pub struct AnalyzeOutput {
    pub source: String,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

impl Render for AnalyzeOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let r = &self.report;
        writeln!(w, "Analysis: {}", self.source.bold())?;
        writeln!(w, "Run ID: {}", r.run_id)?;
        writeln!(
            w,
            "Records: {} ({} lines skipped)",
            r.total_records, r.skipped_lines
        )?;

        writeln!(w)?;
        writeln!(w, "{}", "Traffic".bold())?;
        for t in &r.traffic {
            writeln!(w, "  {:<14} {:>8}", t.class.to_string(), t.count)?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Top Requested Pages".bold())?;
        for p in &r.top_pages {
            writeln!(w, "  {:>8}  {}", p.count, p.page)?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Top Referer Domains".bold())?;
        if r.top_referer_domains.is_empty() {
            writeln!(w, "  (none)")?;
        }
        for d in &r.top_referer_domains {
            writeln!(w, "  {:>8}  {}", d.count, d.domain)?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Flagged IPs".bold())?;
        let flagged: Vec<&FlaggedIp> = r
            .endpoint_scanning
            .iter()
            .chain(&r.rate_limit_abuse)
            .chain(&r.burst_activity)
            .collect();
        if flagged.is_empty() {
            writeln!(w, "  {}", "none".green())?;
        }
        for f in flagged {
            writeln!(w, "  {}", f.to_string().yellow())?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Possible Exfiltration".bold())?;
        if r.exfiltration.is_empty() {
            writeln!(w, "  {}", "none".green())?;
        }
        for e in &r.exfiltration {
            let destination = if e.destination_domain.is_empty() {
                "-"
            } else {
                e.destination_domain.as_str()
            };
            writeln!(
                w,
                "  {} {} {} {} bytes -> {}",
                e.ip,
                e.method,
                e.request_path,
                e.size,
                destination.red()
            )?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Summary".bold())?;
        if r.findings.is_empty() {
            writeln!(w, "  {}", "No findings".green())?;
        }
        for finding in &r.findings {
            writeln!(w, "  - {}", finding)?;
        }

        if let Some(enrichment) = &r.enrichment {
            writeln!(w)?;
            writeln!(w, "{}", "Domain Reputation".bold())?;
            for verdict in &enrichment.verdicts {
                if verdict.is_scored() {
                    writeln!(w, "  {}", verdict)?;
                } else {
                    writeln!(w, "  {}", verdict.to_string().red())?;
                }
            }
            if enrichment.cancelled {
                writeln!(
                    w,
                    "  {} ({} not looked up)",
                    "cancelled".yellow(),
                    enrichment.skipped.len()
                )?;
            }
        }

        Ok(())
    }
}
