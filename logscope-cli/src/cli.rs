//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Logscope -- access log analysis and threat detection.
///
/// Use `logscope <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logscope", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logscope.toml configuration file.
    #[arg(short, long, default_value = "logscope.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse an access log and run every aggregator and detector.
    Analyze(AnalyzeArgs),

    /// Look up domain reputation verdicts.
    Reputation(ReputationArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Input formats accepted by `analyze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Apache/Nginx combined access log.
    Combined,
    /// Record set previously exported as JSON Lines.
    Jsonl,
}

// ---- analyze ----

/// Analyze an access log file.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Access log file to analyze.
    pub file: PathBuf,

    /// Input format.
    #[arg(long, default_value = "combined")]
    pub format: InputFormat,

    /// Look up reputation of the top referer domains.
    #[arg(long)]
    pub enrich: bool,

    /// Override the number of top pages/domains to report.
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Also export the parsed records as JSON Lines.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

// ---- reputation ----

/// Look up one or more domains.
#[derive(Args, Debug)]
pub struct ReputationArgs {
    /// Domains to look up (duplicates are ignored).
    #[arg(required = true)]
    pub domains: Vec<String>,
}

// ---- config ----

/// Manage logscope configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, analysis, detection, summary, reputation).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_analyze_defaults() {
        let cli = Cli::try_parse_from(["logscope", "analyze", "access.log"])
            .expect("should parse 'analyze' subcommand");
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.file, PathBuf::from("access.log"));
                assert_eq!(args.format, InputFormat::Combined);
                assert!(!args.enrich, "enrich should default to false");
                assert!(args.top_n.is_none());
                assert!(args.export.is_none());
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_parse_analyze_options() {
        let cli = Cli::try_parse_from([
            "logscope",
            "analyze",
            "records.jsonl",
            "--format",
            "jsonl",
            "--enrich",
            "--top-n",
            "3",
            "--export",
            "/tmp/out.jsonl",
        ])
        .expect("should parse analyze options");
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.format, InputFormat::Jsonl);
                assert!(args.enrich);
                assert_eq!(args.top_n, Some(3));
                assert_eq!(args.export, Some(PathBuf::from("/tmp/out.jsonl")));
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_parse_analyze_requires_file() {
        assert!(Cli::try_parse_from(["logscope", "analyze"]).is_err());
    }

    #[test]
    fn test_cli_parse_reputation_domains() {
        let cli = Cli::try_parse_from(["logscope", "reputation", "a.example", "b.example"])
            .expect("should parse reputation domains");
        match cli.command {
            Commands::Reputation(args) => {
                assert_eq!(args.domains, vec!["a.example", "b.example"]);
            }
            _ => panic!("expected Reputation command"),
        }
    }

    #[test]
    fn test_cli_parse_reputation_requires_domain() {
        assert!(Cli::try_parse_from(["logscope", "reputation"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["logscope", "config", "show", "--section", "detection"])
            .expect("should parse config show with section");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("detection".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_options() {
        let cli = Cli::try_parse_from([
            "logscope",
            "-c",
            "/etc/logscope.toml",
            "config",
            "validate",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("should parse global options after subcommand");
        assert_eq!(cli.config, PathBuf::from("/etc/logscope.toml"));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        assert!(Cli::try_parse_from(["logscope"]).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "logscope");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for name in ["analyze", "reputation", "config"] {
            assert!(subcommands.contains(&name), "should have '{name}' subcommand");
        }
    }
}
