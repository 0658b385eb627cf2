//! Command-line interface for startup-eval
//!
//! ## Commands
//!
//! - `evaluate`: gather evidence about a startup and score it
//! - `config`: print the effective engine configuration

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use eval_core::QueryContext;
use eval_engine::{EvalConfig, Orchestrator};
use eval_sources::{SourcesConfig, default_agents};
use eval_utils::{LogFormat, init_tracing_with};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "startup-eval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evidence-based startup evaluation", long_about = None)]
struct Cli {
    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a startup
    Evaluate {
        /// Company name
        #[arg(long)]
        company: Option<String>,

        /// Pitch document (text or markdown)
        #[arg(long)]
        document: Option<PathBuf>,

        /// Founder's professional profile URL
        #[arg(long)]
        profile_url: Option<String>,

        /// Free-form hint passed to agents, e.g. `ticker:ACME`
        #[arg(long = "hint")]
        hints: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn load_config(path: Option<&Path>) -> Result<EvalConfig> {
    let config = match path {
        Some(path) => EvalConfig::from_json_file(path)?,
        None => EvalConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn build_context(
    company: Option<String>,
    document: Option<PathBuf>,
    profile_url: Option<String>,
    hints: Vec<String>,
) -> Result<QueryContext> {
    let mut builder = QueryContext::builder();
    if let Some(company) = company {
        builder = builder.company_name(company);
    }
    if let Some(document) = document {
        builder = builder.document(document);
    }
    if let Some(url) = profile_url {
        builder = builder.profile_url(url);
    }
    for hint in hints {
        builder = builder.hint(hint);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing_with(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Evaluate {
            company,
            document,
            profile_url,
            hints,
            format,
        } => {
            let context = build_context(company, document, profile_url, hints)?;
            let sources = SourcesConfig::default()
                .with_env_keys()
                .context("Failed to load source configuration")?;

            let orchestrator = Orchestrator::builder()
                .config(config)
                .agents(default_agents(&sources)?)
                .build()?;

            info!(request_id = %context.request_id(), "Starting evaluation");
            let result = orchestrator.evaluate(context).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Table => println!("{}", render::tables(&result)),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate_args() {
        let cli = Cli::try_parse_from([
            "startup-eval",
            "evaluate",
            "--company",
            "Acme Robotics",
            "--hint",
            "ticker:ACME",
            "--hint",
            "stage:seed",
            "--format",
            "json",
        ])
        .unwrap();

        let Command::Evaluate {
            company,
            hints,
            format,
            ..
        } = cli.command
        else {
            panic!("expected evaluate");
        };
        assert_eq!(company.as_deref(), Some("Acme Robotics"));
        assert_eq!(hints, ["ticker:ACME", "stage:seed"]);
        assert_eq!(format, OutputFormat::Json);
    }

    #[test]
    fn test_context_needs_company_or_document() {
        assert!(build_context(None, None, None, Vec::new()).is_err());

        let context = build_context(
            None,
            Some(PathBuf::from("deck.md")),
            Some("https://www.linkedin.com/in/jane-doe".to_string()),
            vec!["stage:seed".to_string()],
        )
        .unwrap();
        assert!(context.document().is_some());
        assert_eq!(context.hints(), ["stage:seed"]);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        assert!(load_config(Some(Path::new("/definitely/not/here.json"))).is_err());
    }
}
