//! `verity` command-line interface.
//!
//! Results go to stdout as JSON. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use verity_core::{ClaimInput, HeuristicClassifier};
use verity_runtime::{
    AdjudicationRequest, Adjudicator, Classifier, LlmProvider, Pipeline, ProviderRegistry,
    RuntimeConfig, ServiceClient,
};

#[derive(Parser)]
#[command(name = "verity", author, version, about, long_about = None)]
struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print JSON on one line
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a claim to an assessment track
    Classify {
        /// Claim text, or "-" to read stdin
        text: String,
        /// Background the classifier should see
        #[arg(long)]
        context: Option<String>,
    },
    /// Adjudicate two diverging assessments
    Adjudicate {
        /// JSON request with claim_text, assessment_a/b and score_a/b
        #[arg(long, value_name = "FILE", conflicts_with_all = ["claim", "assessment_a", "assessment_b"])]
        request: Option<PathBuf>,
        #[arg(long)]
        claim: Option<String>,
        #[arg(long)]
        assessment_a: Option<String>,
        #[arg(long)]
        assessment_b: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        score_a: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        score_b: Option<f64>,
    },
    /// Classify, assess and reconcile one claim
    Check {
        /// Claim text, or "-" to read stdin
        text: String,
        #[arg(long)]
        context: Option<String>,
        /// Stress-test the verdict regardless of configuration
        #[arg(long)]
        stress_test: bool,
    },
    /// Classify with the deterministic heuristics only; no service call
    Offline {
        /// Claim text, or "-" to read stdin
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { text, context } => {
            let text = read_text(&text)?;
            let classifier = Classifier::from_config(ServiceClient::new(provider(&config)?, config));
            let decision = classifier
                .classify_text(&text, context.as_deref())
                .await
                .context("Classification failed")?;
            print_json(&decision, cli.compact)
        }

        Commands::Adjudicate {
            request,
            claim,
            assessment_a,
            assessment_b,
            score_a,
            score_b,
        } => {
            let request = match request {
                Some(path) => read_request(&path)?,
                None => AdjudicationRequest {
                    claim_text: claim.context("--claim is required without --request")?,
                    assessment_a: assessment_a
                        .context("--assessment-a is required without --request")?,
                    assessment_b: assessment_b
                        .context("--assessment-b is required without --request")?,
                    score_a: score_a.context("--score-a is required without --request")?,
                    score_b: score_b.context("--score-b is required without --request")?,
                },
            };

            let adjudicator = Adjudicator::new(ServiceClient::new(provider(&config)?, config));
            let result = adjudicator
                .adjudicate_request(request)
                .await
                .context("Adjudication failed")?;
            print_json(&result, cli.compact)
        }

        Commands::Check {
            text,
            context,
            stress_test,
        } => {
            let text = read_text(&text)?;
            let stress_test = stress_test || config.stress_test;

            let pipeline = Pipeline::builder()
                .provider(provider(&config)?)
                .config(config)
                .build()?;

            let mut report = match pipeline.run_with_context(&text, context.as_deref()).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::debug!(lifecycle = ?e.lifecycle.history(), "Claim did not reconcile");
                    let calls = e.usage.llm_calls;
                    return Err(e).context(format!(
                        "Claim check failed after {} service call(s)",
                        calls
                    ));
                }
            };

            if stress_test {
                pipeline
                    .stress_test(&mut report)
                    .await
                    .context("Stress test failed")?;
            }
            print_json(&report, cli.compact)
        }

        Commands::Offline { text } => {
            let claim = ClaimInput::new(read_text(&text)?)?;
            let decision = HeuristicClassifier::new().classify(&claim);
            print_json(&decision, cli.compact)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let config = match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn provider(config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>> {
    let registry = ProviderRegistry::with_defaults();
    config
        .provider
        .build(&registry)
        .with_context(|| format!("Failed to create provider '{}'", config.provider.kind))
}

/// Claim text from the argument, or stdin for "-".
fn read_text(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read claim from stdin")?;
    Ok(text)
}

fn read_request(path: &Path) -> Result<AdjudicationRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid adjudication request in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}
