mod config;
mod errors;
mod interview;
mod llm_client;
mod models;
mod persona;
mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::interview::engine::InterviewEngine;
use crate::interview::orchestrator::DatasetOrchestrator;
use crate::interview::questions::QuestionSet;
use crate::llm_client::capabilities::ModelCapabilityRegistry;
use crate::llm_client::{LlmClient, OpenAiBackend};
use crate::models::persona::{BaseFields, Persona};
use crate::persona::completion::PersonaCompletionEngine;
use crate::persona::sampler::{BaseSampler, DistributionTable};
use crate::persona::validation::compare_collections;
use crate::storage::interactions::CsvInteractionStore;
use crate::storage::personas::{
    load_records, write_base_personas, write_final_personas, PersonaRecord,
};

#[derive(Parser)]
#[command(name = "dataset-gen", version)]
#[command(about = "Synthetic Persian interview dataset generator for elderly personas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample base personas and complete them with a model
    Personas(PersonasArgs),
    /// Interview every persona with every model
    Interviews(InterviewsArgs),
    /// Check that final personas kept their base fields
    Validate(ValidateArgs),
}

#[derive(Args)]
struct PersonasArgs {
    /// Number of personas to generate
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Completion model (defaults to DEFAULT_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Sampling seed (overrides SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Personas per completion request
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    #[arg(long, default_value = "data/personas")]
    output_dir: PathBuf,
}

#[derive(Args)]
struct InterviewsArgs {
    /// Persona file (.json, .jsonl or .csv)
    #[arg(long)]
    personas: PathBuf,

    /// Model to interview with; repeat for several (defaults to DEFAULT_MODEL)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Question set JSON file (defaults to the built-in battery)
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Only interview the first N personas
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value = "data/output")]
    output_dir: PathBuf,

    /// Minimum seconds between model calls
    #[arg(long, default_value_t = 5.0)]
    delay: f64,

    /// Stop once more than this many pairs have failed
    #[arg(long, default_value_t = 10)]
    max_failed_pairs: usize,
}

#[derive(Args)]
struct ValidateArgs {
    /// Base persona file
    #[arg(long)]
    base: PathBuf,

    /// Final persona file
    #[arg(long = "final")]
    final_personas: PathBuf,

    /// Write the JSON summary here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Also fail when a base persona has no final counterpart
    #[arg(long)]
    require_complete: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dataset-gen v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Personas(args) => run_personas(&config, args).await,
        Command::Interviews(args) => run_interviews(&config, args).await,
        Command::Validate(args) => run_validate(args),
    }
}

fn build_llm(config: &Config, models: &[String]) -> Result<LlmClient> {
    let mut registry = ModelCapabilityRegistry::builtin();
    if let Some(path) = &config.model_capabilities_path {
        registry.load_overrides(path)?;
    }
    for model in models {
        if !registry.is_registered(model) {
            warn!(
                "Model {} has no capability entry; no optional generation parameters will be sent",
                model
            );
        }
    }
    let backend = OpenAiBackend::new(
        &config.llm_base_url,
        config.require_api_key()?.to_string(),
        config.request_timeout,
    )?;
    info!("LLM client initialized (endpoint: {})", config.llm_base_url);
    Ok(LlmClient::new(Arc::new(backend), Arc::new(registry)))
}

/// Loads a persona file, logging every record that was skipped.
fn load_personas<T: PersonaRecord>(path: &Path) -> Result<Vec<T>> {
    let report = load_records::<T>(path)?;
    for rejected in &report.rejected {
        warn!(
            "Skipped record {} of {}: {}",
            rejected.position,
            path.display(),
            rejected.error
        );
    }
    Ok(report.records)
}

async fn run_personas(config: &Config, args: PersonasArgs) -> Result<()> {
    let model = args.model.unwrap_or_else(|| config.default_model.clone());
    let llm = build_llm(config, std::slice::from_ref(&model))?;
    let seed = args.seed.or(config.seed);
    let run_id = Local::now().format("%Y%m%d_%H%M%S").to_string();

    let sampler = BaseSampler::new(&DistributionTable::iranian_elderly())?;
    let bases = sampler.sample_many(args.count, seed);
    info!(
        "Sampled {} base persona(s) (seed: {})",
        bases.len(),
        seed.map(|s| s.to_string()).unwrap_or_else(|| "entropy".to_string())
    );
    write_base_personas(&args.output_dir, &run_id, &bases)?;

    let engine = PersonaCompletionEngine::new(
        llm,
        config.retry,
        config.generation.clone(),
        args.batch_size,
    );
    let outcome = engine.complete(&bases, &model).await?;
    write_final_personas(&args.output_dir, &run_id, &outcome.completed)?;

    for rejected in &outcome.rejected {
        warn!("Persona {} excluded: {}", rejected.persona_id, rejected.error);
    }
    info!(
        "Persona run {} finished: {}/{} completed",
        run_id,
        outcome.completed.len(),
        bases.len()
    );
    if outcome.completed.is_empty() && !bases.is_empty() {
        bail!("no persona was completed");
    }
    Ok(())
}

async fn run_interviews(config: &Config, args: InterviewsArgs) -> Result<()> {
    let mut personas = load_personas::<Persona>(&args.personas)?;
    if let Some(limit) = args.limit {
        personas.truncate(limit);
    }
    if personas.is_empty() {
        bail!("no valid personas in {}", args.personas.display());
    }

    let models = if args.models.is_empty() {
        vec![config.default_model.clone()]
    } else {
        args.models
    };
    let questions = match &args.questions {
        Some(path) => QuestionSet::from_json_file(path)?,
        None => QuestionSet::default_set(),
    };
    let delay = Duration::try_from_secs_f64(args.delay)
        .with_context(|| format!("--delay must be a non-negative number, got {}", args.delay))?;

    let store = CsvInteractionStore::new(&args.output_dir)?;
    info!(
        "Writing transcripts to {} (session {})",
        args.output_dir.display(),
        store.session()
    );

    let engine = InterviewEngine::new(build_llm(config, &models)?, config.retry, config.generation.clone());
    let mut orchestrator =
        DatasetOrchestrator::new(engine, Box::new(store), Some(args.max_failed_pairs));
    let report = orchestrator
        .generate_dataset(&personas, &models, &questions, delay)
        .await?;

    info!(
        "{} pair(s) attempted, {} completed, {} failed, {} interaction(s) written",
        report.pairs_attempted, report.pairs_completed, report.pairs_failed, report.total_interactions
    );
    if report.stopped_early {
        bail!("stopped early after {} failed pair(s)", report.pairs_failed);
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let bases = load_personas::<BaseFields>(&args.base)?;
    let finals: Vec<BaseFields> = load_personas::<Persona>(&args.final_personas)?
        .iter()
        .map(Persona::base_fields)
        .collect();

    let summary = compare_collections(&bases, &finals);
    summary.log();
    if let Some(path) = &args.report {
        summary.write_report(path)?;
    }
    if !summary.passed() {
        bail!(
            "{} base field mismatch(es), {} final persona(s) without a base record",
            summary.total_mismatches,
            summary.unexpected_in_final.len()
        );
    }
    if args.require_complete && !summary.is_complete() {
        bail!(
            "{} base persona(s) missing from the final collection",
            summary.missing_in_final.len()
        );
    }
    info!("All compared personas kept their base fields");
    Ok(())
}
