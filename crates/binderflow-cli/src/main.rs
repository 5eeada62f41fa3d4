//! binderflow — Staged protein binder design.
//! Entry point for the pipeline binary.

use anyhow::Context;
use binderflow_common::settings::DesignConfig;
use binderflow_common::{OutputLayoutPolicy, RegionEntry, RunConfiguration, Settings, Stage};
use binderflow_pipeline::{BinderPipeline, NimClient, PipelineOptions, SequenceParser, ValidationOptions};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "binderflow", version, about = "Design protein binders against a target region")]
struct Args {
    /// Region label from the `[[regions]]` catalog, e.g. 1, 1A, 2D
    #[arg(long)]
    cycle: String,

    /// Sequences to design per backbone
    #[arg(long, default_value_t = 1)]
    num_seq: u32,

    /// Diffusion steps for structure generation
    #[arg(long, default_value_t = 20)]
    diffusion: u32,

    /// Sampling temperature for sequence design
    #[arg(long, default_value_t = 0.2)]
    temp: f64,

    /// Run complex structure validation after sequence design
    #[arg(long)]
    validate: bool,

    /// Settings file (defaults to $BINDERFLOW_CONFIG, then ./binderflow.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output layout: cycle_scoped, num_seq_scoped or seq_scoped
    #[arg(long)]
    layout: Option<OutputLayoutPolicy>,

    /// Root directory for run artifacts
    #[arg(long)]
    output_root: Option<PathBuf>,
}

fn build_run_configuration(
    args: &Args,
    entry: &RegionEntry,
    design: &DesignConfig,
) -> binderflow_common::Result<RunConfiguration> {
    RunConfiguration::builder(entry.label.clone())
        .region(entry)
        .requested_sequence_count(args.num_seq)
        .diffusion_step_count(args.diffusion)
        .sampling_temperature(args.temp)
        .chain_selectors(design.chain_selectors.iter().cloned())
        .ca_only(design.ca_only)
        .use_soluble_model(design.use_soluble_model)
        .build()
}

fn build_options(args: &Args, settings: &Settings) -> PipelineOptions {
    let mut options = PipelineOptions::new(
        args.output_root.clone().unwrap_or_else(|| settings.output.root.clone()),
    );
    options.layout = args.layout.unwrap_or(settings.output.layout);
    options.parser = SequenceParser::new(settings.design.header_marker.clone())
        .discard_leading_template(settings.design.discard_leading_template);
    if args.validate || settings.validation.enabled {
        options.validation = Some(ValidationOptions {
            selected_models: settings.validation.selected_models.clone(),
            max_pairs: settings.validation.max_pairs,
        });
    }
    options
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("binderflow=debug,info")),
        )
        .init();

    let args = Args::parse();
    info!("🧬 binderflow {} starting up...", env!("CARGO_PKG_VERSION"));

    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Could not load settings")?;

    let catalog = settings.region_catalog()?;
    info!("Region catalog loaded: {} regions", catalog.len());
    let entry = catalog.resolve(&args.cycle)?;
    let cfg = build_run_configuration(&args, entry, &settings.design)?;
    let options = build_options(&args, &settings);

    let api_key = settings.services.api_key()?;
    let client = NimClient::from_services(&settings.services, api_key)?;

    let mut stages = vec![Stage::StructureGeneration, Stage::SequenceDesign];
    if options.validation.is_some() {
        stages.push(Stage::StructureValidation);
    }
    for stage in stages {
        if client.probe(stage).await {
            info!("✅ {} service ready", stage);
        } else {
            warn!("{} service is not reporting ready; continuing anyway", stage);
        }
    }

    let pipeline = BinderPipeline::new(Arc::new(client), options);
    match pipeline.run(&cfg).await {
        Ok(report) => {
            info!(
                "✅ {} finished: {} pairs, {} validated, {} files in {}",
                report.run_name,
                report.pairs.len(),
                report.validated_count,
                report.artifacts.files.len(),
                report.artifacts.run_dir.display()
            );
            Ok(())
        }
        Err(failure) => {
            warn!(
                "Run stopped after {:?}; {} files kept",
                failure.report.history,
                failure.report.artifacts.files.len()
            );
            Err(failure.into())
        }
    }
}
