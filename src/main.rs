//! CLI entry point for the feeder risk tool.
//!
//! Scores a feeder setup export against historical part usage and writes the
//! report artifacts locally or to S3.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feeder_risk::config::{DEFAULT_FILE_PREFIX, LogConfig, PipelineConfig};
use feeder_risk::pipeline::{ResultEnvelope, run};
use feeder_risk::scoring::{Classifier, LogisticPipeline};
use feeder_risk::sink::{ArtifactSink, FsSink, S3Sink};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "feeder-risk")]
#[command(about = "Predict placement-error risk for a feeder setup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a feeder setup file and write the report artifacts
    Predict {
        /// Feeder setup export (two metadata lines above and below the table)
        #[arg(value_name = "SETUP")]
        setup: PathBuf,

        /// Historical part usage CSV
        #[arg(long, env = "FEEDER_HISTORICAL_PATH", default_value = "PartUsage.csv")]
        historical: PathBuf,

        /// Model pipeline artifact (JSON)
        #[arg(long, env = "FEEDER_MODEL_PATH", default_value = "feeder_model.json")]
        model: PathBuf,

        /// Directory the report folder is created in
        #[arg(short = 'd', long, env = "FEEDER_OUTPUT_DIR", default_value = "reports")]
        output_dir: PathBuf,

        /// Prefix of the report folder and file names
        #[arg(short, long, default_value = DEFAULT_FILE_PREFIX)]
        prefix: String,

        /// Optional: S3 bucket to upload artifacts to instead of the output directory
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress artifacts before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Print the result envelope as JSON on stdout
        #[arg(long, default_value_t = false)]
        print_json: bool,
    },
    /// Show the feature schema a model artifact declares
    InspectModel {
        #[arg(value_name = "MODEL")]
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_config = LogConfig::from_env();
    let file_appender = tracing_appender::rolling::daily(log_config.dir(), log_config.file_name());
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            setup,
            historical,
            model,
            output_dir,
            prefix,
            s3_bucket,
            gzip,
            print_json,
        } => {
            let config = PipelineConfig::new(setup)
                .with_historical(historical)
                .with_model(model)
                .with_prefix(prefix);

            let sink: Box<dyn ArtifactSink> = match s3_bucket {
                Some(bucket) => Box::new(S3Sink::from_env(bucket, "", gzip)?),
                None => {
                    if gzip {
                        warn!("--gzip only applies to S3 uploads, ignoring");
                    }
                    Box::new(FsSink::new(output_dir))
                }
            };

            let envelope = run(&config, sink.as_ref()).inspect_err(|e| error!(error = %e, "Prediction failed"))?;
            report(&envelope);

            if print_json {
                let json = serde_json::to_string_pretty(&envelope).context("serializing result")?;
                println!("{json}");
            }
        }
        Commands::InspectModel { model } => {
            let pipeline = LogisticPipeline::load(&model)?;
            let schema = pipeline.schema();
            info!(
                numeric = ?schema.numeric,
                categorical = ?schema.categorical,
                threshold = pipeline.threshold(),
                "Model feature schema"
            );
        }
    }

    Ok(())
}

/// Logs the headline numbers of a finished run.
fn report(envelope: &ResultEnvelope) {
    let perf = &envelope.aggregates.model_performance;
    info!(
        total_parts = envelope.aggregates.summary.total_parts,
        total_errors = perf.total_errors,
        error_rate = perf.error_rate,
        accuracy = perf.accuracy,
        f1 = perf.f1_score,
        fallback = envelope.scoring.fallback_applied,
        "Prediction summary"
    );
    if let Some(note) = &perf.note {
        warn!(note = %note, "Metrics not computed");
    }
    for (artifact, location) in &envelope.output_files {
        info!(artifact = %artifact, location = %location, "Output file");
    }
    for failure in &envelope.artifact_errors {
        error!(artifact = %failure.artifact, reason = %failure.reason, "Output file missing");
    }
}
