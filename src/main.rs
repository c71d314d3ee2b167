//! Mobile AL Tools CLI
//!
//! Resampling, label windowing and location extraction for Mobile AL CSV files.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mobile_al_tools::{
    config::Config,
    core::{LabelConfig, ResampleConfig},
    event::{output_path, Schema},
    pipeline, RunSummary, VERSION,
};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "al-tools")]
#[command(version = VERSION)]
#[command(about = "Preprocessing tools for Mobile AL sensor event files", long_about = None)]
struct Cli {
    /// Schema file describing the timestamp, sensor and label columns
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample data to a uniform rate using up/down sampling
    Resample {
        /// AL CSV input file
        input: PathBuf,

        /// Rate to resample data to (Hz)
        #[arg(allow_negative_numbers = true)]
        resample_rate: f64,

        /// Output file (defaults to the input with 'sampled' added before the extension)
        #[arg(long, short)]
        output_file: Option<PathBuf>,

        /// Gap between events (seconds) that restarts the sampling grid
        #[arg(long, allow_negative_numbers = true)]
        gap_threshold: Option<f64>,

        /// Start the sampling grid on the whole second of the first event
        #[arg(long)]
        align: bool,

        /// Write run statistics as JSON to this file
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Apply labels to windows of data before each label instance
    Label {
        /// AL CSV input file
        input: PathBuf,

        /// Output file (defaults to the input with 'labeled' or 'instances' added before the extension)
        #[arg(long, short)]
        output_file: Option<PathBuf>,

        /// Seconds before a label to start its window
        #[arg(long, allow_negative_numbers = true)]
        window_start: Option<f64>,

        /// Seconds before a label to end its window
        #[arg(long, allow_negative_numbers = true)]
        window_end: Option<f64>,

        /// Label field to apply windows to (defaults to the first label column)
        #[arg(long)]
        label_field: Option<String>,

        /// Only write labeled instances
        #[arg(long, short)]
        filter_instances: bool,

        /// Write run statistics as JSON to this file
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Extract changed latitude/longitude pairs for reverse geocoding
    Latlong {
        /// AL CSV input file
        input: PathBuf,

        /// Output file
        #[arg(long, short, default_value = "latlong")]
        output_file: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Persist the configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level);
    if let Some(e) = config_error {
        warn!("Could not load {}: {e}; using defaults", Config::config_path().display());
    }

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Resample {
            input,
            resample_rate,
            output_file,
            gap_threshold,
            align,
            stats,
        } => {
            let params = ResampleConfig::new(
                resample_rate,
                gap_threshold.unwrap_or(config.gap_threshold_secs),
            )?
            .with_align_start(align);
            let schema = load_schema(cli.schema.as_deref(), &config)?;
            let output = output_file.unwrap_or_else(|| output_path(&input, "sampled"));

            println!("Resampling {} to {} Hz", input.display(), resample_rate);
            println!("Writing to {}", output.display());

            let summary = pipeline::resample_file(&input, &output, &schema, params)
                .with_context(|| format!("resampling {}", input.display()))?;
            report(&summary, stats.as_deref())
        }
        Commands::Label {
            input,
            output_file,
            window_start,
            window_end,
            label_field,
            filter_instances,
            stats,
        } => {
            let mut params = LabelConfig::new(
                window_start.unwrap_or(config.window_start_secs),
                window_end.unwrap_or(config.window_end_secs),
            )?;
            if let Some(field) = label_field.or_else(|| config.label_field.clone()) {
                params = params.with_label_field(field);
            }
            let schema = load_schema(cli.schema.as_deref(), &config)?;
            let tag = if filter_instances { "instances" } else { "labeled" };
            let output = output_file.unwrap_or_else(|| output_path(&input, tag));

            println!(
                "Applying labels to windows of {}-{}s before labels",
                params.window_start, params.window_end
            );
            println!("Reading {} and writing to {}", input.display(), output.display());
            if filter_instances {
                println!("Output will be filtered to only instances");
            }

            let summary =
                pipeline::label_file(&input, &output, &schema, params, filter_instances)
                    .with_context(|| format!("labeling {}", input.display()))?;
            report(&summary, stats.as_deref())
        }
        Commands::Latlong { input, output_file } => {
            let schema = load_schema(cli.schema.as_deref(), &config)?;

            println!("Extracting locations from {}", input.display());
            let summary = pipeline::latlong_file(
                &input,
                &output_file,
                &schema,
                &config.latitude_field,
                &config.longitude_field,
            )
            .with_context(|| format!("extracting locations from {}", input.display()))?;
            report(&summary, None)
        }
        Commands::Config { save } => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("Configuration ({}):", Config::config_path().display());
            println!("{json}");
            if save {
                config.save()?;
                println!("Saved.");
            }
            Ok(())
        }
    }
}

fn load_schema(path: Option<&Path>, config: &Config) -> Result<Schema> {
    let path = path
        .or(config.schema_path.as_deref())
        .ok_or_else(|| anyhow!("no schema given; pass --schema or set schema_path in the config"))?;
    Schema::load(path).with_context(|| format!("loading schema {}", path.display()))
}

fn report(summary: &RunSummary, stats_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", summary.summary());

    if let Some(path) = stats_path {
        summary
            .save(path)
            .with_context(|| format!("writing statistics to {}", path.display()))?;
    }
    Ok(())
}
