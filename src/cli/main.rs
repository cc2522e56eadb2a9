//! epigeo command line.
//!
//! Normalizes EMPRES-i, GenBank and ECDC exports into one schema,
//! geocoding every record through a persistent Nominatim cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use epigeo::cache::FeatureCache;
use epigeo::config::Config;
use epigeo::nominatim::{Geocoder, NominatimClient};
use epigeo::records::SamplingMode;
use epigeo::reference::ReferenceData;
use epigeo::resolve::DataSource;
use epigeo::workflow::{self, NormalizeOptions};

#[derive(Parser, Debug)]
#[command(name = "epigeo")]
#[command(about = "Normalize and geocode epidemiological surveillance data")]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize an input file
    Normalize {
        /// Input data source
        #[arg(short = 's', long = "data-source", value_enum)]
        source: DataSource,

        /// Input CSV file
        input: PathBuf,

        /// Output file name
        #[arg(short = 'f', long)]
        output_file: Option<String>,

        /// Output directory (defaults to the working directory)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Also write one geometry file per referenced feature
        #[arg(short = 'a', long = "write-auxiliaries")]
        write_auxiliaries: bool,

        /// Only process a sample of 10 rows
        #[arg(long)]
        dry_run: bool,

        /// Which rows a dry run keeps
        #[arg(long, value_enum, default_value = "top")]
        sample_mode: SamplingMode,
    },

    /// Merge normalized files
    Merge,

    /// Delete the feature cache
    ClearCache,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Normalize {
            source,
            input,
            output_file,
            output_dir,
            write_auxiliaries,
            dry_run,
            sample_mode,
        } => {
            if !input.is_file() {
                anyhow::bail!("Input file {} does not exist", input.display());
            }

            let options = NormalizeOptions {
                source,
                input,
                output_file,
                output_dir,
                write_geometries: write_auxiliaries,
                dry_run,
                sample_mode,
            };
            run_normalize(&config, &options).await
        }
        Command::Merge => {
            workflow::merge_data()?;
            Ok(())
        }
        Command::ClearCache => {
            workflow::clear_cache(&config).context("Failed to clear the feature cache")?;
            Ok(())
        }
    }
}

async fn run_normalize(config: &Config, options: &NormalizeOptions) -> Result<()> {
    info!("epigeo normalize");
    info!("Source: {}", options.source.label());
    info!("File: {}", options.input.display());

    let reference = ReferenceData::load(&config.paths.reference_dir)
        .context("Failed to load reference data")?;

    let cache_path = config.cache_path()?;
    let cache = FeatureCache::open(&cache_path)
        .with_context(|| format!("Failed to open feature cache {}", cache_path.display()))?;

    let client = NominatimClient::new(&config.geocoder).context("Failed to build HTTP client")?;
    let mut geocoder = Geocoder::new(client, &cache, &config.geocoder);

    let summary = workflow::normalize_data(
        options,
        &reference,
        &mut geocoder,
        config.geocoder.max_permutation_tokens,
    )
    .await
    .context("Normalization failed")?;

    info!("Normalized data saved to {}", summary.output_file.display());
    if !summary.geometry_files.is_empty() {
        info!("{} geometry files written", summary.geometry_files.len());
    }
    Ok(())
}
