//! maskmatch CLI
//!
//! Targets are read from stdin as concatenated or line-delimited GeoJSON
//! Features (FeatureCollections are flattened); results go to stdout one
//! Feature per line. Logs go to stderr.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use maskmatch::{
    filter_features, join_features, load_masks, mask_source, match_areas, write_split,
    CoordinateSpace, FeatureIds, FeatureReader, FeatureWriter, FuzzyAreaMatcher, MaskmatchConfig,
    SpatialJoiner, Splitter,
};

#[derive(Parser)]
#[command(name = "maskmatch")]
#[command(about = "Match GeoJSON target features against a mask set", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split targets into features uniquely claimed by one mask and the rest.
    ///
    /// Non-unique features (misses, unresolved near hits, hits on masks with
    /// several hits) are written to stdout one per line. Unique features are
    /// written as one FeatureCollection to --uniques, or stderr.
    Split {
        /// Mask FeatureCollection (defaults to pipeline.mask_source)
        #[arg(long)]
        mask: Option<String>,

        /// Where to write the unique FeatureCollection
        #[arg(long)]
        uniques: Option<PathBuf>,

        /// Where to write targets set aside for invalid topology
        #[arg(long)]
        unresolvable: Option<PathBuf>,

        /// Near-hit buffer distance
        #[arg(long)]
        buffer: Option<f64>,

        /// Coordinates are projected and the buffer is in coordinate units
        /// rather than metres over lon/lat
        #[arg(long)]
        planar: bool,
    },
    /// Copy properties from the feature each target falls in.
    Join {
        /// FeatureCollection to join against
        #[arg(long = "join")]
        join: String,

        /// Property to copy; repeat for several
        #[arg(long = "property", required = true)]
        properties: Vec<String>,
    },
    /// Keep only targets that intersect no mask.
    Filter {
        /// Mask FeatureCollection (defaults to pipeline.mask_source)
        #[arg(long)]
        mask: Option<String>,
    },
    /// Tag polygons with the id of the task area covering the same ground.
    MatchAreas {
        /// Task-area FeatureCollection
        #[arg(long)]
        tasks: String,

        /// Largest accepted uncovered share of the hull union
        #[arg(long)]
        tolerance: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MaskmatchConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MaskmatchConfig::default(),
    };
    config.apply_env().context("applying environment overrides")?;
    init_logging(&config, cli.log_json);

    run(cli.command, config)
}

fn init_logging(config: &MaskmatchConfig, force_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if force_json || config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn targets() -> FeatureReader<BufReader<io::Stdin>> {
    FeatureReader::new(BufReader::new(io::stdin()), FeatureIds::new())
}

fn run(command: Command, mut config: MaskmatchConfig) -> Result<()> {
    let stdout = BufWriter::new(io::stdout().lock());

    match command {
        Command::Split {
            mask,
            uniques,
            unresolvable,
            buffer,
            planar,
        } => {
            if let Some(buffer) = buffer {
                config.registrar.buffer_distance = buffer;
            }
            if planar {
                config.registrar.coordinate_space = CoordinateSpace::Planar;
            }
            config.validate()?;

            let source = mask_source(mask.as_deref(), &config)?;
            let index = load_masks(source).with_context(|| format!("loading masks {source}"))?;
            let splitter = Splitter::new(
                &index,
                config.registrar_config(),
                config.pipeline.on_topology_error,
            )?;
            let outcome = splitter.run(targets())?;

            match uniques {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_split(&outcome, stdout, BufWriter::new(file))?;
                }
                None => write_split(&outcome, stdout, io::stderr().lock())?,
            }

            if let Some(path) = unresolvable {
                let file =
                    File::create(&path).with_context(|| format!("creating {}", path.display()))?;
                let mut writer = FeatureWriter::new(BufWriter::new(file));
                writer.write_features(&outcome.unresolvable)?;
                writer.flush()?;
            }
        }
        Command::Join { join, properties } => {
            let index = load_masks(&join).with_context(|| format!("loading join features {join}"))?;
            let joiner = SpatialJoiner::new(properties);
            join_features(&index, &joiner, targets(), stdout)?;
        }
        Command::Filter { mask } => {
            let source = mask_source(mask.as_deref(), &config)?;
            let index = load_masks(source).with_context(|| format!("loading masks {source}"))?;
            filter_features(&index, targets(), stdout)?;
        }
        Command::MatchAreas { tasks, tolerance } => {
            if let Some(tolerance) = tolerance {
                config.fuzzy.tolerance = tolerance;
            }
            config.validate()?;
            let index = load_masks(&tasks).with_context(|| format!("loading tasks {tasks}"))?;
            let matcher = FuzzyAreaMatcher::new(config.fuzzy_config())?;
            match_areas(&index, &matcher, targets(), stdout)?;
        }
    }

    Ok(())
}
