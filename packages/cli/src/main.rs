#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point.
//!
//! ```text
//! urbansight analyze "<address>" [--radius 800] [--config urbansight.toml]
//!                                [--no-narrative] [--output report.json]
//!                                [--lat 40.71 --lon -74.00]
//! urbansight analyze-batch addresses.txt [--radius 800] [--config urbansight.toml]
//!                                      [--no-narrative] [--output reports.json]
//! urbansight config [--config urbansight.toml]
//! urbansight categories
//! ```
//!
//! Set `RUST_LOG=info` to follow the pipeline stages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use urbansight_ai::insight::LlmNarrativeGenerator;
use urbansight_ai::providers::create_provider_from_env;
use urbansight_analysis::{AnalysisReport, AnalysisRequest, Orchestrator};
use urbansight_config::EngineConfig;
use urbansight_geocoder::nominatim::NominatimGeocoder;
use urbansight_geocoder::{Geocoder, StaticGeocoder};
use urbansight_poi::classifier::{TagMatch, rules_for};
use urbansight_poi::overpass::OverpassProvider;
use urbansight_poi_models::{Coordinate, PoiCategory};

#[derive(Parser)]
#[command(
    name = "urbansight",
    about = "Score walkability and nearby amenities for an address"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an address and emit the JSON report
    Analyze {
        /// Street address to analyze
        address: String,
        /// Search radius in meters (overrides the configuration)
        #[arg(long)]
        radius: Option<f64>,
        /// Configuration file (defaults to `URBANSIGHT_CONFIG`, then built-ins)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip the narrative stage
        #[arg(long)]
        no_narrative: bool,
        /// Write the report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Skip geocoding and use this latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Skip geocoding and use this longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// Analyze every address in a file (one per line, `#` comments allowed)
    /// and emit a JSON array of the successful reports
    AnalyzeBatch {
        /// File with one address per line
        file: PathBuf,
        /// Search radius in meters (overrides the configuration)
        #[arg(long)]
        radius: Option<f64>,
        /// Configuration file (defaults to `URBANSIGHT_CONFIG`, then built-ins)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip the narrative stage
        #[arg(long)]
        no_narrative: bool,
        /// Write the reports here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate and print the effective configuration
    Config {
        /// Configuration file (defaults to `URBANSIGHT_CONFIG`, then built-ins)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List POI categories and the tags that select them
    Categories,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            address,
            radius,
            config,
            no_narrative,
            output,
            lat,
            lon,
        } => {
            let geocoder: Option<Arc<dyn Geocoder>> = match (lat, lon) {
                (Some(lat), Some(lon)) => {
                    Some(Arc::new(StaticGeocoder::new(Coordinate::new(lat, lon))))
                }
                _ => None,
            };
            let orchestrator = build_orchestrator(config.as_deref(), no_narrative, geocoder)?;

            let mut request = AnalysisRequest::new(address);
            if let Some(radius) = radius {
                request = request.with_radius(radius);
            }

            let report = orchestrator.analyze(&request).await?;
            let json = report.to_json_pretty()?;

            write_output(output.as_deref(), &json)?;
            print_summary(&report);
        }
        Commands::AnalyzeBatch {
            file,
            radius,
            config,
            no_narrative,
            output,
        } => {
            let orchestrator = build_orchestrator(config.as_deref(), no_narrative, None)?;

            let requests: Vec<AnalysisRequest> = std::fs::read_to_string(&file)?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(|address| {
                    let request = AnalysisRequest::new(address);
                    match radius {
                        Some(radius) => request.with_radius(radius),
                        None => request,
                    }
                })
                .collect();

            let reports: Vec<AnalysisReport> = orchestrator
                .analyze_batch(&requests)
                .await
                .into_iter()
                .filter_map(Result::ok)
                .collect();

            if reports.is_empty() && !requests.is_empty() {
                return Err(format!("none of {} addresses could be analyzed", requests.len()).into());
            }

            write_output(output.as_deref(), &serde_json::to_string_pretty(&reports)?)?;
            for report in &reports {
                print_summary(report);
            }
            eprintln!("\n{}/{} addresses analyzed", reports.len(), requests.len());
        }
        Commands::Config { config } => {
            let config = EngineConfig::load(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
        }
        Commands::Categories => {
            println!("{:<16} {:<16} {:<7} TAGS", "CATEGORY", "GROUP", "SCORED");
            println!("{}", "-".repeat(80));

            for &category in PoiCategory::all() {
                let tags = rules_for(category)
                    .iter()
                    .map(|rule| match rule.values {
                        TagMatch::Any => format!("{}=*", rule.key),
                        TagMatch::OneOf(values) => format!("{}={}", rule.key, values.join("|")),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let name: &str = category.as_ref();
                let group = category.group().to_string();

                println!(
                    "{:<16} {:<16} {:<7} {}",
                    name,
                    group,
                    if category.is_scored() { "yes" } else { "no" },
                    if tags.is_empty() { "-" } else { tags.as_str() }
                );
            }
        }
    }

    Ok(())
}

/// Builds an orchestrator against the public Nominatim and Overpass
/// endpoints, or `geocoder` when given.
fn build_orchestrator(
    config_path: Option<&Path>,
    no_narrative: bool,
    geocoder: Option<Arc<dyn Geocoder>>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let mut config = EngineConfig::load(config_path)?;
    if no_narrative {
        config.narrative.enabled = false;
    }

    let geocoder: Arc<dyn Geocoder> = match geocoder {
        Some(geocoder) => geocoder,
        None => Arc::new(NominatimGeocoder::from_env()?),
    };
    let narrative_enabled = config.narrative.enabled;
    let mut orchestrator =
        Orchestrator::new(geocoder, Arc::new(OverpassProvider::from_env()?), config);

    if narrative_enabled {
        match create_provider_from_env() {
            Ok(provider) => {
                log::info!("Narratives from {}", provider.model());
                orchestrator =
                    orchestrator.with_narrator(Arc::new(LlmNarrativeGenerator::new(provider)));
            }
            Err(e) => log::warn!("No narrative provider configured: {e}"),
        }
    }

    Ok(orchestrator)
}

/// Writes `json` to `path`, or stdout when no path is given.
fn write_output(path: Option<&Path>, json: &str) -> std::io::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Prints a short human-readable summary to stderr.
fn print_summary(report: &AnalysisReport) {
    let scores = &report.scores;
    eprintln!();
    eprintln!(
        "{} ({})",
        report.matched_address.as_deref().unwrap_or(&report.address),
        report.coordinate
    );
    eprintln!(
        "  Walk Score {:.1}  Composite {:.1} ({})  {} POIs within {:.0} m",
        scores.walk, scores.composite, scores.grade, report.summary.total_pois, report.radius_m
    );

    for strength in &report.highlights.strengths {
        eprintln!("  + {strength}");
    }
    for concern in &report.highlights.concerns {
        eprintln!("  - {concern}");
    }
    for degradation in &report.status.degradations {
        eprintln!("  ! {degradation}");
    }
}
