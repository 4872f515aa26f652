//! # CLI Module
//!
//! Command-line interface for summerdays, including:
//! - Argument parsing with clap
//! - Request file loading (JSON/YAML) with CLI overrides
//! - Environment variable support with SUMMERDAYS_ prefix
//! - Subcommands for counting, catalog search, file inspection and templates
//! - Progress reporting and logging

use crate::catalog::Catalog;
use crate::info::{dataset_info, print_dataset_info_human, print_dataset_info_json};
use crate::input::{CatalogQuery, LocationSpec, RequestConfig};
use crate::stats::DEFAULT_THRESHOLD_CELSIUS;
use crate::{process_request, report};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Count summer days at a location from CMIP-style climate archives
#[derive(Parser, Debug)]
#[command(name = "summerdays")]
#[command(about = "Count the days above a temperature threshold for a place and year")]
#[command(version)]
#[command(long_about = "
summerdays resolves a place name to coordinates, finds the matching daily
maximum temperature dataset in a CSV catalog, extracts the annual series at
the nearest model grid cell and counts the days above a threshold.

FEATURES:
  • Catalog search by model, experiment, member, variable and frequency
  • Free-text geocoding via Nominatim, or explicit coordinates
  • Local, S3 and HTTPS dataset and catalog locations
  • Standard, 365-day and 360-day model calendars
  • Annual series export to Parquet or CSV
  • Shell completions: Auto-completion for bash, zsh, fish, and PowerShell

EXAMPLES:
  # Count summer days from a request file
  summerdays count --config request.json

  # Everything on the command line
  summerdays count --catalog catalog.csv --model MPI-ESM1-2-HR \\
    --experiment ssp585 --member r1i1p1f1 --variable tasmax --frequency day \\
    --place 'Hamburg' --year 2050

  # Explicit coordinates and a custom threshold
  summerdays count --config request.json --lat 53.55 --lon 9.99 --threshold 30

  # List catalog records matching a query
  summerdays search --catalog s3://bucket/catalog.csv --variable tasmax

  # File inspection
  summerdays info data/tasmax.nc --detailed

  # Generate a request template
  summerdays template basic --format yaml > request.yaml
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Request file path (JSON or YAML)
    #[arg(short, long, global = true, env = "SUMMERDAYS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count summer days for a place and year
    #[command(long_about = "
Count the days above a temperature threshold for a place and year.

The request can come from a JSON/YAML file, from command-line arguments,
or a mix of both: any argument given on the command line overrides the
corresponding field of the request file.

EXAMPLES:
  # Request file only
  summerdays count --config request.json

  # Request file with a different year and place
  summerdays count --config request.json --year 2071 --place 'Lisbon'

  # No request file at all
  summerdays count --catalog catalog.csv --model MPI-ESM1-2-HR \\
    --experiment ssp585 --member r1i1p1f1 --variable tasmax --frequency day \\
    --lat 53.55 --lon 9.99 --year 2050 --output series.parquet
")]
    Count {
        /// Catalog locator (local path, s3:// or https://)
        #[arg(long, env = "SUMMERDAYS_CATALOG")]
        catalog: Option<String>,

        /// Source model identifier
        #[arg(long, env = "SUMMERDAYS_MODEL")]
        model: Option<String>,

        /// Experiment identifier
        #[arg(long, env = "SUMMERDAYS_EXPERIMENT")]
        experiment: Option<String>,

        /// Ensemble member identifier
        #[arg(long, env = "SUMMERDAYS_MEMBER")]
        member: Option<String>,

        /// Variable identifier
        #[arg(short = 'n', long, env = "SUMMERDAYS_VARIABLE")]
        variable: Option<String>,

        /// Temporal resolution identifier
        #[arg(long, env = "SUMMERDAYS_FREQUENCY")]
        frequency: Option<String>,

        /// Free-text place name, resolved through the geocoder
        #[arg(long, env = "SUMMERDAYS_PLACE", conflicts_with_all = ["lat", "lon"])]
        place: Option<String>,

        /// Target latitude in degrees (skips geocoding, requires --lon)
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Target longitude in degrees (skips geocoding, requires --lat)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Target calendar year
        #[arg(short, long, env = "SUMMERDAYS_YEAR")]
        year: Option<i32>,

        /// Summer-day threshold in degrees Celsius
        #[arg(short, long, env = "SUMMERDAYS_THRESHOLD", allow_hyphen_values = true)]
        threshold: Option<f64>,

        /// Export the annual series to this path (.parquet or .csv)
        #[arg(short, long, env = "SUMMERDAYS_OUTPUT")]
        output: Option<String>,
    },

    /// List catalog records matching a query
    #[command(long_about = "
List the catalog records matching the given dataset facets.

Omitted facets fall back to the request file when --config is given;
a facet present in neither place is reported as an error, so a search
needs either a full request file or all five facets on the command line.

EXAMPLES:
  # Facets from a request file
  summerdays search --config request.json

  # Fully spelled out
  summerdays search --catalog catalog.csv --model MPI-ESM1-2-HR \\
    --experiment ssp585 --member r1i1p1f1 --variable tasmax --frequency day
")]
    Search {
        /// Catalog locator (local path, s3:// or https://)
        #[arg(long, env = "SUMMERDAYS_CATALOG")]
        catalog: Option<String>,

        /// Source model identifier
        #[arg(long, env = "SUMMERDAYS_MODEL")]
        model: Option<String>,

        /// Experiment identifier
        #[arg(long, env = "SUMMERDAYS_EXPERIMENT")]
        experiment: Option<String>,

        /// Ensemble member identifier
        #[arg(long, env = "SUMMERDAYS_MEMBER")]
        member: Option<String>,

        /// Variable identifier
        #[arg(short = 'n', long, env = "SUMMERDAYS_VARIABLE")]
        variable: Option<String>,

        /// Temporal resolution identifier
        #[arg(long, env = "SUMMERDAYS_FREQUENCY")]
        frequency: Option<String>,
    },

    /// Show information about a NetCDF dataset
    #[command(long_about = "
Inspect NetCDF datasets and display structure information.

This command analyzes NetCDF files (local, S3 or HTTPS) and displays:
• File dimensions and their sizes
• Available variables and their attributes
• Variable-specific information (when specified)

EXAMPLES:
  # Basic file info
  summerdays info data/tasmax.nc

  # Detailed information about one variable
  summerdays info data/tasmax.nc --detailed -n tasmax

  # JSON output for scripting
  summerdays info s3://bucket/tasmax.nc --format json
")]
    Info {
        /// NetCDF dataset path (local, s3:// or https://)
        file: String,

        /// Show detailed variable information
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Generate request file templates
    #[command(long_about = "
Generate request file templates for common use cases.

Available templates:
• basic: place-name request against a local catalog
• coords: explicit-coordinate request with series export
• s3: request against an S3-hosted catalog

EXAMPLES:
  # Generate basic JSON template
  summerdays template basic

  # Generate YAML template to file
  summerdays template coords --format yaml -o request.yaml
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Request file format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for various shells.

Supports bash, zsh, fish, and PowerShell completion generation.

EXAMPLES:
  # Generate bash completions
  summerdays completions bash > ~/.bash_completion.d/summerdays

  # Save zsh completions to file
  summerdays completions zsh -o _summerdays
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Place-name request against a local catalog
    Basic,
    /// Explicit-coordinate request with series export
    Coords,
    /// Request against an S3-hosted catalog
    S3,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON request format
    Json,
    /// YAML request format
    Yaml,
}

/// Facet overrides shared by `count` and `search`.
#[derive(Debug, Clone, Default)]
pub struct QueryOverrides {
    pub catalog: Option<String>,
    pub model: Option<String>,
    pub experiment: Option<String>,
    pub member: Option<String>,
    pub variable: Option<String>,
    pub frequency: Option<String>,
}

/// Builds the effective request from an optional request file and CLI
/// overrides. CLI arguments win over file values; a field present in
/// neither is an error.
pub fn resolve_request(
    base: Option<RequestConfig>,
    overrides: &QueryOverrides,
    place: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    year: Option<i32>,
    threshold: Option<f64>,
    output: Option<String>,
) -> Result<RequestConfig, String> {
    let location = match (place, lat, lon) {
        (Some(place), _, _) => Some(LocationSpec::Place { place }),
        (None, Some(lat), Some(lon)) => Some(LocationSpec::Coords { lat, lon }),
        (None, None, None) => None,
        _ => return Err("Both --lat and --lon are required for coordinates".to_string()),
    };

    let config = match base {
        Some(base) => RequestConfig {
            catalog: overrides.catalog.clone().unwrap_or(base.catalog),
            query: merge_query(Some(base.query), overrides)?,
            location: location.unwrap_or(base.location),
            year: year.unwrap_or(base.year),
            threshold_celsius: threshold.unwrap_or(base.threshold_celsius),
            output: output.or(base.output),
        },
        None => RequestConfig {
            catalog: overrides
                .catalog
                .clone()
                .ok_or("Missing catalog: give --catalog or a request file")?,
            query: merge_query(None, overrides)?,
            location: location.ok_or("Missing location: give --place or --lat/--lon")?,
            year: year.ok_or("Missing year: give --year or a request file")?,
            threshold_celsius: threshold.unwrap_or(DEFAULT_THRESHOLD_CELSIUS),
            output,
        },
    };

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Merges facet overrides into an optional base query.
pub fn merge_query(
    base: Option<CatalogQuery>,
    overrides: &QueryOverrides,
) -> Result<CatalogQuery, String> {
    let pick = |name: &str, over: &Option<String>, base: Option<String>| -> Result<String, String> {
        over.clone()
            .or(base)
            .ok_or_else(|| format!("Missing {}: give --{} or a request file", name, name))
    };

    let (model, experiment, member, variable, frequency) = match base {
        Some(q) => (
            Some(q.model),
            Some(q.experiment),
            Some(q.member),
            Some(q.variable),
            Some(q.frequency),
        ),
        None => (None, None, None, None, None),
    };

    Ok(CatalogQuery {
        model: pick("model", &overrides.model, model)?,
        experiment: pick("experiment", &overrides.experiment, experiment)?,
        member: pick("member", &overrides.member, member)?,
        variable: pick("variable", &overrides.variable, variable)?,
        frequency: pick("frequency", &overrides.frequency, frequency)?,
    })
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn spinner(quiet: bool, message: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn template_config(template_type: &TemplateType) -> RequestConfig {
    let query = CatalogQuery {
        model: "MPI-ESM1-2-HR".to_string(),
        experiment: "ssp585".to_string(),
        member: "r1i1p1f1".to_string(),
        variable: "tasmax".to_string(),
        frequency: "day".to_string(),
    };

    match template_type {
        TemplateType::Basic => RequestConfig {
            catalog: "catalog.csv".to_string(),
            query,
            location: LocationSpec::Place {
                place: "Hamburg".to_string(),
            },
            year: 2050,
            threshold_celsius: DEFAULT_THRESHOLD_CELSIUS,
            output: None,
        },
        TemplateType::Coords => RequestConfig {
            catalog: "catalog.csv".to_string(),
            query,
            location: LocationSpec::Coords {
                lat: 53.55,
                lon: 9.99,
            },
            year: 2050,
            threshold_celsius: DEFAULT_THRESHOLD_CELSIUS,
            output: Some("series.parquet".to_string()),
        },
        TemplateType::S3 => RequestConfig {
            catalog: "s3://my-climate-bucket/catalog.csv".to_string(),
            query,
            location: LocationSpec::Place {
                place: "Hamburg".to_string(),
            },
            year: 2050,
            threshold_celsius: DEFAULT_THRESHOLD_CELSIUS,
            output: Some("s3://my-climate-bucket/series.parquet".to_string()),
        },
    }
}

fn write_or_print(content: &str, output: Option<&PathBuf>) -> Result<(), std::io::Error> {
    match output {
        Some(path) => std::fs::write(path, content),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Parses arguments, dispatches the chosen subcommand and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match execute(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let base_config = match &cli.config {
        Some(path) => Some(RequestConfig::from_file(path)?),
        None => None,
    };

    match cli.command {
        Commands::Count {
            catalog,
            model,
            experiment,
            member,
            variable,
            frequency,
            place,
            lat,
            lon,
            year,
            threshold,
            output,
        } => {
            let overrides = QueryOverrides {
                catalog,
                model,
                experiment,
                member,
                variable,
                frequency,
            };
            let config = resolve_request(
                base_config,
                &overrides,
                place,
                lat,
                lon,
                year,
                threshold,
                output,
            )?;

            if !cli.quiet && cli.output_format == OutputFormat::Human {
                report::echo_request(&config);
            }

            let pb = spinner(cli.quiet, "Computing summer days...");
            let result = process_request(&config).await;
            pb.finish_and_clear();
            let summer_report = result?;

            match cli.output_format {
                OutputFormat::Human => report::print_report(&summer_report),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&summer_report)?)
                }
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summer_report)?),
            }
            Ok(())
        }

        Commands::Search {
            catalog,
            model,
            experiment,
            member,
            variable,
            frequency,
        } => {
            let overrides = QueryOverrides {
                catalog,
                model,
                experiment,
                member,
                variable,
                frequency,
            };
            let catalog_uri = overrides
                .catalog
                .clone()
                .or(base_config.as_ref().map(|c| c.catalog.clone()))
                .ok_or("Missing catalog: give --catalog or a request file")?;
            let query = merge_query(base_config.map(|c| c.query), &overrides)?;

            let pb = spinner(cli.quiet, "Searching catalog...");
            let result = Catalog::load(&catalog_uri).await;
            pb.finish_and_clear();
            let records = result?.search(&query);

            match cli.output_format {
                OutputFormat::Human => report::print_search_results(&records),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&records)?),
            }
            Ok(())
        }

        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let pb = spinner(cli.quiet, "Reading dataset structure...");
            let result = dataset_info(&file, variable.as_deref(), detailed).await;
            pb.finish_and_clear();
            let info = result?;

            match format.unwrap_or(cli.output_format) {
                OutputFormat::Human => print_dataset_info_human(&info),
                OutputFormat::Json => print_dataset_info_json(&info)?,
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&info)?),
            }
            Ok(())
        }

        Commands::Template {
            template_type,
            output,
            format,
        } => {
            let config = template_config(&template_type);
            let content = match format {
                ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
                ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
            };
            write_or_print(&content, output.as_ref())?;
            Ok(())
        }

        Commands::Completions { shell, output } => {
            let mut cmd = Cli::command();
            match output {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)?;
                    clap_complete::generate(shell, &mut cmd, "summerdays", &mut file);
                    file.flush()?;
                }
                None => {
                    clap_complete::generate(shell, &mut cmd, "summerdays", &mut std::io::stdout());
                }
            }
            Ok(())
        }
    }
}
