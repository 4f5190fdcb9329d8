use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use kbplacer::{apply_report, Pipeline, PlacerConfig, RecordingSink};
use kbplacer_layout::Value;
use kbplacer_place::{ElementInfo, FootprintCatalog, MapCatalog, StandardCatalog};
use kbplacer_route::RouterConfig;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "kbplacer", version, about = "Place and route keyboard switch matrix footprints", long_about = None)]
struct Cli {
    /// Keyboard layout: KLE, VIA, ergogen points or a saved layout (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    layout: PathBuf,

    /// Placement and routing configuration (YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Footprints on the board; without it every SW<n>/D<n> is assumed present
    #[arg(short, long, value_name = "FILE")]
    footprints: Option<PathBuf>,

    /// Route the switch matrix
    #[arg(long)]
    route: bool,

    /// Millimetres per key unit, "X Y" or a single value for both axes
    #[arg(long, value_name = "X Y")]
    key_distance: Option<String>,

    /// Diode descriptor, e.g. "D{} CUSTOM 5.08 3.03 90 BACK"
    #[arg(long, value_name = "DESCRIPTOR")]
    diode: Option<String>,

    /// ';'-separated descriptors of further diodes wired to each switch
    #[arg(long, value_name = "DESCRIPTORS")]
    extra_diodes: Option<String>,

    /// ';'-separated descriptors of footprints that follow each switch
    #[arg(long, value_name = "DESCRIPTORS")]
    additional_elements: Option<String>,

    /// Number keys without matrix annotations in visual order
    #[arg(long)]
    sequential: bool,

    /// Fold alternative layouts onto their default choice
    #[arg(long)]
    collapse: bool,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                error::ErrorCode::Usage as i32
            } else {
                0
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.debug);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_text(path: &Path, what: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {what} {}", path.display()))
}

fn parse_key_distance(text: &str) -> Result<[f64; 2], CliError> {
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::usage(format!("invalid --key-distance \"{text}\": {e}")))?;
    match values.as_slice() {
        [d] => Ok([*d, *d]),
        [x, y] => Ok([*x, *y]),
        _ => Err(CliError::usage(format!(
            "invalid --key-distance \"{text}\": expected one or two numbers"
        ))),
    }
}

fn load_config(cli: &Cli) -> Result<PlacerConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => PlacerConfig::from_path(path)?,
        None => PlacerConfig::default(),
    };
    if let Some(text) = &cli.key_distance {
        config.placement.key_distance = parse_key_distance(text)?;
    }
    if let Some(text) = &cli.diode {
        config.placement.diode = Some(text.parse::<ElementInfo>()?);
    }
    if let Some(text) = &cli.extra_diodes {
        config.placement.extra_diodes = ElementInfo::parse_list(text)?;
    }
    if let Some(text) = &cli.additional_elements {
        config.placement.additional_elements = ElementInfo::parse_list(text)?;
    }
    if cli.sequential {
        config.parse.sequential_fallback = true;
    }
    if cli.collapse {
        config.parse.collapse = true;
    }
    if cli.route && config.route.is_none() {
        config.route = Some(RouterConfig::default());
    }
    Ok(config)
}

fn load_catalog(path: Option<&Path>) -> Result<Box<dyn FootprintCatalog>, CliError> {
    let Some(path) = path else {
        return Ok(Box::new(StandardCatalog::default()));
    };
    let text = read_text(path, "footprints").map_err(|e| CliError::input(format!("{e:#}")))?;
    let catalog = MapCatalog::from_text(&text).map_err(|e| CliError::input(e.to_string()))?;
    debug!(footprints = catalog.len(), "loaded footprint list");
    Ok(Box::new(catalog))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let text = read_text(&cli.layout, "layout").map_err(|e| CliError::input(format!("{e:#}")))?;
    let document = Value::from_text(&text).map_err(|e| CliError::input(e.to_string()))?;
    let catalog = load_catalog(cli.footprints.as_deref())?;

    let report = Pipeline::new(config).run(&document, catalog.as_ref())?;

    let mut sink = RecordingSink::default();
    let failures = apply_report(&report, &mut sink);
    info!(
        footprints = sink.footprints.len(),
        connections = sink.connections.len(),
        rejected = failures.len(),
        "dry run complete"
    );

    let json = report
        .to_json()
        .map_err(|e| CliError::processing(format!("Could not serialize report: {e}")))?;
    match &cli.output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Could not write report {}", path.display()))
            .map_err(|e| CliError::processing(format!("{e:#}")))?,
        None => println!("{json}"),
    }
    Ok(())
}
