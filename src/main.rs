use anyhow::Context;
use clap::{Args, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::Colorize;
use geodetect::GeocodeEngine;
use geodetect::builder::FeatureBuilder;
use geodetect::config::GeoConfig;
use geodetect::geo::ImageSize;
use geodetect::imagesize::read_dimensions;
use geodetect::run::{RunContext, load_inference_result, run};
use geodetect::schema::{FeatureCollection, RunMeta, RunStatus};
use geodetect::tile::TileMetadata;
use std::io::{IsTerminal, stderr};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "geodetect",
    about = "Place object detections from an inference result on the map",
    arg_required_else_help = true
)]
struct Cli {
    /// Disable color
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn one inference result into a GeoJSON FeatureCollection
    Geocode(GeocodeArgs),
    /// Process a working directory and write detections.geojson + meta.json
    Run(RunArgs),
    /// Print the JSON Schema of the FeatureCollection output
    Schema,
}

#[derive(Args, Clone)]
struct GeocodeArgs {
    /// Inference result JSON
    #[arg(long, value_name = "FILE")]
    result: PathBuf,

    /// Tile metadata JSON with bbox_wgs84
    #[arg(long, value_name = "FILE")]
    tile_meta: Option<PathBuf>,

    /// Source image, read for its dimensions
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Write the FeatureCollection here instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Print the run status record instead of the FeatureCollection
    #[arg(long)]
    meta: bool,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Working directory holding inputs/ and data/
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,
}

fn detect_color_choice() -> ColorChoice {
    // Scan args before clap so help/errors honor `--no-color`.
    let mut args = std::env::args_os();
    args.next();
    let flag = args
        .take_while(|arg| arg != "--")
        .any(|arg| arg == "--no-color");
    if flag || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn status_line(meta: &RunMeta, color: bool) -> String {
    let label = meta.status.as_str();
    let label = if !color {
        label.to_string()
    } else if meta.status == RunStatus::Ok {
        label.green().to_string()
    } else if meta.status.is_degraded() {
        label.yellow().to_string()
    } else {
        label.red().to_string()
    };
    let mut line = format!(
        "status: {} ({} feature(s), {} prediction(s))",
        label, meta.counts.features_written, meta.counts.predictions_found
    );
    if let Some(message) = &meta.message {
        line.push_str(" - ");
        line.push_str(message);
    }
    line
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn run_geocode(args: GeocodeArgs, config: &GeoConfig, color: bool) -> anyhow::Result<()> {
    let result = load_inference_result(&args.result)?;

    // Unusable tile metadata degrades the run instead of failing it.
    let tile = args
        .tile_meta
        .as_deref()
        .and_then(|path| match TileMetadata::load(path) {
            Ok(tile) => Some(tile),
            Err(e) => {
                log::warn!("tile metadata unusable: {}", e);
                None
            }
        });

    // A zero --width/--height is unusable, so the image header still gets a say.
    let size = args
        .width
        .zip(args.height)
        .and_then(|(w, h)| ImageSize::new(w, h))
        .or_else(|| {
            args.image.as_deref().and_then(|path| {
                read_dimensions(path)
                    .map_err(|e| log::warn!("cannot read size of {}: {}", path.display(), e))
                    .ok()
            })
        });

    let engine = GeocodeEngine::new().with_builder(
        FeatureBuilder::new().with_fallback_marker(config.output.fallback_marker),
    );
    let outcome = engine.geocode(&result, tile.as_ref(), size);

    let mut meta = RunMeta::new(outcome.status);
    meta.message = outcome.diagnostic.clone();
    meta.counts = outcome.counts;
    meta.fallback = outcome.fallback;
    meta.input_image = args.image.as_ref().map(|p| p.display().to_string());

    let pretty = config.output.pretty;
    if args.meta {
        println!("{}", to_json(&meta, pretty)?);
        return Ok(());
    }

    let rendered = to_json(&outcome.collection, pretty)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, rendered + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{}", status_line(&meta, color));
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn run_dir(args: RunArgs, config: GeoConfig, color: bool) -> Result<(), i32> {
    let ctx = RunContext::new(args.root, config);
    match run(&ctx) {
        Ok(report) => {
            eprintln!("{}", status_line(&report.meta, color));
            Ok(())
        }
        Err(e) if e.is_configuration() => {
            eprintln!("Error: {}", e);
            Err(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(1)
        }
    }
}

fn run_schema() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(FeatureCollection);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn main() {
    let color = detect_color_choice();
    let matches = Cli::command().color(color).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    init_logging(cli.verbose);

    let want_color = stderr().is_terminal() && !cli.no_color && !matches!(color, ColorChoice::Never);
    if !want_color {
        colored::control::set_override(false);
    }
    let config = GeoConfig::load(cli.config.as_deref());

    let code = match cli.command {
        Some(Commands::Geocode(args)) => run_geocode(args, &config, want_color)
            .map_err(|e| {
                eprintln!("Error: {:#}", e);
                1
            }),
        Some(Commands::Run(args)) => run_dir(args, config, want_color),
        Some(Commands::Schema) => run_schema().map_err(|e| {
            eprintln!("Error: {:#}", e);
            1
        }),
        None => Ok(()),
    };
    if let Err(code) = code {
        std::process::exit(code);
    }
}
