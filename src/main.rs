use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use roxmltree::Document;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use layout_sbgn_rs::dump::write_layout_dump;
use layout_sbgn_rs::render::{render_diagram, svg_output_path, DEFAULT_PADDING_PX};
use layout_sbgn_rs::{load_config, parse_sbgnml, LayoutCompletion, SbgnModel};

#[derive(Parser)]
#[command(author, version, about = "Complete and render SBGNML layouts", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill in missing geometry, then render.
    #[command(name = "complete_sbgnml")]
    CompleteSbgnml {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "sbgnml.png")]
        output: PathBuf,
        /// JSON file overriding completion settings.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the completed layout as JSON.
        #[arg(long)]
        dump: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_PADDING_PX)]
        padding: f64,
    },
    /// Render a file whose geometry is already complete.
    #[command(name = "draw_sbgnml")]
    DrawSbgnml {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "sbgnml.png")]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_PADDING_PX)]
        padding: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::CompleteSbgnml {
            input,
            output,
            config,
            dump,
            padding,
        } => complete_sbgnml(&input, &output, config.as_deref(), dump.as_deref(), padding),
        Command::DrawSbgnml {
            input,
            output,
            padding,
        } => draw_sbgnml(&input, &output, padding),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_model(input: &Path) -> Result<SbgnModel> {
    let xml = fs::read_to_string(input).with_context(|| format!("Failed to read {:?}", input))?;
    let doc = Document::parse(&xml).context("Failed to parse SBGN XML")?;
    parse_sbgnml(&doc)
}

fn complete_sbgnml(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    dump: Option<&Path>,
    padding: f64,
) -> Result<()> {
    let config = load_config(config)?;
    let model = read_model(input)?;
    let mut run = LayoutCompletion::new(config);
    model.register(&mut run)?;
    let layout = run.complete()?;

    for dropped in &layout.dropped_arcs {
        warn!("{dropped}");
    }
    info!(
        completed = layout.completed.len(),
        orphaned = layout.orphaned.len(),
        "completed {:?}",
        input
    );
    if let Some(dump) = dump {
        write_layout_dump(dump, &layout)
            .with_context(|| format!("Failed to write layout dump {:?}", dump))?;
    }
    render_diagram(&layout.glyphs, &layout.arcs, output, padding)?;
    info!(png = ?output, svg = ?svg_output_path(output), "wrote diagram");
    Ok(())
}

fn draw_sbgnml(input: &Path, output: &Path, padding: f64) -> Result<()> {
    let model = read_model(input)?;
    let missing: Vec<&str> = model
        .glyphs
        .iter()
        .filter(|glyph| !glyph.bounds.is_complete())
        .map(|glyph| glyph.id.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!(
            "Glyphs without complete geometry: {}; run complete_sbgnml first",
            missing.join(", ")
        ));
    }
    let arcs: Vec<_> = model.arcs.into_iter().map(|parsed| parsed.arc).collect();
    render_diagram(&model.glyphs, &arcs, output, padding)?;
    info!(png = ?output, svg = ?svg_output_path(output), "wrote diagram");
    Ok(())
}
