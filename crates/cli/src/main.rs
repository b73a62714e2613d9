//! RiverShift CLI - river erosion and accretion over a fishnet

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rivershift_algorithms::change::{
    run_analysis, AnalysisParams, AnalysisRequest, FishnetParams, Stretch, StretchParams,
};
use rivershift_algorithms::vector::area;
use rivershift_core::io::read_layer;
use rivershift_core::vector::geometry_kind;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "rivershift")]
#[command(author, version, about = "River erosion and accretion analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a polygon shapefile
    Info {
        /// Input shapefile
        input: PathBuf,
    },
    /// Run the full erosion/accretion analysis
    Run {
        /// River extent, first (earlier) year
        #[arg(long)]
        year1: Option<PathBuf>,
        /// River extent, second (later) year
        #[arg(long)]
        year2: Option<PathBuf>,
        /// Study area boundary
        #[arg(long)]
        study_area: Option<PathBuf>,
        /// Output directory (created if missing)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fishnet cell size in projection units
        #[arg(short, long, default_value = "30")]
        cell_size: f64,
        /// Cells per stretch
        #[arg(short, long, default_value = "100")]
        stretch_size: u32,
        /// Number of stretches to report per metric
        #[arg(short = 'n', long, default_value = "30")]
        top_n: usize,
        /// Keep the partial cells along the top and right edges
        #[arg(long)]
        partial_edge_cells: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_ranking(label: &str, field: &str, stretches: &[Stretch]) {
    println!("\nTop {} stretches ({}):", stretches.len(), label);
    for (rank, s) in stretches.iter().take(5).enumerate() {
        println!(
            "  {:>2}. stretch {:>4}  {:>3} cells  {} = {:.6}",
            rank + 1,
            s.stretch_id,
            s.cells,
            field,
            s.total_km2
        );
    }
    if stretches.len() > 5 {
        println!("  ... {} more", stretches.len() - 5);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading layer...");
            let layer = read_layer(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            pb.finish_and_clear();

            let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
            let mut empty = 0usize;
            for feature in layer.iter() {
                match &feature.geometry {
                    Some(g) => *kinds.entry(geometry_kind(g)).or_default() += 1,
                    None => empty += 1,
                }
            }
            let total_area: f64 = layer.iter().filter_map(|f| f.geometry.as_ref()).map(area).sum();

            println!("File: {}", input.display());
            println!("Features: {}", layer.len());
            for (kind, count) in &kinds {
                println!("  {}: {}", kind, count);
            }
            if empty > 0 {
                println!("  (no geometry): {}", empty);
            }
            match &layer.crs {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: none (no .prj)"),
            }
            if let Some(bounds) = layer.bounds() {
                println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    bounds.min().x,
                    bounds.min().y,
                    bounds.max().x,
                    bounds.max().y
                );
            }
            println!("Total area: {:.3} (square CRS units)", total_area);
        }

        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            year1,
            year2,
            study_area,
            output,
            cell_size,
            stretch_size,
            top_n,
            partial_edge_cells,
        } => {
            let request = AnalysisRequest {
                year1,
                year2,
                study_area,
                output_dir: output,
            };
            let params = AnalysisParams {
                fishnet: FishnetParams {
                    cell_size,
                    partial_edge_cells,
                },
                stretch: StretchParams { stretch_size, top_n },
            };

            let start = Instant::now();
            let pb = spinner("Running river change analysis...");
            let result = run_analysis(&request, &params);
            pb.finish_and_clear();
            let summary = result.context("Analysis failed")?;
            let elapsed = start.elapsed();

            info!(
                "Fishnet {} cells, {} inside the study area",
                summary.fishnet_cells, summary.clipped_cells
            );
            println!(
                "Working CRS: {}",
                summary
                    .working_crs
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unspecified".into())
            );
            println!("Cells: {} ({} before clipping)", summary.clipped_cells, summary.fishnet_cells);
            println!(
                "Fragments: year 1 = {}, year 2 = {}, unchanged = {}",
                summary.year1_fragments, summary.year2_fragments, summary.unchanged_fragments
            );
            if summary.negative_changes > 0 {
                println!("Cells with negative change: {}", summary.negative_changes);
            }
            print_ranking("erosion", "erosion_km2", &summary.top_erosion);
            print_ranking("accretion", "accretion_km2", &summary.top_accretion);
            println!();

            let dir = summary
                .outputs
                .first()
                .and_then(|p| p.parent())
                .map(PathBuf::from)
                .unwrap_or_default();
            done(&format!("{} layers", summary.outputs.len()), &dir, elapsed);
        }
    }

    Ok(())
}
