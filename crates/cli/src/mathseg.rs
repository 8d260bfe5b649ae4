//! mathseg - find math-expression regions in classified OCR output
//!
//! Reads page JSON (one page object or an array of pages), groups the
//! math-classified blobs of every page into segments and writes them as a
//! rect list, one line per segment, or as JSON.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, error};

use mathseg_core::SegParams;
use mathseg_core::api::{SegmentOptions, segment_pages};
use mathseg_core::converter::{CoordinateSpace, RectConverter};
use mathseg_core::page::{PageInput, load_pages};

/// Coordinate convention of the written rect list.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Coords {
    /// Origin at the bottom-left corner, y up (as computed)
    #[default]
    BottomLeft,
    /// Origin at the top-left corner, y down (image convention)
    TopLeft,
}

impl From<Coords> for CoordinateSpace {
    fn from(c: Coords) -> Self {
        match c {
            Coords::BottomLeft => CoordinateSpace::BottomLeft,
            Coords::TopLeft => CoordinateSpace::TopLeft,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// One `[page ]type left top right bottom` line per segment
    #[default]
    Rects,
    /// Full per-page results, including run statistics
    Json,
}

/// Groups math-classified OCR blobs into math-expression regions.
#[derive(Parser, Debug)]
#[command(name = "mathseg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One or more page JSON files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Output file ("-" for stdout)
    #[arg(short = 'o', long = "outfile", default_value = "-")]
    outfile: String,

    /// Output format
    #[arg(short = 't', long = "output-type", value_enum, default_value_t = OutputFormat::Rects)]
    output_type: OutputFormat,

    /// Coordinate space of the rect list
    #[arg(long, value_enum, default_value_t = Coords::BottomLeft)]
    coords: Coords,

    /// Prefix every rect line with its page name
    #[arg(long = "page-names", action = ArgAction::SetTrue)]
    page_names: bool,

    /// Report each math-classified blob as its own segment, without grouping
    #[arg(long, action = ArgAction::SetTrue)]
    detections: bool,

    /// Worker threads (defaults to the available parallelism)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    // === Segmentation parameters ===
    /// JSON file with segmentation parameters; missing fields keep defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid cell edge length in pixels
    #[arg(long = "cell-size")]
    cell_size: Option<i32>,

    /// Maximum merge depth per seed
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// Keep math labels on the topmost text row
    #[arg(long = "keep-header", action = ArgAction::SetTrue)]
    keep_header: bool,
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Builds parameters from the config file and command line overrides.
fn build_params(args: &Args) -> Result<SegParams> {
    let mut params = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            SegParams::from_json(&json)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => SegParams::default(),
    };
    if let Some(cell) = args.cell_size {
        params.grid_cell_size = cell;
    }
    if let Some(depth) = args.max_depth {
        params.max_merge_depth = depth;
    }
    if args.keep_header {
        params.suppress_header_row = false;
    }
    params.validate().context("Invalid segmentation parameters")?;
    Ok(params)
}

fn read_pages(path: &Path) -> Result<Vec<PageInput>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    load_pages(BufReader::new(file))
        .with_context(|| format!("Failed to parse pages from {}", path.display()))
}

/// Segments every page of one file and writes the results. Returns the
/// number of pages that failed.
fn process_file<W: Write>(
    path: &Path,
    writer: &mut W,
    args: &Args,
    options: &SegmentOptions,
) -> Result<usize> {
    let pages = read_pages(path)?;
    debug!(file = %path.display(), pages = pages.len(), "loaded pages");
    let results = segment_pages(&pages, options)?;

    let mut failed = 0;
    match args.output_type {
        OutputFormat::Rects => {
            let mut converter = RectConverter::new(writer, args.coords.into(), args.page_names);
            for (input, result) in pages.iter().zip(results) {
                match result {
                    Ok(page) => converter.receive_page(&page)?,
                    Err(e) => {
                        error!(file = %path.display(), page = %input.name, "{e}");
                        failed += 1;
                    }
                }
            }
        }
        OutputFormat::Json => {
            let mut ok = Vec::with_capacity(results.len());
            for (input, result) in pages.iter().zip(results) {
                match result {
                    Ok(page) => ok.push(page),
                    Err(e) => {
                        error!(file = %path.display(), page = %input.name, "{e}");
                        failed += 1;
                    }
                }
            }
            serde_json::to_writer_pretty(&mut *writer, &ok)?;
            writeln!(writer)?;
        }
    }
    Ok(failed)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let options = SegmentOptions {
        params: build_params(&args)?,
        threads: args.threads,
        detections_only: args.detections,
    };

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("Failed to create output file: {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    let mut failed = 0;
    for path in &args.files {
        failed += process_file(path, &mut output, &args, &options)
            .with_context(|| format!("Error processing {}", path.display()))?;
    }
    output.flush()?;

    if failed > 0 {
        anyhow::bail!("{failed} page(s) could not be segmented");
    }
    Ok(())
}
