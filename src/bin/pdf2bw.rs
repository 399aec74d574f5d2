//! CLI binary for edgequake-pdf2bw.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2bw::config::MAX_RESOLUTION;
use edgequake_pdf2bw::{
    convert_to_file, default_output_path, inspect, preview, CancelFlag, ConversionConfig,
    ConversionProgress, ConversionProgressCallback, ConversionSettings, Pdf2BwError,
    PreviewCandidate, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, progress: ConversionProgress) {
        let secs = self.page_elapsed(progress.pages_completed);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            progress.pages_completed,
            progress.pages_total,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.set_position(progress.pages_completed as u64);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.page_elapsed(page_num);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with defaults (400 dpi, no bias) → scan_bw.pdf
  pdf2bw scan.pdf

  # Explicit output, lower resolution, darker result
  pdf2bw scan.pdf -o out.pdf --resolution 300 --bias 15

  # Compare 9 settings on page 3 before converting
  pdf2bw scan.pdf --preview-page 3 --preview-dir previews/

  # Inspect PDF metadata
  pdf2bw --inspect-only scan.pdf --json

TUNING:
  --bias shifts the per-page Otsu threshold. Positive values turn more grey
  into black (bolder text), negative values clean up dirty backgrounds.
  Higher resolutions keep thin strokes intact at the cost of file size.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to the pdfium shared library
  RUST_LOG          Override log filter (e.g. edgequake_pdf2bw=debug)
  PDF2BW_*          Any flag below, e.g. PDF2BW_RESOLUTION=300
"#;

/// Convert PDF pages into clean black-and-white rasters for e-ink displays.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2bw",
    version,
    about = "Convert PDF pages into clean black-and-white rasters for e-ink displays",
    long_about = "Renders every page of a PDF, binarises it with a per-page Otsu threshold, \
contrast stretch and speckle cleanup, and writes the result as a new image-only PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Output PDF path (default: <input>_bw.pdf next to the input).
    #[arg(short, long, env = "PDF2BW_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering resolution in dpi.
    #[arg(short, long, env = "PDF2BW_RESOLUTION", default_value_t = 400,
          value_parser = clap::value_parser!(u32).range(1..=MAX_RESOLUTION as i64))]
    resolution: u32,

    /// Signed offset added to each page's Otsu threshold.
    #[arg(short, long, env = "PDF2BW_BIAS", default_value_t = 0, allow_hyphen_values = true)]
    bias: i32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2BW_PASSWORD")]
    password: Option<String>,

    /// Cap on the rendered bitmap's longest edge, in pixels.
    #[arg(long, env = "PDF2BW_MAX_PIXELS")]
    max_pixels: Option<u32>,

    /// Title stored in the output PDF.
    #[arg(long, env = "PDF2BW_TITLE")]
    title: Option<String>,

    /// Render a 3×3 preview matrix for this page instead of converting.
    #[arg(long, env = "PDF2BW_PREVIEW_PAGE")]
    preview_page: Option<usize>,

    /// Directory for preview PNGs.
    #[arg(long, env = "PDF2BW_PREVIEW_DIR", default_value = ".")]
    preview_dir: PathBuf,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print results as JSON.
    #[arg(long, env = "PDF2BW_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2BW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2BW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2BW_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && cli.preview_page.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let cancel = CancelFlag::new();
    let config = build_config(&cli, progress_cb, cancel.clone())?;

    // ── Preview mode ─────────────────────────────────────────────────────
    if let Some(page) = cli.preview_page {
        let candidates = preview(&cli.input, page, &config)
            .await
            .with_context(|| format!("Failed to preview page {page}"))?;
        let written = write_previews(&candidates, &cli.preview_dir).await?;

        if cli.json {
            let rows: Vec<serde_json::Value> = candidates
                .iter()
                .zip(&written)
                .map(|(c, path)| {
                    serde_json::json!({
                        "resolution": c.resolution,
                        "threshold_bias": c.threshold_bias,
                        "path": path,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("Failed to serialise previews")?
            );
        } else if !cli.quiet {
            print_preview_grid(&candidates, config.settings);
            eprintln!(
                "{} {} previews written to {}",
                green("✔"),
                candidates.len(),
                bold(&cli.preview_dir.display().to_string())
            );
        }
        return Ok(());
    }

    // ── Conversion ───────────────────────────────────────────────────────
    // Ctrl-C stops at the next page boundary; the atomic write leaves no
    // partial output behind.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let stats = match convert_to_file(&cli.input, &output_path, &config).await {
        Ok(stats) => stats,
        Err(e @ Pdf2BwError::Cancelled { .. }) => {
            if !cli.quiet {
                eprintln!("{} {}", cyan("⚠"), e);
            }
            std::process::exit(130);
        }
        Err(e) => return Err(e).context("Conversion failed"),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} pages  {}  {}ms  →  {}",
            green("✔"),
            stats.total_pages,
            dim(&stats.settings.to_string()),
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancelFlag,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .resolution(cli.resolution)
        .threshold_bias(cli.bias)
        .cancel_flag(cancel);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(px) = cli.max_pixels {
        builder = builder.max_rendered_pixels(px);
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write every candidate as a PNG into `dir`, returning the paths in order.
async fn write_previews(candidates: &[PreviewCandidate], dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut paths = Vec::with_capacity(candidates.len());
    for c in candidates {
        let path = dir.join(c.file_name());
        let png = c.to_png().context("Failed to encode preview")?;
        tokio::fs::write(&path, png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Print the candidate grid, resolution rows by bias columns, marking the
/// current settings.
fn print_preview_grid(candidates: &[PreviewCandidate], current: ConversionSettings) {
    let mut rows: Vec<u32> = candidates.iter().map(|c| c.resolution).collect();
    rows.dedup();
    let mut cols: Vec<i32> = candidates.iter().map(|c| c.threshold_bias).collect();
    cols.sort_unstable();
    cols.dedup();

    let header: String = cols.iter().map(|b| format!("{:>12}", format!("bias {b:+}"))).collect();
    println!("{:>10}{}", "", header);
    for r in rows {
        let cells: String = cols
            .iter()
            .map(|&b| {
                let cell = if r == current.resolution && b == current.threshold_bias {
                    "[current]"
                } else {
                    "·"
                };
                format!("{cell:>12}")
            })
            .collect();
        println!("{:>10}{}", format!("{r} dpi"), cells);
    }
}
