//! CLI binary for pdf2fax.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2fax::{
    convert_input, convert_to_file, inspect, inspect_container, ConversionConfig, ConversionMode,
    ConversionProgressCallback, ProgressCallback,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

/// Live progress bar plus one log line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the page count.
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
            page_started: Mutex::new(None),
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
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, black_pixels: u64) {
        let elapsed_ms = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<14}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{black_pixels:>9} black")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, output_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages converted  {}",
            green("✔"),
            bold(&total_pages.to_string()),
            dim(&format!("({} KiB)", output_bytes.div_ceil(1024))),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert to a Group 4 TIFF (default mode: dither)
  pdf2fax document.pdf -o document.tif

  # Crisp black text, no halftoning
  pdf2fax --mode threshold invoice.pdf -o invoice.tif

  # Faint scans: stretch contrast before thresholding
  pdf2fax --mode normalized-threshold scan.pdf -o scan.tif

  # Reproducible dithering
  pdf2fax --seed 42 brochure.pdf -o brochure.tif

  # Convert from URL, TIFF bytes on stdout
  pdf2fax https://example.com/form.pdf > form.tif

  # Inspect PDF metadata
  pdf2fax --inspect-only document.pdf

  # List the pages of an existing TIFF
  pdf2fax --inspect-tiff document.tif --json

MODES:
  threshold              black below 50% luminance, white otherwise
  dither                 per-pixel random threshold; grays become dot density
  normalized-threshold   stretch darkest → black, median → white, then threshold
  normalized-dither      stretch, then dither

OUTPUT:
  Pages are rendered at 500 DPI and stored as 1-bit CCITT Group 4 strips,
  tagged 300 dpi, one TIFF directory per page.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override the log filter (e.g. pdf2fax=debug)
  PDF2FAX_*               Every flag below can also be set this way
"#;

/// Convert PDF files and URLs to bi-level Group 4 TIFF.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2fax",
    version,
    about = "Convert PDF files and URLs to bi-level Group 4 TIFF",
    long_about = "Convert PDF documents (local files or URLs) to multi-page, 1-bit TIFF files \
with CCITT Group 4 compression, ready for fax transmission or archival.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL (a TIFF path with --inspect-tiff).
    input: String,

    /// Write the TIFF to this file instead of stdout.
    #[arg(short, long, env = "PDF2FAX_OUTPUT")]
    output: Option<PathBuf>,

    /// Binarization mode: threshold, dither, normalized-threshold, normalized-dither.
    #[arg(long, env = "PDF2FAX_MODE", default_value = "dither", value_parser = parse_mode)]
    mode: ConversionMode,

    /// Seed for the dithering generator (reproducible output).
    #[arg(long, env = "PDF2FAX_SEED")]
    seed: Option<u64>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2FAX_PASSWORD")]
    password: Option<String>,

    /// Print conversion stats (or metadata) as JSON on stdout. Converting
    /// with --json needs -o, since stdout carries the JSON.
    #[arg(long, env = "PDF2FAX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2FAX_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long, conflicts_with = "inspect_tiff")]
    inspect_only: bool,

    /// Treat the input as a TIFF and list its pages.
    #[arg(long)]
    inspect_tiff: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2FAX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2FAX_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2FAX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

fn parse_mode(s: &str) -> std::result::Result<ConversionMode, String> {
    s.parse::<ConversionMode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    check_output_target(&cli)?;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let to_stdout = cli.output.is_none();
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && io::stderr().is_terminal();
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

    // ── Inspect modes ────────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    if cli.inspect_tiff {
        let bytes = tokio::fs::read(&cli.input)
            .await
            .with_context(|| format!("Failed to read {}", cli.input))?;
        let summary = inspect_container(&bytes).context("Failed to read TIFF directories")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("File:   {} ({} bytes)", cli.input, summary.file_bytes);
            println!("Pages:  {}", summary.pages.len());
            for (i, page) in summary.pages.iter().enumerate() {
                let dpi = page
                    .x_resolution
                    .map(|(n, d)| format!("{}/{}", n, d))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "  {:>3}  {}x{} px  compression={}  res={}  {} bytes",
                    i + 1,
                    page.width,
                    page.height,
                    page.compression,
                    dpi,
                    page.strip_byte_count
                );
            }
        }
        return Ok(());
    }

    if to_stdout && io::stdout().is_terminal() {
        anyhow::bail!("Refusing to write binary TIFF to a terminal; use -o <FILE> or redirect stdout");
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let stats = if let Some(ref output_path) = cli.output {
        let stats = convert_to_file(&cli.input, output_path, &config)
            .await
            .context("Conversion failed")?;

        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {} pages  {}ms  →  {}",
                green("✔"),
                stats.total_pages,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        stats
    } else {
        let output = convert_input(&cli.input, &config)
            .await
            .context("Conversion failed")?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(&output.tiff)
            .context("Failed to write to stdout")?;
        handle.flush().context("Failed to flush stdout")?;

        if !cli.quiet && !show_progress {
            eprintln!(
                "Converted {} pages in {}ms ({} bytes)",
                output.stats.total_pages, output.stats.total_duration_ms, output.stats.output_bytes
            );
        }
        output.stats
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
        println!("{json}");
    }

    Ok(())
}

/// Stdout holds either the TIFF or the JSON stats, never both.
fn check_output_target(cli: &Cli) -> Result<()> {
    if cli.json && cli.output.is_none() && !cli.inspect_only && !cli.inspect_tiff {
        anyhow::bail!("--json prints the conversion stats on stdout; use -o <FILE> for the TIFF");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .mode(cli.mode)
        .download_timeout_secs(cli.download_timeout);

    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
