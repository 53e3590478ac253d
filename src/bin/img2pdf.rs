//! CLI binary for img2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use img2pdf::{
    convert, inspect, ConversionConfig, ConversionOutput, ConversionProgressCallback,
    ConversionStats, PageSize, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a bar that advances once per placed image.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Reading");
        bar.set_message("images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }

    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_images: usize) {
        self.activate_bar(total_images);
    }

    fn on_image_start(&self, image_num: usize, total_images: usize) {
        self.bar.set_message(format!("image {image_num}/{total_images}"));
    }

    fn on_image_complete(&self, image_num: usize, total_images: usize, fraction: f64) {
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}",
            green("✓"),
            image_num,
            total_images,
            dim(&format!("{:>3.0}%", fraction * 100.0)),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, image_num: usize, total_images: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}",
            red("✗"),
            image_num,
            total_images,
            red(&msg)
        ));
    }

    fn on_conversion_complete(&self, _total_pages: usize, _output_bytes: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Two images → imagens-convertidas-<timestamp>.pdf in the current directory
  img2pdf cover.jpg page-2.png

  # Choose the output file
  img2pdf scans/*.png -o scans.pdf

  # US Letter pages with a half-inch margin
  img2pdf --page-size letter --margin 36 photo.jpg -o photo.pdf

  # Custom page size in points
  img2pdf --page-size 400x600 a.png b.png

  # Mix local files and URLs; other formats are skipped with a warning
  img2pdf https://example.com/a.jpg local.png notes.txt

  # Sizes and dimensions only, no PDF
  img2pdf --inspect-only --json *.jpg

PAGE LAYOUT:
  Images are never enlarged. An image wider than the page minus margins is
  scaled to that width; if it is still too tall it is scaled to fit the
  height. Every image is centred on its own page.

ENVIRONMENT VARIABLES:
  Every flag can also be set through IMG2PDF_<FLAG>, e.g. IMG2PDF_MARGIN=36.
  RUST_LOG overrides the log filter chosen by -v / -q.
"#;

/// Combine JPEG and PNG images into one PDF, one image per page.
#[derive(Parser, Debug)]
#[command(
    name = "img2pdf",
    version,
    about = "Combine JPEG and PNG images into one PDF, one image per page",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file paths or HTTP/HTTPS URLs, in page order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the PDF to this file.
    #[arg(short, long, env = "IMG2PDF_OUTPUT", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for the PDF, saved under its suggested timestamped name.
    #[arg(long, env = "IMG2PDF_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Page size: a4, letter, legal, or <W>x<H> in points.
    #[arg(long, env = "IMG2PDF_PAGE_SIZE", default_value = "a4", value_parser = parse_page_size)]
    page_size: PageSize,

    /// Minimum blank border around each image, in points.
    #[arg(long, env = "IMG2PDF_MARGIN", default_value_t = img2pdf::config::DEFAULT_MARGIN)]
    margin: f64,

    /// Prefix of the suggested file name.
    #[arg(long, env = "IMG2PDF_PREFIX", default_value = img2pdf::config::DEFAULT_FILE_PREFIX)]
    prefix: String,

    /// Document title stored in the PDF metadata.
    #[arg(long, env = "IMG2PDF_TITLE")]
    title: Option<String>,

    /// Re-encode JPEGs as raw pixels instead of embedding them as-is.
    #[arg(long, env = "IMG2PDF_NO_JPEG_PASSTHROUGH")]
    no_jpeg_passthrough: bool,

    /// Number of inputs read or downloaded at the same time.
    #[arg(long, env = "IMG2PDF_FETCH_CONCURRENCY", default_value_t = 4)]
    fetch_concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMG2PDF_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Print image sizes and dimensions only, no PDF.
    #[arg(long, env = "IMG2PDF_INSPECT_ONLY")]
    inspect_only: bool,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "IMG2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2PDF_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_page_size(s: &str) -> Result<PageSize, String> {
    PageSize::parse(s).ok_or_else(|| {
        format!("'{s}' is not a page size (use a4, letter, legal or <W>x<H> in points)")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let (infos, rejected) = inspect(&cli.inputs, &config)
            .await
            .context("Failed to inspect images")?;

        if cli.json {
            let json = serde_json::json!({ "images": infos, "rejected": rejected });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).context("Failed to serialize image info")?
            );
        } else {
            for info in &infos {
                println!(
                    "{:<32} {:<10} {:>5}×{:<5} {:>10}",
                    info.name, info.media_type, info.width, info.height, info.formatted_size
                );
            }
            report_rejections(&rejected, cli.quiet);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = match convert(&cli.inputs, &config).await {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref p) = progress {
                p.abandon();
            }
            return Err(e).context("Conversion failed");
        }
    };

    let path = match cli.output {
        Some(ref path) => output.result.save_to(path).await,
        None => output.result.save_in_dir(&cli.out_dir).await,
    }
    .context("Failed to save PDF")?;

    if cli.json {
        print_json(&output, &path)?;
    } else {
        report_rejections(&output.rejected, cli.quiet);
        if !cli.quiet {
            eprintln!("{}", summary_line(&output.stats, &path));
        }
    }

    Ok(())
}

fn summary_line(stats: &ConversionStats, path: &std::path::Path) -> String {
    format!(
        "{}  {} pages  {}  {}ms  →  {}",
        green("✔"),
        bold(&stats.pages.to_string()),
        img2pdf::format_file_size(stats.output_bytes as u64),
        stats.total_duration_ms,
        bold(&path.display().to_string()),
    )
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    if cli.inputs.is_empty() {
        bail!("No input images given");
    }

    let mut builder = ConversionConfig::builder()
        .page_size(cli.page_size)
        .margin(cli.margin)
        .file_prefix(cli.prefix.clone())
        .jpeg_passthrough(!cli.no_jpeg_passthrough)
        .fetch_concurrency(cli.fetch_concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref title) = cli.title {
        builder = builder.document_title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid options")
}

fn report_rejections(rejected: &[img2pdf::IngestRejection], quiet: bool) {
    if quiet || rejected.is_empty() {
        return;
    }
    eprintln!(
        "{} {} input(s) skipped:",
        yellow("⚠"),
        bold(&rejected.len().to_string())
    );
    for r in rejected {
        eprintln!("   {} {}", dim(&r.input), r.reason.lines().next().unwrap_or(""));
    }
}

fn print_json(output: &ConversionOutput, path: &std::path::Path) -> Result<()> {
    let json = serde_json::json!({
        "path": path,
        "result": &output.result,
        "rejected": &output.rejected,
        "stats": &output.stats,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&json).context("Failed to serialise output")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_flag_accepts_names_and_dimensions() {
        assert_eq!(parse_page_size("Letter"), Ok(PageSize::Letter));
        assert_eq!(
            parse_page_size("300x500"),
            Ok(PageSize::Custom {
                width: 300.0,
                height: 500.0
            })
        );
        assert!(parse_page_size("huge").unwrap_err().contains("huge"));
    }

    #[test]
    fn progress_bar_leaves_the_summary_to_main() {
        let cb = CliProgressCallback::new();
        cb.on_conversion_start(1);
        cb.on_conversion_complete(1, 2048);
        assert!(cb.bar.is_finished());

        let stats = ConversionStats {
            total_inputs: 1,
            accepted_images: 1,
            rejected_inputs: 0,
            pages: 1,
            output_bytes: 2048,
            fetch_duration_ms: 0,
            assembly_duration_ms: 3,
            total_duration_ms: 3,
        };
        let line = summary_line(&stats, std::path::Path::new("out.pdf"));
        assert_eq!(line.matches("pages").count(), 1);
        assert!(line.contains("out.pdf"));
    }

    #[test]
    fn output_and_out_dir_conflict() {
        let parsed = Cli::try_parse_from(["img2pdf", "a.png", "-o", "x.pdf", "--out-dir", "d"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
