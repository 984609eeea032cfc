//! CLI binary for rollscan.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `BatchConfig`, builds the production Google clients, runs the batch,
//! and prints a per-document summary.

use anyhow::{Context, Result};
use clap::Parser;
use rollscan::pipeline::report;
use rollscan::{auth, run_batch, BatchConfig, GcsClient, VisionClient};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Batch OCR for scanned PDF documents via Google Cloud Vision.
///
/// Uploads every matching file in INPUT_DIR to the bucket, runs document
/// text detection, appends the recognized text to output/ocr/<name>.txt,
/// and extracts labeled field values.
#[derive(Debug, Parser)]
#[command(name = "rollscan", version, about)]
struct Cli {
    /// Folder containing the scanned PDF files (scanned non-recursively).
    input_dir: PathBuf,

    /// Cloud Storage bucket to upload documents to.
    #[arg(long, env = "ROLLSCAN_BUCKET")]
    bucket: String,

    /// Service-account JSON key file. Defaults to application-default
    /// credentials (GOOGLE_APPLICATION_CREDENTIALS etc.).
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Label token marking the field to extract.
    #[arg(long, default_value = rollscan::DEFAULT_FIELD_LABEL)]
    label: String,

    /// Bucket-relative prefix for OCR result objects.
    #[arg(long, default_value = rollscan::DEFAULT_OCR_PREFIX)]
    prefix: String,

    /// Per-document OCR deadline in seconds.
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Root folder for local outputs (text under ocr/, workbooks under excel/).
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Input file extension to match.
    #[arg(long, default_value = "pdf")]
    extension: String,

    /// Also write extracted fields to an Excel workbook
    /// (<output-dir>/excel/names.xlsx, one sheet per document).
    #[arg(long)]
    excel: bool,

    /// Verbose logging (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "rollscan=info",
        1 => "rollscan=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut builder = BatchConfig::builder()
        .bucket(&cli.bucket)
        .input_dir(&cli.input_dir)
        .extension(&cli.extension)
        .ocr_prefix(&cli.prefix)
        .output_root(&cli.output_dir)
        .field_label(&cli.label)
        .ocr_timeout_secs(cli.timeout);
    if let Some(ref path) = cli.credentials {
        builder = builder.credentials(path);
    }
    let config = builder.build().context("invalid configuration")?;

    let creds = auth::credentials_provider(&config)
        .await
        .context("failed to resolve Google credentials")?;
    let store = GcsClient::new(creds.clone());
    let vision = VisionClient::new(creds, &config);

    let output = run_batch(&store, &vision, &config)
        .await
        .context("batch aborted")?;

    // ── Summary ──────────────────────────────────────────────────────────
    println!();
    println!("{}", bold(&format!(
        "Processed {} document(s), {} field value(s) in {:.1}s",
        output.stats.total_documents,
        output.stats.total_fields,
        output.stats.total_duration_ms as f64 / 1000.0,
    )));
    for doc in &output.documents {
        println!(
            "  {} {:<40} {:>4} value(s)  {}",
            green("✓"),
            doc.file_name,
            doc.fields.len(),
            dim(&format!("{:.1}s", doc.duration_ms as f64 / 1000.0)),
        );
    }

    if cli.excel {
        let workbook_path = config.excel_output_path("names");
        report::write_workbook(&output.documents, &workbook_path)
            .context("failed to write workbook")?;
        println!("  {} workbook: {}", green("✓"), workbook_path.display());
    }

    Ok(())
}
