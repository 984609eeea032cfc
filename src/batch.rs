//! Driver loop: run the stage sequence over every document in a folder.
//!
//! Documents are processed strictly one at a time; a document's Upload,
//! Recognition, and Extraction all finish before the next document
//! starts. There is no per-document error isolation: the first stage
//! failure returns immediately and the remaining documents are never
//! touched. Outputs already produced, local text files as well as remote
//! objects, are left exactly as they were when the failure happened.
//!
//! Per-document state machine, no skips, no retries, no rollback:
//!
//! ```text
//! Pending ──▶ Uploaded ──▶ Recognized ──▶ Extracted
//! ```

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::output::{BatchOutput, BatchStats, DocumentResult};
use crate::pipeline::extract::{self, FieldPattern};
use crate::pipeline::{recognize, upload};
use crate::storage::ObjectStore;
use crate::vision::Recognizer;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// One input document: a local path plus its derived names.
///
/// `file_name` doubles as the object name in the bucket; `stem` keys the
/// local output files. Both are fixed for the run.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
}

impl Document {
    /// Derive a document from a path. Returns `None` for paths without a
    /// file name or stem (e.g. `..`).
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self {
            path,
            file_name,
            stem,
        })
    }
}

/// Enumerate input documents: files in `dir` (non-recursive) whose
/// extension matches `extension`, sorted by file name so runs are
/// deterministic regardless of directory order.
pub fn scan_input_dir(dir: &Path, extension: &str) -> Result<Vec<Document>, BatchError> {
    let entries = std::fs::read_dir(dir).map_err(|e| BatchError::InputDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BatchError::InputDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches {
            debug!("Skipping non-{} file: {}", extension, path.display());
            continue;
        }
        if let Some(document) = Document::from_path(path) {
            documents.push(document);
        }
    }

    documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(documents)
}

/// Run the full batch: Upload, Recognition, and Extraction per document.
///
/// The Reporting Stage is not wired in here; call
/// [`crate::pipeline::report::write_workbook`] with the returned
/// [`BatchOutput::documents`] when a workbook is wanted.
///
/// # Errors
/// Any stage error for any document aborts the batch. Earlier documents'
/// outputs remain on disk and in the bucket.
pub async fn run_batch(
    store: &dyn ObjectStore,
    ocr: &dyn Recognizer,
    config: &BatchConfig,
) -> Result<BatchOutput, BatchError> {
    let total_start = Instant::now();
    let started_at = Local::now();
    info!("Started at: {}", started_at.format("%Y-%m-%d %H:%M:%S"));

    let pattern = FieldPattern::new(&config.field_label)?;
    let documents = scan_input_dir(&config.input_dir, &config.extension)?;
    info!(
        "Found {} .{} file(s) in {}",
        documents.len(),
        config.extension,
        config.input_dir.display()
    );

    let mut results = Vec::with_capacity(documents.len());
    for document in &documents {
        let doc_start = Instant::now();
        info!("Processing {}", document.file_name);

        let text_path = config.text_output_path(&document.stem);
        if let Some(parent) = text_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BatchError::OutputWrite {
                    path: text_path.clone(),
                    source: e,
                })?;
        }

        upload::run(store, &config.bucket, document).await?;
        recognize::run(
            ocr,
            &config.bucket,
            &document.file_name,
            &config.ocr_prefix,
            config.ocr_timeout(),
        )
        .await?;

        // The output prefix is shared, unscoped state across the whole
        // run. Result objects from earlier documents are still under it
        // and get re-processed here, exactly as the tooling this replaces
        // did. Drive extract::run with a scoped key set to opt out.
        let keys = store.list(&config.bucket, &config.ocr_prefix).await?;
        let fields = extract::run(
            store,
            &config.bucket,
            &keys,
            &text_path,
            &document.file_name,
            &pattern,
        )
        .await?;

        results.push(DocumentResult {
            file_name: document.file_name.clone(),
            fields,
            text_path,
            result_keys: keys,
            duration_ms: doc_start.elapsed().as_millis() as u64,
        });
    }

    let completed_at = Local::now();
    info!("Completed at: {}", completed_at.format("%Y-%m-%d %H:%M:%S"));

    let stats = BatchStats {
        total_documents: results.len(),
        total_fields: results.iter().map(|r| r.fields.len()).sum(),
        started_at,
        completed_at,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    Ok(BatchOutput {
        documents: results,
        stats,
    })
}
