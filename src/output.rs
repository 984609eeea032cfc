//! Result types returned by a batch run.

use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Outcome of one document's trip through the pipeline.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    /// Base file name of the source document (also its object name).
    pub file_name: String,

    /// Field values captured during extraction, in the order the pattern
    /// matched them across result objects and pages.
    pub fields: Vec<String>,

    /// Local text file the recognized text was appended to.
    pub text_path: PathBuf,

    /// Result-object keys extraction processed for this document.
    pub result_keys: Vec<String>,

    /// Wall-clock time for the document's three stages.
    pub duration_ms: u64,
}

/// Timing and volume statistics for a whole run.
#[derive(Debug, Clone)]
pub struct BatchStats {
    pub total_documents: usize,
    pub total_fields: usize,
    pub started_at: DateTime<Local>,
    pub completed_at: DateTime<Local>,
    pub total_duration_ms: u64,
}

/// Everything a successful batch run produced.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Per-document results, in processing (file-name) order.
    pub documents: Vec<DocumentResult>,
    pub stats: BatchStats,
}
