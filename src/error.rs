//! Error types for the rollscan library.
//!
//! A single [`BatchError`] covers the four failure classes of the pipeline:
//!
//! * **Store errors** — existence check, delete, upload, listing, or
//!   download against the object store failed.
//! * **OCR errors** — the recognition job could not be submitted, reported
//!   a failure, or did not finish before the deadline.
//! * **Parse errors** — a result object was not a valid annotate-file
//!   response.
//! * **Filesystem errors** — the input folder could not be read or an
//!   output file could not be written.
//!
//! The pipeline catches none of these. Every stage propagates with `?`, so
//! the first failure aborts the current document and, because documents run
//! strictly in sequence, the rest of the batch with it. Outputs already
//! written for earlier documents are left in place.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the rollscan library.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Filesystem errors ─────────────────────────────────────────────────
    /// The configured input folder could not be enumerated.
    #[error("Cannot read input folder '{path}': {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local input document could not be read.
    #[error("Cannot read input file '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file or its parent directory could not be written.
    #[error("Failed to write output '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Store errors ──────────────────────────────────────────────────────
    /// Google credentials could not be resolved or refreshed.
    #[error("Authentication failed: {reason}\nSet GOOGLE_APPLICATION_CREDENTIALS or pass --credentials.")]
    Auth { reason: String },

    /// A store request failed before a status code was available
    /// (connection refused, DNS, TLS, timeout).
    #[error("Object store {op} failed for gs://{bucket}/{object}: {reason}")]
    StoreRequest {
        op: &'static str,
        bucket: String,
        object: String,
        reason: String,
    },

    /// The store answered with a non-success HTTP status.
    #[error("Object store {op} returned HTTP {status} for gs://{bucket}/{object}")]
    StoreStatus {
        op: &'static str,
        bucket: String,
        object: String,
        status: u16,
    },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The asynchronous annotate-file request was rejected.
    #[error("OCR submission failed for gs://{bucket}/{object}: {reason}")]
    OcrSubmit {
        bucket: String,
        object: String,
        reason: String,
    },

    /// The recognition operation completed with an error status.
    #[error("OCR failed for '{object}': {detail}")]
    OcrFailed { object: String, detail: String },

    /// The recognition operation did not finish before the deadline.
    #[error("OCR timed out after {secs}s for '{object}'")]
    OcrTimeout { object: String, secs: u64 },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// A result object under the output prefix was not valid JSON or was
    /// missing the expected annotate-file shape.
    #[error("Malformed OCR result '{object}': {source}")]
    MalformedResult {
        object: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Reporting errors ──────────────────────────────────────────────────
    /// The workbook could not be assembled or saved.
    #[error("Workbook write failed for '{path}': {reason}")]
    Workbook { path: PathBuf, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_status_display() {
        let e = BatchError::StoreStatus {
            op: "upload",
            bucket: "rolls".into(),
            object: "ward-7.pdf".into(),
            status: 403,
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 403"), "got: {msg}");
        assert!(msg.contains("gs://rolls/ward-7.pdf"));
    }

    #[test]
    fn ocr_timeout_display() {
        let e = BatchError::OcrTimeout {
            object: "ward-7.pdf".into(),
            secs: 300,
        };
        assert!(e.to_string().contains("300s"));
    }

    #[test]
    fn malformed_result_carries_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = BatchError::MalformedResult {
            object: "output/ocr/ward-7-output-1-to-1.json".into(),
            source,
        };
        assert!(std::error::Error::source(&e).is_some());
    }
}
