//! # rollscan
//!
//! Batch OCR for scanned PDF documents. Each file in an input folder is
//! uploaded to Cloud Storage, run through Cloud Vision's asynchronous
//! document-text-detection, and the recognized text is read back,
//! appended to a cumulative text file, and scanned for labeled field
//! values (by default the Devanagari label "नाव", "name"). Extracted
//! values can be written to an Excel workbook on request.
//!
//! ## Pipeline Overview
//!
//! ```text
//! scans/*.pdf
//!  │
//!  ├─ 1. Upload     delete stale object, put the file in the bucket
//!  ├─ 2. Recognize  files:asyncBatchAnnotate, poll until done (300 s cap)
//!  ├─ 3. Extract    read result JSON, append text, capture field values
//!  └─ 4. Report     one workbook sheet per document (opt-in)
//! ```
//!
//! Processing is strictly sequential: one document completes all of its
//! stages before the next begins, and the first error aborts the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollscan::{auth, run_batch, BatchConfig, GcsClient, VisionClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .bucket("bucket_election")
//!         .input_dir("scans/ward-7")
//!         .build()?;
//!
//!     let creds = auth::credentials_provider(&config).await?;
//!     let store = GcsClient::new(creds.clone());
//!     let vision = VisionClient::new(creds, &config);
//!
//!     let output = run_batch(&store, &vision, &config).await?;
//!     for doc in &output.documents {
//!         println!("{}: {} field value(s)", doc.file_name, doc.fields.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Collaborator seams
//!
//! The object store and the OCR service are reached through the
//! [`ObjectStore`] and [`Recognizer`] traits. The production
//! implementations ([`GcsClient`], [`VisionClient`]) speak the Google REST
//! APIs; [`MemoryStore`] and test-local recognizer fakes run the same
//! pipeline entirely in process.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rollscan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod vision;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_batch, scan_input_dir, Document};
pub use config::{BatchConfig, BatchConfigBuilder, DEFAULT_FIELD_LABEL, DEFAULT_OCR_PREFIX};
pub use error::BatchError;
pub use output::{BatchOutput, BatchStats, DocumentResult};
pub use pipeline::extract::FieldPattern;
pub use storage::{GcsClient, MemoryStore, ObjectStore};
pub use vision::{Recognizer, VisionClient};
