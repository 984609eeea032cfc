//! Extraction stage: read OCR result objects back, persist the text, and
//! capture labeled field values.
//!
//! The caller passes the exact result-object keys to process. That keeps
//! the stage honest about a quirk inherited from the original tooling: the
//! driver obtains keys by listing the shared output prefix, which still
//! holds every earlier document's result objects, so later documents
//! re-process them (see [`crate::batch`]). A caller that wants clean
//! per-document extraction can pass a scoped key set instead.
//!
//! The output text file is opened in append mode on purpose. It
//! accumulates recognized text document after document and run after run;
//! nothing ever truncates it.

use crate::config::DEFAULT_FIELD_LABEL;
use crate::error::BatchError;
use crate::storage::ObjectStore;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Compiled pattern locating one labeled field value in recognized text.
///
/// The pattern is the label token, optional colon and whitespace, then one
/// whitespace-delimited capture: `<label>\s*:?\s*(\S+)`. The separator is
/// optional, so `नाव: RAMESH`, `नाव RAMESH`, and `नावRAMESH` all yield
/// `RAMESH`.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    regex: Regex,
}

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&pattern_source(DEFAULT_FIELD_LABEL)).expect("default field pattern compiles")
});

fn pattern_source(label: &str) -> String {
    format!(r"{}\s*:?\s*(\S+)", regex::escape(label))
}

impl FieldPattern {
    /// Compile a pattern for `label`. The label is matched literally.
    pub fn new(label: &str) -> Result<Self, BatchError> {
        let regex = Regex::new(&pattern_source(label))
            .map_err(|e| BatchError::InvalidConfig(format!("field label '{label}': {e}")))?;
        Ok(Self { regex })
    }

    /// All values the pattern captures in `text`, in match order.
    pub fn captures(&self, text: &str) -> Vec<String> {
        self.regex
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect()
    }
}

impl Default for FieldPattern {
    fn default() -> Self {
        Self {
            regex: DEFAULT_PATTERN.clone(),
        }
    }
}

// ── Result-object shape ──────────────────────────────────────────────────

/// One OCR result object: an annotate-file response holding a batch of
/// page annotations (batch size 1 in this pipeline, but the shape allows
/// more).
#[derive(Debug, Deserialize)]
pub struct AnnotateFileResponse {
    #[serde(default)]
    pub responses: Vec<PageAnnotation>,
}

/// One annotated page. `full_text_annotation` is absent when the service
/// detected no text on the page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnnotation {
    pub full_text_annotation: Option<FullTextAnnotation>,
}

/// Aggregated recognized text for a page.
#[derive(Debug, Deserialize)]
pub struct FullTextAnnotation {
    pub text: String,
}

// ── Stage ────────────────────────────────────────────────────────────────

/// Marker written for pages without a full-text annotation.
pub const NO_TEXT_MARKER: &str = "No text detected on this page.\n";

/// Process the result objects named by `keys`.
///
/// For each key: download and parse the annotate-file response, then per
/// page append a `--- Text from <file_name> ---` delimiter and the page
/// text (or [`NO_TEXT_MARKER`]) to `text_path`, and collect every value
/// `pattern` captures. Returns the captured values across all keys and
/// pages, in order.
///
/// Malformed JSON in any result object aborts the stage with
/// [`BatchError::MalformedResult`].
pub async fn run(
    store: &dyn ObjectStore,
    bucket: &str,
    keys: &[String],
    text_path: &Path,
    file_name: &str,
    pattern: &FieldPattern,
) -> Result<Vec<String>, BatchError> {
    let write_err = |e: std::io::Error| BatchError::OutputWrite {
        path: text_path.to_path_buf(),
        source: e,
    };

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(text_path)
        .await
        .map_err(write_err)?;

    let mut extracted = Vec::new();

    for key in keys {
        let bytes = store.download(bucket, key).await?;
        let response: AnnotateFileResponse =
            serde_json::from_slice(&bytes).map_err(|e| BatchError::MalformedResult {
                object: key.clone(),
                source: e,
            })?;
        debug!("Parsed {} page(s) from {}", response.responses.len(), key);

        for page in &response.responses {
            match &page.full_text_annotation {
                Some(annotation) => {
                    file.write_all(
                        format!("\n--- Text from {file_name} ---\n").as_bytes(),
                    )
                    .await
                    .map_err(write_err)?;
                    file.write_all(annotation.text.as_bytes())
                        .await
                        .map_err(write_err)?;
                    file.write_all(b"\n\n").await.map_err(write_err)?;

                    extracted.extend(pattern.captures(&annotation.text));
                }
                None => {
                    file.write_all(NO_TEXT_MARKER.as_bytes())
                        .await
                        .map_err(write_err)?;
                }
            }
        }
    }

    file.flush().await.map_err(write_err)?;
    info!(
        "OCR text from {} saved to {} ({} field value(s))",
        file_name,
        text_path.display(),
        extracted.len()
    );
    Ok(extracted)
}
