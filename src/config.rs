//! Configuration for a batch OCR run.
//!
//! All behaviour is controlled through [`BatchConfig`], built via
//! [`BatchConfigBuilder`]. Nothing is read from process-global state at run
//! time: the bucket name, input folder, credentials path, and the field
//! label all live in the config and are handed to client construction and
//! to each stage explicitly, which is what makes the stages testable with
//! fake collaborators.

use crate::error::BatchError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Devanagari label token marking the field to extract ("name").
pub const DEFAULT_FIELD_LABEL: &str = "नाव";

/// Bucket-relative prefix the OCR service writes result objects under.
pub const DEFAULT_OCR_PREFIX: &str = "output/ocr/";

/// Configuration for a batch OCR run.
///
/// # Example
/// ```rust
/// use rollscan::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .bucket("bucket_election")
///     .input_dir("scans/ward-7")
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr_timeout_secs, 300);
/// ```
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Name of the bucket documents are uploaded to and results read from.
    pub bucket: String,

    /// Folder containing the input documents. Scanned non-recursively.
    pub input_dir: PathBuf,

    /// Input file extension, without the dot. Default: "pdf".
    pub extension: String,

    /// Path to a service-account JSON key file. When `None` the
    /// application-default credential chain is used (environment variable,
    /// well-known file, metadata server).
    pub credentials: Option<PathBuf>,

    /// Bucket-relative prefix for OCR result objects. Always ends with '/'.
    /// Default: [`DEFAULT_OCR_PREFIX`].
    ///
    /// The prefix is shared by every document in the run; result objects
    /// are never cleaned up between documents. See
    /// [`crate::pipeline::extract`] for the consequences.
    pub ocr_prefix: String,

    /// Root for local outputs. Text files land at `<root>/ocr/<stem>.txt`,
    /// workbooks at `<root>/excel/<stem>.xlsx`. Default: "output".
    pub output_root: PathBuf,

    /// Label token located by the field pattern. Default: [`DEFAULT_FIELD_LABEL`].
    pub field_label: String,

    /// Deadline for one recognition operation in seconds. Default: 300.
    pub ocr_timeout_secs: u64,

    /// Interval between operation-status polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Pages per OCR result object. Default: 1 (one JSON object per page).
    pub batch_size: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            input_dir: PathBuf::from("."),
            extension: "pdf".to_string(),
            credentials: None,
            ocr_prefix: DEFAULT_OCR_PREFIX.to_string(),
            output_root: PathBuf::from("output"),
            field_label: DEFAULT_FIELD_LABEL.to_string(),
            ocr_timeout_secs: 300,
            poll_interval_ms: 2000,
            batch_size: 1,
        }
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Local path the cumulative OCR text for `stem` is appended to.
    pub fn text_output_path(&self, stem: &str) -> PathBuf {
        self.output_root.join("ocr").join(format!("{stem}.txt"))
    }

    /// Local path a workbook for `stem` is saved to.
    pub fn excel_output_path(&self, stem: &str) -> PathBuf {
        self.output_root.join("excel").join(format!("{stem}.xlsx"))
    }

    /// Recognition deadline as a [`Duration`].
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    /// Operation poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.input_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.config.extension = ext.trim_start_matches('.').to_string();
        self
    }

    pub fn credentials(mut self, path: impl AsRef<Path>) -> Self {
        self.config.credentials = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the result-object prefix. A trailing '/' is appended when
    /// missing so object names concatenate cleanly.
    pub fn ocr_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.config.ocr_prefix = prefix;
        self
    }

    pub fn output_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_root = dir.as_ref().to_path_buf();
        self
    }

    pub fn field_label(mut self, label: impl Into<String>) -> Self {
        self.config.field_label = label.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(1);
        self
    }

    pub fn batch_size(mut self, n: u32) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.bucket.is_empty() {
            return Err(BatchError::InvalidConfig("Bucket name is empty".into()));
        }
        if c.ocr_timeout_secs == 0 {
            return Err(BatchError::InvalidConfig(
                "OCR timeout must be at least 1 second".into(),
            ));
        }
        if c.field_label.is_empty() {
            return Err(BatchError::InvalidConfig("Field label is empty".into()));
        }
        Ok(self.config)
    }
}
