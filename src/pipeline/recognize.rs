//! Recognition stage: submit the stored document for OCR and wait.
//!
//! Thin by design. Request construction, operation polling, and the wire
//! format all live in [`crate::vision`]; this stage only ties a document's
//! object name to the configured output prefix and deadline so the driver
//! reads as the plain stage sequence.

use crate::error::BatchError;
use crate::vision::Recognizer;
use std::time::Duration;
use tracing::info;

/// Run text detection on `gs://<bucket>/<object>`.
///
/// Blocks until the remote job completes. A timeout or service error is
/// fatal for the document; result objects that were already written under
/// `output_prefix` are left in the bucket.
pub async fn run(
    ocr: &dyn Recognizer,
    bucket: &str,
    object: &str,
    output_prefix: &str,
    timeout: Duration,
) -> Result<(), BatchError> {
    info!("Submitting OCR for gs://{}/{}", bucket, object);
    ocr.recognize(bucket, object, output_prefix, timeout).await
}
