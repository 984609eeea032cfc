//! Upload stage: ensure a clean destination object, then upload.
//!
//! The object name is the document's base file name, so re-running a batch
//! reuses names. Deleting any existing object first guarantees the stage
//! is idempotent: two uploads of the same file never conflict and leave
//! exactly one object under the name.

use crate::batch::Document;
use crate::error::BatchError;
use crate::storage::ObjectStore;
use crate::vision::PDF_MIME_TYPE;
use tracing::info;

/// Upload `document` into `bucket` under its base file name, replacing any
/// object already stored under that name.
///
/// Store-layer errors propagate unchanged and are fatal for the document.
pub async fn run(
    store: &dyn ObjectStore,
    bucket: &str,
    document: &Document,
) -> Result<(), BatchError> {
    let name = &document.file_name;

    if store.exists(bucket, name).await? {
        store.delete(bucket, name).await?;
    }

    let bytes = tokio::fs::read(&document.path)
        .await
        .map_err(|e| BatchError::ReadInput {
            path: document.path.clone(),
            source: e,
        })?;

    store.upload(bucket, name, bytes, PDF_MIME_TYPE).await?;
    info!(
        "Uploaded {} to gs://{}/{}",
        document.path.display(),
        bucket,
        name
    );
    Ok(())
}
