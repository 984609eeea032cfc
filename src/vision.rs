//! OCR collaborator: the [`Recognizer`] trait and the Cloud Vision
//! implementation.
//!
//! One document means one `files:asyncBatchAnnotate` call. Vision runs the
//! job server-side and writes result objects back into the bucket under
//! the destination prefix, so the only thing to do afterwards is poll the
//! long-running operation until it reports done. The pipeline is strictly
//! sequential and the poll loop blocks its document until the deadline; no
//! cancellation exists beyond the deadline turning into
//! [`BatchError::OcrTimeout`].

use crate::auth;
use crate::config::BatchConfig;
use crate::error::BatchError;
use async_trait::async_trait;
use gcp_auth::TokenProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info};

/// Production endpoint for the Cloud Vision REST API.
const VISION_ENDPOINT: &str = "https://vision.googleapis.com";

/// MIME type sent with every request. The pipeline only handles PDFs.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Feature requested from the service.
const DOCUMENT_TEXT_DETECTION: &str = "DOCUMENT_TEXT_DETECTION";

/// Submits a stored document for text detection and blocks until the
/// remote job finishes.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Run OCR on `gs://<bucket>/<object>`, writing result objects under
    /// `gs://<bucket>/<output_prefix>`. Returns once the job is done, or
    /// an error on submission failure, job failure, or `timeout` elapsing.
    async fn recognize(
        &self,
        bucket: &str,
        object: &str,
        output_prefix: &str,
        timeout: Duration,
    ) -> Result<(), BatchError>;
}

// ── Request / response bodies ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AsyncBatchAnnotateRequest {
    requests: Vec<AsyncAnnotateFileRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AsyncAnnotateFileRequest {
    input_config: InputConfig,
    features: Vec<Feature>,
    output_config: OutputConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputConfig {
    gcs_source: GcsSource,
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct GcsSource {
    uri: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputConfig {
    gcs_destination: GcsDestination,
    batch_size: u32,
}

#[derive(Debug, Serialize)]
struct GcsDestination {
    uri: String,
}

/// Long-running operation resource, as returned by submission and polling.
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationStatus>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

// ── Vision client ────────────────────────────────────────────────────────

/// Cloud Vision asynchronous file-annotation client.
pub struct VisionClient {
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    endpoint: String,
    poll_interval: Duration,
    batch_size: u32,
}

impl VisionClient {
    /// Create a client sharing the run's token provider. Poll interval and
    /// result batch size come from the config.
    pub fn new(auth: Arc<dyn TokenProvider>, config: &BatchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            endpoint: VISION_ENDPOINT.to_string(),
            poll_interval: config.poll_interval(),
            batch_size: config.batch_size,
        }
    }

    /// Point the client at a non-default endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(&self, bucket: &str, object: &str, output_prefix: &str) -> AsyncBatchAnnotateRequest {
        AsyncBatchAnnotateRequest {
            requests: vec![AsyncAnnotateFileRequest {
                input_config: InputConfig {
                    gcs_source: GcsSource {
                        uri: format!("gs://{bucket}/{object}"),
                    },
                    mime_type: PDF_MIME_TYPE.to_string(),
                },
                features: vec![Feature {
                    kind: DOCUMENT_TEXT_DETECTION.to_string(),
                }],
                output_config: OutputConfig {
                    gcs_destination: GcsDestination {
                        uri: format!("gs://{bucket}/{output_prefix}"),
                    },
                    batch_size: self.batch_size,
                },
            }],
        }
    }

    /// POST the annotate request, returning the operation resource name.
    async fn submit(
        &self,
        bucket: &str,
        object: &str,
        output_prefix: &str,
    ) -> Result<String, BatchError> {
        let body = self.build_request(bucket, object, output_prefix);
        let token = auth::bearer(&self.auth).await?;
        let submit_err = |reason: String| BatchError::OcrSubmit {
            bucket: bucket.to_string(),
            object: object.to_string(),
            reason,
        };

        let response = self
            .http
            .post(format!("{}/v1/files:asyncBatchAnnotate", self.endpoint))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| submit_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(submit_err(format!("HTTP {status}: {detail}")));
        }

        let operation: Operation = response
            .json()
            .await
            .map_err(|e| submit_err(e.to_string()))?;
        debug!("Submitted OCR operation {}", operation.name);
        Ok(operation.name)
    }

    /// Poll the operation until it is done or the deadline passes.
    async fn wait(
        &self,
        operation_name: &str,
        object: &str,
        timeout: Duration,
    ) -> Result<(), BatchError> {
        let deadline = Instant::now() + timeout;

        loop {
            let token = auth::bearer(&self.auth).await?;
            let response = self
                .http
                .get(format!("{}/v1/{}", self.endpoint, operation_name))
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| BatchError::OcrFailed {
                    object: object.to_string(),
                    detail: format!("operation poll failed: {e}"),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(BatchError::OcrFailed {
                    object: object.to_string(),
                    detail: format!("operation poll returned HTTP {status}"),
                });
            }

            let operation: Operation =
                response.json().await.map_err(|e| BatchError::OcrFailed {
                    object: object.to_string(),
                    detail: format!("operation poll response: {e}"),
                })?;

            if operation.done {
                if let Some(err) = operation.error {
                    return Err(BatchError::OcrFailed {
                        object: object.to_string(),
                        detail: format!("code {}: {}", err.code, err.message),
                    });
                }
                return Ok(());
            }

            if Instant::now() + self.poll_interval >= deadline {
                return Err(BatchError::OcrTimeout {
                    object: object.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Recognizer for VisionClient {
    async fn recognize(
        &self,
        bucket: &str,
        object: &str,
        output_prefix: &str,
        timeout: Duration,
    ) -> Result<(), BatchError> {
        let operation_name = self.submit(bucket, object, output_prefix).await?;
        info!("Waiting for OCR operation to complete: {}", object);
        self.wait(&operation_name, object, timeout).await?;
        info!("OCR processing completed: {}", object);
        Ok(())
    }
}
