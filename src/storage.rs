//! Object store collaborator: the [`ObjectStore`] trait and its two
//! implementations.
//!
//! [`GcsClient`] speaks the Cloud Storage JSON API directly over HTTP.
//! The five operations the pipeline needs (existence check, delete,
//! upload, prefix-listing, download) map one-to-one onto REST calls, so a
//! full SDK would buy nothing but dependency weight.
//!
//! [`MemoryStore`] is an in-process fake. It backs the unit and
//! integration tests and lets the whole pipeline run without a network,
//! which is why every stage takes `&dyn ObjectStore` instead of a concrete
//! client.

use crate::auth;
use crate::error::BatchError;
use async_trait::async_trait;
use gcp_auth::TokenProvider;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Production endpoint for the Cloud Storage JSON API.
const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Blob operations the pipeline needs from a bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether an object named `name` exists in `bucket`.
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool, BatchError>;

    /// Delete the object. Deleting a missing object is an error; callers
    /// check [`ObjectStore::exists`] first.
    async fn delete(&self, bucket: &str, name: &str) -> Result<(), BatchError>;

    /// Create or replace the object with `bytes`.
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BatchError>;

    /// Names of all objects under `prefix`, in lexicographic order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BatchError>;

    /// Full contents of the object.
    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, BatchError>;
}

// ── GCS client ───────────────────────────────────────────────────────────

/// Cloud Storage JSON API client.
pub struct GcsClient {
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    endpoint: String,
}

impl GcsClient {
    /// Create a client sharing the run's token provider.
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            endpoint: STORAGE_ENDPOINT.to_string(),
        }
    }

    /// Point the client at a non-default endpoint, e.g. a local
    /// fake-gcs-server instance.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// `<endpoint>/storage/v1/b/<bucket>/o[/<object>]`.
    ///
    /// The object name goes in as a single path segment, so '/' inside it
    /// is percent-encoded as the API requires.
    fn object_url(&self, bucket: &str, object: Option<&str>) -> Result<Url, BatchError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| BatchError::Internal(format!("bad storage endpoint: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BatchError::Internal("storage endpoint cannot be a base".into()))?;
            segments.extend(["storage", "v1", "b", bucket, "o"]);
            if let Some(object) = object {
                segments.push(object);
            }
        }
        Ok(url)
    }

    fn upload_url(&self, bucket: &str) -> Result<Url, BatchError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| BatchError::Internal(format!("bad storage endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BatchError::Internal("storage endpoint cannot be a base".into()))?
            .extend(["upload", "storage", "v1", "b", bucket, "o"]);
        Ok(url)
    }

    fn request_err(
        op: &'static str,
        bucket: &str,
        object: &str,
        e: reqwest::Error,
    ) -> BatchError {
        BatchError::StoreRequest {
            op,
            bucket: bucket.to_string(),
            object: object.to_string(),
            reason: e.to_string(),
        }
    }

    fn status_err(op: &'static str, bucket: &str, object: &str, status: StatusCode) -> BatchError {
        BatchError::StoreStatus {
            op,
            bucket: bucket.to_string(),
            object: object.to_string(),
            status: status.as_u16(),
        }
    }
}

/// One page of an object listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectMeta>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool, BatchError> {
        let url = self.object_url(bucket, Some(name))?;
        let token = auth::bearer(&self.auth).await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::request_err("stat", bucket, name, e))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Self::status_err("stat", bucket, name, status)),
        }
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), BatchError> {
        let url = self.object_url(bucket, Some(name))?;
        let token = auth::bearer(&self.auth).await?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::request_err("delete", bucket, name, e))?;

        if !response.status().is_success() {
            return Err(Self::status_err("delete", bucket, name, response.status()));
        }
        info!("Deleted existing object gs://{}/{}", bucket, name);
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BatchError> {
        let url = self.upload_url(bucket)?;
        let token = auth::bearer(&self.auth).await?;
        let response = self
            .http
            .post(url)
            .query(&[("uploadType", "media"), ("name", name)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Self::request_err("upload", bucket, name, e))?;

        if !response.status().is_success() {
            return Err(Self::status_err("upload", bucket, name, response.status()));
        }
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BatchError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.object_url(bucket, None)?;
            let token = auth::bearer(&self.auth).await?;
            let mut request = self
                .http
                .get(url)
                .bearer_auth(token)
                .query(&[("prefix", prefix)]);
            if let Some(ref t) = page_token {
                request = request.query(&[("pageToken", t.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Self::request_err("list", bucket, prefix, e))?;
            if !response.status().is_success() {
                return Err(Self::status_err("list", bucket, prefix, response.status()));
            }

            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| Self::request_err("list", bucket, prefix, e))?;
            names.extend(page.items.into_iter().map(|o| o.name));

            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        debug!("Listed {} objects under gs://{}/{}", names.len(), bucket, prefix);
        Ok(names)
    }

    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, BatchError> {
        let url = self.object_url(bucket, Some(name))?;
        let token = auth::bearer(&self.auth).await?;
        let response = self
            .http
            .get(url)
            .query(&[("alt", "media")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Self::request_err("download", bucket, name, e))?;

        if !response.status().is_success() {
            return Err(Self::status_err("download", bucket, name, response.status()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::request_err("download", bucket, name, e))?;
        Ok(bytes.to_vec())
    }
}

// ── In-memory fake ───────────────────────────────────────────────────────

/// In-process object store used by the test suite and dry runs.
///
/// Objects live in a [`BTreeMap`], so [`ObjectStore::list`] returns names
/// in the same lexicographic order the real service does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an object directly, bypassing the trait.
    pub fn insert(&self, bucket: &str, name: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .expect("store lock")
            .insert((bucket.to_string(), name.to_string()), bytes);
    }

    /// All object names in `bucket`, for assertions.
    pub fn object_names(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .expect("store lock")
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool, BatchError> {
        Ok(self
            .objects
            .lock()
            .expect("store lock")
            .contains_key(&(bucket.to_string(), name.to_string())))
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), BatchError> {
        let removed = self
            .objects
            .lock()
            .expect("store lock")
            .remove(&(bucket.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(BatchError::StoreStatus {
                op: "delete",
                bucket: bucket.to_string(),
                object: name.to_string(),
                status: 404,
            });
        }
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BatchError> {
        self.insert(bucket, name, bytes);
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BatchError> {
        Ok(self
            .objects
            .lock()
            .expect("store lock")
            .keys()
            .filter(|(b, n)| b == bucket && n.starts_with(prefix))
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, BatchError> {
        self.objects
            .lock()
            .expect("store lock")
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| BatchError::StoreStatus {
                op: "download",
                bucket: bucket.to_string(),
                object: name.to_string(),
                status: 404,
            })
    }
}
