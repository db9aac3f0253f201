//! Control-plane client for the NGINX Unit control socket
//!
//! Unit exposes its whole configuration as one JSON document over HTTP.
//! This client wraps the four verbs used to read and mutate sub-paths of
//! that document. Unit reports failures as an `error` field inside the
//! JSON body, often with a 2xx status, so success is decided by the body
//! and not by the HTTP status code.

use crate::error::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Request body for a write operation
#[derive(Debug, Clone)]
pub enum Payload {
    /// Structured value, serialized to JSON
    Json(Value),
    /// Pre-formed bytes sent verbatim (PEM bundles)
    Raw(Vec<u8>),
}

/// Minimal HTTP wrapper around the Unit control API
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ControlPlaneClient {
    /// Create a client against a control socket base URL
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Fetch the JSON value at `path`
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    /// PUT: full replace of the value at `path`
    pub async fn set(&self, path: &str, payload: Payload) -> Result<Value> {
        self.request(Method::PUT, path, Some(payload)).await
    }

    /// POST: merge at `path` with the control plane's own semantics
    pub async fn update(&self, path: &str, payload: Payload) -> Result<Value> {
        self.request(Method::POST, path, Some(payload)).await
    }

    /// Delete the value at `path`
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None).await
    }

    /// Single request builder behind all four verbs: one place for
    /// serialization, response decoding and error classification.
    async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        builder = match payload {
            Some(Payload::Json(value)) => builder.json(&value),
            Some(Payload::Raw(bytes)) => builder.body(bytes),
            None => builder,
        };

        let transport = |source: reqwest::Error| Error::Transport {
            method: method.to_string(),
            path: path.to_string(),
            source,
        };

        let response = builder.send().await.map_err(transport)?;
        let body: Value = response.json().await.map_err(transport)?;

        debug!("{} {} -> {}", method, path, body);

        if let Some(err) = body.get("error") {
            let message = err
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(Error::ControlPlane {
                method: method.to_string(),
                path: path.to_string(),
                message,
            });
        }

        Ok(body)
    }
}
