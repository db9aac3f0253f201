//! Error types shared across the crate

use thiserror::Error;

/// Errors surfaced by control-plane and certificate operations
#[derive(Debug, Error)]
pub enum Error {
    /// The control plane answered with a JSON body containing an `error`
    /// field. Unit reports these inside 2xx responses, so the HTTP status
    /// is not part of the classification.
    #[error("control plane rejected {method} {path}: {message}")]
    ControlPlane {
        method: String,
        path: String,
        message: String,
    },

    /// Network or protocol failure reaching the control plane.
    #[error("transport failure on {method} {path}: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// An external certificate tool failed or did not produce the
    /// expected output file.
    #[error("certificate generation for '{name}' failed: {reason}")]
    CertificateGeneration { name: String, reason: String },

    /// A service descriptor without any port binding cannot be reconciled.
    #[error("service '{name}' has no port bindings")]
    NoPortBinding { name: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
