//! Unitman - a reconciliation client for the NGINX Unit control API
//!
//! Translates "expose this service under this domain name with TLS" into
//! idempotent writes against Unit's JSON configuration document:
//! - Certificate generation (self-signed via openssl, ACME via certbot)
//! - Safe certificate replacement in the control plane's store
//! - Route and listener fragments applied at per-name config sub-paths

pub mod certificate;
pub mod client;
pub mod error;
pub mod fragments;
pub mod inventory;
pub mod publish;

pub use certificate::{AcmeGenerator, CertificateGenerator, SelfSignedGenerator};
pub use client::{ControlPlaneClient, Payload};
pub use error::{Error, Result};
pub use fragments::{FragmentBuilder, Listener, RouteStep, Tls};
pub use inventory::{PortBinding, ServiceSpec};
pub use publish::CertificatePublisher;
