//! Certificate generation strategies
//!
//! Two interchangeable ways to produce a PEM bundle (certificate followed
//! by private key) for a logical name: a self-signed path shelling out to
//! `openssl`, and an ACME path shelling out to `certbot`. Both leave their
//! artifacts under a working directory scoped by name and only ever hand a
//! complete bundle to the caller.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::fs;
use tokio::process::Command;
use tracing::info;

/// Produces a certificate + key bundle for a logical name
#[async_trait]
pub trait CertificateGenerator {
    /// Generate a PEM bundle for `name`, issued for the hostname `dns`
    async fn generate(&self, name: &str, dns: &str) -> Result<Vec<u8>>;
}

fn generation_error(name: &str, reason: impl Into<String>) -> Error {
    Error::CertificateGeneration {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Run an external tool, mapping spawn failures and non-zero exits to
/// certificate-generation errors naming the tool.
async fn run_tool(command: &mut Command, bin: &str, name: &str) -> Result<Output> {
    let output = command
        .output()
        .await
        .map_err(|e| generation_error(name, format!("failed to run {bin}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(generation_error(
            name,
            format!("{bin} exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(output)
}

async fn read_artifact(path: &Path, name: &str) -> Result<Vec<u8>> {
    fs::read(path)
        .await
        .map_err(|e| generation_error(name, format!("missing output file {}: {e}", path.display())))
}

/// Self-signed generator backed by `openssl req`
///
/// Fixed parameters: 4096-bit RSA, SHA-256, 10-year validity, no
/// passphrase. The subject is a placeholder except for the common name,
/// which is a configurable input.
#[derive(Debug, Clone)]
pub struct SelfSignedGenerator {
    work_dir: PathBuf,
    common_name: String,
    openssl_bin: String,
}

impl SelfSignedGenerator {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            common_name: "example.com".to_string(),
            openssl_bin: "openssl".to_string(),
        }
    }

    /// Override the certificate's common name
    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = common_name.into();
        self
    }

    /// Substitute the `openssl` binary
    pub fn with_openssl_bin(mut self, bin: impl Into<String>) -> Self {
        self.openssl_bin = bin.into();
        self
    }
}

#[async_trait]
impl CertificateGenerator for SelfSignedGenerator {
    async fn generate(&self, name: &str, _dns: &str) -> Result<Vec<u8>> {
        fs::create_dir_all(&self.work_dir).await?;

        let key_path = self.work_dir.join(format!("key_{name}.pem"));
        let cert_path = self.work_dir.join(format!("cert_{name}.pem"));
        let bundle_path = self.work_dir.join(format!("bundle_{name}.pem"));

        let subject = format!(
            "/C=XX/ST=StateName/L=CityName/O=CompanyName/OU=CompanySectionName/CN={}",
            self.common_name
        );

        let mut command = Command::new(&self.openssl_bin);
        command
            .arg("req")
            .args(["-x509", "-newkey", "rsa:4096", "-sha256"])
            .arg("-keyout")
            .arg(&key_path)
            .arg("-out")
            .arg(&cert_path)
            .args(["-days", "3650", "-nodes", "-subj"])
            .arg(&subject);

        run_tool(&mut command, &self.openssl_bin, name).await?;

        // Bundle order matters: certificate first, key second, bytes
        // exactly as produced.
        let cert = read_artifact(&cert_path, name).await?;
        let key = read_artifact(&key_path, name).await?;

        let mut bundle = cert;
        bundle.extend_from_slice(&key);
        fs::write(&bundle_path, &bundle).await?;

        info!("generated self-signed certificate '{}'", name);

        Ok(bundle)
    }
}

/// ACME generator backed by `certbot certonly` in manual mode
///
/// State is kept under an isolated per-name directory; the issued chain is
/// read back from certbot's well-known `live/<name>/chain.pem` layout.
#[derive(Debug, Clone)]
pub struct AcmeGenerator {
    work_dir: PathBuf,
    email: String,
    dry_run: bool,
    certbot_bin: String,
}

impl AcmeGenerator {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            email: "test@example.com".to_string(),
            dry_run: true,
            certbot_bin: "certbot".to_string(),
        }
    }

    /// Contact email passed to the ACME client
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Toggle certbot's dry-run mode (on by default)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Substitute the `certbot` binary
    pub fn with_certbot_bin(mut self, bin: impl Into<String>) -> Self {
        self.certbot_bin = bin.into();
        self
    }
}

#[async_trait]
impl CertificateGenerator for AcmeGenerator {
    async fn generate(&self, name: &str, dns: &str) -> Result<Vec<u8>> {
        let invocation_dir = self.work_dir.join(name);
        fs::create_dir_all(&invocation_dir).await?;

        let mut command = Command::new(&self.certbot_bin);
        command
            .arg("certonly")
            .args(["-d", dns])
            .args(["--manual", "--non-interactive"])
            .args(["--email", &self.email])
            .arg("--work-dir")
            .arg(&invocation_dir)
            .arg("--config-dir")
            .arg(invocation_dir.join("config"))
            .arg("--logs-dir")
            .arg(invocation_dir.join("logs"));

        if self.dry_run {
            command.arg("--dry-run");
        }

        run_tool(&mut command, &self.certbot_bin, name).await?;

        let chain_path = invocation_dir.join("live").join(name).join("chain.pem");
        let bundle = read_artifact(&chain_path, name).await?;

        info!("obtained ACME certificate '{}' for {}", name, dns);

        Ok(bundle)
    }
}
