//! Unitman - Main entry point
//!
//! CLI for reconciling services against an NGINX Unit control socket.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use unitman::{
    AcmeGenerator, CertificateGenerator, CertificatePublisher, ControlPlaneClient,
    FragmentBuilder, PortBinding, SelfSignedGenerator, ServiceSpec,
};
use url::Url;

/// Unitman - NGINX Unit management CLI
#[derive(Parser, Debug)]
#[command(name = "unitman")]
#[command(author = "Unitman Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Reconcile certificates, routes and listeners against NGINX Unit")]
struct Args {
    /// Unit control socket base URL
    #[arg(long, env = "UNIT_URL", default_value = "http://127.0.0.1:8080")]
    url: Url,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get every unit object
    Info,

    /// Get the unit configuration object
    Config,

    /// Get the unit certificate store
    Certs,

    /// Get the unit status object
    Status,

    /// Expose a service under a domain name with TLS
    Domain {
        /// Service name, used as both the certificate name and the routes key
        #[arg(long)]
        name: String,

        /// Public hostname the listener matches on
        #[arg(long)]
        dns: String,

        /// Upstream IP the service listens on
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,

        /// Upstream port the service listens on
        #[arg(long)]
        port: u16,

        /// Generate a self-signed dummy certificate instead of an ACME one
        #[arg(long)]
        dummy: bool,

        /// Disable certbot's dry-run mode
        #[arg(long)]
        no_dry_run: bool,

        /// Contact email for ACME registration
        #[arg(long, default_value = "test@example.com")]
        email: String,

        /// Working directory for certificate artifacts
        #[arg(long, env = "WORK_DIR", default_value = "./.unitman/tmp")]
        work_dir: PathBuf,

        /// Common name of the self-signed certificate subject
        #[arg(long, default_value = "example.com")]
        common_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let client = ControlPlaneClient::new(args.url);

    match args.command {
        Commands::Info => print_json(client.get("/").await?)?,
        Commands::Config => print_json(client.get("/config").await?)?,
        Commands::Certs => print_json(client.get("/certificates").await?)?,
        Commands::Status => print_json(client.get("/status").await?)?,

        Commands::Domain {
            name,
            dns,
            ip,
            port,
            dummy,
            no_dry_run,
            email,
            work_dir,
            common_name,
        } => {
            let service = ServiceSpec {
                name,
                dns,
                ports: vec![PortBinding { ip, port }],
            };

            let generator: Box<dyn CertificateGenerator> = if dummy {
                Box::new(SelfSignedGenerator::new(&work_dir).with_common_name(common_name))
            } else {
                Box::new(
                    AcmeGenerator::new(work_dir.join("letsencrypt"))
                        .with_email(email)
                        .with_dry_run(!no_dry_run),
                )
            };

            reconcile(&client, generator.as_ref(), &service).await?;
        }
    }

    Ok(())
}

/// Full reconciliation for one service: certificate, routes, listeners.
async fn reconcile(
    client: &ControlPlaneClient,
    generator: &dyn CertificateGenerator,
    service: &ServiceSpec,
) -> Result<()> {
    let bundle = generator.generate(&service.name, &service.dns).await?;

    CertificatePublisher::new(client.clone())
        .publish(&service.name, &bundle)
        .await?;

    let fragments = FragmentBuilder::new(client.clone());
    fragments.apply_routes(service).await?;
    fragments.apply_listeners(&service.name).await?;

    info!("reconciled '{}' -> {}", service.name, service.dns);

    Ok(())
}

fn print_json(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
