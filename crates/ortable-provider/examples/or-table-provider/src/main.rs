use std::net::Ipv4Addr;
use std::time::Duration;

use clap::Parser;

use ortable::device::{DeviceDescription, ModelDescription};

use ortable_provider::device::OrTable;
use ortable_provider::server::{DEFAULT_SERVER_PORT, Server};
use ortable_provider::service::ServiceConfig;

use tracing::{info, warn};

use tracing_subscriber::EnvFilter;

// Endpoint reference of the demo provider.
const EPR: &str = "urn:uuid:sdcx-ORTableProvider-1234-12345";

#[derive(Debug, thiserror::Error)]
enum ProviderError {
    #[error(transparent)]
    Server(#[from] ortable_provider::error::Error),
    #[error("Invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server address.
    ///
    /// Only an `Ipv4` address is accepted.
    #[arg(short, long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    address: Ipv4Addr,

    /// Server port.
    #[arg(short = 'p', long, default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Endpoint reference identifying the provider.
    #[arg(long, default_value_t = String::from(EPR))]
    epr: String,

    /// Service instance name.
    #[arg(short = 'n', long, default_value = "or-table")]
    instance_name: String,

    /// Service hostname.
    #[arg(long, default_value = "or-table")]
    hostname: String,

    /// Period of the metric reports, in milliseconds.
    #[arg(long, default_value_t = 500)]
    report_period: u64,

    /// Do not announce the provider on the network.
    #[arg(long)]
    no_discovery: bool,

    /// Log filter, i.e. `info` or `ortable_provider=debug`.
    #[arg(short, long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), ProviderError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log)?)
        .init();

    let device = OrTable::new(cli.epr)
        .model(
            ModelDescription::new("SurgiTAIX", "sdcX OR Table Demo Provider")
                .model_number("1234")
                .model_url("http://surgitaix.com"),
        )
        .description(
            DeviceDescription::new("sdcX OR Table Demo Provider")
                .serial_number("4567")
                .firmware_version("1.3.0"),
        );

    info!("Provider endpoint reference: {}", device.epr());

    let server = Server::new(device)
        .address(cli.address)
        .port(cli.port)
        .report_period(Duration::from_millis(cli.report_period));

    let server = if cli.no_discovery {
        server
    } else {
        server.discovery_service(
            ServiceConfig::mdns_sd(&cli.instance_name)
                .hostname(&cli.hostname)
                .disable_ipv6()
                .disable_network_interface("docker0"),
        )
    };

    server
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Unable to listen for the shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        })
        .run()
        .await?;

    info!("Provider stopped");

    Ok(())
}
