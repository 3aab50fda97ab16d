use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;

use axum::{Router, response::Redirect};

use tracing::{error, info};

use crate::device::OrTable;
use crate::error::Result;
use crate::reporter::{DEFAULT_REPORT_PERIOD, Reporter};
use crate::service::{Service, ServiceConfig};

// Default HTTP address.
//
// The entire local network is considered, so the Ipv4 unspecified address is
// used.
const DEFAULT_HTTP_ADDRESS: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 10000;

// Default scheme is `http`.
const DEFAULT_SCHEME: &str = "http";

// Default service name needed to compose a well-known URI.
// https://en.wikipedia.org/wiki/Well-known_URI
const DEFAULT_WELL_KNOWN_SERVICE: &str = "ortable";

#[derive(Debug)]
struct ServerData<'a> {
    // HTTP address.
    http_address: Ipv4Addr,
    // Server port.
    port: u16,
    // Scheme.
    scheme: &'a str,
    // Well-known service.
    well_known_service: &'a str,
    // Service configurator.
    service_config: Option<ServiceConfig<'a>>,
    // Period of the metric reports.
    report_period: Duration,
    // Device.
    device: OrTable,
}

/// A server exposing an [`OrTable`] on the network.
#[derive(Debug)]
pub struct Server<'a> {
    data: ServerData<'a>,
}

impl<'a> Server<'a> {
    /// Creates a [`Server`] from the given [`OrTable`].
    #[must_use]
    pub const fn new(device: OrTable) -> Self {
        Self {
            data: ServerData {
                http_address: DEFAULT_HTTP_ADDRESS,
                port: DEFAULT_SERVER_PORT,
                scheme: DEFAULT_SCHEME,
                well_known_service: DEFAULT_WELL_KNOWN_SERVICE,
                service_config: None,
                report_period: DEFAULT_REPORT_PERIOD,
                device,
            },
        }
    }

    /// Sets the server `IPv4` address.
    #[must_use]
    pub const fn address(mut self, http_address: Ipv4Addr) -> Self {
        self.data.http_address = http_address;
        self
    }

    /// Sets the server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.data.port = port;
        self
    }

    /// Sets the server scheme. i.e. `http`
    #[must_use]
    pub const fn scheme(mut self, scheme: &'a str) -> Self {
        self.data.scheme = scheme;
        self
    }

    /// Sets the service name used to compose the well-known `URI`.
    #[must_use]
    pub const fn well_known_service(mut self, service_name: &'a str) -> Self {
        self.data.well_known_service = service_name;
        self
    }

    /// Sets the period of the metric reports.
    #[must_use]
    pub const fn report_period(mut self, report_period: Duration) -> Self {
        self.data.report_period = report_period;
        self
    }

    /// Sets the configuration for the discovery service.
    #[must_use]
    #[inline]
    pub fn discovery_service(mut self, service_config: ServiceConfig<'a>) -> Self {
        self.data.service_config = Some(service_config);
        self
    }

    /// Transforms the server into a [`GracefulShutdownServer`].
    ///
    /// The [`Future`] passed as input manages the graceful shutdown of
    /// the server.
    #[must_use]
    #[inline]
    pub fn with_graceful_shutdown<F>(self, signal: F) -> GracefulShutdownServer<'a, F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        GracefulShutdownServer {
            data: self.data,
            signal,
        }
    }

    /// Runs the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub async fn run(self) -> Result<()> {
        self.with_graceful_shutdown(std::future::pending())
            .run()
            .await
    }
}

/// A server with graceful shutdown.
///
/// Aside from the graceful shutdown functionality, it behaves the same as
/// [`Server`].
#[derive(Debug)]
pub struct GracefulShutdownServer<'a, F> {
    // Server data.
    data: ServerData<'a>,
    // Graceful shutdown signal.
    signal: F,
}

impl<F> GracefulShutdownServer<'_, F>
where
    F: Future<Output = ()> + Send + 'static,
{
    /// Runs the server with graceful shutdown.
    ///
    /// When the shutdown signal completes, the table is closed: report
    /// streams end, the reporter stops and the discovery service is
    /// unregistered.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub async fn run(self) -> Result<()> {
        // Create listener bind.
        let listener_bind = format!("{}:{}", self.data.http_address, self.data.port);

        // Consume a device returning all server information.
        let (device_main_route, device_data, device_router, table) = self.data.device.finalize();

        let epr = device_data.epr.to_string();

        // Serialize device data returning a json format.
        let device_data = serde_json::to_value(device_data)?;

        // Construct well-known URI.
        let well_known_uri = format!("/.well-known/{}", self.data.well_known_service);

        info!("Server route: [GET, \"/\"]");
        info!("Server route: [GET, \"{}\"]", well_known_uri);

        // Create a new TCP socket which responds to the specified HTTP address
        // and port.
        let listener = tokio::net::TcpListener::bind(&listener_bind).await?;

        // Run a discovery service if present.
        let service = match self.data.service_config {
            Some(service_config) => {
                let service_config = service_config
                    .property(("scheme", self.data.scheme))
                    .property(("path", well_known_uri.clone()))
                    .property(("epr", epr));

                Some(Service::run(
                    service_config,
                    self.data.http_address,
                    self.data.port,
                )?)
            }
            None => None,
        };

        // Create the main router.
        //
        //- Save device data as a json format which is returned when a query
        //  to the server root is requested.
        //- Redirect well-known URI to server root.
        let router = Router::new()
            .route(
                "/",
                axum::routing::get(move || async { axum::Json(device_data) }),
            )
            .route(
                &well_known_uri,
                axum::routing::get(move || async { Redirect::to("/") }),
            )
            .nest(device_main_route, device_router);

        let reporter = Reporter::new(table.clone())
            .period(self.data.report_period)
            .run();

        info!("Device reachable at this HTTP address: {listener_bind}");
        info!("Starting server...");

        let signal = self.signal;
        let closing_table = table.clone();
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("Shutting down server...");
                closing_table.close();
            })
            .await;

        // The server may also stop because of an error.
        table.close();

        if let Err(e) = reporter.await {
            error!("Failed to await the reporter task: {e}");
        }

        if let Some(service) = service {
            service.stop();
        }

        served?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ortable::command::Command;
    use ortable::controller::TableSnapshot;
    use ortable::device::DeviceData;
    use ortable::report::Report;
    use ortable::response::{CommandResponse, ErrorKind, ErrorResponse, InvocationState};
    use ortable::table::PresetPosition;

    use serde_json::json;

    use serial_test::serial;

    use tokio::sync::oneshot;

    use crate::device::OrTable;

    use super::Server;

    const PORT: u16 = 10100;

    fn url(path: &str) -> String {
        format!("http://127.0.0.1:{PORT}{path}")
    }

    async fn put(path: &str) -> CommandResponse {
        reqwest::Client::new()
            .put(url(path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn serve_table() {
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(
            Server::new(OrTable::new("urn:uuid:or-table-server-test"))
                .port(PORT)
                .report_period(Duration::from_millis(20))
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .run(),
        );

        // Wait for the server to start.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let device_data: DeviceData = reqwest::get(url("/.well-known/ortable"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(device_data.epr, "urn:uuid:or-table-server-test");
        assert_eq!(device_data.route_configs.len(), 12);

        let mut reports = reqwest::get(url("/or-table/reports")).await.unwrap();

        let response = put("/or-table/height/increase").await;
        assert_eq!(response.snapshot.state.height, 81.);
        assert_eq!(response.invocation.invocation_state, InvocationState::Finished);

        let response: CommandResponse = reqwest::Client::new()
            .put(url("/or-table/preset"))
            .json(&json!({ "position": "BeachChair" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response.snapshot.selected_preset, PresetPosition::BeachChair);
        // Selecting does not move the table.
        assert_eq!(response.snapshot.state.backplate, 0.);

        let response = put("/or-table/preset/apply").await;
        assert_eq!(response.snapshot.state, PresetPosition::BeachChair.state());
        assert_eq!(
            response.invocation.operation,
            Command::ApplyPreset.operation()
        );

        let rejected = reqwest::Client::new()
            .put(url("/or-table/preset"))
            .json(&json!({ "position": "Lounge" }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: ErrorResponse = rejected.json().await.unwrap();
        assert_eq!(error.error, ErrorKind::InvalidData);

        let status: TableSnapshot = reqwest::get(url("/or-table/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status.state, PresetPosition::BeachChair.state());

        // Unknown operations never reach the table.
        let unknown = reqwest::Client::new()
            .put(url("/or-table/height/raise"))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);

        // The stream delivers whole lines.
        let mut buffer = Vec::new();
        while !buffer.contains(&b'\n') {
            let chunk = reports.chunk().await.unwrap().unwrap();
            buffer.extend_from_slice(&chunk);
        }
        let line = buffer.split(|byte| *byte == b'\n').next().unwrap();
        assert!(Report::from_line(line).is_ok());

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
