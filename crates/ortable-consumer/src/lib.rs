//! `ortable-consumer` is a library for driving OR table providers across a
//! network.
//!
//! Providers are found through an `mDNS-SD` discovery service, optionally
//! filtered by their endpoint reference, or contacted directly at a known
//! address. Each provider description lists its routes, which the consumer
//! turns into requests.
//!
//! The [`controller::Controller`] sends table commands to a provider and
//! returns the outcome of each invocation. It can also start a task for each
//! provider which reads its report stream and forwards every metric, alert
//! and operation invocation report to a channel.
//!
//! The [`menu`] module maps the keys of a console menu to table commands.

#![deny(unsafe_code)]
#![deny(missing_docs)]

/// The consumer controller.
pub mod controller;
/// Provider descriptions and their requests.
pub mod device;
/// Discovery of providers.
pub mod discovery;
/// Error management.
pub mod error;
/// Console menu actions.
pub mod menu;
/// Report stream receivers.
pub mod reports;
/// Provider requests.
pub mod request;
/// Parsers of provider responses.
pub mod response;

#[cfg(test)]
pub(crate) mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use ortable_provider::device::OrTable;
    use ortable_provider::server::Server;

    use tokio::sync::oneshot;

    pub(crate) const EPR: &str = "urn:uuid:or-table-consumer-test";

    // Runs a provider on the given port for the duration of a test function,
    // which receives the provider address.
    pub(crate) async fn with_provider<F, Fut>(port: u16, function: F)
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(
            Server::new(OrTable::new(EPR))
                .address(Ipv4Addr::LOCALHOST)
                .port(port)
                .report_period(Duration::from_millis(20))
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .run(),
        );

        // Wait for the server to start.
        tokio::time::sleep(Duration::from_millis(200)).await;

        function(format!("http://127.0.0.1:{port}")).await;

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
