use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::time::Duration;

use ortable::device::DeviceData;

use flume::RecvTimeoutError;

use mdns_sd::{IfKind, Receiver, ResolvedService, ServiceDaemon, ServiceEvent};

use tokio::time::sleep;

use tracing::{info, warn};

use crate::device::{Device, Devices, NetworkInformation, build_device_address};
use crate::error::{Error, ErrorKind, Result};

// Service domain.
//
// It defines the default domain searched for providers.
const DOMAIN: &str = "ortable";

// Service top-level domain.
//
// It defines the default top-level domain for a service.
const TOP_LEVEL_DOMAIN: &str = "local";

// Service property carrying the provider endpoint reference.
const EPR_PROPERTY: &str = "epr";

// Default discovery timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

async fn fetch_device_data(complete_address: &str) -> Result<DeviceData> {
    let response = reqwest::get(complete_address).await?;

    if !response.status().is_success() {
        return Err(Error::new(
            ErrorKind::Discovery,
            format!(
                "The provider at {complete_address} replied with status {}",
                response.status()
            ),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| Error::new(ErrorKind::JsonResponse, e.to_string()))
}

/// Providers discovery.
///
/// It detects all OR table providers in a network, or only the one
/// identified by a target endpoint reference.
#[derive(Debug, PartialEq)]
pub struct Discovery {
    domain: Cow<'static, str>,
    top_level_domain: Cow<'static, str>,
    timeout: Duration,
    disable_ipv6: bool,
    disable_ip: Option<IpAddr>,
    disable_network_interface: Option<&'static str>,
    target_epr: Option<Cow<'static, str>>,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(DOMAIN)
    }
}

impl Discovery {
    /// Creates a [`Discovery`].
    #[must_use]
    #[inline]
    pub fn new(domain: impl Into<Cow<'static, str>>) -> Self {
        Self {
            domain: domain.into(),
            top_level_domain: Cow::Borrowed(TOP_LEVEL_DOMAIN),
            timeout: DEFAULT_TIMEOUT,
            disable_ipv6: false,
            disable_ip: None,
            disable_network_interface: None,
            target_epr: None,
        }
    }

    /// Sets a different timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Changes service domain.
    #[must_use]
    #[inline]
    pub fn domain(mut self, domain: impl Into<Cow<'static, str>>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Sets the service top-level domain.
    #[must_use]
    #[inline]
    pub fn top_level_domain(mut self, top_level_domain: impl Into<Cow<'static, str>>) -> Self {
        self.top_level_domain = top_level_domain.into();
        self
    }

    /// Do not discover providers with `IPv6` interfaces.
    #[must_use]
    pub const fn disable_ipv6(mut self) -> Self {
        self.disable_ipv6 = true;
        self
    }

    /// Disables the given IP address.
    #[must_use]
    #[inline]
    pub fn disable_ip(mut self, ip: impl Into<IpAddr>) -> Self {
        self.disable_ip = Some(ip.into());
        self
    }

    /// Disables the given network interface.
    #[must_use]
    pub const fn disable_network_interface(mut self, network_interface: &'static str) -> Self {
        self.disable_network_interface = Some(network_interface);
        self
    }

    /// Only accepts the provider with the given endpoint reference.
    #[must_use]
    #[inline]
    pub fn target_epr(mut self, epr: impl Into<Cow<'static, str>>) -> Self {
        self.target_epr = Some(epr.into());
        self
    }

    pub(crate) async fn discover(&self) -> Result<Devices> {
        // Discover providers.
        let discovery_info = self.discover_devices().await?;

        self.obtain_devices_data(discovery_info).await
    }

    // Contacts a provider at a known address, skipping the discovery
    // service.
    pub(crate) async fn resolve(&self, address: &str) -> Result<Device> {
        let url = reqwest::Url::parse(address).map_err(|e| {
            Error::new(
                ErrorKind::InvalidParameter,
                format!("Invalid provider address `{address}`: {e}"),
            )
        })?;

        let port = url.port_or_known_default().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidParameter,
                format!("No port found for the provider address `{address}`"),
            )
        })?;

        let mut addresses = HashSet::new();
        if let Some(ip) = url
            .host_str()
            .and_then(|host| host.trim_matches(['[', ']']).parse::<IpAddr>().ok())
        {
            addresses.insert(ip);
        }

        let mut properties = HashMap::new();
        properties.insert("scheme".into(), url.scheme().into());

        let complete_address = address.trim_end_matches('/').to_string();
        info!("Resolving provider at {complete_address}");

        let device_data = fetch_device_data(&complete_address).await?;

        if !self.is_target(&device_data.epr) {
            return Err(Error::new(
                ErrorKind::Discovery,
                format!(
                    "The provider at {complete_address} has endpoint reference `{}`",
                    device_data.epr
                ),
            ));
        }

        let network_info = NetworkInformation::new(
            device_data.epr.to_string(),
            addresses,
            port,
            properties,
            complete_address,
        );

        Ok(Device::from_device_data(network_info, device_data))
    }

    fn is_target(&self, epr: &str) -> bool {
        self.target_epr
            .as_ref()
            .is_none_or(|target_epr| target_epr == epr)
    }

    fn service_type(&self) -> String {
        format!("_{}._tcp.{}.", self.domain, self.top_level_domain)
    }

    async fn discover_devices(&self) -> Result<Vec<ResolvedService>> {
        // Create a mdns daemon
        let mdns = ServiceDaemon::new()?;

        // Disable IPv6 interface.
        if self.disable_ipv6 {
            mdns.disable_interface(IfKind::IPv6)?;
        }

        // Disable IP.
        if let Some(ip) = self.disable_ip {
            mdns.disable_interface(ip)?;
        }

        // Disable network interface.
        if let Some(network_interface) = self.disable_network_interface {
            mdns.disable_interface(network_interface)?;
        }

        let service_type = self.service_type();

        // Detects providers.
        let receiver = mdns.browse(&service_type)?;

        let mut discovery_service = Vec::new();

        // Run for n-seconds in search of providers and saves their
        // information in memory.
        while let Ok(event) = self.with_timeout(&receiver).await {
            if let ServiceEvent::ServiceResolved(info) = event {
                if info.get_addresses().is_empty() {
                    warn!("No provider address available for {:?}", info);
                    continue;
                }

                // Skip announced providers with a different endpoint
                // reference before contacting them.
                if let Some(epr) = info.txt_properties.get_property_val_str(EPR_PROPERTY)
                    && !self.is_target(epr)
                {
                    info!(
                        "Skipping provider `{}` with endpoint reference `{epr}`",
                        info.get_fullname()
                    );
                    continue;
                }

                if Self::check_device_duplicates(&discovery_service, &info) {
                    continue;
                }

                discovery_service.push(*info);
            }
        }

        // Stop detection.
        mdns.stop_browse(&service_type)?;

        if let Err(e) = mdns.shutdown() {
            warn!("Unable to stop the discovery daemon: {e}");
        }

        Ok(discovery_service)
    }

    #[inline]
    async fn with_timeout<T>(
        &self,
        receiver: &Receiver<T>,
    ) -> std::result::Result<T, RecvTimeoutError> {
        let timeout_future = sleep(self.timeout);

        tokio::select! {
            () = timeout_future => {
                // This is the same error returned by the `recv_timeout`
                // function in case of a timeout.
                Err(RecvTimeoutError::Timeout)
            }
            result = receiver.recv_async() => {
                result.map_err(|_| RecvTimeoutError::Disconnected)
            }
        }
    }

    async fn obtain_devices_data(
        &self,
        discovery_service: Vec<ResolvedService>,
    ) -> Result<Devices> {
        let mut devices = Devices::new();

        for service in discovery_service {
            // Try to contact each available address of a provider to retrieve
            // its data.
            for address in &service.addresses {
                let complete_address = build_device_address(
                    service
                        .txt_properties
                        .get_property_val_str("scheme")
                        // If the scheme is not specified as a property,
                        // fall back to `http` as default.
                        .unwrap_or("http"),
                    &address.to_ip_addr(),
                    service.port,
                );
                info!("Complete address: {complete_address}");

                let device_data = match fetch_device_data(&complete_address).await {
                    Ok(device_data) => device_data,
                    Err(e) => {
                        warn!("Impossible to contact address {complete_address}: {e}");
                        continue;
                    }
                };

                if !self.is_target(&device_data.epr) {
                    info!(
                        "Ignoring provider {complete_address} with endpoint reference `{}`",
                        device_data.epr
                    );
                    break;
                }

                if devices.find_by_epr(&device_data.epr).is_some() {
                    warn!(
                        "Ignoring provider {complete_address}: endpoint reference `{}` already discovered",
                        device_data.epr
                    );
                    break;
                }

                let network_info = NetworkInformation::new(
                    service.fullname.clone(),
                    service
                        .addresses
                        .iter()
                        .map(|address| address.to_ip_addr())
                        .collect(),
                    service.port,
                    service.txt_properties.clone().into_property_map_str(),
                    complete_address,
                );

                devices.add(Device::from_device_data(network_info, device_data));

                // Only a single address is necessary.
                break;
            }
        }

        Ok(devices)
    }

    // A discovered provider is equal to another provider when:
    //
    // - It has an address with IP and port identical to the ones of
    //   another provider address.
    //   Providers belonging to the same local network CANNOT HAVE any IP
    //   and port in common.
    //
    //   OR
    //
    // - It has the same full name of another provider belonging to the same
    //   network.
    fn check_device_duplicates(
        discovery_service: &[ResolvedService],
        info: &ResolvedService,
    ) -> bool {
        for disco_service in discovery_service {
            // When the addresses have distinct ports, they are always
            // different, so they are not considered.
            if disco_service.port != info.get_port() {
                continue;
            }

            for address in &disco_service.addresses {
                if info.get_addresses().contains(address) {
                    return true;
                }
            }

            if disco_service.fullname == info.get_fullname() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use serial_test::serial;

    use crate::error::ErrorKind;
    use crate::tests::{EPR, with_provider};

    use super::Discovery;

    pub(crate) fn configure_discovery() -> Discovery {
        Discovery::default()
            .timeout(Duration::from_secs(1))
            .disable_ipv6()
            .disable_network_interface("docker0")
    }

    #[test]
    fn service_type() {
        assert_eq!(Discovery::default().service_type(), "_ortable._tcp.local.");
        assert_eq!(
            Discovery::new("table").top_level_domain("lan").service_type(),
            "_table._tcp.lan."
        );
    }

    #[test]
    fn target_epr() {
        assert!(Discovery::default().is_target("urn:uuid:any"));

        let discovery = Discovery::default().target_epr(EPR);
        assert!(discovery.is_target(EPR));
        assert!(!discovery.is_target("urn:uuid:other"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn resolve_provider() {
        with_provider(10200, |address| async move {
            let device = Discovery::default()
                .target_epr(EPR)
                .resolve(&address)
                .await
                .unwrap();

            assert_eq!(device.epr(), EPR);
            assert_eq!(device.requests_count(), 12);
            assert!(device.has_reports());
            assert_eq!(device.description().main_route, "/or-table");
            assert_eq!(device.network_info().port, 10200);
            assert_eq!(device.network_info().last_reachable_address, address);

            let error = Discovery::default()
                .target_epr("urn:uuid:other")
                .resolve(&address)
                .await
                .unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Discovery);
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn resolve_invalid_address() {
        let error = Discovery::default()
            .resolve("not an address")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidParameter);

        // No provider listens on this port.
        let error = Discovery::default()
            .resolve("http://127.0.0.1:10299")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Request);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    #[ignore = "requires multicast on a physical network interface"]
    async fn discover_provider() {
        with_provider(10201, |_| async move {
            let devices = configure_discovery().target_epr(EPR).discover().await.unwrap();

            assert_eq!(devices.len(), 1);
            assert_eq!(devices.get(0).map(|device| device.epr()), Some(EPR));
        })
        .await;
    }
}
