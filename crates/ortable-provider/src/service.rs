use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

use mdns_sd::{IfKind, ServiceDaemon, ServiceInfo};

use tracing::{info, warn};

use crate::error::Result;

// Service domain.
//
// It defines the default domain for a service.
const DOMAIN: &str = "ortable";

// Service top-level domain.
//
// It defines the default top-level domain for a service.
const TOP_LEVEL_DOMAIN: &str = "local";

/// A discovery service configuration.
#[derive(Debug)]
pub struct ServiceConfig<'a> {
    // Instance name.
    pub(crate) instance_name: &'a str,
    // Service host name
    pub(crate) hostname: &'a str,
    // Service domain.
    pub(crate) domain: &'a str,
    // Top-level domain.
    pub(crate) top_level_domain: &'a str,
    // Service properties.
    pub(crate) properties: HashMap<String, String>,
    // Disable IPv6.
    pub(crate) disable_ipv6: bool,
    // Disable IP.
    pub(crate) disable_ip: Option<IpAddr>,
    // Disable network interface.
    pub(crate) disable_network_interface: Option<&'a str>,
}

impl<'a> ServiceConfig<'a> {
    /// Creates [`ServiceConfig`] for an `mDNS-SD` discovery service.
    #[must_use]
    pub fn mdns_sd(instance_name: &'a str) -> Self {
        Self {
            instance_name,
            hostname: instance_name,
            domain: DOMAIN,
            top_level_domain: TOP_LEVEL_DOMAIN,
            properties: HashMap::new(),
            disable_ipv6: false,
            disable_ip: None,
            disable_network_interface: None,
        }
    }

    /// Sets a discovery service property.
    ///
    /// For example, a property might be the server scheme.
    /// i.e. ("scheme", "http")
    #[must_use]
    pub fn property(mut self, property: (impl Into<String>, impl Into<String>)) -> Self {
        self.properties.insert(property.0.into(), property.1.into());
        self
    }

    /// Sets the service hostname.
    #[must_use]
    pub const fn hostname(mut self, hostname: &'a str) -> Self {
        self.hostname = hostname;
        self
    }

    /// Sets the service domain.
    ///
    /// The domain searched by consumers, i.e. `ortable`.
    #[must_use]
    pub const fn domain(mut self, domain: &'a str) -> Self {
        self.domain = domain;
        self
    }

    /// Sets the service top-level domain.
    ///
    /// A common top-level domain is `.local`.
    #[must_use]
    pub const fn top_level_domain(mut self, top_level_domain: &'a str) -> Self {
        self.top_level_domain = top_level_domain;
        self
    }

    /// Excludes `IPv6` interfaces from the discovery service.
    #[must_use]
    pub const fn disable_ipv6(mut self) -> Self {
        self.disable_ipv6 = true;
        self
    }

    /// Excludes the given `IP` from the discovery service.
    #[must_use]
    #[inline]
    pub fn disable_ip(mut self, ip: impl Into<IpAddr>) -> Self {
        self.disable_ip = Some(ip.into());
        self
    }

    /// Disables the given network interface from the discovery service.
    #[must_use]
    pub const fn disable_network_interface(mut self, network_interface: &'a str) -> Self {
        self.disable_network_interface = Some(network_interface);
        self
    }

    fn service_type(&self) -> String {
        format!("_{}._tcp.{}.", self.domain, self.top_level_domain)
    }

    fn host_name(&self) -> String {
        format!("{}.{}.", self.hostname, self.top_level_domain)
    }
}

// A registered discovery service.
pub(crate) struct Service {
    daemon: ServiceDaemon,
    fullname: String,
}

impl Service {
    // Registers a service announcing the server address and port.
    //
    // When the server listens on all interfaces, the addresses of every
    // enabled interface are announced.
    pub(crate) fn run(
        service_config: ServiceConfig,
        server_address: Ipv4Addr,
        port: u16,
    ) -> Result<Self> {
        let daemon = ServiceDaemon::new()?;

        if service_config.disable_ipv6 {
            daemon.disable_interface(IfKind::IPv6)?;
        }

        if let Some(ip) = service_config.disable_ip {
            daemon.disable_interface(ip)?;
        }

        if let Some(network_interface) = service_config.disable_network_interface {
            daemon.disable_interface(network_interface)?;
        }

        let service_type = service_config.service_type();
        let host_name = service_config.host_name();

        let address = if server_address.is_unspecified() {
            String::new()
        } else {
            server_address.to_string()
        };

        let service = ServiceInfo::new(
            &service_type,
            service_config.instance_name,
            &host_name,
            address.as_str(),
            port,
            service_config.properties,
        )?;

        let service = if server_address.is_unspecified() {
            service.enable_addr_auto()
        } else {
            service
        };

        let fullname = service.get_fullname().to_string();

        daemon.register(service)?;

        info!("Service `{fullname}` registered on port {port}");

        Ok(Self { daemon, fullname })
    }

    // Unregisters the service and stops the daemon.
    pub(crate) fn stop(self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            warn!("Unable to unregister service `{}`: {e}", self.fullname);
        }

        if let Err(e) = self.daemon.shutdown() {
            warn!("Unable to stop the discovery daemon: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceConfig;

    #[test]
    fn service_names() {
        let config = ServiceConfig::mdns_sd("or-table")
            .hostname("surgery-room")
            .property(("scheme", "http"));

        assert_eq!(config.service_type(), "_ortable._tcp.local.");
        assert_eq!(config.host_name(), "surgery-room.local.");
        assert_eq!(
            config.properties.get("scheme").map(String::as_str),
            Some("http")
        );

        let config = config.domain("table").top_level_domain("lan");
        assert_eq!(config.service_type(), "_table._tcp.lan.");
    }
}
