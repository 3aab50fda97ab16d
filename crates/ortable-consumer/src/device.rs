use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use serde::Serialize;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

use tokio_util::sync::CancellationToken;

use ortable::device::{DeviceData, DeviceDescription, ModelDescription};
use ortable::response::ResponseKind;
use ortable::route::RouteConfigs;

use crate::error::{Error, ErrorKind, Result};
use crate::reports::{ReportPayload, ReportsRunner};
use crate::request::{Request, RequestInfo, create_requests};

pub(crate) fn build_device_address(scheme: &str, address: &IpAddr, port: u16) -> String {
    format!("{scheme}://{address}:{port}")
}

/// Device network information.
///
/// All data needed to contact a provider in a network.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct NetworkInformation {
    /// Provider complete name.
    pub name: String,
    /// Provider addresses.
    pub addresses: HashSet<IpAddr>,
    /// Provider port.
    pub port: u16,
    /// Provider properties.
    pub properties: HashMap<String, String>,
    /// Provider last reachable address.
    pub last_reachable_address: String,
}

impl NetworkInformation {
    /// Creates a [`NetworkInformation`].
    #[must_use]
    pub const fn new(
        name: String,
        addresses: HashSet<IpAddr>,
        port: u16,
        properties: HashMap<String, String>,
        last_reachable_address: String,
    ) -> Self {
        Self {
            name,
            addresses,
            port,
            properties,
            last_reachable_address,
        }
    }
}

/// Device description.
///
/// All properties which describe a provider.
#[derive(Debug, PartialEq, Serialize)]
pub struct Description {
    /// Endpoint reference.
    pub epr: String,
    /// Model description.
    pub model: ModelDescription,
    /// Device description.
    pub device: DeviceDescription,
    /// Provider main route.
    pub main_route: String,
}

impl Description {
    /// Creates a [`Description`].
    #[must_use]
    pub const fn new(
        epr: String,
        model: ModelDescription,
        device: DeviceDescription,
        main_route: String,
    ) -> Self {
        Self {
            epr,
            model,
            device,
            main_route,
        }
    }
}

/// An OR table provider known to the consumer.
#[derive(Debug, Serialize)]
pub struct Device {
    // Information needed to contact a provider in a network.
    network_info: NetworkInformation,
    // All data needed to describe a provider.
    description: Description,
    // All provider requests, keyed by operation.
    requests: HashMap<String, Request>,
    // Token stopping the report receiver.
    #[serde(skip)]
    pub(crate) cancellation_token: CancellationToken,
    // The join handle for the report task.
    #[serde(skip)]
    pub(crate) report_handle: Option<JoinHandle<()>>,
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.network_info == other.network_info
            && self.description == other.description
            && self.requests == other.requests
    }
}

impl Device {
    /// Creates a [`Device`] from [`NetworkInformation`], [`Description`],
    /// and [`RouteConfigs`] data.
    ///
    /// This method might be useful when a provider is known in advance, for
    /// example because its data are stored in a database.
    #[must_use]
    pub fn new(
        network_info: NetworkInformation,
        description: Description,
        route_configs: RouteConfigs,
    ) -> Self {
        let requests = create_requests(
            route_configs,
            &network_info.last_reachable_address,
            &description.main_route,
        );

        Self::init(network_info, description, requests)
    }

    /// Returns an immutable reference to [`NetworkInformation`].
    #[must_use]
    pub const fn network_info(&self) -> &NetworkInformation {
        &self.network_info
    }

    /// Returns an immutable reference to [`Description`].
    #[must_use]
    pub const fn description(&self) -> &Description {
        &self.description
    }

    /// Returns the endpoint reference of the provider.
    #[must_use]
    pub fn epr(&self) -> &str {
        &self.description.epr
    }

    /// Returns requests information as a vector of [`RequestInfo`].
    #[must_use]
    #[inline]
    pub fn requests_info(&self) -> Vec<RequestInfo<'_>> {
        self.requests
            .iter()
            .map(|(route, request)| RequestInfo::new(route, request))
            .collect()
    }

    /// Returns the number of available requests for a provider.
    #[must_use]
    #[inline]
    pub fn requests_count(&self) -> usize {
        self.requests.len()
    }

    /// Returns the [`Request`] associated with the given route.
    ///
    /// The route is relative to the main route, with or without slashes,
    /// i.e. `height/increase`.
    ///
    /// If [`None`], the given route **does not** exist.
    #[must_use]
    #[inline]
    pub fn request(&self, route: &str) -> Option<&Request> {
        self.requests.get(route.trim_matches('/'))
    }

    /// Checks if the provider streams reports.
    #[must_use]
    #[inline]
    pub fn has_reports(&self) -> bool {
        self.reports_request().is_some()
    }

    /// Checks if a report receiver for a [`Device`] is running.
    #[must_use]
    pub const fn is_report_receiver_running(&self) -> bool {
        self.report_handle.is_some()
    }

    /// Starts the asynchronous report receiver of the [`Device`].
    ///
    /// A report receiver task opens the report stream of the provider,
    /// parses each report and sends it to the [`Receiver`] returned by this
    /// method.
    ///
    /// The `buffer_size` parameter specifies how many reports the receiver
    /// buffer can hold.
    /// When the buffer is full, the task waits until a report is consumed
    /// from the channel.
    ///
    /// When the returned [`Receiver`] is dropped, the report receiver task
    /// terminates automatically.
    ///
    /// # Errors
    ///
    /// - The provider does not stream reports
    /// - The report receiver task has already been started
    /// - An error occurred while opening the report stream
    pub async fn start_report_receiver(
        &mut self,
        id: usize,
        buffer_size: usize,
    ) -> Result<Receiver<ReportPayload>> {
        let (tx, rx) = mpsc::channel(buffer_size);
        self.run_report_receiver(id, tx).await?;
        Ok(rx)
    }

    pub(crate) async fn run_report_receiver(
        &mut self,
        id: usize,
        sender: Sender<ReportPayload>,
    ) -> Result<()> {
        if self.report_handle.is_some() {
            return Err(Error::new(
                ErrorKind::Reports,
                format!("Report receiver already started for device with id `{id}`"),
            ));
        }

        let Some(request) = self.reports_request() else {
            return Err(Error::new(
                ErrorKind::Reports,
                format!("The device with id `{id}` does not stream reports"),
            ));
        };

        let handle =
            ReportsRunner::run(request, id, sender, self.cancellation_token.clone()).await?;
        self.report_handle = Some(handle);

        Ok(())
    }

    pub(crate) fn init(
        network_info: NetworkInformation,
        description: Description,
        requests: HashMap<String, Request>,
    ) -> Self {
        Self {
            network_info,
            description,
            requests,
            cancellation_token: CancellationToken::new(),
            report_handle: None,
        }
    }

    pub(crate) fn from_device_data(
        network_info: NetworkInformation,
        device_data: DeviceData,
    ) -> Self {
        let description = Description::new(
            device_data.epr.into_owned(),
            device_data.model,
            device_data.device,
            device_data.main_route.into_owned(),
        );

        Self::new(network_info, description, device_data.route_configs)
    }

    fn reports_request(&self) -> Option<&Request> {
        self.requests
            .values()
            .find(|request| request.response_kind == ResponseKind::Stream)
    }
}

/// A collection of [`Device`]s.
#[derive(Debug, PartialEq, Serialize)]
pub struct Devices(pub(crate) Vec<Device>);

impl Default for Devices {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for Devices {
    type Item = Device;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Devices {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut Devices {
    type Item = &'a mut Device;
    type IntoIter = std::slice::IterMut<'a, Device>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter_mut()
    }
}

impl Devices {
    /// Creates a [`Device`]s collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates [`Devices`] from a vector of [`Device`]s.
    #[must_use]
    pub const fn from_devices(devices: Vec<Device>) -> Self {
        Self(devices)
    }

    /// Adds a [`Device`], returning its identifier.
    #[inline]
    pub fn add(&mut self, device: Device) -> usize {
        self.0.push(device);
        self.0.len() - 1
    }

    /// Checks whether the collection is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of [`Device`] contained in a collection.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Gets a [`Device`] reference identified by the given index.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Device> {
        self.0.get(index)
    }

    /// Gets a mutable [`Device`] reference identified by the given index.
    #[must_use]
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Device> {
        self.0.get_mut(index)
    }

    /// Returns the [`Device`] with the given endpoint reference, along with
    /// its identifier.
    #[must_use]
    pub fn find_by_epr(&self, epr: &str) -> Option<(usize, &Device)> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, device)| device.epr() == epr)
    }

    /// Returns an iterator over [`Device`]s.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.0.iter()
    }

    /// Returns a mutable iterator over [`Device`]s.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Device> {
        self.0.iter_mut()
    }
}
