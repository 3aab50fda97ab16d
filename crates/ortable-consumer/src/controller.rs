use std::borrow::Cow;

use ortable::command::Command;
use ortable::controller::TableSnapshot;
use ortable::response::{CommandResponse, InvocationInfo};

use tokio::sync::mpsc::{self, Receiver};

use tracing::{error, info, warn};

use crate::device::{Device, Devices};
use crate::discovery::Discovery;
use crate::error::{Error, ErrorKind, Result};
use crate::reports::ReportPayload;
use crate::request::Request;
use crate::response::Response;

// Route of the table status.
const STATUS_ROUTE: &str = "status";

fn sender_error(error: impl Into<Cow<'static, str>>) -> Error {
    Error::new(ErrorKind::Sender, error)
}

/// A request sender.
#[derive(Debug, PartialEq)]
pub struct RequestSender<'controller> {
    request: &'controller Request,
}

impl RequestSender<'_> {
    /// Sends a request to a provider, getting in return a [`Response`].
    ///
    /// When the request has a parameter, its default value is sent.
    ///
    /// # Errors
    ///
    /// While sending a request to a provider, some network failures or
    /// timeouts can prevent the effective sending. Moreover, the same issues
    /// can also affect the returned response.
    pub async fn send(&self) -> Result<Response> {
        let body = self.request.body(None)?;
        self.request.retrieve_response(body).await
    }

    /// Sends a request to a provider with the given parameter value,
    /// getting in return a [`Response`].
    ///
    /// # Errors
    ///
    /// An error is returned when the value is not allowed by the request
    /// parameter. Network failures or timeouts can also prevent the
    /// effective sending.
    pub async fn send_with_argument(&self, argument: &str) -> Result<Response> {
        let body = self.request.body(Some(argument))?;
        self.request.retrieve_response(body).await
    }
}

/// A sender for the requests of a determined provider.
#[derive(Debug, PartialEq)]
pub struct DeviceSender<'controller> {
    device: &'controller Device,
    id: usize,
}

impl DeviceSender<'_> {
    /// Returns the identifier of the provider.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Builds the [`RequestSender`] for the given request, identified by its
    /// route.
    ///
    /// # Errors
    ///
    /// An error is returned when the given route **does** not exist.
    pub fn request(&self, route: &str) -> Result<RequestSender<'_>> {
        let request = self.device.request(route).ok_or_else(|| {
            sender_error(format!(
                "Error in retrieving the request with route `{route}` for device with id `{}`.",
                self.id
            ))
        })?;

        Ok(RequestSender { request })
    }

    /// Executes a [`Command`] on the provider table, returning the
    /// [`InvocationInfo`] of the command.
    ///
    /// # Errors
    ///
    /// An error is returned when the provider does not expose the command,
    /// rejects it, or cannot be reached.
    pub async fn execute(&self, command: Command) -> Result<InvocationInfo> {
        self.execute_with_snapshot(command)
            .await
            .map(|response| response.invocation)
    }

    /// Executes a [`Command`] on the provider table, returning both the
    /// [`InvocationInfo`] and the table state right after the command.
    ///
    /// # Errors
    ///
    /// An error is returned when the provider does not expose the command,
    /// rejects it, or cannot be reached.
    pub async fn execute_with_snapshot(&self, command: Command) -> Result<CommandResponse> {
        let sender = self.request(&command.operation())?;

        let response = match command {
            Command::SetPreset(position) => sender.send_with_argument(position.name()).await?,
            Command::IncreaseAxis(_) | Command::DecreaseAxis(_) | Command::ApplyPreset => {
                sender.send().await?
            }
        };

        let response = response
            .serial()?
            .parse_body::<CommandResponse>()
            .await?
            .into_inner();

        info!(
            "Device `{}` executed `{command}` with transaction id {}",
            self.id, response.invocation.transaction_id
        );

        Ok(response)
    }

    /// Retrieves the current axis values and alarm flags of the provider.
    ///
    /// # Errors
    ///
    /// An error is returned when the provider cannot be reached or replies
    /// with an invalid status.
    pub async fn status(&self) -> Result<TableSnapshot> {
        Ok(self
            .request(STATUS_ROUTE)?
            .send()
            .await?
            .serial()?
            .parse_body::<TableSnapshot>()
            .await?
            .into_inner())
    }
}

/// A consumer controller for OR table providers.
///
/// It discovers providers and sends them commands. When the controller
/// receives a response from a provider, it forwards it directly to the
/// caller.
#[derive(Debug, PartialEq)]
pub struct Controller {
    discovery: Discovery,
    devices: Devices,
}

impl Controller {
    /// Creates a [`Controller`] given a [`Discovery`] configuration.
    #[must_use]
    #[inline]
    pub fn new(discovery: Discovery) -> Self {
        Self {
            discovery,
            devices: Devices::new(),
        }
    }

    /// Creates a [`Controller`] from a [`Discovery`] configuration and
    /// a set of initial [`Devices`].
    ///
    /// This method might be useful when [`Devices`] are retrieved from
    /// a database.
    #[must_use]
    #[inline]
    pub const fn from_devices(discovery: Discovery, devices: Devices) -> Self {
        Self { discovery, devices }
    }

    /// Discovers all available providers in a network.
    ///
    /// Previously known [`Devices`] are replaced.
    ///
    /// # Errors
    ///
    /// ## Discovery Errors
    ///
    /// During a discovery process some of the most common errors are the
    /// impossibility to connect to a network, disable a particular interface,
    /// or close the discovery process itself.
    ///
    /// ## Sending Requests Errors
    ///
    /// While sending a request to a provider to obtain its description and
    /// all of its routes, some network failures or timeouts can prevent the
    /// effective sending.
    #[inline]
    pub async fn discover(&mut self) -> Result<()> {
        self.devices = self.discovery.discover().await?;
        Ok(())
    }

    /// Contacts the provider at the given address, i.e.
    /// `http://192.168.1.10:10000`, returning its identifier.
    ///
    /// A provider already known by its endpoint reference keeps its
    /// identifier.
    ///
    /// # Errors
    ///
    /// An error is returned when the address is invalid, when the provider
    /// cannot be reached, or when its endpoint reference differs from the
    /// target one.
    pub async fn resolve(&mut self, address: &str) -> Result<usize> {
        let device = self.discovery.resolve(address).await?;

        if let Some((id, _)) = self.devices.find_by_epr(device.epr()) {
            warn!(
                "Device with endpoint reference `{}` already known with id `{id}`",
                device.epr()
            );
            return Ok(id);
        }

        Ok(self.devices.add(device))
    }

    /// Starts an asynchronous report receiver task for the [`Device`] with
    /// the given identifier.
    ///
    /// See [`Device::start_report_receiver`].
    ///
    /// # Errors
    ///
    /// - The given identifier **does** not exist
    /// - The report receiver cannot be started
    pub async fn start_report_receiver(
        &mut self,
        id: usize,
        buffer_size: usize,
    ) -> Result<Receiver<ReportPayload>> {
        let device = self.devices.get_mut(id).ok_or_else(|| {
            sender_error(format!(
                "Error in retrieving the device with identifier {id}."
            ))
        })?;

        device.start_report_receiver(id, buffer_size).await
    }

    /// Starts asynchronous report receiver tasks for all [`Device`]s which
    /// stream reports.
    ///
    /// All reports are sent to the [`Receiver`] returned by this method,
    /// along with the identifier of the device which produced them.
    ///
    /// The `buffer_size` parameter specifies how many reports the receiver
    /// buffer can hold.
    /// When the buffer is full, the tasks wait until a report is consumed
    /// from the channel.
    ///
    /// When the [`Receiver`] is dropped, all tasks terminate automatically.
    ///
    /// # Errors
    ///
    /// An error is returned when no report receiver task has started.
    pub async fn start_report_receivers(
        &mut self,
        buffer_size: usize,
    ) -> Result<Receiver<ReportPayload>> {
        let (tx, rx) = mpsc::channel(buffer_size);

        let mut started_count = 0;
        for (id, device) in self.devices.iter_mut().enumerate() {
            if device.is_report_receiver_running() {
                warn!("Skip device with id `{id}`: report receiver already started");
                continue;
            }

            match device.run_report_receiver(id, tx.clone()).await {
                Ok(()) => started_count += 1,
                Err(e) => warn!("Skip device with id `{id}`: {e}"),
            }
        }

        if started_count == 0 {
            return Err(Error::new(
                ErrorKind::Reports,
                "No report receiver tasks has started",
            ));
        }

        Ok(rx)
    }

    /// Returns an immutable reference to the internal [`Devices`].
    #[must_use]
    pub const fn devices(&self) -> &Devices {
        &self.devices
    }

    /// Returns a mutable reference to the internal [`Devices`].
    #[must_use]
    pub const fn devices_mut(&mut self) -> &mut Devices {
        &mut self.devices
    }

    /// Builds a [`DeviceSender`] for the [`Device`] with the given identifier.
    ///
    /// # Errors
    ///
    /// An error is returned when there are no devices or the given index
    /// **does** not exist.
    pub fn device(&self, id: usize) -> Result<DeviceSender<'_>> {
        if self.devices.is_empty() {
            return Err(sender_error("No devices found."));
        }

        let device = self.devices.get(id).ok_or_else(|| {
            sender_error(format!(
                "Error in retrieving the device with identifier {id}."
            ))
        })?;

        Ok(DeviceSender { device, id })
    }

    /// Shuts down the [`Controller`], stopping all asynchronous tasks and
    /// releasing all associated resources.
    ///
    /// # Note
    ///
    /// For a graceful shutdown, this method must be called before dropping
    /// the [`Controller`].
    pub async fn shutdown(self) {
        for device in self.devices {
            // Stop the report loop.
            device.cancellation_token.cancel();

            if let Some(report_handle) = device.report_handle {
                if let Err(e) = report_handle.await {
                    error!("Failed to await the report task: {e}");
                }
            }
        }
    }
}
