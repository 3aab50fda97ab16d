use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::route::RouteConfigs;

/// Model description.
///
/// General information about the model of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Manufacturer name.
    pub manufacturer: Cow<'static, str>,
    /// Model name.
    pub model_name: Cow<'static, str>,
    /// Model number.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub model_number: Option<Cow<'static, str>>,
    /// Model URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub model_url: Option<Cow<'static, str>>,
}

impl ModelDescription {
    /// Creates a [`ModelDescription`].
    #[must_use]
    pub fn new(
        manufacturer: impl Into<Cow<'static, str>>,
        model_name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model_name: model_name.into(),
            model_number: None,
            model_url: None,
        }
    }

    /// Sets the model number.
    #[must_use]
    pub fn model_number(mut self, model_number: impl Into<Cow<'static, str>>) -> Self {
        self.model_number = Some(model_number.into());
        self
    }

    /// Sets the model URL.
    #[must_use]
    pub fn model_url(mut self, model_url: impl Into<Cow<'static, str>>) -> Self {
        self.model_url = Some(model_url.into());
        self
    }
}

/// Device description.
///
/// Information about a single device instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Human readable name.
    pub friendly_name: Cow<'static, str>,
    /// Serial number.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub serial_number: Option<Cow<'static, str>>,
    /// Firmware version.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub firmware_version: Option<Cow<'static, str>>,
}

impl DeviceDescription {
    /// Creates a [`DeviceDescription`].
    #[must_use]
    pub fn new(friendly_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            serial_number: None,
            firmware_version: None,
        }
    }

    /// Sets the serial number.
    #[must_use]
    pub fn serial_number(mut self, serial_number: impl Into<Cow<'static, str>>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Sets the firmware version.
    #[must_use]
    pub fn firmware_version(mut self, firmware_version: impl Into<Cow<'static, str>>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// Device data.
///
/// Returned by a provider when its root is queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceData {
    /// Endpoint reference, the unique identifier of a provider.
    pub epr: Cow<'static, str>,
    /// Model description.
    pub model: ModelDescription,
    /// Device description.
    pub device: DeviceDescription,
    /// Device main route.
    #[serde(rename = "main route")]
    pub main_route: Cow<'static, str>,
    /// All device route configurations.
    pub route_configs: RouteConfigs,
}

impl DeviceData {
    /// Creates [`DeviceData`].
    #[must_use]
    pub fn new(
        epr: impl Into<Cow<'static, str>>,
        model: ModelDescription,
        device: DeviceDescription,
        main_route: impl Into<Cow<'static, str>>,
        route_configs: RouteConfigs,
    ) -> Self {
        Self {
            epr: epr.into(),
            model,
            device,
            main_route: main_route.into(),
            route_configs,
        }
    }
}
