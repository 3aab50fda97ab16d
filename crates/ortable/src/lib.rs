//! `ortable` is the interface shared by a virtual operating table provider
//! and its consumers.
//!
//! An operating table has four axes: height, trend, tilt and backplate.
//! Each axis is bounded by a range and moves by a fixed step. When an axis
//! gets close to one of its range extremes, an alarm for that axis becomes
//! active.
//!
//! The [`controller::AxisController`] owns the table state and keeps the
//! alarm flags consistent with it. Every state change is requested through a
//! [`command::Command`], so providers and consumers agree on a single set of
//! operations, described on the network by [`route::RouteConfigs`] inside
//! a [`device::DeviceData`].
//!
//! Providers push [`report::Report`]s to their observers, while command
//! outcomes travel back as [`response`] payloads.

#![deny(unsafe_code)]
#![deny(missing_docs)]

/// Table axes, their ranges and steps.
pub mod axis;
/// Alarm flags derived from the table state.
pub mod alarm;
/// Commands accepted by a table.
pub mod command;
/// The component owning the table state.
pub mod controller;
/// Description of a table provider.
pub mod device;
/// Reports pushed by a provider.
pub mod report;
/// All responses kinds along with their payloads.
pub mod response;
/// Definition of provider routes.
pub mod route;
/// Axis values and preset positions.
pub mod table;

#[cfg(test)]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
