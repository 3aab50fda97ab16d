//! `ortable-provider` is a library for exposing a virtual operating table on
//! the network.
//!
//! A provider owns a single [`ortable::controller::AxisController`] shared
//! by every request handler and by a periodic reporter. It is exposed
//! through a client-server architecture in which the provider operates as
//! the server and its consumers as clients.
//!
//! The provider description, returned when the server root is queried,
//! contains the endpoint reference identifying the provider, its model and
//! device descriptions, and the list of its routes. Each route runs one
//! command on the table and replies with the invocation outcome along with
//! a consistent snapshot of the table.
//!
//! The table state is also pushed to consumers as a stream of reports:
//! metrics on a fixed cadence, alerts whenever an alarm changes its presence
//! and every operation invocation.
//!
//! Providers can announce themselves on the local network through an
//! `mDNS-SD` discovery service.

#![deny(unsafe_code)]
#![deny(missing_docs)]

/// The table description along with its routes.
pub mod device;
/// Error management.
pub mod error;
/// The periodic reporter of the table state.
pub mod reporter;
/// All responses kinds sent by the provider.
pub mod responses;
/// The provider server.
pub mod server;
/// The discovery service used to make the provider detectable on the network.
pub mod service;
/// The table shared by all routes.
pub mod table;
