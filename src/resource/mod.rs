// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access to remote stateful devices.
//!
//! The capabilities here are deliberately narrow: [`AttributeReader`] for
//! typed attribute reads and [`CommandInvoker`] for command invocation.
//! They are implemented twice: against the control system's REST gateway
//! ([`GatewayClient`]) and against an in-memory simulator
//! ([`SimulatedTelescope`]) for tests and local development.

mod assertion;
#[cfg(feature = "gateway")]
mod gateway;
mod group;
mod simulated;

use std::future::Future;

use crate::error::Result;
use crate::types::{AttrValue, DeviceName};

pub use assertion::{AttributeAssertion, assert_attribute};
#[cfg(feature = "gateway")]
pub use gateway::{DeviceHandle, GatewayClient, GatewayConfig};
pub use group::ResourceGroup;
pub use simulated::{SimulatedDevice, SimulatedTelescope};

/// Capability to read named attributes from a remote device.
///
/// Reads normalize enum/state/array value encodings into [`AttrValue`] so
/// downstream equality comparisons are straightforward. A missing attribute
/// reads as the [`AttrValue::not_found`] sentinel rather than an error.
pub trait AttributeReader: Send + Sync {
    /// The name of the device this reader is bound to.
    fn device_name(&self) -> &DeviceName;

    /// Reads the named attribute.
    ///
    /// Remote failures (unreachable gateway, malformed replies) surface as
    /// errors; a missing attribute is a sentinel value.
    fn read(&self, attr: &str) -> impl Future<Output = Result<AttrValue>> + Send;
}

/// Capability to invoke commands on a remote device.
pub trait CommandInvoker {
    /// Invokes the named command with an optional JSON argument and returns
    /// the command's reply.
    fn invoke(
        &self,
        command: &str,
        arg: Option<serde_json::Value>,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

/// A source of per-device readers, keyed by device name.
///
/// Both the gateway client and the simulator implement this, so waiters and
/// scenarios can be built against either.
pub trait ResourceProvider {
    /// The reader type handed out for each device.
    type Reader: AttributeReader;

    /// Returns a reader bound to the named device.
    fn resource(&self, name: &DeviceName) -> Self::Reader;
}
