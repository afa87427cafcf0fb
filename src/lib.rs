// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! statewatch - observe and synchronize on remote device state.
//!
//! This library gives acceptance test suites a reliable way to drive a
//! Tango-style control system through state transitions (startup, resource
//! assignment, configure, scan, standby) and block until the transitions
//! actually happened, without polling blindly or racing the system under
//! test.
//!
//! # Building blocks
//!
//! - **Resource access**: typed attribute reads and command invocation
//!   against the control system's REST gateway, or against an in-memory
//!   simulator for tests.
//! - **Change monitors**: capture a baseline, poll until the value changes
//!   (or reaches a target), with a wall-clock budget and a discriminated
//!   value-or-timeout outcome.
//! - **Waiters**: block until a whole set of expected transitions across
//!   several devices resolves, with a transition report for diagnostics.
//! - **Synchronized commands**: send a command and return only once the
//!   telescope reached the commanded state.
//! - **State recording**: snapshot a device set's states on a background
//!   task for post-hoc analysis, deduplicating unchanged ticks.
//! - **Event listening**: consume attribute-transition events pushed on an
//!   event bus, immediately or at a client-side cadence.
//!
//! # Quick Start
//!
//! ## Waiting for a transition
//!
//! ```
//! use statewatch::monitor::{WaitBudget, watch};
//! use statewatch::resource::SimulatedDevice;
//! use statewatch::types::{AttrValue, DeviceName};
//!
//! #[tokio::main]
//! async fn main() -> statewatch::Result<()> {
//!     let subarray = SimulatedDevice::new(DeviceName::new("ska_mid/tm_subarray_node/1")?);
//!     subarray.script_attribute("obsState", ["EMPTY", "RESOURCING", "IDLE"]);
//!
//!     let mut monitor = watch(subarray).for_a_change_to("obsState", "IDLE").await?;
//!     let value = monitor.value_when_changed(WaitBudget::default()).await?;
//!     assert_eq!(value, AttrValue::from("IDLE"));
//!     Ok(())
//! }
//! ```
//!
//! ## Synchronizing a command against a live deployment
//!
//! ```no_run
//! use statewatch::control::TelescopeControl;
//! use statewatch::resource::GatewayConfig;
//! use statewatch::waiter::Topology;
//!
//! #[tokio::main]
//! async fn main() -> statewatch::Result<()> {
//!     let gateway = GatewayConfig::from_env()?.into_client();
//!     let control = TelescopeControl::new(gateway, Topology::from_env());
//!
//!     // Returns once every subarray device reported the startup transition.
//!     let report = control.start_up().await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod control;
pub mod error;
pub mod event;
pub mod fixtures;
pub mod monitor;
pub mod recorder;
pub mod resource;
pub mod sync;
pub mod types;
pub mod waiter;

pub use control::TelescopeControl;
pub use error::{
    AssertionError, DeviceError, Error, ParseError, ProtocolError, RecorderError, Result,
    ValueError, WaitError,
};
pub use event::{ConsumeStrategy, EventBus, Listener, TransitionEvent};
pub use monitor::{Monitor, Watch, WaitBudget, WaitOutcome, watch};
pub use recorder::{Record, StateRecorder};
#[cfg(feature = "gateway")]
pub use resource::{DeviceHandle, GatewayClient, GatewayConfig};
pub use resource::{
    AttributeReader, CommandInvoker, ResourceGroup, ResourceProvider, SimulatedDevice,
    SimulatedTelescope, assert_attribute,
};
pub use sync::Synced;
pub use types::{AttrValue, DevState, DeviceName, ObsState};
pub use waiter::{Scenarios, Topology, WaitReport, Waiter};
