// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory devices for tests and local development.
//!
//! [`SimulatedDevice`] implements the same capabilities as the gateway
//! handle, backed by programmable attribute values: a plain value, a
//! scripted sequence consumed one step per read, or command-driven
//! transitions that also publish [`TransitionEvent`]s.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DeviceError, Result};
use crate::event::{EventBus, Listener, TransitionEvent};
use crate::types::{AttrValue, DeviceName};

use super::{AttributeReader, CommandInvoker, ResourceProvider};

/// A scripted attribute: successive reads step through the values, and the
/// last value repeats forever.
#[derive(Debug)]
struct ValueScript {
    steps: Vec<AttrValue>,
    next: usize,
}

impl ValueScript {
    fn fixed(value: AttrValue) -> Self {
        Self {
            steps: vec![value],
            next: 0,
        }
    }

    fn advance(&mut self) -> AttrValue {
        let value = self.steps[self.next].clone();
        if self.next + 1 < self.steps.len() {
            self.next += 1;
        }
        value
    }

    fn current(&self) -> AttrValue {
        self.steps[self.next].clone()
    }
}

#[derive(Debug)]
struct DeviceInner {
    name: DeviceName,
    attributes: Mutex<HashMap<String, ValueScript>>,
    commands: Mutex<HashMap<String, Vec<(String, AttrValue)>>>,
    bus: EventBus,
}

/// An in-memory stand-in for a remote device.
///
/// Cloning is cheap and clones share state, so a test can hold one handle
/// to script values while a monitor polls another.
///
/// # Examples
///
/// ```
/// use statewatch::resource::{AttributeReader, SimulatedDevice};
/// use statewatch::types::{AttrValue, DeviceName};
///
/// # async fn example() -> statewatch::Result<()> {
/// let device = SimulatedDevice::new(DeviceName::new("mid_csp/elt/subarray_01")?);
/// device.script_attribute("State", ["OFF", "OFF", "ON"]);
///
/// assert_eq!(device.read("State").await?, AttrValue::from("OFF"));
/// assert_eq!(device.read("State").await?, AttrValue::from("OFF"));
/// assert_eq!(device.read("State").await?, AttrValue::from("ON"));
/// // The last scripted value repeats.
/// assert_eq!(device.read("State").await?, AttrValue::from("ON"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    inner: Arc<DeviceInner>,
}

impl SimulatedDevice {
    /// Creates a device with its own private event bus.
    #[must_use]
    pub fn new(name: DeviceName) -> Self {
        Self::with_bus(name, EventBus::new())
    }

    /// Creates a device publishing on a shared event bus.
    #[must_use]
    pub fn with_bus(name: DeviceName, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                name,
                attributes: Mutex::new(HashMap::new()),
                commands: Mutex::new(HashMap::new()),
                bus,
            }),
        }
    }

    /// Returns the bus this device publishes transitions on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Sets an attribute to a fixed value without publishing an event.
    pub fn set_attribute(&self, attr: &str, value: impl Into<AttrValue>) {
        self.inner
            .attributes
            .lock()
            .insert(attr.to_string(), ValueScript::fixed(value.into()));
    }

    /// Scripts an attribute: successive reads step through `values`, with
    /// the last value repeating forever. An empty script removes the
    /// attribute, so reads return the missing-attribute sentinel.
    pub fn script_attribute<I, V>(&self, attr: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<AttrValue>,
    {
        let steps: Vec<AttrValue> = values.into_iter().map(Into::into).collect();
        let mut attributes = self.inner.attributes.lock();
        if steps.is_empty() {
            attributes.remove(attr);
        } else {
            attributes.insert(attr.to_string(), ValueScript { steps, next: 0 });
        }
    }

    /// Sets an attribute and publishes the transition on the bus.
    pub fn transition(&self, attr: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        self.set_attribute(attr, value.clone());
        self.inner.bus.publish(TransitionEvent::now(
            self.inner.name.clone(),
            attr,
            value,
        ));
    }

    /// Registers the transitions a command applies when invoked.
    pub fn on_command(&self, command: &str, effects: Vec<(&str, AttrValue)>) {
        self.inner.commands.lock().insert(
            command.to_string(),
            effects
                .into_iter()
                .map(|(attr, value)| (attr.to_string(), value))
                .collect(),
        );
    }

    /// Returns the current value of an attribute without advancing a script.
    #[must_use]
    pub fn peek_attribute(&self, attr: &str) -> AttrValue {
        self.inner
            .attributes
            .lock()
            .get(attr)
            .map_or_else(AttrValue::not_found, ValueScript::current)
    }
}

impl AttributeReader for SimulatedDevice {
    fn device_name(&self) -> &DeviceName {
        &self.inner.name
    }

    async fn read(&self, attr: &str) -> Result<AttrValue> {
        let value = self
            .inner
            .attributes
            .lock()
            .get_mut(attr)
            .map_or_else(AttrValue::not_found, ValueScript::advance);
        Ok(value)
    }
}

impl CommandInvoker for SimulatedDevice {
    async fn invoke(
        &self,
        command: &str,
        _arg: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let effects = self
            .inner
            .commands
            .lock()
            .get(command)
            .cloned()
            .ok_or_else(|| DeviceError::UnknownCommand(command.to_string()))?;

        tracing::debug!(device = %self.inner.name, command, "simulated command invoked");
        for (attr, value) in effects {
            self.transition(&attr, value);
        }
        Ok(serde_json::Value::Null)
    }
}

#[derive(Debug)]
struct TelescopeInner {
    devices: Mutex<HashMap<DeviceName, SimulatedDevice>>,
    bus: EventBus,
}

/// A set of simulated devices sharing one event bus.
///
/// Devices are created on first access, so scenarios can be built against
/// any topology without prior registration.
#[derive(Debug, Clone)]
pub struct SimulatedTelescope {
    inner: Arc<TelescopeInner>,
}

impl SimulatedTelescope {
    /// Creates an empty telescope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TelescopeInner {
                devices: Mutex::new(HashMap::new()),
                bus: EventBus::new(),
            }),
        }
    }

    /// Returns the named device, creating it on first access.
    #[must_use]
    pub fn device(&self, name: &DeviceName) -> SimulatedDevice {
        self.inner
            .devices
            .lock()
            .entry(name.clone())
            .or_insert_with(|| SimulatedDevice::with_bus(name.clone(), self.inner.bus.clone()))
            .clone()
    }

    /// Returns the shared event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Returns a listener subscribed to the shared bus.
    #[must_use]
    pub fn listener(&self) -> Listener {
        Listener::new(&self.inner.bus)
    }
}

impl Default for SimulatedTelescope {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for SimulatedTelescope {
    type Reader = SimulatedDevice;

    fn resource(&self, name: &DeviceName) -> SimulatedDevice {
        self.device(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn subarray() -> DeviceName {
        DeviceName::new("ska_mid/tm_subarray_node/1").unwrap()
    }

    #[tokio::test]
    async fn missing_attribute_reads_as_sentinel() {
        let device = SimulatedDevice::new(subarray());
        let value = device.read("obsState").await.unwrap();
        assert!(value.is_not_found());
    }

    #[tokio::test]
    async fn scripted_values_step_and_repeat() {
        let device = SimulatedDevice::new(subarray());
        device.script_attribute("obsState", ["EMPTY", "IDLE"]);

        assert_eq!(device.read("obsState").await.unwrap(), AttrValue::from("EMPTY"));
        assert_eq!(device.read("obsState").await.unwrap(), AttrValue::from("IDLE"));
        assert_eq!(device.read("obsState").await.unwrap(), AttrValue::from("IDLE"));
    }

    #[tokio::test]
    async fn empty_script_removes_the_attribute() {
        let device = SimulatedDevice::new(subarray());
        device.set_attribute("obsState", "IDLE");
        device.script_attribute::<_, AttrValue>("obsState", []);

        assert!(device.read("obsState").await.unwrap().is_not_found());
    }

    #[tokio::test]
    async fn command_applies_effects_and_publishes() {
        let device = SimulatedDevice::new(subarray());
        device.set_attribute("State", "OFF");
        device.on_command("On", vec![("State", AttrValue::from("ON"))]);

        let mut rx = device.bus().subscribe();
        device.invoke("On", None).await.unwrap();

        assert_eq!(device.peek_attribute("State"), AttrValue::from("ON"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.attribute, "State");
        assert_eq!(event.value, AttrValue::from("ON"));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let device = SimulatedDevice::new(subarray());
        let result = device.invoke("SelfDestruct", None).await;
        assert!(matches!(
            result,
            Err(Error::Device(DeviceError::UnknownCommand(_)))
        ));
    }

    #[tokio::test]
    async fn telescope_hands_out_shared_devices() {
        let telescope = SimulatedTelescope::new();
        let name = subarray();

        telescope.device(&name).set_attribute("State", "ON");
        let value = telescope.resource(&name).read("State").await.unwrap();
        assert_eq!(value, AttrValue::from("ON"));
    }
}
