// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! REST gateway access to remote devices.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{DeviceError, ProtocolError, Result};
use crate::types::{AttrValue, DeviceName};

use super::{AttributeReader, CommandInvoker, ResourceProvider};

// ============================================================================
// GatewayConfig - Connection parameters for the REST gateway
// ============================================================================

/// Configuration for the control system's REST gateway.
///
/// # Examples
///
/// ```
/// use statewatch::resource::GatewayConfig;
/// use std::time::Duration;
///
/// let config = GatewayConfig::new("http://gateway.example:8080/tango/rest")
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    base_url: String,
    timeout: Duration,
}

impl GatewayConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new gateway configuration for the specified base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Creates a configuration from the environment.
    ///
    /// Reads `TANGO_GATEWAY_URL`, falling back to composing a gateway URL
    /// from `TANGO_HOST`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if neither variable is set.
    pub fn from_env() -> Result<Self> {
        if let Ok(url) = std::env::var("TANGO_GATEWAY_URL") {
            return Ok(Self::new(url));
        }
        if let Ok(host) = std::env::var("TANGO_HOST") {
            return Ok(Self::new(format!("http://{host}/tango/rest")));
        }
        Err(ProtocolError::InvalidAddress(
            "neither TANGO_GATEWAY_URL nor TANGO_HOST is set".to_string(),
        )
        .into())
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a `GatewayClient` from this configuration.
    #[must_use]
    pub fn into_client(self) -> GatewayClient {
        GatewayClient { config: self }
    }
}

// ============================================================================
// GatewayClient - Per-device handle factory
// ============================================================================

/// Client for the control system's REST gateway.
///
/// The client itself holds no connections; it hands out per-device
/// [`DeviceHandle`]s.
///
/// # Examples
///
/// ```no_run
/// use statewatch::resource::{AttributeReader, GatewayClient, GatewayConfig, ResourceProvider};
/// use statewatch::types::DeviceName;
///
/// # async fn example() -> statewatch::Result<()> {
/// let client = GatewayConfig::new("http://gateway.example/tango/rest").into_client();
/// let subarray = DeviceName::new("ska_mid/tm_subarray_node/1")?;
/// let value = client.resource(&subarray).read("obsState").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
}

impl GatewayClient {
    /// Creates a client from the given configuration.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Returns a handle bound to the named device.
    #[must_use]
    pub fn device(&self, name: &DeviceName) -> DeviceHandle {
        DeviceHandle {
            config: self.config.clone(),
            name: name.clone(),
        }
    }
}

impl ResourceProvider for GatewayClient {
    type Reader = DeviceHandle;

    fn resource(&self, name: &DeviceName) -> DeviceHandle {
        self.device(name)
    }
}

// ============================================================================
// DeviceHandle - Attribute reads and command invocation for one device
// ============================================================================

/// A handle to one remote device behind the gateway.
///
/// Each read builds a fresh connection; nothing is pooled or cached across
/// calls. This trades performance for test isolation: a read can never
/// observe connection state left behind by an earlier one.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    config: GatewayConfig,
    name: DeviceName,
}

/// Gateway envelope for an attribute read.
#[derive(Debug, Deserialize)]
struct AttributeEnvelope {
    value: serde_json::Value,
}

/// Gateway envelope for a command reply.
#[derive(Debug, Deserialize)]
struct CommandEnvelope {
    #[serde(default)]
    output: Option<serde_json::Value>,
}

impl DeviceHandle {
    /// Returns the device name this handle is bound to.
    #[must_use]
    pub fn name(&self) -> &DeviceName {
        &self.name
    }

    fn fresh_client(&self) -> Result<Client> {
        let client = Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(ProtocolError::Http)?;
        Ok(client)
    }

    fn attribute_url(&self, attr: &str) -> String {
        format!(
            "{}/devices/{}/attributes/{}/value",
            self.config.base_url(),
            urlencoding::encode(self.name.as_str()),
            urlencoding::encode(attr)
        )
    }

    fn command_url(&self, command: &str) -> String {
        format!(
            "{}/devices/{}/commands/{}",
            self.config.base_url(),
            urlencoding::encode(self.name.as_str()),
            urlencoding::encode(command)
        )
    }
}

impl AttributeReader for DeviceHandle {
    fn device_name(&self) -> &DeviceName {
        &self.name
    }

    async fn read(&self, attr: &str) -> Result<AttrValue> {
        let client = self.fresh_client()?;
        let url = self.attribute_url(attr);
        tracing::trace!(device = %self.name, attr, "reading attribute");

        let response = client.get(&url).send().await.map_err(ProtocolError::Http)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(AttrValue::not_found());
        }
        if !response.status().is_success() {
            return Err(ProtocolError::UnexpectedStatus {
                status: response.status().as_u16(),
            }
            .into());
        }

        let envelope: AttributeEnvelope = response.json().await.map_err(ProtocolError::Http)?;
        Ok(AttrValue::from_json(&envelope.value))
    }
}

impl CommandInvoker for DeviceHandle {
    async fn invoke(
        &self,
        command: &str,
        arg: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let client = self.fresh_client()?;
        let url = self.command_url(command);
        tracing::debug!(device = %self.name, command, "invoking command");

        let response = client
            .put(&url)
            .json(&serde_json::json!({ "input": arg }))
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(DeviceError::CommandRejected(format!(
                "{} on {} answered {}",
                command,
                self.name,
                status.as_u16()
            ))
            .into());
        }
        if !status.is_success() {
            return Err(ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
            }
            .into());
        }

        let envelope: CommandEnvelope = response.json().await.map_err(ProtocolError::Http)?;
        Ok(envelope.output.unwrap_or(serde_json::Value::Null))
    }
}
