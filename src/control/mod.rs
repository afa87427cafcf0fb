// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level telescope operations.
//!
//! Each operation pairs a device command with its preconditions and the
//! waiter for the transitions it is expected to cause, so the call returns
//! only once the telescope actually reached the commanded state. The
//! operations run against any [`ResourceProvider`], which is how the same
//! flows drive a live deployment or the simulator.

use serde_json::json;

use crate::error::Result;
use crate::monitor::WaitBudget;
use crate::resource::{CommandInvoker, ResourceProvider, assert_attribute};
use crate::sync::Synced;
use crate::types::{DevState, ObsState};
use crate::waiter::{Scenarios, Topology, WaitReport};

/// Drives a telescope deployment through its operational cycle.
///
/// # Examples
///
/// ```no_run
/// use statewatch::control::TelescopeControl;
/// use statewatch::resource::GatewayConfig;
/// use statewatch::waiter::Topology;
///
/// # async fn example() -> statewatch::Result<()> {
/// let gateway = GatewayConfig::from_env()?.into_client();
/// let control = TelescopeControl::new(gateway, Topology::from_env());
///
/// let report = control.start_up().await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TelescopeControl<P: ResourceProvider> {
    provider: P,
    topology: Topology,
    budget: WaitBudget,
}

impl<P> TelescopeControl<P>
where
    P: ResourceProvider,
    P::Reader: CommandInvoker,
{
    /// Creates a controller over the given provider and topology.
    #[must_use]
    pub fn new(provider: P, topology: Topology) -> Self {
        Self {
            provider,
            topology,
            budget: WaitBudget::default(),
        }
    }

    /// Sets the wait budget applied to every operation.
    #[must_use]
    pub fn with_budget(mut self, budget: WaitBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Returns the topology this controller drives.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    fn scenarios(&self) -> Scenarios<'_, P> {
        Scenarios::new(&self.provider, &self.topology)
    }

    /// Starts the telescope up, raising the subarray devices to OFF.
    ///
    /// # Errors
    ///
    /// Fails when the command is rejected or a transition is missed.
    pub async fn start_up(&self) -> Result<WaitReport> {
        let waiter = self.scenarios().starting_up().await?;
        let central = self.provider.resource(&self.topology.central_node);
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { central.invoke("StartUpTelescope", None).await })
            .await?;
        Ok(report)
    }

    /// Lowers the telescope to standby (DISABLE).
    ///
    /// # Errors
    ///
    /// Fails when the command is rejected or a transition is missed.
    pub async fn set_to_standby(&self) -> Result<WaitReport> {
        let waiter = self.scenarios().going_to_standby().await?;
        let central = self.provider.resource(&self.topology.central_node);
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { central.invoke("StandByTelescope", None).await })
            .await?;
        Ok(report)
    }

    /// Assigns `receptors` receptors to the subarray using the given
    /// assign-resources configuration.
    ///
    /// # Errors
    ///
    /// Fails when the subarray is not OFF beforehand, when the command is
    /// rejected, or when a transition is missed.
    pub async fn compose_subarray(
        &self,
        config: serde_json::Value,
        receptors: u16,
    ) -> Result<WaitReport> {
        let subarray = self.provider.resource(&self.topology.subarray_node);
        assert_attribute(&subarray, "State")
            .await?
            .equals(DevState::Off)?;

        let waiter = self.scenarios().assigning_resources(Some(receptors)).await?;
        let central = self.provider.resource(&self.topology.central_node);
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { central.invoke("AssignResources", Some(config)).await })
            .await?;
        Ok(report)
    }

    /// Releases all resources assigned to the subarray.
    ///
    /// # Errors
    ///
    /// Fails when the subarray is not IDLE beforehand, when the command is
    /// rejected, or when a transition is missed.
    pub async fn release_resources(&self) -> Result<WaitReport> {
        let subarray = self.provider.resource(&self.topology.subarray_node);
        assert_attribute(&subarray, "obsState")
            .await?
            .equals(ObsState::Idle)?;

        let waiter = self.scenarios().releasing_resources().await?;
        let central = self.provider.resource(&self.topology.central_node);
        let arg = json!({
            "subarrayID": 1,
            "releaseALL": true,
            "receptorIDList": [],
        });
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { central.invoke("ReleaseResources", Some(arg)).await })
            .await?;
        Ok(report)
    }

    /// Configures the subarray for a scan.
    ///
    /// # Errors
    ///
    /// Fails when the subarray is not ON and IDLE/READY beforehand, when
    /// the command is rejected, or when a transition is missed.
    pub async fn configure(&self, config: serde_json::Value) -> Result<WaitReport> {
        let subarray = self.provider.resource(&self.topology.subarray_node);
        assert_attribute(&subarray, "State")
            .await?
            .equals(DevState::On)?;
        assert_attribute(&subarray, "obsState")
            .await?
            .is_one_of([ObsState::Idle, ObsState::Ready])?;

        let waiter = self.scenarios().configuring().await?;
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { subarray.invoke("Configure", Some(config)).await })
            .await?;
        Ok(report)
    }

    /// Starts a scan with the given scan configuration.
    ///
    /// # Errors
    ///
    /// Fails when the subarray is not READY beforehand, when the command is
    /// rejected, or when a transition is missed.
    pub async fn scan(&self, config: serde_json::Value) -> Result<WaitReport> {
        let subarray = self.provider.resource(&self.topology.subarray_node);
        assert_attribute(&subarray, "obsState")
            .await?
            .equals(ObsState::Ready)?;

        let waiter = self.scenarios().entering_scan().await?;
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { subarray.invoke("Scan", Some(config)).await })
            .await?;
        Ok(report)
    }

    /// Ends the scheduling block, returning the subarray to IDLE.
    ///
    /// # Errors
    ///
    /// Fails when the subarray is not READY beforehand, when the command is
    /// rejected, or when a transition is missed.
    pub async fn end_scheduling_block(&self) -> Result<WaitReport> {
        let subarray = self.provider.resource(&self.topology.subarray_node);
        assert_attribute(&subarray, "obsState")
            .await?
            .equals(ObsState::Ready)?;

        let waiter = self.scenarios().ending_scheduling_block().await?;
        let (_, report) = Synced::with(waiter)
            .budget(self.budget)
            .run(|| async move { subarray.invoke("EndSB", None).await })
            .await?;
        Ok(report)
    }
}
