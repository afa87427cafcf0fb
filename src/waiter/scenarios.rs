// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pre-built waiters for the standard operational scenarios.
//!
//! A [`Topology`] names the devices playing each role in a deployment;
//! [`Scenarios`] builds waiters for the transitions each operation is
//! expected to cause across them. Builders capture baselines at
//! construction time, so build the waiter before sending the command it
//! synchronizes on.

use crate::error::Result;
use crate::monitor::{Monitor, predicates, watch};
use crate::resource::{AttributeReader, ResourceProvider};
use crate::types::{AttrValue, DevState, DeviceName, ObsState};

use super::Waiter;

/// The devices playing each role in a deployment.
///
/// Roles other than the central and subarray nodes are optional: a reduced
/// deployment simply leaves them out and the scenario builders skip them.
///
/// # Examples
///
/// ```
/// use statewatch::waiter::Topology;
///
/// let topology = Topology::mid();
/// assert_eq!(topology.subarray_node.as_str(), "ska_mid/tm_subarray_node/1");
/// assert_eq!(topology.dish_masters.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// The central node commands telescope-wide operations.
    pub central_node: DeviceName,
    /// The subarray node leads subarray transitions.
    pub subarray_node: DeviceName,
    /// CSP subarray following the subarray node.
    pub csp_subarray: Option<DeviceName>,
    /// CBF subarray following the subarray node.
    pub cbf_subarray: Option<DeviceName>,
    /// SDP subarray following the subarray node.
    pub sdp_subarray: Option<DeviceName>,
    /// CSP master, tracking receptor membership.
    pub csp_master: Option<DeviceName>,
    /// MCCS subarray following the subarray node (low deployments).
    pub mccs_subarray: Option<DeviceName>,
    /// Dish masters available for allocation.
    pub dish_masters: Vec<DeviceName>,
}

impl Topology {
    /// The mid telescope layout.
    #[must_use]
    pub fn mid() -> Self {
        Self {
            central_node: DeviceName::known("ska_mid/tm_central/central_node"),
            subarray_node: DeviceName::known("ska_mid/tm_subarray_node/1"),
            csp_subarray: Some(DeviceName::known("mid_csp/elt/subarray_01")),
            cbf_subarray: Some(DeviceName::known("mid_csp_cbf/sub_elt/subarray_01")),
            sdp_subarray: Some(DeviceName::known("mid_sdp/elt/subarray_1")),
            csp_master: Some(DeviceName::known("mid_csp/elt/master")),
            mccs_subarray: None,
            dish_masters: (1..=4).filter_map(|n| DeviceName::dish_master(n).ok()).collect(),
        }
    }

    /// The low telescope layout.
    #[must_use]
    pub fn low() -> Self {
        Self {
            central_node: DeviceName::known("ska_low/tm_central/central_node"),
            subarray_node: DeviceName::known("ska_low/tm_subarray_node/1"),
            csp_subarray: None,
            cbf_subarray: None,
            sdp_subarray: None,
            csp_master: None,
            mccs_subarray: Some(DeviceName::known("low-mccs/subarray/01")),
            dish_masters: Vec::new(),
        }
    }

    /// Selects a layout from the `TELESCOPE` environment variable
    /// (`low` for the low layout, anything else for mid).
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("TELESCOPE").as_deref() {
            Ok("low") => Self::low(),
            _ => Self::mid(),
        }
    }

    /// Returns the subarray node together with every present follower.
    #[must_use]
    pub fn subarray_devices(&self) -> Vec<&DeviceName> {
        let mut devices = vec![&self.subarray_node];
        devices.extend(self.followers());
        devices
    }

    /// Followers that track the subarray node's observation state.
    fn followers(&self) -> Vec<&DeviceName> {
        [
            self.csp_subarray.as_ref(),
            self.cbf_subarray.as_ref(),
            self.sdp_subarray.as_ref(),
            self.mccs_subarray.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Followers that take part in power-state (startup/standby) cycles.
    fn power_followers(&self) -> Vec<&DeviceName> {
        [
            self.csp_subarray.as_ref(),
            self.cbf_subarray.as_ref(),
            self.mccs_subarray.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Builds scenario waiters against a resource provider and a topology.
///
/// # Examples
///
/// ```
/// use statewatch::resource::SimulatedTelescope;
/// use statewatch::waiter::{Scenarios, Topology};
///
/// # async fn example() -> statewatch::Result<()> {
/// let telescope = SimulatedTelescope::new();
/// let topology = Topology::mid();
/// let scenarios = Scenarios::new(&telescope, &topology);
///
/// let waiter = scenarios.starting_up().await?;
/// assert_eq!(waiter.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Scenarios<'a, P: ResourceProvider> {
    provider: &'a P,
    topology: &'a Topology,
}

impl<'a, P: ResourceProvider> Scenarios<'a, P> {
    /// Creates a scenario builder.
    #[must_use]
    pub fn new(provider: &'a P, topology: &'a Topology) -> Self {
        Self { provider, topology }
    }

    async fn change_on(&self, device: &DeviceName, attr: &str) -> Result<Monitor<P::Reader>> {
        watch(self.provider.resource(device))
            .for_a_change_on(attr)
            .await
    }

    async fn change_to(
        &self,
        device: &DeviceName,
        attr: &str,
        target: impl Into<AttrValue>,
    ) -> Result<Monitor<P::Reader>> {
        watch(self.provider.resource(device))
            .for_a_change_to(attr, target)
            .await
    }

    /// Startup raises the subarray node and its power followers to OFF.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn starting_up(&self) -> Result<Waiter<P::Reader>> {
        let mut waiter = Waiter::new();
        waiter.add(
            self.change_to(&self.topology.subarray_node, "State", DevState::Off)
                .await?,
        );
        for device in self.topology.power_followers() {
            waiter.add(self.change_to(device, "State", DevState::Off).await?);
        }
        Ok(waiter)
    }

    /// Standby lowers the subarray node and its power followers to DISABLE.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn going_to_standby(&self) -> Result<Waiter<P::Reader>> {
        let mut waiter = Waiter::new();
        waiter.add(
            self.change_to(&self.topology.subarray_node, "State", DevState::Disable)
                .await?,
        );
        for device in self.topology.power_followers() {
            waiter.add(self.change_to(device, "State", DevState::Disable).await?);
        }
        Ok(waiter)
    }

    /// Resource assignment updates the receptor bookkeeping attributes and
    /// raises the subarray devices to ON.
    ///
    /// With a receptor count the bookkeeping watches compare against the
    /// expected allocation (receptor ID lists as unordered sets, membership
    /// masks by sum); without one they accept any change.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn assigning_resources(&self, receptors: Option<u16>) -> Result<Waiter<P::Reader>> {
        let topology = self.topology;
        let mut waiter = Waiter::new();

        if let Some(count) = receptors {
            let id_list =
                AttrValue::from((1..=i64::from(count)).collect::<Vec<_>>());
            let membership = AttrValue::from(vec![1_i64; usize::from(count)]);

            waiter.add(
                watch(self.provider.resource(&topology.subarray_node))
                    .for_a_change_matching(
                        "receptorIDList",
                        id_list.clone(),
                        predicates::unordered_equal(),
                    )
                    .await?,
            );
            if let Some(csp) = &topology.csp_subarray {
                waiter.add(
                    watch(self.provider.resource(csp))
                        .for_a_change_matching(
                            "assignedReceptors",
                            id_list,
                            predicates::unordered_equal(),
                        )
                        .await?,
                );
            }
            if let Some(master) = &topology.csp_master {
                waiter.add(
                    watch(self.provider.resource(master))
                        .for_a_change_matching(
                            "receptorMembership",
                            membership,
                            predicates::sum_equal(),
                        )
                        .await?,
                );
            }
        } else {
            waiter.add(
                self.change_on(&topology.subarray_node, "receptorIDList")
                    .await?,
            );
            if let Some(csp) = &topology.csp_subarray {
                waiter.add(self.change_on(csp, "assignedReceptors").await?);
            }
            if let Some(master) = &topology.csp_master {
                waiter.add(self.change_on(master, "receptorMembership").await?);
            }
        }

        for device in topology.subarray_devices() {
            waiter.add(self.change_to(device, "State", DevState::On).await?);
        }
        Ok(waiter)
    }

    /// Releasing resources clears the receptor list and lowers the subarray
    /// devices back to OFF.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn releasing_resources(&self) -> Result<Waiter<P::Reader>> {
        let mut waiter = Waiter::new();
        waiter.add(
            self.change_on(&self.topology.subarray_node, "receptorIDList")
                .await?,
        );
        for device in self.topology.subarray_devices() {
            waiter.add(self.change_to(device, "State", DevState::Off).await?);
        }
        Ok(waiter)
    }

    /// Configuration drives the observation state to READY.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn configuring(&self) -> Result<Waiter<P::Reader>> {
        self.obs_state_scenario(ObsState::Ready).await
    }

    /// A scan drives the observation state to SCANNING.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn entering_scan(&self) -> Result<Waiter<P::Reader>> {
        self.obs_state_scenario(ObsState::Scanning).await
    }

    /// Ending the scheduling block returns the observation state to IDLE.
    ///
    /// # Errors
    ///
    /// Propagates baseline read failures.
    pub async fn ending_scheduling_block(&self) -> Result<Waiter<P::Reader>> {
        self.obs_state_scenario(ObsState::Idle).await
    }

    async fn obs_state_scenario(&self, target: ObsState) -> Result<Waiter<P::Reader>> {
        let mut waiter = Waiter::new();
        for device in self.topology.subarray_devices() {
            waiter.add(self.change_to(device, "obsState", target).await?);
        }
        Ok(waiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::monitor::WaitBudget;
    use crate::resource::SimulatedTelescope;

    fn budget() -> WaitBudget {
        WaitBudget::new(Duration::from_secs(2))
    }

    #[test]
    fn mid_layout_names() {
        let topology = Topology::mid();
        assert_eq!(
            topology.csp_master.as_ref().unwrap().as_str(),
            "mid_csp/elt/master"
        );
        assert_eq!(topology.dish_masters[0].as_str(), "mid_d0001/elt/master");
        assert_eq!(topology.subarray_devices().len(), 4);
    }

    #[test]
    fn low_layout_has_reduced_followers() {
        let topology = Topology::low();
        assert!(topology.csp_subarray.is_none());
        assert_eq!(
            topology.mccs_subarray.as_ref().unwrap().as_str(),
            "low-mccs/subarray/01"
        );
        assert_eq!(topology.subarray_devices().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn assigning_resources_with_receptor_count_resolves() {
        let telescope = SimulatedTelescope::new();
        let topology = Topology::mid();

        // Script the post-command transitions before building the waiter so
        // baselines are captured on the first value.
        for device in topology.subarray_devices() {
            telescope
                .device(device)
                .script_attribute("State", ["OFF", "ON"]);
        }
        telescope.device(&topology.subarray_node).script_attribute(
            "receptorIDList",
            [AttrValue::Tuple(vec![]), AttrValue::from(vec![2_i64, 1])],
        );
        telescope
            .device(topology.csp_subarray.as_ref().unwrap())
            .script_attribute(
                "assignedReceptors",
                [AttrValue::Tuple(vec![]), AttrValue::from(vec![1_i64, 2])],
            );
        telescope
            .device(topology.csp_master.as_ref().unwrap())
            .script_attribute(
                "receptorMembership",
                [
                    AttrValue::from(vec![0_i64, 0, 0, 0]),
                    AttrValue::from(vec![1_i64, 1, 0, 0]),
                ],
            );

        let scenarios = Scenarios::new(&telescope, &topology);
        let mut waiter = scenarios.assigning_resources(Some(2)).await.unwrap();
        assert_eq!(waiter.len(), 7);

        let report = waiter.wait(budget()).await.unwrap();
        assert!(report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn low_scenarios_only_watch_present_devices() {
        let telescope = SimulatedTelescope::new();
        let topology = Topology::low();
        telescope
            .device(&topology.subarray_node)
            .script_attribute("obsState", ["IDLE", "SCANNING"]);
        telescope
            .device(topology.mccs_subarray.as_ref().unwrap())
            .script_attribute("obsState", ["IDLE", "SCANNING"]);

        let scenarios = Scenarios::new(&telescope, &topology);
        let mut waiter = scenarios.entering_scan().await.unwrap();
        assert_eq!(waiter.len(), 2);

        let report = waiter.wait(budget()).await.unwrap();
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn standby_scenario_watches_power_followers() {
        let telescope = SimulatedTelescope::new();
        let topology = Topology::mid();
        for device in topology.subarray_devices() {
            telescope.device(device).set_attribute("State", "OFF");
        }

        let scenarios = Scenarios::new(&telescope, &topology);
        let waiter = scenarios.going_to_standby().await.unwrap();
        // Subarray node, CSP and CBF; SDP does not take part in standby.
        assert_eq!(waiter.len(), 3);
    }
}
