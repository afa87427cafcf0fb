// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenario tests against the simulator.

use std::time::Duration;

use statewatch::error::{Error, WaitError};
use statewatch::event::ConsumeStrategy;
use statewatch::monitor::WaitBudget;
use statewatch::recorder::StateRecorder;
use statewatch::resource::{
    CommandInvoker, ResourceGroup, ResourceProvider, SimulatedTelescope,
};
use statewatch::sync::Synced;
use statewatch::types::{AttrValue, DeviceName, ObsState};
use statewatch::waiter::{Scenarios, Topology};

fn budget() -> WaitBudget {
    WaitBudget::new(Duration::from_secs(5))
}

/// Sets every subarray device's obsState so baselines are well-defined.
fn seed_obs_state(telescope: &SimulatedTelescope, topology: &Topology, value: &str) {
    for device in topology.subarray_devices() {
        telescope.device(device).set_attribute("obsState", value);
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_wait_resolves_while_a_recorder_tracks_the_transition() {
    let telescope = SimulatedTelescope::new();
    let topology = Topology::mid();
    seed_obs_state(&telescope, &topology, "SCANNING");

    // Arm the waiter first so baselines are the pre-transition values.
    let scenarios = Scenarios::new(&telescope, &topology);
    let mut waiter = scenarios.ending_scheduling_block().await.unwrap();

    let resources = topology
        .subarray_devices()
        .into_iter()
        .map(|name| telescope.resource(name))
        .collect();
    let mut recorder = StateRecorder::new(resources);
    recorder.spawn(Duration::from_millis(100)).unwrap();

    // The devices transition a few ticks after the waiter starts polling.
    let movers: Vec<_> = topology
        .subarray_devices()
        .into_iter()
        .map(|name| telescope.device(name))
        .collect();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        for device in movers {
            device.transition("obsState", "IDLE");
        }
    });

    let report = waiter.wait(budget()).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.observed().len(), 4);

    recorder.stop().await.unwrap();
    let unique = recorder.records(true).unwrap();
    // One unique tick for the initial SCANNING states, one for IDLE.
    assert_eq!(unique.len(), 2);
    assert!(
        unique[0]
            .states
            .iter()
            .all(|snapshot| snapshot.value == AttrValue::from("SCANNING"))
    );
    assert!(
        unique[1]
            .states
            .iter()
            .all(|snapshot| snapshot.value == AttrValue::from("IDLE"))
    );

    // Full record list keeps gapless sequence numbers.
    let records = recorder.records(false).unwrap();
    assert!(records.windows(2).all(|w| w[1].seq == w[0].seq + 1));
}

#[tokio::test(start_paused = true)]
async fn synced_command_publishes_events_a_listener_observes() {
    let telescope = SimulatedTelescope::new();
    let name = DeviceName::new("ska_mid/tm_subarray_node/1").unwrap();
    let device = telescope.device(&name);
    device.set_attribute("obsState", "EMPTY");
    device.on_command(
        "AssignResources",
        vec![("obsState", AttrValue::from("IDLE"))],
    );

    // Subscribe before the command so the event is buffered for us.
    let mut listener = telescope.listener().on_attribute("obsState");

    let scenarios_topology = Topology {
        csp_subarray: None,
        cbf_subarray: None,
        sdp_subarray: None,
        csp_master: None,
        mccs_subarray: None,
        dish_masters: Vec::new(),
        central_node: DeviceName::new("ska_mid/tm_central/central_node").unwrap(),
        subarray_node: name.clone(),
    };
    let scenarios = Scenarios::new(&telescope, &scenarios_topology);
    let waiter = scenarios.ending_scheduling_block().await.unwrap();

    let command_target = device.clone();
    let (_, report) = Synced::with(waiter)
        .budget(budget())
        .run(|| async move { command_target.invoke("AssignResources", None).await })
        .await
        .unwrap();
    assert!(report.is_complete());

    let (event, _elapsed) = listener
        .wait_for_next_event(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(event.device, name);
    assert_eq!(event.value, AttrValue::from("IDLE"));
}

#[tokio::test(start_paused = true)]
async fn periodic_listener_sees_transitions_from_a_scenario_run() {
    let telescope = SimulatedTelescope::new();
    let name = DeviceName::new("ska_low/tm_subarray_node/1").unwrap();
    let device = telescope.device(&name);
    device.set_attribute("obsState", "READY");

    let mut listener = telescope
        .listener()
        .on_device(name.clone())
        .with_strategy(ConsumeStrategy::Periodically {
            polling: Duration::from_millis(50),
        });

    device.transition("obsState", "SCANNING");

    let (event, _) = listener
        .wait_for_next_event(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(event.value, AttrValue::from("SCANNING"));
}

#[tokio::test(start_paused = true)]
async fn stuck_follower_is_named_in_the_failure_report() {
    let telescope = SimulatedTelescope::new();
    let topology = Topology::mid();
    seed_obs_state(&telescope, &topology, "SCANNING");

    let scenarios = Scenarios::new(&telescope, &topology);
    let mut waiter = scenarios.ending_scheduling_block().await.unwrap();

    // Every device but the SDP subarray transitions.
    for device in topology.subarray_devices() {
        if Some(device) != topology.sdp_subarray.as_ref() {
            telescope.device(device).transition("obsState", "IDLE");
        }
    }

    let err = waiter
        .wait(WaitBudget::new(Duration::from_millis(500)))
        .await
        .unwrap_err();
    let Error::Wait(WaitError::Unresolved {
        failures,
        total,
        report,
    }) = err
    else {
        panic!("expected an unresolved wait, got {err:?}");
    };
    assert_eq!(failures, 1);
    assert_eq!(total, 4);
    assert!(report.contains("mid_sdp/elt/subarray_1"));
    assert!(report.contains("to IDLE (last value SCANNING)"));
}

#[tokio::test]
async fn group_snapshot_reflects_the_final_states() {
    let telescope = SimulatedTelescope::new();
    let topology = Topology::mid();
    seed_obs_state(&telescope, &topology, "IDLE");

    let names: Vec<DeviceName> = topology
        .subarray_devices()
        .into_iter()
        .cloned()
        .collect();
    let group = ResourceGroup::from_provider(&telescope, &names);
    let values = group.read("obsState").await.unwrap();

    assert_eq!(values.len(), 4);
    assert!(
        values
            .iter()
            .all(|(_, value)| *value == AttrValue::from(ObsState::Idle))
    );
}
