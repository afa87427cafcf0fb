// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waiting on transitions across several devices.
//!
//! A [`Waiter`] collects monitors for the transitions a scenario expects
//! and blocks until all of them resolve or time out, keeping a
//! human-readable [`WaitReport`] for failure diagnostics. Monitors are
//! driven sequentially within the wait, so the effective polling latency
//! scales with the number of watched devices.
//!
//! The pre-built scenario waiters live in [`scenarios`].

pub mod scenarios;

use std::fmt;

use crate::error::{Result, WaitError};
use crate::monitor::{Monitor, WaitBudget, WaitOutcome};
use crate::resource::AttributeReader;

pub use scenarios::{Scenarios, Topology};

/// Human-readable record of what a wait observed and what it missed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitReport {
    observed: Vec<String>,
    missing: Vec<String>,
}

impl WaitReport {
    /// Returns one line per observed transition.
    #[must_use]
    pub fn observed(&self) -> &[String] {
        &self.observed
    }

    /// Returns one line per transition that was not observed in time.
    #[must_use]
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Returns `true` if every registered transition was observed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for WaitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.missing.is_empty() {
            writeln!(f, "transitions not observed:")?;
            for line in &self.missing {
                writeln!(f, "  {line}")?;
            }
        }
        if !self.observed.is_empty() {
            writeln!(f, "observed transitions:")?;
            for line in &self.observed {
                writeln!(f, "  {line}")?;
            }
        }
        Ok(())
    }
}

/// Blocks a caller until a registered set of expected transitions is
/// observed.
///
/// # Examples
///
/// ```
/// use statewatch::monitor::{WaitBudget, watch};
/// use statewatch::resource::SimulatedDevice;
/// use statewatch::types::DeviceName;
/// use statewatch::waiter::Waiter;
///
/// # async fn example() -> statewatch::Result<()> {
/// let device = SimulatedDevice::new(DeviceName::new("ska_mid/tm_subarray_node/1")?);
/// device.script_attribute("State", ["OFF", "ON"]);
///
/// let mut waiter = Waiter::new();
/// waiter.add(watch(device).for_a_change_to("State", "ON").await?);
/// let report = waiter.wait(WaitBudget::default()).await?;
/// assert!(report.is_complete());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Waiter<R: AttributeReader> {
    watches: Vec<Monitor<R>>,
    report: WaitReport,
    timed_out: bool,
}

impl<R: AttributeReader> Waiter<R> {
    /// Creates an empty waiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            watches: Vec::new(),
            report: WaitReport::default(),
            timed_out: false,
        }
    }

    /// Registers a monitor.
    pub fn add(&mut self, monitor: Monitor<R>) {
        self.watches.push(monitor);
    }

    /// Drops all registered monitors.
    pub fn clear_watches(&mut self) {
        self.watches.clear();
    }

    /// Returns the number of registered monitors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Returns `true` if no monitors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Returns `true` if the last wait missed at least one transition.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Returns the report accumulated by the last wait.
    #[must_use]
    pub fn report(&self) -> &WaitReport {
        &self.report
    }

    /// Drives every registered monitor to resolution and reports.
    ///
    /// Each monitor gets the full budget; the registered set is drained by
    /// this call.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Unresolved`] carrying the full report when any
    /// transition was not observed in time, and propagates read failures.
    pub async fn wait(&mut self, budget: WaitBudget) -> Result<WaitReport> {
        self.report = WaitReport::default();
        self.timed_out = false;
        let total = self.watches.len();

        while let Some(mut monitor) = self.watches.pop() {
            let device = monitor.device_name().clone();
            let attr = monitor.attribute().to_string();
            let baseline = monitor.baseline().clone();
            let target = monitor.target().cloned();

            match monitor.wait_until_changed(budget).await? {
                WaitOutcome::Changed { value, elapsed } => {
                    self.report.observed.push(format!(
                        "{device} changed {attr} from {baseline} to {value} after {:.1}s",
                        elapsed.as_secs_f64()
                    ));
                }
                WaitOutcome::TimedOut { last, waited } => {
                    self.timed_out = true;
                    let target_shim = target
                        .map(|target| format!(" to {target} (last value {last})"))
                        .unwrap_or_default();
                    self.report.missing.push(format!(
                        "{device} timed out whilst waiting for {attr} to change from \
                         {baseline}{target_shim} in {:.1}s",
                        waited.as_secs_f64()
                    ));
                }
            }
        }

        if self.timed_out {
            Err(WaitError::Unresolved {
                failures: self.report.missing.len(),
                total,
                report: self.report.to_string(),
            }
            .into())
        } else {
            Ok(self.report.clone())
        }
    }
}

impl<R: AttributeReader> Default for Waiter<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::Error;
    use crate::monitor::watch;
    use crate::resource::{ResourceProvider, SimulatedTelescope};
    use crate::types::{AttrValue, DeviceName};

    fn budget() -> WaitBudget {
        WaitBudget::new(Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_when_all_transitions_happen() {
        let telescope = SimulatedTelescope::new();
        let names = [
            DeviceName::new("ska_mid/tm_subarray_node/1").unwrap(),
            DeviceName::new("mid_csp/elt/subarray_01").unwrap(),
        ];
        for name in &names {
            telescope
                .device(name)
                .script_attribute("obsState", ["EMPTY", "IDLE"]);
        }

        let mut waiter = Waiter::new();
        for name in &names {
            waiter.add(
                watch(telescope.resource(name))
                    .for_a_change_to("obsState", "IDLE")
                    .await
                    .unwrap(),
            );
        }

        let report = waiter.wait(budget()).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.observed().len(), 2);
        assert!(!waiter.timed_out());
        assert!(waiter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missed_transition_fails_with_report() {
        let telescope = SimulatedTelescope::new();
        let moving = DeviceName::new("ska_mid/tm_subarray_node/1").unwrap();
        let stuck = DeviceName::new("mid_sdp/elt/subarray_1").unwrap();
        telescope
            .device(&moving)
            .script_attribute("State", ["OFF", "ON"]);
        telescope.device(&stuck).set_attribute("State", "OFF");

        let mut waiter = Waiter::new();
        for name in [&moving, &stuck] {
            waiter.add(
                watch(telescope.resource(name))
                    .for_a_change_to("State", "ON")
                    .await
                    .unwrap(),
            );
        }

        let err = waiter.wait(budget()).await.unwrap_err();
        let Error::Wait(WaitError::Unresolved {
            failures,
            total,
            report,
        }) = err
        else {
            panic!("expected an unresolved wait");
        };
        assert_eq!(failures, 1);
        assert_eq!(total, 2);
        assert!(report.contains("mid_sdp/elt/subarray_1"));
        assert!(report.contains("to ON (last value OFF)"));
        assert!(waiter.timed_out());
        // The transition that did happen is still reported.
        assert_eq!(waiter.report().observed().len(), 1);
    }

    #[tokio::test]
    async fn clear_watches_empties_the_register() {
        let telescope = SimulatedTelescope::new();
        let name = DeviceName::new("ska_mid/tm_subarray_node/1").unwrap();
        telescope.device(&name).set_attribute("State", "OFF");

        let mut waiter = Waiter::new();
        waiter.add(
            watch(telescope.resource(&name))
                .for_a_change_on("State")
                .await
                .unwrap(),
        );
        assert_eq!(waiter.len(), 1);

        waiter.clear_watches();
        assert!(waiter.is_empty());

        // An empty waiter resolves immediately.
        let report = waiter.wait(budget()).await.unwrap();
        assert!(report.is_complete());
        assert!(report.observed().is_empty());
    }

    #[test]
    fn report_display_lists_missing_before_observed() {
        let report = WaitReport {
            observed: vec!["a changed".to_string()],
            missing: vec!["b missed".to_string()],
        };
        let text = report.to_string();
        let missing_at = text.find("b missed").unwrap();
        let observed_at = text.find("a changed").unwrap();
        assert!(missing_at < observed_at);
    }

    #[test]
    fn value_is_rendered_in_report_lines() {
        // Guards the wording tests rely on when grepping failure output.
        let mut report = WaitReport::default();
        report
            .observed
            .push(format!("{} ok", AttrValue::from(vec![1_i64, 2])));
        assert!(report.to_string().contains("(1, 2) ok"));
    }
}
