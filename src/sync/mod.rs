// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command synchronization.
//!
//! [`Synced`] pairs a command with the waiter for its expected post-command
//! transitions: the command runs, then the call blocks until the waiter
//! resolves. A missed transition is a hard error carrying the waiter's
//! report; the command is never retried.
//!
//! Build the waiter before calling [`Synced::run`] - waiter construction
//! captures the pre-command baselines the transition checks compare
//! against.
//!
//! # Examples
//!
//! ```
//! use statewatch::monitor::{WaitBudget, watch};
//! use statewatch::resource::{CommandInvoker, SimulatedDevice};
//! use statewatch::sync::Synced;
//! use statewatch::types::{AttrValue, DeviceName};
//! use statewatch::waiter::Waiter;
//!
//! # async fn example() -> statewatch::Result<()> {
//! let device = SimulatedDevice::new(DeviceName::new("ska_mid/tm_subarray_node/1")?);
//! device.set_attribute("State", "OFF");
//! device.on_command("On", vec![("State", AttrValue::from("ON"))]);
//!
//! let mut waiter = Waiter::new();
//! waiter.add(watch(device.clone()).for_a_change_to("State", "ON").await?);
//!
//! let command_target = device.clone();
//! let (_, report) = Synced::with(waiter)
//!     .budget(WaitBudget::default())
//!     .run(|| async move { command_target.invoke("On", None).await })
//!     .await?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use crate::error::Result;
use crate::monitor::WaitBudget;
use crate::resource::AttributeReader;
use crate::waiter::{WaitReport, Waiter};

/// Runs a command and blocks until its expected transitions are observed.
#[derive(Debug)]
pub struct Synced<R: AttributeReader> {
    waiter: Waiter<R>,
    budget: WaitBudget,
}

impl<R: AttributeReader> Synced<R> {
    /// Creates a synchronized runner around an armed waiter.
    #[must_use]
    pub fn with(waiter: Waiter<R>) -> Self {
        Self {
            waiter,
            budget: WaitBudget::default(),
        }
    }

    /// Sets the wait budget applied after the command.
    #[must_use]
    pub fn budget(mut self, budget: WaitBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Invokes `command` and waits for the registered transitions.
    ///
    /// Returns the command's result together with the transition report.
    ///
    /// # Errors
    ///
    /// Propagates command failures without waiting; a missed transition
    /// afterwards surfaces as
    /// [`WaitError::Unresolved`](crate::error::WaitError::Unresolved) with
    /// the full report attached.
    pub async fn run<T, F, Fut>(mut self, command: F) -> Result<(T, WaitReport)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = command().await?;
        tracing::debug!(
            transitions = self.waiter.len(),
            "command sent, waiting for transitions"
        );
        let report = self.waiter.wait(self.budget).await?;
        Ok((result, report))
    }
}
