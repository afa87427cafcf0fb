// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change monitoring for single attributes.
//!
//! A [`Monitor`] captures a baseline value and then re-polls the resource at
//! a fixed cadence until the value changes (or reaches a specific target),
//! or the wall-clock budget runs out. Every wait resolves to a
//! [`WaitOutcome`] — a discriminated value-or-timeout result — so callers
//! decide whether a timeout escalates into an error.
//!
//! # Examples
//!
//! ```
//! use statewatch::monitor::{WaitBudget, watch};
//! use statewatch::resource::SimulatedDevice;
//! use statewatch::types::{AttrValue, DeviceName};
//!
//! # async fn example() -> statewatch::Result<()> {
//! let device = SimulatedDevice::new(DeviceName::new("ska_mid/tm_subarray_node/1")?);
//! device.script_attribute("State", ["OFF", "ON"]);
//!
//! let mut monitor = watch(device).for_a_change_on("State").await?;
//! let outcome = monitor.wait_until_changed(WaitBudget::default()).await?;
//! assert_eq!(outcome.into_result()?, AttrValue::from("ON"));
//! # Ok(())
//! # }
//! ```

pub mod predicates;

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Result, WaitError};
use crate::resource::AttributeReader;
use crate::types::{AttrValue, DeviceName};

pub use predicates::Predicate;

/// Wall-clock timeout plus polling resolution for a wait.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use statewatch::monitor::WaitBudget;
///
/// let budget = WaitBudget::new(Duration::from_secs(30))
///     .with_resolution(Duration::from_millis(500));
/// assert_eq!(budget.timeout(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    timeout: Duration,
    resolution: Duration,
}

impl WaitBudget {
    /// Default wall-clock timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default polling resolution.
    pub const DEFAULT_RESOLUTION: Duration = Duration::from_millis(100);

    /// Creates a budget with the given timeout and the default resolution.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            resolution: Self::DEFAULT_RESOLUTION,
        }
    }

    /// Sets the polling resolution.
    #[must_use]
    pub const fn with_resolution(mut self, resolution: Duration) -> Self {
        self.resolution = resolution;
        self
    }

    /// Returns the wall-clock timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the polling resolution.
    #[must_use]
    pub const fn resolution(&self) -> Duration {
        self.resolution
    }
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

/// The result of a wait: either the observed value or a timeout.
///
/// Timeouts are values, not errors; use [`WaitOutcome::into_result`] when a
/// timeout should fail the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The watched condition held before the budget ran out.
    Changed {
        /// The value that satisfied the condition.
        value: AttrValue,
        /// How long the wait blocked.
        elapsed: Duration,
    },
    /// The budget ran out first.
    TimedOut {
        /// The last value observed.
        last: AttrValue,
        /// How long the wait blocked.
        waited: Duration,
    },
}

impl WaitOutcome {
    /// Returns `true` if the condition was observed.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Returns `true` if the wait timed out.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns the value carried by the outcome, observed or last-seen.
    #[must_use]
    pub fn value(&self) -> &AttrValue {
        match self {
            Self::Changed { value, .. } => value,
            Self::TimedOut { last, .. } => last,
        }
    }

    /// Escalates a timeout into an error, yielding the observed value
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] for the timeout variant.
    pub fn into_result(self) -> Result<AttrValue> {
        match self {
            Self::Changed { value, .. } => Ok(value),
            Self::TimedOut { last, waited } => Err(WaitError::TimedOut { last, waited }.into()),
        }
    }
}

/// Starts watching a resource.
///
/// The entry point for building monitors: `watch(resource)` followed by one
/// of the `for_a_change_*` constructors.
#[must_use]
pub fn watch<R: AttributeReader>(resource: R) -> Watch<R> {
    Watch { resource }
}

/// Builder tying a resource to the attribute being watched.
#[derive(Debug)]
pub struct Watch<R: AttributeReader> {
    resource: R,
}

impl<R: AttributeReader> Watch<R> {
    /// Captures the current value of `attr` and monitors for any change.
    ///
    /// # Errors
    ///
    /// Propagates the baseline read failure.
    pub async fn for_a_change_on(self, attr: &str) -> Result<Monitor<R>> {
        Monitor::capture(self.resource, attr, None, None).await
    }

    /// Captures the current value of `attr` and monitors for a change to
    /// `target`.
    ///
    /// # Errors
    ///
    /// Propagates the baseline read failure.
    pub async fn for_a_change_to(
        self,
        attr: &str,
        target: impl Into<AttrValue>,
    ) -> Result<Monitor<R>> {
        Monitor::capture(self.resource, attr, Some(target.into()), None).await
    }

    /// Like [`Watch::for_a_change_to`], but the target comparison uses a
    /// caller-supplied predicate instead of equality.
    ///
    /// # Errors
    ///
    /// Propagates the baseline read failure.
    pub async fn for_a_change_matching(
        self,
        attr: &str,
        target: impl Into<AttrValue>,
        predicate: Predicate,
    ) -> Result<Monitor<R>> {
        Monitor::capture(self.resource, attr, Some(target.into()), Some(predicate)).await
    }
}

/// Monitors one attribute on one resource for a change.
///
/// The "changed" determination is a strict inequality against the captured
/// baseline and is sticky: once a differing value was observed, the monitor
/// stays changed even if the value later returns to the baseline.
pub struct Monitor<R: AttributeReader> {
    resource: R,
    attr: String,
    baseline: AttrValue,
    current: AttrValue,
    target: Option<AttrValue>,
    predicate: Option<Predicate>,
    changed: bool,
}

impl<R: AttributeReader> Monitor<R> {
    async fn capture(
        resource: R,
        attr: &str,
        target: Option<AttrValue>,
        predicate: Option<Predicate>,
    ) -> Result<Self> {
        let baseline = resource.read(attr).await?;
        tracing::trace!(
            device = %resource.device_name(),
            attr,
            baseline = %baseline,
            "baseline captured"
        );
        Ok(Self {
            resource,
            attr: attr.to_string(),
            current: baseline.clone(),
            baseline,
            target,
            predicate,
            changed: false,
        })
    }

    /// Returns the device being monitored.
    #[must_use]
    pub fn device_name(&self) -> &DeviceName {
        self.resource.device_name()
    }

    /// Returns the attribute being monitored.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attr
    }

    /// Returns the baseline captured when the monitor was built.
    #[must_use]
    pub fn baseline(&self) -> &AttrValue {
        &self.baseline
    }

    /// Returns the most recently polled value.
    #[must_use]
    pub fn last_value(&self) -> &AttrValue {
        &self.current
    }

    /// Returns the target value, if the monitor was built with one.
    #[must_use]
    pub fn target(&self) -> Option<&AttrValue> {
        self.target.as_ref()
    }

    async fn update(&mut self) -> Result<()> {
        self.current = self.resource.read(&self.attr).await?;
        Ok(())
    }

    fn matches_target(&self, target: &AttrValue) -> bool {
        self.predicate
            .as_ref()
            .map_or(self.current == *target, |predicate| {
                predicate(&self.current, target)
            })
    }

    fn condition_met(&mut self) -> bool {
        if self.current != self.baseline {
            self.changed = true;
        }
        let target_reached = match &self.target {
            None => true,
            Some(target) => self.matches_target(target),
        };
        self.changed && target_reached
    }

    /// Blocks until the watched condition holds or the budget runs out.
    ///
    /// For monitors without a target this is any change from the baseline;
    /// with a target, the value must additionally reach it.
    ///
    /// # Errors
    ///
    /// Propagates read failures. A timeout is not an error; it is the
    /// [`WaitOutcome::TimedOut`] variant.
    pub async fn wait_until_changed(&mut self, budget: WaitBudget) -> Result<WaitOutcome> {
        let started = Instant::now();
        let deadline = started + budget.timeout();
        loop {
            if self.condition_met() {
                let elapsed = started.elapsed();
                tracing::debug!(
                    device = %self.resource.device_name(),
                    attr = %self.attr,
                    value = %self.current,
                    ?elapsed,
                    "transition observed"
                );
                return Ok(WaitOutcome::Changed {
                    value: self.current.clone(),
                    elapsed,
                });
            }
            if Instant::now() >= deadline {
                let waited = started.elapsed();
                tracing::debug!(
                    device = %self.resource.device_name(),
                    attr = %self.attr,
                    last = %self.current,
                    ?waited,
                    "wait timed out"
                );
                return Ok(WaitOutcome::TimedOut {
                    last: self.current.clone(),
                    waited,
                });
            }
            tokio::time::sleep(budget.resolution()).await;
            self.update().await?;
        }
    }

    /// Blocks until the value equals `target` (or satisfies the monitor's
    /// predicate against it), regardless of whether it changed from the
    /// baseline.
    ///
    /// # Errors
    ///
    /// Propagates read failures. A timeout is the
    /// [`WaitOutcome::TimedOut`] variant.
    pub async fn wait_until_value_is(
        &mut self,
        target: impl Into<AttrValue>,
        budget: WaitBudget,
    ) -> Result<WaitOutcome> {
        let target = target.into();
        let started = Instant::now();
        let deadline = started + budget.timeout();
        self.update().await?;
        loop {
            if self.matches_target(&target) {
                return Ok(WaitOutcome::Changed {
                    value: self.current.clone(),
                    elapsed: started.elapsed(),
                });
            }
            if Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut {
                    last: self.current.clone(),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(budget.resolution()).await;
            self.update().await?;
        }
    }

    /// Waits for a change and returns the new value, escalating a timeout
    /// into an error.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] when the budget runs out, and
    /// propagates read failures.
    pub async fn value_when_changed(&mut self, budget: WaitBudget) -> Result<AttrValue> {
        self.wait_until_changed(budget).await?.into_result()
    }
}

impl<R: AttributeReader> std::fmt::Debug for Monitor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("device", &self.resource.device_name().as_str())
            .field("attr", &self.attr)
            .field("baseline", &self.baseline)
            .field("current", &self.current)
            .field("target", &self.target)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}
