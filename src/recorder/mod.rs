// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background recording of device states.
//!
//! A [`StateRecorder`] snapshots one attribute across a device set every
//! `resolution` seconds into a growing log of [`Record`]s, either inline on
//! the caller or on a background task. Each record carries a gapless
//! sequence number starting at 1, a time-of-day stamp, per-device values
//! with read deltas, and a `unique` flag marking ticks whose tracked values
//! differ from the previous tick - the compressed view for diagnostics.
//!
//! The recording loop is the sole mutator of the shared record list; it
//! publishes the log under a lock only when it stops, and
//! [`StateRecorder::records`] refuses to return anything while the loop is
//! still running.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{RecorderError, Result};
use crate::resource::AttributeReader;
use crate::types::{AttrValue, DeviceName};

/// Attribute recorded when none is configured.
const DEFAULT_ATTRIBUTE: &str = "obsState";

/// Record cap applied to inline runs without an explicit cap, so they
/// always terminate.
const DEFAULT_INLINE_CAP: usize = 100;

/// Value recorded when a read fails mid-loop.
const READ_FAILED: &str = "read failed";

/// One device's part of a recorded tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// The device that was read.
    pub device: DeviceName,
    /// The value read.
    pub value: AttrValue,
    /// Seconds from the start of the tick until this read completed.
    pub delta: f64,
}

/// One tick of the recording loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Sequence number, gapless and starting at 1.
    pub seq: u64,
    /// Time of day when the tick started, `HH:MM:SS.mmm`.
    pub time_window: String,
    /// Per-device snapshots, in configuration order.
    pub states: Vec<DeviceSnapshot>,
    /// `true` iff the tracked values differ from the previous record.
    pub unique: bool,
}

impl Record {
    fn state_values(&self) -> Vec<&AttrValue> {
        self.states.iter().map(|snapshot| &snapshot.value).collect()
    }
}

#[derive(Debug, Default)]
struct Shared {
    running: bool,
    records: Vec<Record>,
}

/// Periodically snapshots a set of devices' attributes for post-hoc
/// analysis.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use statewatch::recorder::StateRecorder;
/// use statewatch::resource::{ResourceProvider, SimulatedTelescope};
/// use statewatch::types::DeviceName;
///
/// # async fn example() -> statewatch::Result<()> {
/// let telescope = SimulatedTelescope::new();
/// let name = DeviceName::new("ska_mid/tm_subarray_node/1")?;
/// telescope.device(&name).set_attribute("obsState", "IDLE");
///
/// let mut recorder = StateRecorder::new(vec![telescope.resource(&name)])
///     .with_max_records(10);
/// recorder.run_inline(Duration::from_millis(100)).await?;
///
/// let records = recorder.records(false)?;
/// assert_eq!(records.len(), 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StateRecorder<R: AttributeReader> {
    resources: Vec<R>,
    attribute: String,
    overrides: HashMap<DeviceName, String>,
    max_records: Option<usize>,
    shared: Arc<Mutex<Shared>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<R: AttributeReader> StateRecorder<R> {
    /// Creates a recorder over the given resources, tracking `obsState`.
    #[must_use]
    pub fn new(resources: Vec<R>) -> Self {
        Self {
            resources,
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            overrides: HashMap::new(),
            max_records: None,
            shared: Arc::new(Mutex::new(Shared::default())),
            handle: None,
        }
    }

    /// Tracks a different attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    /// Tracks a specific attribute on one device instead of the default.
    #[must_use]
    pub fn with_override(mut self, device: DeviceName, attribute: impl Into<String>) -> Self {
        self.overrides.insert(device, attribute.into());
        self
    }

    /// Stops the loop after `max_records` ticks.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// Returns `true` while a recording loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Runs the recording loop inline until the record cap is reached.
    ///
    /// Without an explicit cap the loop is bounded at 100 records so it
    /// always terminates.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::AlreadyRunning`] if a loop is active.
    pub async fn run_inline(&mut self, resolution: Duration) -> Result<()> {
        self.mark_running()?;
        let cap = self.max_records.unwrap_or(DEFAULT_INLINE_CAP);
        record_loop(
            &self.resources,
            &self.attribute,
            &self.overrides,
            resolution,
            Some(cap),
            &self.shared,
        )
        .await;
        Ok(())
    }

    fn mark_running(&self) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.running {
            return Err(RecorderError::AlreadyRunning.into());
        }
        shared.running = true;
        shared.records.clear();
        Ok(())
    }

    /// Returns the accumulated records, optionally only the unique ticks.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::StillRunning`] while the loop is active:
    /// callers must [`stop`](Self::stop) first so the log cannot change
    /// under them.
    pub fn records(&self, filtered: bool) -> Result<Vec<Record>> {
        let shared = self.shared.lock();
        if shared.running {
            return Err(RecorderError::StillRunning.into());
        }
        let records = if filtered {
            shared
                .records
                .iter()
                .filter(|record| record.unique)
                .cloned()
                .collect()
        } else {
            shared.records.clone()
        };
        Ok(records)
    }

    /// Writes the accumulated records to a JSON file.
    ///
    /// # Errors
    ///
    /// Fails while the loop is running, and on I/O or serialization errors.
    pub fn write_json(&self, path: impl AsRef<Path>, filtered: bool) -> Result<()> {
        let records = self.records(filtered)?;
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &records).map_err(crate::error::ParseError::Json)?;
        Ok(())
    }
}

impl<R> StateRecorder<R>
where
    R: AttributeReader + Clone + 'static,
{
    /// Starts the recording loop on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::AlreadyRunning`] if a loop is active.
    pub fn spawn(&mut self, resolution: Duration) -> Result<()> {
        self.mark_running()?;
        let resources = self.resources.clone();
        let attribute = self.attribute.clone();
        let overrides = self.overrides.clone();
        let max_records = self.max_records;
        let shared = Arc::clone(&self.shared);

        self.handle = Some(tokio::spawn(async move {
            record_loop(
                &resources,
                &attribute,
                &overrides,
                resolution,
                max_records,
                &shared,
            )
            .await;
        }));
        Ok(())
    }

    /// Signals the loop to stop and joins the background task.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::NotRunning`] if no background loop was
    /// started, and [`RecorderError::TaskFailed`] if the task panicked.
    pub async fn stop(&mut self) -> Result<()> {
        let handle = self
            .handle
            .take()
            .ok_or(RecorderError::NotRunning)?;
        self.shared.lock().running = false;
        handle
            .await
            .map_err(|err| RecorderError::TaskFailed(err.to_string()))?;
        Ok(())
    }
}

/// The recording loop. Appends to a local list and publishes it under the
/// lock only on exit, so readers never observe a half-written log.
async fn record_loop<R: AttributeReader>(
    resources: &[R],
    attribute: &str,
    overrides: &HashMap<DeviceName, String>,
    resolution: Duration,
    max_records: Option<usize>,
    shared: &Mutex<Shared>,
) {
    let mut records: Vec<Record> = Vec::new();
    let mut seq: u64 = 0;

    while shared.lock().running {
        seq += 1;
        let tick_started = Instant::now();
        let time_window = chrono::Local::now().format("%H:%M:%S%.3f").to_string();

        let mut states = Vec::with_capacity(resources.len());
        for resource in resources {
            let attr = overrides
                .get(resource.device_name())
                .map_or(attribute, String::as_str);
            let value = match resource.read(attr).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(
                        device = %resource.device_name(),
                        attr,
                        %err,
                        "recorder read failed"
                    );
                    AttrValue::Str(READ_FAILED.to_string())
                }
            };
            states.push(DeviceSnapshot {
                device: resource.device_name().clone(),
                value,
                delta: tick_started.elapsed().as_secs_f64(),
            });
        }

        let unique = records.last().is_none_or(|previous| {
            previous.state_values() != states.iter().map(|s| &s.value).collect::<Vec<_>>()
        });
        records.push(Record {
            seq,
            time_window,
            states,
            unique,
        });

        if let Some(cap) = max_records
            && records.len() >= cap
        {
            tracing::debug!(records = records.len(), cap, "record cap reached, stopping");
            shared.lock().running = false;
            break;
        }

        // Compensate for time spent reading so the cadence tracks the
        // resolution.
        let elapsed = tick_started.elapsed();
        tokio::time::sleep(resolution.saturating_sub(elapsed)).await;
    }

    let mut shared = shared.lock();
    shared.records = records;
    shared.running = false;
}
