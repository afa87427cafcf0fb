// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `statewatch` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! value validation, gateway communication, JSON parsing, device commands,
//! waiting/synchronization, assertions and the background recorder.

use std::time::Duration;

use thiserror::Error;

use crate::types::AttrValue;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when observing
/// and synchronizing on remote device state.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during gateway communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a response or a fixture.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred during a device command.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A wait did not resolve within its budget.
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),

    /// An attribute assertion did not hold.
    #[error("assertion error: {0}")]
    Assertion(#[from] AssertionError),

    /// Error occurred in the background state recorder.
    #[error("recorder error: {0}")]
    Recorder(#[from] RecorderError),

    /// File I/O failed while reading or writing fixtures or records.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when attempting to create constrained types
/// with invalid values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A device name does not follow the `domain/family/member` form.
    #[error("invalid device name: {0}")]
    InvalidDeviceName(String),

    /// A dish number is outside the addressable range (1-9999).
    #[error("dish number {0} is out of range [1, 9999]")]
    InvalidDishNumber(u16),

    /// An invalid observation state label was provided.
    #[error("invalid observation state: {0}")]
    InvalidObsState(String),

    /// An invalid device state label was provided.
    #[error("invalid device state: {0}")]
    InvalidDevState(String),
}

/// Errors related to gateway communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "gateway")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the gateway failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The gateway answered with an unexpected HTTP status.
    #[error("unexpected gateway status {status}")]
    UnexpectedStatus {
        /// The HTTP status code returned by the gateway.
        status: u16,
    },

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing gateway responses and fixture files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the document.
    #[error("missing field: {0}")]
    MissingField(String),

    /// Unexpected document format.
    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),
}

/// Errors related to device commands.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Command was rejected by the device.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The device does not implement the command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Errors surfaced by the waiting machinery.
///
/// Single-monitor waits report timeouts through
/// [`WaitOutcome`](crate::monitor::WaitOutcome) and only produce a
/// `WaitError` when the caller escalates; the multi-device waiter always
/// escalates because a missed transition is fatal for its callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WaitError {
    /// A single watched attribute did not reach the expected condition.
    #[error("timed out after {waited:?}, last value was {last}")]
    TimedOut {
        /// The last value observed before the budget ran out.
        last: AttrValue,
        /// How long the wait actually blocked.
        waited: Duration,
    },

    /// One or more registered transitions were not observed in time.
    #[error("{failures} of {total} expected transitions were not observed:\n{report}")]
    Unresolved {
        /// Number of transitions that timed out.
        failures: usize,
        /// Total number of registered transitions.
        total: usize,
        /// The full transition report, for test failure output.
        report: String,
    },

    /// No event arrived on a listener within the timeout.
    #[error("no event received within {waited:?}")]
    NoEvent {
        /// How long the listener waited.
        waited: Duration,
    },

    /// The listener was stopped before or during the wait.
    #[error("listener was stopped")]
    ListenerStopped,
}

/// Errors raised by attribute assertions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// The attribute did not hold the asserted value.
    #[error("{subject} is asserted to be {expected} but was instead {actual}")]
    NotEqual {
        /// The asserted `device.attribute` pair.
        subject: String,
        /// The expected value.
        expected: String,
        /// The value actually read.
        actual: String,
    },

    /// The attribute held none of the allowed values.
    #[error("{subject} is asserted to be one of [{allowed}] but was instead {actual}")]
    NotOneOf {
        /// The asserted `device.attribute` pair.
        subject: String,
        /// The allowed values, comma separated.
        allowed: String,
        /// The value actually read.
        actual: String,
    },
}

/// Errors raised by the background state recorder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// Records were requested while the recording loop is still running.
    #[error("records are not available while the recorder is running")]
    StillRunning,

    /// The recorder was started while already running.
    #[error("recorder is already running")]
    AlreadyRunning,

    /// `stop` was called but no recording loop was started.
    #[error("recorder is not running")]
    NotRunning,

    /// The background task panicked or was cancelled.
    #[error("recorder task failed: {0}")]
    TaskFailed(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
