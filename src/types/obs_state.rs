// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observation state labels.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;
use crate::types::AttrValue;

/// The observation-activity state of a subarray-like device.
///
/// Devices report this through their `obsState` attribute as an enum label.
/// The usual cycle is EMPTY -> IDLE -> CONFIGURING -> READY -> SCANNING ->
/// READY, with ABORTED/RESTARTING excursions. The waiting utilities do not
/// enforce this machine; they only compare labels.
///
/// # Examples
///
/// ```
/// use statewatch::types::ObsState;
///
/// assert_eq!(ObsState::Scanning.as_str(), "SCANNING");
/// assert_eq!("IDLE".parse::<ObsState>().unwrap(), ObsState::Idle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObsState {
    /// No resources assigned.
    Empty,
    /// Resource assignment in progress.
    Resourcing,
    /// Resources assigned, not configured.
    Idle,
    /// Configuration in progress.
    Configuring,
    /// Configured and ready to scan.
    Ready,
    /// Scan in progress.
    Scanning,
    /// Abort in progress.
    Aborting,
    /// Aborted; awaiting reset or restart.
    Aborted,
    /// Reset to IDLE in progress.
    Resetting,
    /// Restart to EMPTY in progress.
    Restarting,
    /// An unrecoverable observation fault.
    Fault,
}

impl ObsState {
    /// Returns the attribute label for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Resourcing => "RESOURCING",
            Self::Idle => "IDLE",
            Self::Configuring => "CONFIGURING",
            Self::Ready => "READY",
            Self::Scanning => "SCANNING",
            Self::Aborting => "ABORTING",
            Self::Aborted => "ABORTED",
            Self::Resetting => "RESETTING",
            Self::Restarting => "RESTARTING",
            Self::Fault => "FAULT",
        }
    }
}

impl fmt::Display for ObsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ObsState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EMPTY" => Ok(Self::Empty),
            "RESOURCING" => Ok(Self::Resourcing),
            "IDLE" => Ok(Self::Idle),
            "CONFIGURING" => Ok(Self::Configuring),
            "READY" => Ok(Self::Ready),
            "SCANNING" => Ok(Self::Scanning),
            "ABORTING" => Ok(Self::Aborting),
            "ABORTED" => Ok(Self::Aborted),
            "RESETTING" => Ok(Self::Resetting),
            "RESTARTING" => Ok(Self::Restarting),
            "FAULT" => Ok(Self::Fault),
            _ => Err(ValueError::InvalidObsState(s.to_string())),
        }
    }
}

impl From<ObsState> for AttrValue {
    fn from(state: ObsState) -> Self {
        Self::Str(state.as_str().to_string())
    }
}
