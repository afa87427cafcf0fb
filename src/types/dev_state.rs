// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device operational state labels.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;
use crate::types::AttrValue;

/// The operational state of a device, reported through its `State`
/// attribute.
///
/// OFF means powered but not operating; STANDBY and DISABLE sit below it.
/// The startup sequence raises devices from DISABLE to OFF, resource
/// assignment raises them to ON, and standby lowers them back to DISABLE.
///
/// # Examples
///
/// ```
/// use statewatch::types::DevState;
///
/// assert_eq!(DevState::On.as_str(), "ON");
/// assert_eq!("STANDBY".parse::<DevState>().unwrap(), DevState::Standby);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevState {
    /// Fully operational.
    On,
    /// Powered but not operating.
    Off,
    /// Low-power standby.
    Standby,
    /// Administratively disabled.
    Disable,
    /// Initialization in progress.
    Init,
    /// Moving between positions.
    Moving,
    /// Long-running activity in progress.
    Running,
    /// A raised alarm condition.
    Alarm,
    /// An unrecoverable fault.
    Fault,
    /// State could not be determined.
    Unknown,
}

impl DevState {
    /// Returns the attribute label for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Standby => "STANDBY",
            Self::Disable => "DISABLE",
            Self::Init => "INIT",
            Self::Moving => "MOVING",
            Self::Running => "RUNNING",
            Self::Alarm => "ALARM",
            Self::Fault => "FAULT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DevState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DevState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            "STANDBY" => Ok(Self::Standby),
            "DISABLE" => Ok(Self::Disable),
            "INIT" => Ok(Self::Init),
            "MOVING" => Ok(Self::Moving),
            "RUNNING" => Ok(Self::Running),
            "ALARM" => Ok(Self::Alarm),
            "FAULT" => Ok(Self::Fault),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(ValueError::InvalidDevState(s.to_string())),
        }
    }
}

impl From<DevState> for AttrValue {
    fn from(state: DevState) -> Self {
        Self::Str(state.as_str().to_string())
    }
}
