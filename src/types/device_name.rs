// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// The name of a remote device, in `domain/family/member` form.
///
/// Device names identify a remote stateful entity; no local state is held
/// beyond the identifier itself.
///
/// # Examples
///
/// ```
/// use statewatch::types::DeviceName;
///
/// let name = DeviceName::new("ska_mid/tm_subarray_node/1").unwrap();
/// assert_eq!(name.domain(), "ska_mid");
/// assert_eq!(name.member(), "1");
///
/// // Dish masters follow a zero-padded naming convention.
/// let dish = DeviceName::dish_master(2).unwrap();
/// assert_eq!(dish.as_str(), "mid_d0002/elt/master");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceName(String);

impl DeviceName {
    /// Creates a device name, validating the `domain/family/member` form.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidDeviceName` if the name does not consist
    /// of exactly three non-empty `/`-separated segments.
    pub fn new(name: impl Into<String>) -> Result<Self, ValueError> {
        let name = name.into();
        let mut segments = name.split('/');
        let valid = segments.by_ref().take(3).filter(|s| !s.is_empty()).count() == 3
            && segments.next().is_none();
        if valid {
            Ok(Self(name))
        } else {
            Err(ValueError::InvalidDeviceName(name))
        }
    }

    /// Creates the master device name for a numbered dish.
    ///
    /// Dish numbers map to zero-padded four-digit device names, e.g. dish 3
    /// becomes `mid_d0003/elt/master`.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidDishNumber` for numbers outside 1-9999.
    pub fn dish_master(dish_nr: u16) -> Result<Self, ValueError> {
        if dish_nr == 0 || dish_nr > 9999 {
            return Err(ValueError::InvalidDishNumber(dish_nr));
        }
        Ok(Self(format!("mid_d{dish_nr:04}/elt/master")))
    }

    /// Constructs a name from a statically known-valid literal.
    ///
    /// Callers must guarantee the `domain/family/member` form.
    pub(crate) fn known(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Returns the full name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain segment.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.segment(0)
    }

    /// Returns the family segment.
    #[must_use]
    pub fn family(&self) -> &str {
        self.segment(1)
    }

    /// Returns the member segment.
    #[must_use]
    pub fn member(&self) -> &str {
        self.segment(2)
    }

    fn segment(&self, index: usize) -> &str {
        // Validated at construction, so the segment exists.
        self.0.split('/').nth(index).unwrap_or_default()
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceName {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceName {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceName> for String {
    fn from(name: DeviceName) -> Self {
        name.0
    }
}
