// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute assertions for command preconditions.

use crate::error::{AssertionError, Result};
use crate::types::AttrValue;

use super::AttributeReader;

/// Reads an attribute and returns an assertion handle on the value.
///
/// # Examples
///
/// ```
/// use statewatch::resource::{SimulatedDevice, assert_attribute};
/// use statewatch::types::{DeviceName, ObsState};
///
/// # async fn example() -> statewatch::Result<()> {
/// let device = SimulatedDevice::new(DeviceName::new("ska_mid/tm_subarray_node/1")?);
/// device.set_attribute("obsState", "IDLE");
///
/// assert_attribute(&device, "obsState").await?.equals(ObsState::Idle)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Propagates read failures from the underlying resource.
pub async fn assert_attribute<R: AttributeReader>(
    resource: &R,
    attr: &str,
) -> Result<AttributeAssertion> {
    let actual = resource.read(attr).await?;
    Ok(AttributeAssertion {
        subject: format!("{}.{attr}", resource.device_name()),
        actual,
    })
}

/// An attribute value captured for assertion.
#[derive(Debug, Clone)]
pub struct AttributeAssertion {
    subject: String,
    actual: AttrValue,
}

impl AttributeAssertion {
    /// Returns the captured value.
    #[must_use]
    pub fn value(&self) -> &AttrValue {
        &self.actual
    }

    /// Asserts that the value equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::NotEqual` with a descriptive message on
    /// mismatch.
    pub fn equals(&self, expected: impl Into<AttrValue>) -> Result<()> {
        let expected = expected.into();
        if self.actual == expected {
            Ok(())
        } else {
            Err(AssertionError::NotEqual {
                subject: self.subject.clone(),
                expected: expected.to_string(),
                actual: self.actual.to_string(),
            }
            .into())
        }
    }

    /// Asserts that the value equals one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::NotOneOf` when none of the values match.
    pub fn is_one_of<I, V>(&self, allowed: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<AttrValue>,
    {
        let allowed: Vec<AttrValue> = allowed.into_iter().map(Into::into).collect();
        if allowed.iter().any(|value| *value == self.actual) {
            Ok(())
        } else {
            Err(AssertionError::NotOneOf {
                subject: self.subject.clone(),
                allowed: allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                actual: self.actual.to_string(),
            }
            .into())
        }
    }
}
