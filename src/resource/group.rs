// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reads across a set of devices.

use crate::error::Result;
use crate::types::{AttrValue, DeviceName};

use super::{AttributeReader, ResourceProvider};

/// A named set of devices read together.
///
/// Reads are sequential within one call, so the effective latency scales
/// with the number of members.
///
/// # Examples
///
/// ```
/// use statewatch::resource::{ResourceGroup, SimulatedTelescope, ResourceProvider};
/// use statewatch::types::DeviceName;
///
/// # async fn example() -> statewatch::Result<()> {
/// let telescope = SimulatedTelescope::new();
/// let names = vec![
///     DeviceName::new("mid_csp/elt/subarray_01")?,
///     DeviceName::new("mid_sdp/elt/subarray_1")?,
/// ];
/// let group = ResourceGroup::from_provider(&telescope, &names);
/// let states = group.read("obsState").await?;
/// assert_eq!(states.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResourceGroup<R: AttributeReader> {
    members: Vec<R>,
}

impl<R: AttributeReader> ResourceGroup<R> {
    /// Creates a group from pre-built readers.
    #[must_use]
    pub fn new(members: Vec<R>) -> Self {
        Self { members }
    }

    /// Creates a group by resolving names through a provider.
    #[must_use]
    pub fn from_provider<P>(provider: &P, names: &[DeviceName]) -> Self
    where
        P: ResourceProvider<Reader = R>,
    {
        Self {
            members: names.iter().map(|name| provider.resource(name)).collect(),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Reads the named attribute from every member, in order.
    ///
    /// # Errors
    ///
    /// Propagates the first read failure.
    pub async fn read(&self, attr: &str) -> Result<Vec<(DeviceName, AttrValue)>> {
        let mut values = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let value = member.read(attr).await?;
            values.push((member.device_name().clone(), value));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::SimulatedTelescope;

    #[tokio::test]
    async fn reads_every_member_in_order() {
        let telescope = SimulatedTelescope::new();
        let names = vec![
            DeviceName::new("ska_mid/tm_subarray_node/1").unwrap(),
            DeviceName::new("mid_csp/elt/subarray_01").unwrap(),
        ];
        telescope.device(&names[0]).set_attribute("obsState", "IDLE");
        telescope.device(&names[1]).set_attribute("obsState", "EMPTY");

        let group = ResourceGroup::from_provider(&telescope, &names);
        let values = group.read("obsState").await.unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0], (names[0].clone(), AttrValue::from("IDLE")));
        assert_eq!(values[1], (names[1].clone(), AttrValue::from("EMPTY")));
    }

    #[tokio::test]
    async fn empty_group_reads_nothing() {
        let group: ResourceGroup<crate::resource::SimulatedDevice> = ResourceGroup::new(vec![]);
        assert!(group.is_empty());
        assert!(group.read("obsState").await.unwrap().is_empty());
    }
}
