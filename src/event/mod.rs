// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event-driven observation of attribute transitions.
//!
//! Polling (the [`monitor`](crate::monitor) module) asks devices for their
//! state; this module is the push-side complement. Producers publish
//! [`TransitionEvent`]s on an [`EventBus`] and a [`Listener`] blocks until
//! the next matching event arrives, either consuming immediately or polling
//! a buffered subscription at a client-side cadence.

mod bus;
mod listener;

use chrono::{DateTime, Utc};

use crate::types::{AttrValue, DeviceName};

pub use bus::EventBus;
pub use listener::{ConsumeStrategy, Listener};

/// A single observed attribute transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    /// The device the transition happened on.
    pub device: DeviceName,
    /// The attribute that changed.
    pub attribute: String,
    /// The value after the transition.
    pub value: AttrValue,
    /// When the transition was published.
    pub at: DateTime<Utc>,
}

impl TransitionEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn now(device: DeviceName, attribute: impl Into<String>, value: AttrValue) -> Self {
        Self {
            device,
            attribute: attribute.into(),
            value,
            at: Utc::now(),
        }
    }
}
