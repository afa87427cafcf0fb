// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting attribute transitions.

use tokio::sync::broadcast;

use super::TransitionEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Event bus for broadcasting transition events to multiple subscribers.
///
/// The `EventBus` uses tokio's broadcast channel so multiple subscribers
/// receive the same events, each getting their own copy.
///
/// # Capacity
///
/// The bus has a fixed capacity (default 256). If the channel fills up
/// because a subscriber is slow, older events are dropped for that
/// subscriber (it observes a `RecvError::Lagged`).
///
/// # Examples
///
/// ```
/// use statewatch::event::{EventBus, TransitionEvent};
/// use statewatch::types::{AttrValue, DeviceName};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// let device = DeviceName::new("mid_csp/elt/subarray_01").unwrap();
/// bus.publish(TransitionEvent::now(device, "obsState", AttrValue::from("IDLE")));
/// ```
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<TransitionEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new event bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to transition events.
    ///
    /// Returns a receiver that will see all events published after the
    /// subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all subscribers.
    ///
    /// If there are no subscribers, the event is silently discarded.
    pub fn publish(&self, event: TransitionEvent) {
        // Ignore errors (no subscribers or channel closed)
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
