// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Blocking consumption of transition events.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::{Result, WaitError};
use crate::types::DeviceName;

use super::TransitionEvent;

/// How a [`Listener`] consumes events from its subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeStrategy {
    /// Await each event as soon as it is published.
    Immediately,
    /// Poll the buffered subscription at a client-side cadence.
    ///
    /// Useful when the consumer wants to bound how often it wakes up rather
    /// than reacting to every publication.
    Periodically {
        /// Interval between polls of the event buffer.
        polling: Duration,
    },
}

impl Default for ConsumeStrategy {
    fn default() -> Self {
        Self::Immediately
    }
}

/// Listens for transition events, optionally filtered by device and
/// attribute.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use statewatch::event::{EventBus, Listener, TransitionEvent};
/// use statewatch::types::{AttrValue, DeviceName};
///
/// # async fn example() -> statewatch::Result<()> {
/// let bus = EventBus::new();
/// let mut listener = Listener::new(&bus).on_attribute("obsState");
///
/// let device = DeviceName::new("mid_sdp/elt/subarray_1")?;
/// bus.publish(TransitionEvent::now(device, "obsState", AttrValue::from("READY")));
///
/// let (event, elapsed) = listener.wait_for_next_event(Duration::from_secs(1)).await?;
/// assert_eq!(event.value, AttrValue::from("READY"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Listener {
    rx: broadcast::Receiver<TransitionEvent>,
    strategy: ConsumeStrategy,
    device: Option<DeviceName>,
    attribute: Option<String>,
    listening: bool,
}

impl Listener {
    /// Creates a listener subscribed to the given bus.
    #[must_use]
    pub fn new(bus: &super::EventBus) -> Self {
        Self {
            rx: bus.subscribe(),
            strategy: ConsumeStrategy::default(),
            device: None,
            attribute: None,
            listening: true,
        }
    }

    /// Restricts the listener to events from one device.
    #[must_use]
    pub fn on_device(mut self, device: DeviceName) -> Self {
        self.device = Some(device);
        self
    }

    /// Restricts the listener to events on one attribute.
    #[must_use]
    pub fn on_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Sets the consumption strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ConsumeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns `true` while the listener accepts waits.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Stops the listener; subsequent waits fail with
    /// [`WaitError::ListenerStopped`].
    pub fn stop_listening(&mut self) {
        self.listening = false;
    }

    fn matches(&self, event: &TransitionEvent) -> bool {
        if let Some(device) = &self.device
            && event.device != *device
        {
            return false;
        }
        if let Some(attribute) = &self.attribute
            && event.attribute != *attribute
        {
            return false;
        }
        true
    }

    /// Blocks until the next matching event arrives.
    ///
    /// Returns the event together with the time spent waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::NoEvent`] when the timeout elapses without a
    /// matching event, [`WaitError::ListenerStopped`] when the listener was
    /// stopped, and a protocol error if the bus was closed.
    pub async fn wait_for_next_event(
        &mut self,
        timeout: Duration,
    ) -> Result<(TransitionEvent, Duration)> {
        if !self.listening {
            return Err(WaitError::ListenerStopped.into());
        }
        let started = Instant::now();
        let deadline = started + timeout;

        match self.strategy {
            ConsumeStrategy::Immediately => loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(WaitError::NoEvent {
                        waited: started.elapsed(),
                    }
                    .into());
                }
                match tokio::time::timeout(remaining, self.rx.recv()).await {
                    Ok(Ok(event)) => {
                        if self.matches(&event) {
                            return Ok((event, started.elapsed()));
                        }
                    }
                    Ok(Err(broadcast::error::RecvError::Lagged(missed))) => {
                        tracing::warn!(missed, "listener lagged behind the event bus");
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        return Err(crate::error::ProtocolError::ChannelClosed(
                            "event bus closed".to_string(),
                        )
                        .into());
                    }
                    Err(_) => {
                        return Err(WaitError::NoEvent {
                            waited: started.elapsed(),
                        }
                        .into());
                    }
                }
            },
            ConsumeStrategy::Periodically { polling } => loop {
                match self.rx.try_recv() {
                    Ok(event) => {
                        if self.matches(&event) {
                            return Ok((event, started.elapsed()));
                        }
                    }
                    Err(broadcast::error::TryRecvError::Empty) => {
                        if Instant::now() >= deadline {
                            return Err(WaitError::NoEvent {
                                waited: started.elapsed(),
                            }
                            .into());
                        }
                        tokio::time::sleep(polling).await;
                    }
                    Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "listener lagged behind the event bus");
                    }
                    Err(broadcast::error::TryRecvError::Closed) => {
                        return Err(crate::error::ProtocolError::ChannelClosed(
                            "event bus closed".to_string(),
                        )
                        .into());
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::event::EventBus;
    use crate::types::AttrValue;

    fn device(name: &str) -> DeviceName {
        DeviceName::new(name).unwrap()
    }

    #[tokio::test]
    async fn receives_published_event() {
        let bus = EventBus::new();
        let mut listener = Listener::new(&bus);

        bus.publish(TransitionEvent::now(
            device("ska_mid/tm_subarray_node/1"),
            "obsState",
            AttrValue::from("IDLE"),
        ));

        let (event, _elapsed) = listener
            .wait_for_next_event(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event.attribute, "obsState");
        assert_eq!(event.value, AttrValue::from("IDLE"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_events() {
        let bus = EventBus::new();
        let mut listener = Listener::new(&bus);

        let result = listener.wait_for_next_event(Duration::from_secs(2)).await;
        assert!(matches!(
            result,
            Err(Error::Wait(WaitError::NoEvent { .. }))
        ));
    }

    #[tokio::test]
    async fn filters_by_device_and_attribute() {
        let bus = EventBus::new();
        let mut listener = Listener::new(&bus)
            .on_device(device("mid_sdp/elt/subarray_1"))
            .on_attribute("obsState");

        bus.publish(TransitionEvent::now(
            device("mid_csp/elt/subarray_01"),
            "obsState",
            AttrValue::from("IDLE"),
        ));
        bus.publish(TransitionEvent::now(
            device("mid_sdp/elt/subarray_1"),
            "State",
            AttrValue::from("ON"),
        ));
        bus.publish(TransitionEvent::now(
            device("mid_sdp/elt/subarray_1"),
            "obsState",
            AttrValue::from("READY"),
        ));

        let (event, _) = listener
            .wait_for_next_event(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event.device, device("mid_sdp/elt/subarray_1"));
        assert_eq!(event.value, AttrValue::from("READY"));
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_strategy_picks_up_buffered_events() {
        let bus = EventBus::new();
        let mut listener = Listener::new(&bus).with_strategy(ConsumeStrategy::Periodically {
            polling: Duration::from_millis(200),
        });

        bus.publish(TransitionEvent::now(
            device("ska_mid/tm_subarray_node/1"),
            "obsState",
            AttrValue::from("SCANNING"),
        ));

        let (event, _) = listener
            .wait_for_next_event(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event.value, AttrValue::from("SCANNING"));
    }

    #[tokio::test]
    async fn stopped_listener_refuses_to_wait() {
        let bus = EventBus::new();
        let mut listener = Listener::new(&bus);
        listener.stop_listening();
        assert!(!listener.is_listening());

        let result = listener.wait_for_next_event(Duration::from_secs(1)).await;
        assert!(matches!(
            result,
            Err(Error::Wait(WaitError::ListenerStopped))
        ));
    }
}
