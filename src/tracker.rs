//! Destination-chain delivery tracking for in-flight messages.
//!
//! [`MessageTracker::track`] returns a lazy [`StatusStream`] that polls
//! the protocol's delivery state at a fixed interval and yields one
//! [`StatusSnapshot`] per poll. The stream is bounded: it ends after the
//! first terminal snapshot — `Delivered`, `Failed`, or `TimedOut` once the
//! configured maximum polling duration elapses — and never hangs
//! indefinitely.
//!
//! Tracking is read-only and independent of other operations: any number
//! of trackers may run concurrently. A manual retry of a failed message is
//! a *new* submission with a new GUID — track it as a fresh stream rather
//! than mutating the old one.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::capability::{DeliveryState, MessageGuid, MessagingEndpoint};
use crate::classify::classify;

/// Polling bounds for one tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// Hard ceiling on total polling time; reaching it yields `TimedOut`.
    pub max_duration: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_duration: Duration::from_secs(600),
        }
    }
}

/// Caller-visible delivery status, including the tracker's own terminal
/// `TimedOut` pseudo-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
    /// The tracker gave up after `max_duration`; the message itself may
    /// still land later.
    TimedOut,
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One observation of an in-flight message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: DeliveryStatus,
    pub last_checked_at: Instant,
}

/// Spawns status streams for in-flight messages.
pub struct MessageTracker<E> {
    endpoint: Arc<E>,
    config: TrackerConfig,
}

impl<E> MessageTracker<E>
where
    E: MessagingEndpoint,
{
    pub fn new(endpoint: Arc<E>, config: TrackerConfig) -> Self {
        Self { endpoint, config }
    }

    /// Starts tracking one message. The returned stream is lazy — nothing
    /// is polled until [`StatusStream::next`] is called — and restartable:
    /// call `track` again for a fresh stream over the same GUID.
    pub fn track(&self, guid: MessageGuid, cancel: CancelToken) -> StatusStream<E> {
        StatusStream {
            endpoint: Arc::clone(&self.endpoint),
            guid,
            config: self.config,
            cancel,
            deadline: None,
            done: false,
        }
    }
}

/// Lazy sequence of delivery snapshots for one message.
pub struct StatusStream<E> {
    endpoint: Arc<E>,
    guid: MessageGuid,
    config: TrackerConfig,
    cancel: CancelToken,
    /// Set on the first poll; the timeout clock starts then, not at
    /// stream construction.
    deadline: Option<Instant>,
    done: bool,
}

impl<E> StatusStream<E>
where
    E: MessagingEndpoint,
{
    /// Yields the next snapshot, waiting one poll interval between
    /// observations. Returns `None` once a terminal snapshot has been
    /// yielded or the caller cancelled.
    pub async fn next(&mut self) -> Option<StatusSnapshot> {
        if self.done || self.cancel.is_cancelled() {
            return None;
        }

        match self.deadline {
            None => {
                // First poll happens immediately.
                self.deadline = Some(Instant::now() + self.config.max_duration);
            }
            Some(_) => {
                tokio::select! {
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                    () = self.cancel.cancelled() => {
                        debug!(guid = %self.guid, "status stream cancelled");
                        self.done = true;
                        return None;
                    }
                }
            }
        }

        let now = Instant::now();
        let deadline = self.deadline?;

        if now >= deadline {
            warn!(guid = %self.guid, "delivery tracking timed out");
            self.done = true;
            return Some(StatusSnapshot {
                status: DeliveryStatus::TimedOut,
                last_checked_at: now,
            });
        }

        let status = match self.endpoint.message_status(self.guid).await {
            Ok(DeliveryState::Inflight) => DeliveryStatus::Pending,
            Ok(DeliveryState::Delivered) => {
                info!(guid = %self.guid, "message delivered");
                DeliveryStatus::Delivered
            }
            Ok(DeliveryState::Failed) => {
                warn!(guid = %self.guid, "message delivery failed");
                DeliveryStatus::Failed
            }
            Err(err) => {
                let classified = classify(&err);
                if classified.retryable {
                    // Transient query failure; keep polling.
                    debug!(guid = %self.guid, kind = %classified.kind, "status poll failed, will retry");
                    DeliveryStatus::Pending
                } else {
                    warn!(guid = %self.guid, kind = %classified.kind, "status poll failed terminally");
                    DeliveryStatus::Failed
                }
            }
        };

        if status.is_terminal() {
            self.done = true;
        }

        Some(StatusSnapshot {
            status,
            last_checked_at: Instant::now(),
        })
    }

    /// Drains the stream and returns its terminal snapshot, or `None` if
    /// the stream was cancelled first.
    pub async fn wait_terminal(&mut self) -> Option<StatusSnapshot> {
        let mut last = None;
        while let Some(snapshot) = self.next().await {
            last = Some(snapshot);
            if snapshot.status.is_terminal() {
                break;
            }
        }
        last.filter(|snapshot| snapshot.status.is_terminal())
    }
}
