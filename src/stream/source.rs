//! Source stream seam and connection state machine
//!
//! A channel has exactly one source stream: the upstream connection the
//! channel's content arrives on. This module defines the trait the hub
//! depends on, the status state machine shared by implementations
//! ([`StatusCell`]), and a bounded queue for control packets posted while
//! the connection is not receiving ([`PostQueue`]).
//!
//! The source stream never retries on its own. A failure transitions it to
//! `Error` and is reported through the status-changed notification; the
//! owning hub observes the transition and decides whether (and when) to
//! call `reconnect`.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::channel::Atom;
use crate::notify::{Notifier, Observer, Subscription};

/// Connection status of a source stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStreamStatus {
    /// Created, not yet started
    Idle,
    /// Connection attempt in progress
    Connecting,
    /// Connected and receiving content
    Receiving,
    /// Connection attempt or established connection failed
    Error,
}

impl std::fmt::Display for SourceStreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStreamStatus::Idle => write!(f, "Idle"),
            SourceStreamStatus::Connecting => write!(f, "Connecting"),
            SourceStreamStatus::Receiving => write!(f, "Receiving"),
            SourceStreamStatus::Error => write!(f, "Error"),
        }
    }
}

/// Observer callback for status transitions
pub type StatusObserver = Observer<SourceStreamStatus>;

/// The single upstream connection of a channel
///
/// Contract violations (post before start, double close, reconnect after
/// close) are well-defined no-ops; implementations must never panic or
/// corrupt state on them. Status observers are notified once per actual
/// transition, before any content produced under the new status reaches
/// the channel.
pub trait SourceStream: Send + Sync {
    /// Current connection status
    fn status(&self) -> SourceStreamStatus;

    /// Begin the connection attempt; idempotent once past `Idle`
    fn start(&self);

    /// Re-enter `Connecting` from `Error`, or abandon a stalled attempt
    ///
    /// Resources of the previous attempt are released on every exit path.
    fn reconnect(&self);

    /// Enqueue an outbound control packet addressed to the upstream peer
    ///
    /// `from` attributes the packet to the originating output stream's
    /// remote endpoint for echo suppression upstream. Never blocks past
    /// enqueueing; posting while not `Receiving` is accepted and queued.
    fn post(&self, from: Option<SocketAddr>, packet: Atom);

    /// Release the connection; terminal and idempotent
    fn close(&self);

    /// Register a status-changed observer
    fn on_status_changed(&self, observer: StatusObserver) -> Subscription;

    /// Remove a status-changed observer
    fn remove_status_observer(&self, subscription: Subscription);
}

/// Status state machine for source stream implementations
///
/// Enforces the transition table (`Idle → Connecting → Receiving`,
/// failures to `Error`, `reconnect` back to `Connecting`, `close`
/// terminal) and fires the status-changed notifier exactly once per actual
/// transition. Implementations must publish a transition through the cell
/// before emitting any content produced under the new status, so observers
/// always see the state change first.
pub struct StatusCell {
    state: Mutex<CellState>,
    changed: Notifier<SourceStreamStatus>,
}

struct CellState {
    status: SourceStreamStatus,
    closed: bool,
}

impl StatusCell {
    /// Create a cell in `Idle`
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CellState {
                status: SourceStreamStatus::Idle,
                closed: false,
            }),
            changed: Notifier::new(),
        }
    }

    /// Current status
    pub fn status(&self) -> SourceStreamStatus {
        self.lock().status
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// `Idle → Connecting`; no-op (returns `false`) once past `Idle`
    pub fn start(&self) -> bool {
        self.transition(|status| match status {
            SourceStreamStatus::Idle => Some(SourceStreamStatus::Connecting),
            _ => None,
        })
    }

    /// `Error | Connecting → Connecting`
    ///
    /// Returns whether the reconnect was accepted. Re-entering `Connecting`
    /// from `Connecting` is accepted but fires no notification, since the
    /// status did not actually change.
    pub fn reconnect(&self) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        match state.status {
            SourceStreamStatus::Error => {
                state.status = SourceStreamStatus::Connecting;
                drop(state);
                self.changed.notify(&SourceStreamStatus::Connecting);
                true
            }
            SourceStreamStatus::Connecting => true,
            _ => false,
        }
    }

    /// `Connecting → Receiving`
    pub fn set_receiving(&self) -> bool {
        self.transition(|status| match status {
            SourceStreamStatus::Connecting => Some(SourceStreamStatus::Receiving),
            _ => None,
        })
    }

    /// `Connecting | Receiving → Error`
    pub fn set_error(&self) -> bool {
        self.transition(|status| match status {
            SourceStreamStatus::Connecting | SourceStreamStatus::Receiving => {
                Some(SourceStreamStatus::Error)
            }
            _ => None,
        })
    }

    /// Mark the cell closed; all further transitions are rejected
    ///
    /// Idempotent. Fires no notification.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        if state.closed {
            false
        } else {
            state.closed = true;
            true
        }
    }

    /// Register a status-changed observer
    pub fn on_changed(&self, observer: StatusObserver) -> Subscription {
        self.changed.subscribe_observer(observer)
    }

    /// Remove a status-changed observer
    pub fn remove_observer(&self, subscription: Subscription) -> bool {
        self.changed.unsubscribe(subscription)
    }

    fn transition(
        &self,
        rule: impl FnOnce(SourceStreamStatus) -> Option<SourceStreamStatus>,
    ) -> bool {
        let next = {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            match rule(state.status) {
                Some(next) => {
                    tracing::debug!(from = %state.status, to = %next, "Source status transition");
                    state.status = next;
                    next
                }
                None => return false,
            }
        };
        self.changed.notify(&next);
        true
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("StatusCell")
            .field("status", &state.status)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Bounded FIFO for control packets posted while not receiving
///
/// Packets posted to a source that is still connecting (or recovering from
/// an error) are held here and drained once the connection re-enters
/// `Receiving`, so keepalives and control packets survive short
/// reconnects. On overflow the oldest packet is dropped.
pub struct PostQueue {
    packets: Mutex<VecDeque<(Option<SocketAddr>, Atom)>>,
    capacity: usize,
}

impl PostQueue {
    /// Default queue capacity in packets
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a queue with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a queue holding at most `capacity` packets
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            packets: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Enqueue a packet, dropping the oldest one if the queue is full
    ///
    /// Returns `false` when a packet was dropped to make room.
    pub fn push(&self, from: Option<SocketAddr>, packet: Atom) -> bool {
        let mut packets = self.lock();
        let mut fit = true;
        if packets.len() >= self.capacity {
            packets.pop_front();
            tracing::debug!(capacity = self.capacity, "Post queue full, dropped oldest packet");
            fit = false;
        }
        packets.push_back((from, packet));
        fit
    }

    /// Take every queued packet, in arrival order
    pub fn drain(&self) -> Vec<(Option<SocketAddr>, Atom)> {
        self.lock().drain(..).collect()
    }

    /// Number of queued packets
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<(Option<SocketAddr>, Atom)>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PostQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;

    use crate::channel::Id4;

    use super::*;

    #[test]
    fn test_status_lifecycle() {
        let cell = StatusCell::new();
        assert_eq!(cell.status(), SourceStreamStatus::Idle);

        assert!(cell.start());
        assert_ne!(cell.status(), SourceStreamStatus::Idle);
        assert_eq!(cell.status(), SourceStreamStatus::Connecting);

        assert!(cell.set_error());
        assert_eq!(cell.status(), SourceStreamStatus::Error);

        assert!(cell.reconnect());
        assert_eq!(cell.status(), SourceStreamStatus::Connecting);

        assert!(cell.set_receiving());
        assert_eq!(cell.status(), SourceStreamStatus::Receiving);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let cell = StatusCell::new();

        // Not started yet
        assert!(!cell.set_receiving());
        assert!(!cell.set_error());
        assert!(!cell.reconnect());

        cell.start();
        // start is a no-op past Idle
        assert!(!cell.start());

        cell.set_receiving();
        // Receiving does not reconnect without an error first
        assert!(!cell.reconnect());
        assert_eq!(cell.status(), SourceStreamStatus::Receiving);
    }

    #[test]
    fn test_close_is_terminal() {
        let cell = StatusCell::new();
        cell.start();

        assert!(cell.close());
        assert!(cell.is_closed());
        assert!(!cell.close());

        assert!(!cell.reconnect());
        assert!(!cell.set_receiving());
        assert!(!cell.set_error());
        assert_eq!(cell.status(), SourceStreamStatus::Connecting);
    }

    #[test]
    fn test_one_notification_per_transition() {
        let cell = StatusCell::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_obs = Arc::clone(&log);
        cell.on_changed(Arc::new(move |status| {
            log_obs.lock().unwrap().push(*status);
        }));

        cell.start();
        cell.start(); // no-op, no notification
        cell.set_error();
        cell.reconnect();
        cell.reconnect(); // Connecting -> Connecting, accepted but silent
        cell.set_receiving();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                SourceStreamStatus::Connecting,
                SourceStreamStatus::Error,
                SourceStreamStatus::Connecting,
                SourceStreamStatus::Receiving,
            ]
        );
    }

    #[test]
    fn test_observer_removal() {
        let cell = StatusCell::new();
        let count = Arc::new(Mutex::new(0u32));

        let count_obs = Arc::clone(&count);
        let sub = cell.on_changed(Arc::new(move |_| *count_obs.lock().unwrap() += 1));

        cell.start();
        assert!(cell.remove_observer(sub));
        cell.set_receiving();

        assert_eq!(*count.lock().unwrap(), 1);
    }

    fn packet(tag: &[u8; 4]) -> Atom {
        Atom::new(Id4::new(*tag), Bytes::new())
    }

    #[test]
    fn test_post_queue_order() {
        let queue = PostQueue::new();
        assert!(queue.is_empty());

        assert!(queue.push(None, packet(b"helo")));
        assert!(queue.push(None, packet(b"host")));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].1.key(), Id4::new(*b"helo"));
        assert_eq!(drained[1].1.key(), Id4::new(*b"host"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_post_queue_overflow_drops_oldest() {
        let queue = PostQueue::with_capacity(2);

        assert!(queue.push(None, packet(b"aaaa")));
        assert!(queue.push(None, packet(b"bbbb")));
        assert!(!queue.push(None, packet(b"cccc")));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].1.key(), Id4::new(*b"bbbb"));
        assert_eq!(drained[1].1.key(), Id4::new(*b"cccc"));
    }
}
