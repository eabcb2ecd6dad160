//! Channel metadata with change notification
//!
//! [`ChannelInfo`] holds the descriptive metadata for one channel: its
//! immutable 128-bit identifier, the tracker URI it was (last) sourced
//! from, a display name, and an ordered list of opaque [`Atom`] records
//! keyed by 4-byte [`Id4`] identifiers. Every mutation raises exactly one
//! synchronous property-changed notification.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use url::Url;
use uuid::Uuid;

use crate::notify::{Notifier, Subscription};

/// 4-byte metadata key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id4([u8; 4]);

impl Id4 {
    /// Create a key from raw bytes, e.g. `Id4::new(*b"name")`
    pub const fn new(raw: [u8; 4]) -> Self {
        Self(raw)
    }

    /// Raw key bytes
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Display for Id4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for b in self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(
                f,
                "[{:02x}{:02x}{:02x}{:02x}]",
                self.0[0], self.0[1], self.0[2], self.0[3]
            )
        }
    }
}

/// One opaque metadata record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    key: Id4,
    value: Bytes,
}

impl Atom {
    /// Create a record under the given key
    pub fn new(key: Id4, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Record key
    pub fn key(&self) -> Id4 {
        self.key
    }

    /// Record payload
    pub fn value(&self) -> &Bytes {
        &self.value
    }
}

/// Which [`ChannelInfo`] property a change notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProperty {
    Name,
    Tracker,
    Extra,
}

impl std::fmt::Display for ChannelProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelProperty::Name => write!(f, "Name"),
            ChannelProperty::Tracker => write!(f, "Tracker"),
            ChannelProperty::Extra => write!(f, "Extra"),
        }
    }
}

#[derive(Debug, Default)]
struct InfoState {
    name: String,
    tracker: Option<Url>,
    extra: Vec<Atom>,
}

/// Mutable channel metadata, shared between the hub and external readers
///
/// A fresh instance has an empty name, no tracker and an empty `extra`
/// list. `extra` is append-only and order-preserving; duplicate keys are
/// permitted. Each mutator fires one [`ChannelProperty`] notification to
/// every registered observer, synchronously, in mutation order.
pub struct ChannelInfo {
    channel_id: Uuid,
    state: Mutex<InfoState>,
    changed: Notifier<ChannelProperty>,
}

impl ChannelInfo {
    /// Create metadata for a channel
    ///
    /// `Uuid::nil()` is the conventional sentinel for a channel whose
    /// identifier is not yet known.
    pub fn new(channel_id: Uuid) -> Self {
        Self {
            channel_id,
            state: Mutex::new(InfoState::default()),
            changed: Notifier::new(),
        }
    }

    /// Channel identifier, immutable after creation
    pub fn channel_id(&self) -> Uuid {
        self.channel_id
    }

    /// Channel display name
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Set the display name, firing a `Name` notification
    pub fn set_name(&self, name: impl Into<String>) {
        self.lock().name = name.into();
        self.changed.notify(&ChannelProperty::Name);
    }

    /// Tracker URI this channel is sourced from, if known
    pub fn tracker(&self) -> Option<Url> {
        self.lock().tracker.clone()
    }

    /// Set the tracker URI, firing a `Tracker` notification
    pub fn set_tracker(&self, tracker: Option<Url>) {
        self.lock().tracker = tracker;
        self.changed.notify(&ChannelProperty::Tracker);
    }

    /// Snapshot of the extra metadata records, in insertion order
    pub fn extra(&self) -> Vec<Atom> {
        self.lock().extra.clone()
    }

    /// Number of extra metadata records
    pub fn extra_count(&self) -> usize {
        self.lock().extra.len()
    }

    /// Append one metadata record, firing a single `Extra` notification
    pub fn add_extra(&self, atom: Atom) {
        self.lock().extra.push(atom);
        self.changed.notify(&ChannelProperty::Extra);
    }

    /// Register a property-changed observer
    pub fn on_property_changed(
        &self,
        observer: impl Fn(&ChannelProperty) + Send + Sync + 'static,
    ) -> Subscription {
        self.changed.subscribe(observer)
    }

    /// Remove a property-changed observer
    pub fn remove_property_observer(&self, subscription: Subscription) -> bool {
        self.changed.unsubscribe(subscription)
    }

    fn lock(&self) -> MutexGuard<'_, InfoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChannelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ChannelInfo")
            .field("channel_id", &self.channel_id)
            .field("name", &state.name)
            .field("tracker", &state.tracker)
            .field("extra", &state.extra.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_construct() {
        let info = ChannelInfo::new(Uuid::nil());

        assert_eq!(info.channel_id(), Uuid::nil());
        assert!(info.tracker().is_none());
        assert_eq!(info.name(), "");
        assert_eq!(info.extra_count(), 0);
    }

    #[test]
    fn test_property_changed() {
        let info = ChannelInfo::new(Uuid::nil());
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_obs = Arc::clone(&log);
        info.on_property_changed(move |prop| log_obs.lock().unwrap().push(prop.to_string()));

        info.set_name("test");
        info.set_tracker(Some(Url::parse("mock://127.0.0.1:7147").unwrap()));
        info.add_extra(Atom::new(Id4::new(*b"test"), Bytes::from_static(b"foo")));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], "Name");
        assert_eq!(log[1], "Tracker");
        assert_eq!(log[2], "Extra");
    }

    #[test]
    fn test_unsubscribed_observer_sees_nothing() {
        let info = ChannelInfo::new(Uuid::new_v4());
        let count = Arc::new(Mutex::new(0u32));

        let count_obs = Arc::clone(&count);
        let sub = info.on_property_changed(move |_| *count_obs.lock().unwrap() += 1);

        info.set_name("before");
        assert!(info.remove_property_observer(sub));
        info.set_name("after");

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(info.name(), "after");
    }

    #[test]
    fn test_extra_preserves_order_and_duplicates() {
        let info = ChannelInfo::new(Uuid::new_v4());
        let key = Id4::new(*b"titl");

        info.add_extra(Atom::new(key, Bytes::from_static(b"first")));
        info.add_extra(Atom::new(Id4::new(*b"desc"), Bytes::from_static(b"other")));
        info.add_extra(Atom::new(key, Bytes::from_static(b"second")));

        let extra = info.extra();
        assert_eq!(extra.len(), 3);
        assert_eq!(extra[0].key(), key);
        assert_eq!(extra[0].value().as_ref(), b"first");
        assert_eq!(extra[2].key(), key);
        assert_eq!(extra[2].value().as_ref(), b"second");
    }

    #[test]
    fn test_id4_display() {
        assert_eq!(Id4::new(*b"name").to_string(), "name");
        assert_eq!(Id4::new([0x00, 0x01, 0xfe, 0xff]).to_string(), "[0001feff]");
    }
}
