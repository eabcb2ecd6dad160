//! Output stream collection
//!
//! The set of all active output streams for one channel: an unordered
//! multiset of handles, identified only by reference identity. Classified
//! counts are computed on demand from the live membership so they can never
//! go stale across concurrent add/remove; the fan-out path blocks on this
//! collection only for the duration of one membership snapshot copy.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::capability::OutputStreamType;
use super::output::OutputStream;

type Member = Arc<dyn OutputStream>;

/// Unordered multiset of output stream handles
pub struct OutputStreamCollection {
    streams: RwLock<Vec<Member>>,
}

impl OutputStreamCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(Vec::new()),
        }
    }

    /// Append a stream handle
    ///
    /// No uniqueness check is made; adding the same handle twice is a
    /// caller error that results in double delivery, not a rejection.
    pub fn add(&self, stream: Member) {
        let mut streams = self.write();
        streams.push(stream);
        tracing::debug!(members = streams.len(), "Output stream added");
    }

    /// Remove one handle matching by reference identity
    ///
    /// No-op if the handle is not a member. Returns whether a handle was
    /// removed.
    pub fn remove(&self, stream: &Member) -> bool {
        let mut streams = self.write();
        if let Some(index) = streams.iter().position(|s| Arc::ptr_eq(s, stream)) {
            streams.swap_remove(index);
            tracing::debug!(members = streams.len(), "Output stream removed");
            true
        } else {
            false
        }
    }

    /// Total number of members
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the collection has no members
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of members whose capability flags include `RELAY`
    pub fn count_relaying(&self) -> usize {
        self.count_with(OutputStreamType::RELAY)
    }

    /// Number of members whose capability flags include `PLAY`
    pub fn count_playing(&self) -> usize {
        self.count_with(OutputStreamType::PLAY)
    }

    fn count_with(&self, flag: OutputStreamType) -> usize {
        self.read()
            .iter()
            .filter(|s| s.output_stream_type().contains(flag))
            .count()
    }

    /// Stable copy of the current membership for one fan-out pass
    ///
    /// Streams added after the snapshot see only later units; streams
    /// removed after it may still receive the unit in flight.
    pub fn snapshot(&self) -> Vec<Member> {
        self.read().clone()
    }

    /// Remove every member and close each one
    pub fn close_all(&self) {
        let drained: Vec<Member> = {
            let mut streams = self.write();
            streams.drain(..).collect()
        };
        for stream in &drained {
            stream.close();
        }
        if !drained.is_empty() {
            tracing::info!(closed = drained.len(), "All output streams closed");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Member>> {
        self.streams.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Member>> {
        self.streams.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OutputStreamCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OutputStreamCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStreamCollection")
            .field("members", &self.len())
            .finish()
    }
}
