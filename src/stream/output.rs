//! Output stream seam
//!
//! One output stream is one downstream connection: a relaying peer, a local
//! player, or a metadata-only consumer. The channel hub depends only on
//! this trait; concrete variants (socket-backed, in-memory test double) are
//! supplied by an [`OutputStreamFactory`](super::factory::OutputStreamFactory)
//! at the connection-acceptance layer.

use std::net::SocketAddr;

use crate::channel::Content;

use super::capability::OutputStreamType;

/// Error from [`OutputStream::post`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostError {
    /// The stream has been closed; the unit was not accepted
    Closed,
    /// The stream's send queue is full; the unit was not accepted
    QueueFull,
}

impl std::fmt::Display for PostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostError::Closed => write!(f, "output stream is closed"),
            PostError::QueueFull => write!(f, "output stream send queue is full"),
        }
    }
}

impl std::error::Error for PostError {}

/// One downstream connection of a channel
///
/// `post` must only enqueue, never block for transmission, so one slow peer
/// cannot stall the channel's fan-out. After `close`, further `post` calls
/// fail with [`PostError::Closed`]; `close` itself is idempotent. The
/// informational accessors (`remote_endpoint`, `upstream_rate`, `is_local`)
/// are metadata with no ordering guarantee against the fan-out path.
pub trait OutputStream: Send + Sync {
    /// Capability flags, fixed at creation
    fn output_stream_type(&self) -> OutputStreamType;

    /// Remote peer address, if known
    fn remote_endpoint(&self) -> Option<SocketAddr> {
        None
    }

    /// Estimated upstream bandwidth cost of this connection, in bits/s
    fn upstream_rate(&self) -> u32 {
        0
    }

    /// Whether the remote end is on the local network
    fn is_local(&self) -> bool {
        false
    }

    /// Begin serving the connection
    fn start(&self);

    /// Enqueue one content unit for delivery, attributed to `from`
    fn post(&self, from: Option<SocketAddr>, content: &Content) -> Result<(), PostError>;

    /// Release the connection; idempotent
    fn close(&self);
}

impl dyn OutputStream {
    /// Whether this stream counts toward the channel's relay count
    pub fn is_relaying(&self) -> bool {
        self.output_stream_type().contains(OutputStreamType::RELAY)
    }

    /// Whether this stream counts toward the channel's play count
    pub fn is_playing(&self) -> bool {
        self.output_stream_type().contains(OutputStreamType::PLAY)
    }
}
