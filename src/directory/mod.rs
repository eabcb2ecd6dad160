//! Directory service ("yellow page") client seam
//!
//! Directory services are external registries that map channel identifiers
//! to tracker addresses and accept channel announcements. This core only
//! specifies the client contract; the wire protocol behind it lives
//! elsewhere. The channel hub uses [`YellowPage::find_tracker`] during its
//! reconnect policy to obtain a fresh tracker address; `announce` and
//! `list_channels` serve the surrounding servent.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::channel::ChannelInfo;

/// Error from a directory service operation
#[derive(Debug, Clone)]
pub enum DirectoryError {
    /// The directory has no tracker for the channel
    NotFound(Uuid),
    /// The directory answered, but the response could not be understood
    MalformedResponse(String),
    /// The directory could not be reached
    Unreachable(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::NotFound(channel_id) => {
                write!(f, "no tracker found for channel {channel_id}")
            }
            DirectoryError::MalformedResponse(detail) => {
                write!(f, "malformed directory response: {detail}")
            }
            DirectoryError::Unreachable(detail) => {
                write!(f, "directory unreachable: {detail}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

/// One channel as listed by a directory service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelListing {
    pub channel_id: Uuid,
    pub name: String,
    pub tracker: Option<Url>,
}

/// Client for one directory service
///
/// All errors are recoverable from the hub's point of view: a failed
/// tracker lookup is treated exactly like a transient connection failure
/// and retried under the same budget.
#[async_trait]
pub trait YellowPage: Send + Sync {
    /// Display name of this directory service
    fn name(&self) -> &str;

    /// Root URI of this directory service
    fn uri(&self) -> &Url;

    /// Locate a tracker currently offering the channel
    async fn find_tracker(&self, channel_id: Uuid) -> Result<Url, DirectoryError>;

    /// List the channels the directory knows about
    async fn list_channels(&self) -> Result<Vec<ChannelListing>, DirectoryError>;

    /// Publish this channel's availability
    async fn announce(&self, channel: &ChannelInfo) -> Result<(), DirectoryError>;
}

/// Creates directory service clients, selected by declared name
pub trait YellowPageFactory: Send + Sync {
    /// Declared factory name used for configuration-time selection
    fn name(&self) -> &str;

    /// Create a client for the directory at `uri`
    fn create(&self, name: &str, uri: Url) -> Arc<dyn YellowPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            DirectoryError::NotFound(id).to_string(),
            format!("no tracker found for channel {id}")
        );
        assert_eq!(
            DirectoryError::Unreachable("timed out".into()).to_string(),
            "directory unreachable: timed out"
        );
    }
}
