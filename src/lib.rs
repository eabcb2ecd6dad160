//! # relay-hub
//!
//! Core of a peer-to-peer media relay servent: a node that receives a
//! stream from one upstream source, re-broadcasts it to many downstream
//! consumers, and publishes its availability through directory services.
//!
//! The centerpiece is the [`ChannelHub`](channel::ChannelHub): it owns
//! exactly one [`SourceStream`](stream::SourceStream), fans every inbound
//! [`Content`](channel::Content) unit out to a dynamically changing
//! [`OutputStreamCollection`](stream::OutputStreamCollection), classifies
//! members by capability flags, and applies bounded-backoff reconnect
//! policy when the source fails.
//!
//! Concrete transports live behind the factory seams in
//! [`stream::factory`]; this crate specifies only the enqueue-never-block
//! send/receive contract each stream must satisfy.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_hub::channel::{ChannelHub, ChannelInfo, HubConfig};
//! use uuid::Uuid;
//!
//! # fn factory() -> Arc<dyn relay_hub::stream::SourceStreamFactory> { unimplemented!() }
//! # async fn run() -> relay_hub::Result<()> {
//! let hub = Arc::new(ChannelHub::new(
//!     ChannelInfo::new(Uuid::new_v4()),
//!     HubConfig::default(),
//! ));
//! let tracker = url::Url::parse("pcp://203.0.113.7:7144")?;
//! hub.start(factory().as_ref(), tracker)?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod directory;
pub mod error;
pub mod notify;
pub mod stream;

pub use channel::{
    Atom, ChannelEvent, ChannelHub, ChannelInfo, ChannelProperty, Content, HubConfig, Id4,
};
pub use directory::{ChannelListing, DirectoryError, YellowPage, YellowPageFactory};
pub use error::{Error, Result};
pub use notify::{Notifier, Observer, Subscription};
pub use stream::{
    FactoryRegistry, OutputStream, OutputStreamCollection, OutputStreamFactory, OutputStreamType,
    PostError, SourceStream, SourceStreamFactory, SourceStreamStatus,
};
