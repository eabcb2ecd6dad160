//! Channel types: content units, metadata and the hub
//!
//! A channel is one logical live stream, identified by a 128-bit id and
//! relayed from one upstream source to many downstream consumers. The hub
//! composes the pieces:
//!
//! ```text
//!                      ChannelHub
//!              ┌──────────────────────────┐
//!   tracker ──►│ SourceStream             │
//!              │    │ Content units       │
//!              │    ▼                     │
//!              │ OutputStreamCollection   │──► relay peer
//!              │ ChannelInfo              │──► local player
//!              └──────────────────────────┘──► metadata consumer
//! ```

pub mod config;
pub mod content;
pub mod hub;
pub mod info;

pub use config::HubConfig;
pub use content::Content;
pub use hub::{ChannelEvent, ChannelHub};
pub use info::{Atom, ChannelInfo, ChannelProperty, Id4};
