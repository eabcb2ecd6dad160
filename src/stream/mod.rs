//! Stream seams: the source and output stream traits, the per-channel
//! output collection, capability flags, and the factory registry.

pub mod capability;
pub mod collection;
pub mod factory;
pub mod output;
pub mod source;

pub use capability::OutputStreamType;
pub use collection::OutputStreamCollection;
pub use factory::{Connection, FactoryRegistry, OutputStreamFactory, SourceStreamFactory};
pub use output::{OutputStream, PostError};
pub use source::{PostQueue, SourceStream, SourceStreamStatus, StatusCell, StatusObserver};
