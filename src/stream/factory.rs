//! Stream factories and the factory registry
//!
//! Concrete stream implementations are selected by declared name, chosen
//! by configuration outside this core. The registry is an explicit struct
//! handed to the connection-acceptance layer, not global mutable state:
//! the acceptance layer reads the first bytes off an inbound connection
//! and asks the registry which output stream factory recognizes them.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use url::Url;
use uuid::Uuid;

use crate::channel::ChannelHub;

use super::output::OutputStream;
use super::source::SourceStream;

/// Abstract duplex byte stream handed to output stream factories
///
/// Blanket-implemented, so factories accept real sockets and in-memory
/// pipes (`tokio::io::duplex`) alike.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// Creates the source stream for a channel
pub trait SourceStreamFactory: Send + Sync {
    /// Declared factory name used for configuration-time selection
    fn name(&self) -> &str;

    /// Create a source stream feeding `channel` from `tracker`
    fn create(&self, channel: Arc<ChannelHub>, tracker: &Url) -> Arc<dyn SourceStream>;
}

/// Creates output streams for inbound connections
pub trait OutputStreamFactory: Send + Sync {
    /// Declared factory name used for configuration-time selection
    fn name(&self) -> &str;

    /// Extract the requested channel id from a connection's header bytes
    ///
    /// Returns `None` when the header does not match this factory's
    /// expected preamble.
    fn parse_channel_id(&self, header: &[u8]) -> Option<Uuid>;

    /// Create an output stream serving the connection
    ///
    /// `header` carries the bytes already consumed while classifying the
    /// connection, so the factory can replay them.
    fn create(
        &self,
        connection: Box<dyn Connection>,
        remote_endpoint: Option<SocketAddr>,
        channel_id: Uuid,
        header: &[u8],
    ) -> Arc<dyn OutputStream>;
}

/// Explicit registry of stream factories, keyed by declared name
#[derive(Default)]
pub struct FactoryRegistry {
    source_factories: Vec<Arc<dyn SourceStreamFactory>>,
    output_factories: Vec<Arc<dyn OutputStreamFactory>>,
}

impl FactoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source stream factory
    pub fn register_source(&mut self, factory: Arc<dyn SourceStreamFactory>) {
        if self.source_factory(factory.name()).is_some() {
            tracing::warn!(name = factory.name(), "Duplicate source factory name, earlier one wins");
        }
        self.source_factories.push(factory);
    }

    /// Register an output stream factory
    ///
    /// Header classification tries factories in registration order.
    pub fn register_output(&mut self, factory: Arc<dyn OutputStreamFactory>) {
        if self.output_factory(factory.name()).is_some() {
            tracing::warn!(name = factory.name(), "Duplicate output factory name, earlier one wins");
        }
        self.output_factories.push(factory);
    }

    /// Look up a source factory by declared name
    pub fn source_factory(&self, name: &str) -> Option<Arc<dyn SourceStreamFactory>> {
        self.source_factories
            .iter()
            .find(|f| f.name() == name)
            .map(Arc::clone)
    }

    /// Look up an output factory by declared name
    pub fn output_factory(&self, name: &str) -> Option<Arc<dyn OutputStreamFactory>> {
        self.output_factories
            .iter()
            .find(|f| f.name() == name)
            .map(Arc::clone)
    }

    /// Classify an inbound connection header
    ///
    /// Returns the first registered output factory whose
    /// [`parse_channel_id`](OutputStreamFactory::parse_channel_id)
    /// recognizes the header, with the channel id it extracted.
    pub fn parse_output_header(
        &self,
        header: &[u8],
    ) -> Option<(Arc<dyn OutputStreamFactory>, Uuid)> {
        for factory in &self.output_factories {
            if let Some(channel_id) = factory.parse_channel_id(header) {
                tracing::debug!(
                    factory = factory.name(),
                    channel = %channel_id,
                    "Inbound header classified"
                );
                return Some((Arc::clone(factory), channel_id));
            }
        }
        None
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("source_factories", &self.source_factories.len())
            .field("output_factories", &self.output_factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::channel::Content;
    use crate::stream::{OutputStreamType, PostError};

    use super::*;

    struct NullOutput;

    impl OutputStream for NullOutput {
        fn output_stream_type(&self) -> OutputStreamType {
            OutputStreamType::RELAY
        }

        fn start(&self) {}

        fn post(
            &self,
            _from: Option<SocketAddr>,
            _content: &Content,
        ) -> std::result::Result<(), PostError> {
            Ok(())
        }

        fn close(&self) {}
    }

    struct PrefixFactory {
        name: &'static str,
        prefix: &'static [u8],
    }

    impl OutputStreamFactory for PrefixFactory {
        fn name(&self) -> &str {
            self.name
        }

        fn parse_channel_id(&self, header: &[u8]) -> Option<Uuid> {
            let rest = header.strip_prefix(self.prefix)?;
            let hex = std::str::from_utf8(rest.get(..32)?).ok()?;
            Uuid::parse_str(hex).ok()
        }

        fn create(
            &self,
            _connection: Box<dyn Connection>,
            _remote_endpoint: Option<SocketAddr>,
            _channel_id: Uuid,
            _header: &[u8],
        ) -> Arc<dyn OutputStream> {
            Arc::new(NullOutput)
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let mut registry = FactoryRegistry::new();
        registry.register_output(Arc::new(PrefixFactory {
            name: "mock",
            prefix: b"mock ",
        }));

        assert!(registry.output_factory("mock").is_some());
        assert!(registry.output_factory("other").is_none());
        assert!(registry.source_factory("mock").is_none());
    }

    #[test]
    fn test_header_classification_first_match_wins() {
        let mut registry = FactoryRegistry::new();
        registry.register_output(Arc::new(PrefixFactory {
            name: "pcp",
            prefix: b"pcp ",
        }));
        registry.register_output(Arc::new(PrefixFactory {
            name: "http",
            prefix: b"GET ",
        }));

        let id = Uuid::new_v4();
        let header = format!("GET {}", id.simple());
        let (factory, parsed) = registry.parse_output_header(header.as_bytes()).unwrap();

        assert_eq!(factory.name(), "http");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_unrecognized_header() {
        let mut registry = FactoryRegistry::new();
        registry.register_output(Arc::new(PrefixFactory {
            name: "pcp",
            prefix: b"pcp ",
        }));

        assert!(registry.parse_output_header(b"garbage").is_none());
        assert!(registry.parse_output_header(b"pcp not-a-guid").is_none());
    }

    #[tokio::test]
    async fn test_create_with_in_memory_connection() {
        let factory = PrefixFactory {
            name: "mock",
            prefix: b"mock ",
        };
        let (client, _server) = tokio::io::duplex(64);

        let stream = factory.create(Box::new(client), None, Uuid::new_v4(), b"mock ");
        assert_eq!(stream.output_stream_type(), OutputStreamType::RELAY);
    }
}
