//! Channel hub
//!
//! The hub owns everything that makes up one live channel: the single
//! source stream the content arrives on, the collection of output streams
//! it fans out to, and the channel's metadata. Content delivery is
//! best-effort and independent per member: a stream that fails to accept a
//! unit is removed and closed without disturbing delivery to the rest.
//!
//! The hub is also where retry policy lives. The source stream reports
//! failures through its status-changed notification and never retries on
//! its own; the hub's supervisor task observes `Error`, waits out an
//! exponential backoff, optionally refreshes the tracker address from the
//! directory service, and calls `reconnect`. Exhausting the retry budget
//! raises [`ChannelEvent::SourceLost`] to the hub's observers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::directory::YellowPage;
use crate::error::{Error, Result};
use crate::notify::{Notifier, Subscription};
use crate::stream::{
    OutputStream, OutputStreamCollection, SourceStream, SourceStreamFactory, SourceStreamStatus,
};
use url::Url;

use super::config::HubConfig;
use super::content::Content;
use super::info::{Atom, ChannelInfo};

/// Hub-level notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The reconnect budget is exhausted; the channel has no live source
    SourceLost,
}

struct SourceSlot {
    stream: Arc<dyn SourceStream>,
    status_subscription: Subscription,
}

/// One channel: a source stream fanned out to many output streams
pub struct ChannelHub {
    info: Arc<ChannelInfo>,
    outputs: OutputStreamCollection,
    config: HubConfig,
    source: Mutex<Option<SourceSlot>>,
    directory: Mutex<Option<Arc<dyn YellowPage>>>,
    events: Notifier<ChannelEvent>,
    started: AtomicBool,
    closed: AtomicBool,
}

impl ChannelHub {
    /// Create a hub for the given channel metadata
    pub fn new(info: ChannelInfo, config: HubConfig) -> Self {
        Self {
            info: Arc::new(info),
            outputs: OutputStreamCollection::new(),
            config,
            source: Mutex::new(None),
            directory: Mutex::new(None),
            events: Notifier::new(),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Channel metadata
    pub fn info(&self) -> &Arc<ChannelInfo> {
        &self.info
    }

    /// Output stream membership and classified counts
    pub fn outputs(&self) -> &OutputStreamCollection {
        &self.outputs
    }

    /// Attach a directory service used to refresh the tracker on reconnect
    pub fn set_directory(&self, directory: Arc<dyn YellowPage>) {
        *self.lock_directory() = Some(directory);
    }

    /// Current source stream status, if a source exists
    pub fn source_status(&self) -> Option<SourceStreamStatus> {
        self.lock_source().as_ref().map(|slot| slot.stream.status())
    }

    /// Whether the hub has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Create and start the source stream
    ///
    /// Obtains the source from `factory` exactly once, registers the hub as
    /// its status observer, spawns the reconnect supervisor and starts the
    /// connection attempt. A second call is a no-op. Must be called from
    /// within a tokio runtime.
    pub fn start(
        self: &Arc<Self>,
        factory: &dyn SourceStreamFactory,
        tracker: Url,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        // Claim startup before touching the factory so concurrent starts
        // cannot both create a source.
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!(channel = %self.info.channel_id(), "Hub already started");
            return Ok(());
        }

        self.info.set_tracker(Some(tracker.clone()));
        let stream = factory.create(Arc::clone(self), &tracker);

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let status_subscription = stream.on_status_changed(Arc::new(move |status| {
            let _ = status_tx.send(*status);
        }));
        self.spawn_supervisor(status_rx);

        tracing::info!(
            channel = %self.info.channel_id(),
            source = factory.name(),
            tracker = %tracker,
            "Channel source starting"
        );

        *self.lock_source() = Some(SourceSlot {
            stream: Arc::clone(&stream),
            status_subscription,
        });

        // A close racing this start may have drained the slot before it was
        // installed; release the source instead of starting it.
        if self.is_closed() {
            if let Some(slot) = self.lock_source().take() {
                slot.stream.remove_status_observer(slot.status_subscription);
                slot.stream.close();
            }
            return Err(Error::ChannelClosed);
        }

        // Outside the lock: start may transition status synchronously
        stream.start();
        Ok(())
    }

    /// Fan one content unit out to every current member
    ///
    /// Delivery goes to a stable snapshot of the membership taken at the
    /// unit's arrival: streams added during the pass see only later units,
    /// and a removal racing the pass may still receive this one. A member
    /// whose `post` fails is removed and closed; the rest of the pass is
    /// unaffected.
    pub fn broadcast(&self, content: Content) {
        if self.is_closed() {
            return;
        }
        let members = self.outputs.snapshot();
        for member in members {
            if let Err(e) = member.post(None, &content) {
                tracing::warn!(
                    channel = %self.info.channel_id(),
                    position = content.position(),
                    error = %e,
                    "Output stream rejected content, dropping it"
                );
                self.outputs.remove(&member);
                member.close();
            }
        }
    }

    /// Add an output stream and start it
    pub fn add_output_stream(&self, stream: Arc<dyn OutputStream>) {
        tracing::info!(
            channel = %self.info.channel_id(),
            stream_type = %stream.output_stream_type(),
            "Output stream attached"
        );
        self.outputs.add(Arc::clone(&stream));
        stream.start();
    }

    /// Remove an output stream and close it; no-op if absent
    pub fn remove_output_stream(&self, stream: &Arc<dyn OutputStream>) {
        if self.outputs.remove(stream) {
            stream.close();
        }
    }

    /// Forward a control packet to the upstream peer
    ///
    /// Dropped with a trace when the hub has no source (packets to nowhere
    /// are a contract violation, not an error).
    pub fn post_to_source(&self, from: Option<SocketAddr>, packet: Atom) {
        match self.source() {
            Some(stream) => stream.post(from, packet),
            None => tracing::debug!(
                channel = %self.info.channel_id(),
                "Control packet posted with no source, dropped"
            ),
        }
    }

    /// Register a hub-event observer
    pub fn subscribe_events(
        &self,
        observer: impl Fn(&ChannelEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.subscribe(observer)
    }

    /// Remove a hub-event observer
    pub fn unsubscribe_events(&self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    /// Close the channel: the source and every output stream
    ///
    /// Idempotent. The channel object stays usable for reads.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(slot) = self.lock_source().take() {
            slot.stream.remove_status_observer(slot.status_subscription);
            slot.stream.close();
        }
        self.outputs.close_all();
        tracing::info!(channel = %self.info.channel_id(), "Channel closed");
    }

    fn source(&self) -> Option<Arc<dyn SourceStream>> {
        self.lock_source().as_ref().map(|slot| Arc::clone(&slot.stream))
    }

    fn spawn_supervisor(self: &Arc<Self>, mut status_rx: mpsc::UnboundedReceiver<SourceStreamStatus>) {
        let hub = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut attempts: u32 = 0;
            while let Some(status) = status_rx.recv().await {
                let Some(hub) = hub.upgrade() else { break };
                if hub.is_closed() {
                    break;
                }
                match status {
                    SourceStreamStatus::Receiving => {
                        if attempts > 0 {
                            tracing::info!(
                                channel = %hub.info.channel_id(),
                                attempts,
                                "Source recovered"
                            );
                        }
                        attempts = 0;
                    }
                    SourceStreamStatus::Error => {
                        if attempts >= hub.config.max_retries {
                            hub.on_source_lost(attempts);
                            break;
                        }
                        attempts += 1;
                        let backoff = hub.config.backoff_for(attempts);
                        tracing::info!(
                            channel = %hub.info.channel_id(),
                            attempt = attempts,
                            max = hub.config.max_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            "Source failed, scheduling reconnect"
                        );
                        tokio::time::sleep(backoff).await;
                        if hub.is_closed() {
                            break;
                        }
                        hub.refresh_tracker().await;
                        if let Some(stream) = hub.source() {
                            stream.reconnect();
                        }
                    }
                    SourceStreamStatus::Idle | SourceStreamStatus::Connecting => {}
                }
            }
        });
    }

    /// Ask the directory service for a fresh tracker address
    ///
    /// A lookup failure is the same as a transient connection failure: the
    /// reconnect proceeds against the previous tracker. Source stream
    /// implementations re-read the channel's tracker on `reconnect`.
    async fn refresh_tracker(&self) {
        let directory = self.lock_directory().clone();
        let Some(directory) = directory else { return };
        match directory.find_tracker(self.info.channel_id()).await {
            Ok(tracker) => {
                tracing::info!(
                    channel = %self.info.channel_id(),
                    directory = directory.name(),
                    tracker = %tracker,
                    "Tracker refreshed from directory"
                );
                self.info.set_tracker(Some(tracker));
            }
            Err(e) => {
                tracing::warn!(
                    channel = %self.info.channel_id(),
                    directory = directory.name(),
                    error = %e,
                    "Tracker lookup failed, reusing previous tracker"
                );
            }
        }
    }

    fn on_source_lost(&self, attempts: u32) {
        tracing::warn!(
            channel = %self.info.channel_id(),
            attempts,
            "Reconnect budget exhausted, source lost"
        );
        self.events.notify(&ChannelEvent::SourceLost);
        if self.config.close_outputs_on_source_lost {
            self.outputs.close_all();
        }
    }

    fn lock_source(&self) -> MutexGuard<'_, Option<SourceSlot>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_directory(&self) -> MutexGuard<'_, Option<Arc<dyn YellowPage>>> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChannelHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHub")
            .field("channel_id", &self.info.channel_id())
            .field("outputs", &self.outputs.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
