//! Session lifecycle and command multiplexing.
//!
//! A [`Session`] owns one TCP connection to one node. `bootstrap()`
//! spawns a driver task that walks the candidate list
//! (*resolving → connecting*), runs the negotiation sub-protocol
//! (*bootstrapping*) and then settles into the steady-state dispatch loop
//! (*ready*) until a fatal I/O error or an explicit `stop()` ends the
//! session (*stopped*).
//!
//! Two deadlines run independently: one covering the whole span from
//! `bootstrap()` to *ready*, and a per-attempt connect deadline armed on
//! each dial. Commands are multiplexed over the connection by opaque;
//! every registered waiter fires exactly once — with its response, an
//! explicit cancel, or *request-canceled* on shutdown.
//!
//! `send`, `cancel` and `stop` may be called from any task. Socket reads,
//! handler dispatch and configuration updates all run on the driver task,
//! so their ordering within one session is total.

mod bootstrap;
mod ready;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::collections::CollectionCache;
use crate::config::ClusterConfig;
use crate::endpoints::EndpointList;
use crate::error::{Error, Result};
use crate::error_map::ErrorMap;
use crate::protocol::{FrameBuffer, ServerFeature};
use crate::registry::{OpaqueRegistry, Reply};
use crate::transport;
use crate::writer::{self, WriterConfig, WriterHandle};

/// Wait before restarting an exhausted candidate list.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Period of the steady-state configuration poll.
const CONFIG_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Socket read buffer size.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Identifier of the owning client, shared by its sessions.
    pub client_id: String,
    /// Authentication user name.
    pub username: String,
    /// Authentication password.
    pub password: String,
    /// Bucket to select during bootstrap, `None` for cluster-level
    /// sessions.
    pub bucket: Option<String>,
    /// Ordered bootstrap candidates.
    pub endpoints: Vec<(String, u16)>,
    /// Deadline covering the whole span from `bootstrap()` to *ready*.
    pub bootstrap_timeout: Duration,
    /// Per-attempt dial deadline.
    pub connect_timeout: Duration,
}

impl SessionOptions {
    /// Options with default timeouts and no endpoints.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            username: String::new(),
            password: String::new(),
            bucket: None,
            endpoints: Vec::new(),
            bootstrap_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Append a bootstrap candidate.
    pub fn endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.endpoints.push((host.into(), port));
        self
    }

    /// Set the authentication credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Select a bucket during bootstrap.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Override the bootstrap deadline.
    pub fn bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }

    /// Override the per-attempt dial deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Resolving = 1,
    Connecting = 2,
    Backoff = 3,
    Bootstrapping = 4,
    Ready = 5,
    Stopped = 6,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Idle,
            1 => SessionState::Resolving,
            2 => SessionState::Connecting,
            3 => SessionState::Backoff,
            4 => SessionState::Bootstrapping,
            5 => SessionState::Ready,
            _ => SessionState::Stopped,
        }
    }
}

/// Where submitted frames go.
///
/// Holding the flip and the buffers behind one lock makes the
/// pending-to-direct transition atomic with respect to producers, so the
/// deferred frames replay strictly before anything submitted after
/// *ready* is entered.
enum SendGate {
    /// Not ready yet: frames park until bootstrap completes.
    Pending(Vec<Bytes>),
    /// Ready: frames go straight to the writer task.
    Direct(WriterHandle),
    /// Stopped: nothing is accepted.
    Stopped,
}

/// State shared between the public handle, the driver task and the
/// message handlers.
pub(crate) struct Shared {
    options: SessionOptions,
    session_id: String,
    state: AtomicU8,
    stopped: AtomicBool,
    bootstrap_started: AtomicBool,
    opaque: AtomicU32,
    pub(crate) cancel_token: CancellationToken,
    registry: OpaqueRegistry,
    gate: tokio::sync::Mutex<SendGate>,
    config: RwLock<Option<ClusterConfig>>,
    features: RwLock<Vec<ServerFeature>>,
    error_map: RwLock<Option<ErrorMap>>,
    supports_gcccp: AtomicBool,
    collections: Mutex<CollectionCache>,
    endpoint_addr: RwLock<Option<SocketAddr>>,
}

impl Shared {
    fn new(options: SessionOptions) -> Self {
        Self {
            options,
            session_id: Uuid::new_v4().to_string(),
            state: AtomicU8::new(SessionState::Idle as u8),
            stopped: AtomicBool::new(false),
            bootstrap_started: AtomicBool::new(false),
            opaque: AtomicU32::new(0),
            cancel_token: CancellationToken::new(),
            registry: OpaqueRegistry::new(),
            gate: tokio::sync::Mutex::new(SendGate::Pending(Vec::new())),
            config: RwLock::new(None),
            features: RwLock::new(Vec::new()),
            error_map: RwLock::new(None),
            supports_gcccp: AtomicBool::new(true),
            collections: Mutex::new(CollectionCache::new()),
            endpoint_addr: RwLock::new(None),
        }
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.options.client_id
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn bucket_name(&self) -> Option<String> {
        self.options.bucket.clone()
    }

    pub(crate) fn credentials(&self) -> (String, String) {
        (self.options.username.clone(), self.options.password.clone())
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
        tracing::debug!(?state, "session state");
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn next_opaque(&self) -> u32 {
        // Wrapping is benign: a collision needs an opaque to stay pending
        // across a full counter wrap.
        self.opaque.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub(crate) fn registry(&self) -> &OpaqueRegistry {
        &self.registry
    }

    /// Idempotent, synchronous shutdown: wake the driver, refuse new
    /// registrations and fail every outstanding waiter.
    pub(crate) fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.set_state(SessionState::Stopped);
        self.cancel_token.cancel();
        self.registry.drain();
    }

    /// Register a waiter under `opaque` and enqueue `frame`.
    ///
    /// Frames go straight to the writer when the session is ready and
    /// park in the pending buffer otherwise. On a stopped session the
    /// returned receiver resolves immediately with *request-canceled*.
    pub(crate) async fn send(&self, opaque: u32, frame: Bytes) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        if self.is_stopped() {
            tracing::warn!(opaque, "submitting to a stopped session");
            let _ = tx.send(Reply::Canceled(Error::RequestCanceled));
            return rx;
        }
        if let Err(tx) = self.registry.register(opaque, tx) {
            let _ = tx.send(Reply::Canceled(Error::RequestCanceled));
            return rx;
        }

        let mut gate = self.gate.lock().await;
        match &mut *gate {
            SendGate::Pending(frames) => frames.push(frame),
            SendGate::Direct(writer) => {
                let writer = writer.clone();
                drop(gate);
                if let Err(err) = writer.send(frame).await {
                    self.registry.cancel(opaque, err);
                }
            }
            SendGate::Stopped => {
                self.registry.cancel(opaque, Error::RequestCanceled);
            }
        }
        rx
    }

    pub(crate) fn config(&self) -> Option<ClusterConfig> {
        self.config.read().expect("config lock poisoned").clone()
    }

    /// Install a configuration view iff its revision strictly exceeds the
    /// stored one. Replacing an existing view resets the collection cache:
    /// the manifest may have changed with the topology.
    pub(crate) fn update_configuration(&self, mut config: ClusterConfig) {
        if self.is_stopped() {
            return;
        }
        let mut guard = self.config.write().expect("config lock poisoned");
        let had_config = match &*guard {
            Some(current) if config.rev <= current.rev => return,
            current => current.is_some(),
        };
        if let Some(addr) = self.endpoint_addr() {
            for node in &mut config.nodes {
                if node.this_node && node.hostname.is_empty() {
                    node.hostname = addr.ip().to_string();
                }
            }
        }
        tracing::debug!(rev = config.rev, nodes = config.nodes.len(), "received new configuration");
        *guard = Some(config);
        drop(guard);
        if had_config {
            self.collections
                .lock()
                .expect("collection lock poisoned")
                .reset();
        }
    }

    pub(crate) fn set_features(&self, features: Vec<ServerFeature>) {
        *self.features.write().expect("feature lock poisoned") = features;
    }

    pub(crate) fn supports(&self, feature: ServerFeature) -> bool {
        self.features
            .read()
            .expect("feature lock poisoned")
            .contains(&feature)
    }

    pub(crate) fn supported_features(&self) -> Vec<ServerFeature> {
        self.features.read().expect("feature lock poisoned").clone()
    }

    pub(crate) fn set_error_map(&self, map: ErrorMap) {
        *self.error_map.write().expect("error map lock poisoned") = Some(map);
    }

    pub(crate) fn error_map(&self) -> Option<ErrorMap> {
        self.error_map
            .read()
            .expect("error map lock poisoned")
            .clone()
    }

    pub(crate) fn set_gcccp(&self, supported: bool) {
        self.supports_gcccp.store(supported, Ordering::Release);
    }

    pub(crate) fn supports_gcccp(&self) -> bool {
        self.supports_gcccp.load(Ordering::Acquire)
    }

    pub(crate) fn set_endpoint_addr(&self, addr: SocketAddr) {
        *self.endpoint_addr.write().expect("endpoint lock poisoned") = Some(addr);
    }

    pub(crate) fn endpoint_addr(&self) -> Option<SocketAddr> {
        *self.endpoint_addr.read().expect("endpoint lock poisoned")
    }
}

/// A client session to one node.
///
/// Cheaply cloneable handle; all clones observe the same session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Create a session over the given options. No I/O happens until
    /// [`bootstrap`](Session::bootstrap).
    pub fn new(options: SessionOptions) -> Self {
        Self {
            shared: Arc::new(Shared::new(options)),
        }
    }

    /// Establish the connection and run the negotiation sub-protocol.
    ///
    /// Resolves with the initial configuration view when the session
    /// first becomes ready, or with the terminal bootstrap error. May be
    /// called once per session; a second call fails with
    /// [`Error::InvalidArgument`].
    pub async fn bootstrap(&self) -> Result<ClusterConfig> {
        if self.shared.bootstrap_started.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidArgument);
        }
        if self.shared.is_stopped() {
            return Err(Error::RequestCanceled);
        }

        let (boot_tx, boot_rx) = oneshot::channel();
        let shared = self.shared.clone();
        let span = tracing::debug_span!(
            "session",
            client_id = %shared.client_id(),
            session_id = %shared.session_id(),
            bucket = %shared.options.bucket.as_deref().unwrap_or("-"),
        );
        tokio::spawn(drive(shared, boot_tx).instrument(span));

        boot_rx.await.unwrap_or(Err(Error::RequestCanceled))
    }

    /// Register `continuation` under the frame's opaque and enqueue it.
    ///
    /// The opaque must have been obtained from
    /// [`next_opaque`](Session::next_opaque) and already be encoded into
    /// `frame`. The returned receiver resolves exactly once.
    pub async fn send(&self, opaque: u32, frame: Bytes) -> oneshot::Receiver<Reply> {
        self.shared.send(opaque, frame).await
    }

    /// Cancel the waiter registered under `opaque` with `err`. No-op when
    /// the opaque is unknown.
    pub fn cancel(&self, opaque: u32, err: Error) {
        if self.shared.is_stopped() {
            return;
        }
        self.shared.registry.cancel(opaque, err);
    }

    /// Stop the session: close the connection, cancel the timers and fail
    /// every outstanding waiter with *request-canceled*. Idempotent.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Next request identifier. Wrapping; collisions require an opaque to
    /// stay pending across a full counter wrap.
    pub fn next_opaque(&self) -> u32 {
        self.shared.next_opaque()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Session uuid, stable across reconnect attempts.
    pub fn id(&self) -> &str {
        self.shared.session_id()
    }

    /// Identifier of the owning client.
    pub fn client_id(&self) -> &str {
        self.shared.client_id()
    }

    /// Bucket bound to this session, if any.
    pub fn bucket_name(&self) -> Option<String> {
        self.shared.bucket_name()
    }

    /// Current configuration view.
    pub fn config(&self) -> Option<ClusterConfig> {
        self.shared.config()
    }

    /// Whether a configuration view has been installed.
    pub fn has_config(&self) -> bool {
        self.shared
            .config
            .read()
            .expect("config lock poisoned")
            .is_some()
    }

    /// Index of the node this session is connected to within the current
    /// configuration view.
    pub fn node_index(&self) -> Option<usize> {
        self.shared.config().and_then(|c| c.this_node_index())
    }

    /// Whether `feature` was acknowledged during HELLO negotiation.
    pub fn supports(&self, feature: ServerFeature) -> bool {
        self.shared.supports(feature)
    }

    /// Features acknowledged during HELLO negotiation.
    pub fn supported_features(&self) -> Vec<ServerFeature> {
        self.shared.supported_features()
    }

    /// Whether the peer serves cluster-level configuration without a
    /// selected bucket.
    pub fn supports_gcccp(&self) -> bool {
        self.shared.supports_gcccp()
    }

    /// Error map fetched during bootstrap, when `xerror` was negotiated.
    pub fn error_map(&self) -> Option<ErrorMap> {
        self.shared.error_map()
    }

    /// Cached collection id for a `scope.collection` path.
    pub fn collection_id(&self, path: &str) -> Option<u32> {
        self.shared
            .collections
            .lock()
            .expect("collection lock poisoned")
            .get(path)
    }

    /// Record a collection id learned from a lookup response.
    pub fn update_collection_id(&self, path: &str, id: u32) {
        if self.shared.is_stopped() {
            return;
        }
        self.shared
            .collections
            .lock()
            .expect("collection lock poisoned")
            .update(path, id);
    }
}

/// Everything the driver needs to enter the steady state.
struct Established {
    read_half: OwnedReadHalf,
    parser: FrameBuffer,
    writer: WriterHandle,
    #[allow(dead_code)]
    writer_task: JoinHandle<Result<()>>,
}

/// Driver task: establish, bootstrap, run steady state, tear down.
async fn drive(shared: Arc<Shared>, boot_tx: oneshot::Sender<Result<ClusterConfig>>) {
    let deadline = shared.options.bootstrap_timeout;
    let outcome = tokio::select! {
        _ = shared.cancel_token.cancelled() => Err(Error::RequestCanceled),
        established = tokio::time::timeout(deadline, establish(&shared)) => match established {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("unable to bootstrap in time");
                Err(Error::UnambiguousTimeout)
            }
        },
    };

    let established = match outcome {
        Ok(established) => established,
        Err(err) => {
            tracing::warn!(error = %err, "bootstrap failed");
            let _ = boot_tx.send(Err(err));
            shared.stop();
            return;
        }
    };

    shared.set_state(SessionState::Ready);
    let Some(config) = shared.config() else {
        let _ = boot_tx.send(Err(Error::ProtocolError(
            "bootstrap completed without a configuration".into(),
        )));
        shared.stop();
        return;
    };

    // Flip the send gate to direct mode, replaying writes deferred during
    // bootstrap in submission order.
    {
        let mut gate = shared.gate.lock().await;
        let previous = std::mem::replace(&mut *gate, SendGate::Direct(established.writer.clone()));
        if let SendGate::Pending(frames) = previous {
            for frame in frames {
                if let Err(err) = established.writer.send(frame).await {
                    tracing::warn!(error = %err, "failed to replay deferred write");
                }
            }
        }
    }

    tracing::debug!(rev = config.rev, "session ready");
    let _ = boot_tx.send(Ok(config));

    ready::run(&shared, established.read_half, established.parser).await;

    {
        let mut gate = shared.gate.lock().await;
        *gate = SendGate::Stopped;
    }
    shared.stop();
}

/// Walk the candidate list until a connection bootstraps.
///
/// Resolve and dial failures advance the cursor; an exhausted list backs
/// off and restarts it. Once a connection is established, any negotiation
/// failure is terminal.
async fn establish(shared: &Arc<Shared>) -> Result<Established> {
    let mut candidates = EndpointList::new(&shared.options.endpoints);
    loop {
        if shared.is_stopped() {
            return Err(Error::RequestCanceled);
        }
        let Some(endpoint) = candidates.next() else {
            shared.set_state(SessionState::Backoff);
            tracing::debug!(
                backoff_ms = RETRY_BACKOFF.as_millis() as u64,
                "reached the end of the candidate list, waiting before restart"
            );
            tokio::time::sleep(RETRY_BACKOFF).await;
            candidates.restart();
            continue;
        };

        shared.set_state(SessionState::Resolving);
        tracing::debug!(endpoint = %endpoint, "attempting to establish connection");
        let addrs = match transport::resolve(&endpoint.host, endpoint.port).await {
            Ok(addrs) => addrs,
            Err(err) => {
                tracing::warn!(error = %err, "resolve failed, trying next candidate");
                continue;
            }
        };

        shared.set_state(SessionState::Connecting);
        let mut connected = None;
        for addr in addrs {
            match transport::connect(addr, shared.options.connect_timeout).await {
                Ok(stream) => {
                    connected = Some((stream, addr));
                    break;
                }
                Err(err) => tracing::warn!(error = %err, "dial attempt failed"),
            }
        }
        let Some((stream, addr)) = connected else {
            tracing::warn!(endpoint = %endpoint, "no addresses left for candidate, trying next");
            continue;
        };

        shared.set_endpoint_addr(addr);
        tracing::debug!(%addr, "connected, starting bootstrap");
        shared.set_state(SessionState::Bootstrapping);

        let (mut read_half, write_half) = stream.into_split();
        let (writer, writer_task) = writer::spawn_writer_task(write_half, WriterConfig::default());
        let mut parser = FrameBuffer::new();
        bootstrap::run(shared, &mut read_half, &mut parser, &writer).await?;
        return Ok(Established {
            read_half,
            parser,
            writer,
            writer_task,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SessionOptions {
        SessionOptions::new("client-1").credentials("user", "pass")
    }

    #[tokio::test]
    async fn send_after_stop_cancels_synchronously() {
        let session = Session::new(options());
        session.stop();

        let mut rx = session.send(1, Bytes::from_static(b"frame")).await;
        assert!(matches!(
            rx.try_recv(),
            Ok(Reply::Canceled(Error::RequestCanceled))
        ));
    }

    #[tokio::test]
    async fn send_before_ready_parks_until_stop() {
        let session = Session::new(options());
        let mut rx = session.send(1, Bytes::from_static(b"frame")).await;

        // No response yet: the frame is parked, the waiter is pending.
        assert!(rx.try_recv().is_err());

        session.stop();
        assert!(matches!(
            rx.await,
            Ok(Reply::Canceled(Error::RequestCanceled))
        ));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let session = Session::new(options());
        let mut rx = session.send(7, Bytes::from_static(b"frame")).await;

        session.stop();
        session.stop();
        session.stop();

        assert_eq!(session.state(), SessionState::Stopped);
        // Exactly one firing.
        assert!(matches!(rx.try_recv(), Ok(Reply::Canceled(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_unknown_opaque_is_noop() {
        let session = Session::new(options());
        session.cancel(42, Error::RequestCanceled);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.shared.registry().len(), 0);
    }

    #[tokio::test]
    async fn cancel_fires_registered_waiter() {
        let session = Session::new(options());
        let opaque = session.next_opaque();
        let mut rx = session.send(opaque, Bytes::from_static(b"frame")).await;

        session.cancel(opaque, Error::UnambiguousTimeout);
        assert!(matches!(
            rx.try_recv(),
            Ok(Reply::Canceled(Error::UnambiguousTimeout))
        ));
    }

    #[test]
    fn next_opaque_is_monotonic() {
        let session = Session::new(options());
        let first = session.next_opaque();
        let second = session.next_opaque();
        let third = session.next_opaque();
        assert_eq!(second, first + 1);
        assert_eq!(third, second + 1);
    }

    #[tokio::test]
    async fn bootstrap_after_stop_is_canceled() {
        let session = Session::new(options());
        session.stop();
        assert!(matches!(
            session.bootstrap().await,
            Err(Error::RequestCanceled)
        ));
    }

    #[tokio::test]
    async fn bootstrap_deadline_surfaces_unambiguous_timeout() {
        // No endpoints: the driver cycles resolve/backoff until the
        // bootstrap deadline fires.
        let session = Session::new(
            options().bootstrap_timeout(Duration::from_millis(50)),
        );
        assert!(matches!(
            session.bootstrap().await,
            Err(Error::UnambiguousTimeout)
        ));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn second_bootstrap_is_rejected() {
        let session = Session::new(
            options().bootstrap_timeout(Duration::from_millis(50)),
        );
        let first = session.bootstrap().await;
        assert!(first.is_err());
        assert!(matches!(
            session.bootstrap().await,
            Err(Error::InvalidArgument)
        ));
    }

    #[test]
    fn configuration_updates_are_monotonic() {
        let shared = Shared::new(options());
        let mut config = ClusterConfig::parse(br#"{"rev": 10, "nodesExt": [{}]}"#).unwrap();
        shared.update_configuration(config.clone());
        assert_eq!(shared.config().unwrap().rev, 10);

        config.rev = 9;
        shared.update_configuration(config.clone());
        assert_eq!(shared.config().unwrap().rev, 10);

        config.rev = 10;
        shared.update_configuration(config.clone());
        assert_eq!(shared.config().unwrap().rev, 10);

        config.rev = 11;
        shared.update_configuration(config);
        assert_eq!(shared.config().unwrap().rev, 11);
    }

    #[test]
    fn newer_configuration_resets_collection_cache() {
        let session = Session::new(options());
        session.update_collection_id("inventory.airport", 8);
        assert_eq!(session.collection_id("inventory.airport"), Some(8));

        session
            .shared
            .update_configuration(ClusterConfig::parse(br#"{"rev": 1}"#).unwrap());
        // First install: nothing to invalidate.
        assert_eq!(session.collection_id("inventory.airport"), Some(8));

        session
            .shared
            .update_configuration(ClusterConfig::parse(br#"{"rev": 2}"#).unwrap());
        assert_eq!(session.collection_id("inventory.airport"), None);
        assert_eq!(session.collection_id("_default._default"), Some(0));
    }

    #[test]
    fn this_node_hostname_filled_from_endpoint() {
        let shared = Shared::new(options());
        shared.set_endpoint_addr("10.1.2.3:11210".parse().unwrap());
        shared.update_configuration(
            ClusterConfig::parse(br#"{"rev": 3, "nodesExt": [{"thisNode": true}]}"#).unwrap(),
        );
        let config = shared.config().unwrap();
        assert_eq!(config.nodes[0].hostname, "10.1.2.3");
    }
}
