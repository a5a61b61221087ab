//! Session state machine over one TCP connection.

use crate::error::ClientError;
use dashmap::DashMap;
use fluxq_protocol::headers;
use fluxq_protocol::{Decoder, Frame};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex, Notify};

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Hook fired on connection lifecycle changes.
pub type SessionHook = Arc<dyn Fn(&Session) + Send + Sync>;

/// Hook fired for every frame the dispatch loop receives.
pub type MessageHook = Arc<dyn Fn(&Session, Frame) + Send + Sync>;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker address (`host:port`).
    pub address: String,
    /// Bound on dials and socket reads.
    pub timeout: Duration,
    /// Liveness probe period.
    pub heartbeat_interval: Duration,
    /// Socket read chunk size.
    pub read_buffer_size: usize,
    /// Whether the connection should be TLS-terminated. Certificate
    /// loading is the deployment layer's concern; the session only
    /// carries the settings.
    pub tls_enabled: bool,
    /// Certificate path handed to the TLS layer when enabled.
    pub cert_file: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_millis(3000),
            heartbeat_interval: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tls_enabled: false,
            cert_file: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(path.into());
        self.tls_enabled = true;
        self
    }
}

/// A logical connection to the broker.
///
/// One session owns at most one TCP connection at a time, recreated
/// across reconnect cycles. Any number of tasks may call
/// [`send`](Session::send)/[`invoke`](Session::invoke) concurrently;
/// responses are matched to callers by correlation id, and frames that
/// belong to another caller are parked until that caller asks for them.
///
/// Must be created inside a Tokio runtime (the heartbeat task is spawned
/// at construction).
pub struct Session {
    config: SessionConfig,
    /// Write half of the current connection.
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Read half of the current connection.
    reader: Mutex<Option<OwnedReadHalf>>,
    /// Accumulates partial reads until a frame completes.
    decoder: Mutex<Decoder>,
    /// Serializes dials so concurrent callers cannot race two connects.
    dial: Mutex<()>,
    connected: AtomicBool,
    auto_reconnect: AtomicBool,
    closed: Arc<AtomicBool>,
    /// Responses parked for callers waiting on other correlation ids.
    pending: DashMap<String, Frame>,
    /// Wakes the heartbeat task early on close; the closed flag is the
    /// durable signal it re-checks every iteration.
    stop: Arc<Notify>,
    connected_hook: RwLock<Option<SessionHook>>,
    disconnected_hook: RwLock<Option<SessionHook>>,
    message_hook: RwLock<Option<MessageHook>>,
}

impl Session {
    /// Creates the session and starts its heartbeat task. No connection
    /// is dialed yet.
    pub fn new(config: SessionConfig) -> Arc<Self> {
        let closed = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(Notify::new());
        let interval = config.heartbeat_interval;

        let session = Arc::new(Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            decoder: Mutex::new(Decoder::new()),
            dial: Mutex::new(()),
            connected: AtomicBool::new(false),
            auto_reconnect: AtomicBool::new(false),
            closed: closed.clone(),
            pending: DashMap::new(),
            stop: stop.clone(),
            connected_hook: RwLock::new(None),
            disconnected_hook: RwLock::new(None),
            message_hook: RwLock::new(None),
        });

        Self::spawn_heartbeat(Arc::downgrade(&session), closed, stop, interval);
        session
    }

    /// Replaces the hook fired after a successful dial.
    pub fn on_connected(&self, hook: impl Fn(&Session) + Send + Sync + 'static) {
        *self.connected_hook.write() = Some(Arc::new(hook));
    }

    /// Replaces the hook fired when the dispatch loop loses the
    /// connection.
    pub fn on_disconnected(&self, hook: impl Fn(&Session) + Send + Sync + 'static) {
        *self.disconnected_hook.write() = Some(Arc::new(hook));
    }

    /// Replaces the hook the dispatch loop hands every frame to.
    pub fn on_message(&self, hook: impl Fn(&Session, Frame) + Send + Sync + 'static) {
        *self.message_hook.write() = Some(Arc::new(hook));
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of parked responses awaiting their caller.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Dials the broker if no connection is live.
    ///
    /// Safe to call concurrently: the dial lock plus a double check means
    /// a single dial wins and the rest observe the established
    /// connection. A dial failure propagates without retry.
    pub async fn connect(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        if self.is_connected() {
            return Ok(());
        }

        let _guard = self.dial.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        tracing::debug!(address = %self.config.address, "dialing");
        let stream = tokio::time::timeout(
            self.config.timeout,
            TcpStream::connect(&self.config.address),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;
        stream.set_nodelay(true).ok();

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        self.decoder.lock().await.clear();
        self.connected.store(true, Ordering::SeqCst);

        match self.connected_hook.read().clone() {
            Some(hook) => hook(self),
            None => tracing::info!(address = %self.config.address, "connected"),
        }
        Ok(())
    }

    /// Encodes and writes one frame, dialing first when needed.
    ///
    /// A frame without a correlation id is stamped with a fresh uuid
    /// before encoding. The write runs to completion or fails.
    pub async fn send(&self, frame: &mut Frame) -> Result<(), ClientError> {
        self.connect().await?;

        if frame.id().is_none() {
            frame.set_id(&uuid::Uuid::new_v4().to_string());
        }
        let data = frame.encode();

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer.write_all(&data).await?;
        Ok(())
    }

    /// Receives one frame.
    ///
    /// With a filter, a parked response matching `expected_id` is claimed
    /// without touching the socket. Otherwise the socket is read under
    /// the session timeout and decoded until a frame completes; a frame
    /// that matches the filter, carries no id, or was requested without a
    /// filter is returned, and anything else is parked under its
    /// correlation id for whichever caller eventually asks.
    pub async fn recv(&self, expected_id: Option<&str>) -> Result<Frame, ClientError> {
        self.connect().await?;

        let mut chunk = vec![0u8; self.config.read_buffer_size];
        loop {
            if let Some(id) = expected_id {
                if let Some((_, frame)) = self.pending.remove(id) {
                    return Ok(frame);
                }
            }

            let n = {
                let mut guard = self.reader.lock().await;
                let reader = guard.as_mut().ok_or(ClientError::NotConnected)?;
                match tokio::time::timeout(self.config.timeout, reader.read(&mut chunk)).await {
                    Err(_) => return Err(ClientError::Timeout),
                    Ok(read) => read?,
                }
            };
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }

            let mut decoder = self.decoder.lock().await;
            decoder.extend(&chunk[..n]);
            while let Some(frame) = decoder.decode_frame()? {
                let frame_id = frame.id().map(str::to_string);
                let claimed = match (expected_id, frame_id.as_deref()) {
                    (None, _) | (_, None) => true,
                    (Some(want), Some(got)) => want == got,
                };
                if claimed {
                    return Ok(frame);
                }
                if let Some(frame_id) = frame_id {
                    self.pending.insert(frame_id, frame);
                }
            }
        }
    }

    /// Sends a request and waits for the response carrying its id.
    pub async fn invoke(&self, request: &mut Frame) -> Result<Frame, ClientError> {
        self.send(request).await?;
        let id = request.id().map(str::to_string);
        self.recv(id.as_deref()).await
    }

    /// Spawns the receive/dispatch loop and enables auto-reconnect.
    ///
    /// Every received frame goes to the message hook. A read timeout
    /// keeps the loop alive. Any other error tears the connection down
    /// and fires the disconnected hook; while auto-reconnect stays
    /// enabled and the error is recoverable, the loop sleeps one timeout
    /// and tries again, otherwise it exits and completes the returned
    /// channel.
    pub fn start(self: Arc<Self>) -> oneshot::Receiver<()> {
        self.auto_reconnect.store(true, Ordering::SeqCst);
        let session = self;
        let (notify, done) = oneshot::channel();

        tokio::spawn(async move {
            loop {
                match session.recv(None).await {
                    Ok(frame) => match session.message_hook.read().clone() {
                        Some(hook) => hook(&session, frame),
                        None => tracing::debug!("no message hook, dropping frame"),
                    },
                    Err(ClientError::Timeout) => continue,
                    Err(err) => {
                        session.teardown().await;
                        match session.disconnected_hook.read().clone() {
                            Some(hook) => hook(&session),
                            None => {
                                tracing::info!(address = %session.config.address, "disconnected")
                            }
                        }
                        let reconnect = session.auto_reconnect.load(Ordering::SeqCst)
                            && err.is_recoverable();
                        if !reconnect {
                            break;
                        }
                        tokio::time::sleep(session.config.timeout).await;
                    }
                }
            }
            let _ = notify.send(());
        });
        done
    }

    /// Spawns a loop retrying [`connect`](Session::connect) until it
    /// succeeds, sleeping one timeout between attempts. The returned
    /// channel completes on success; it is dropped if the session closes
    /// first.
    pub fn ensure_connected(self: Arc<Self>) -> oneshot::Receiver<()> {
        let session = self;
        let (notify, done) = oneshot::channel();

        tokio::spawn(async move {
            loop {
                match session.connect().await {
                    Ok(()) => break,
                    Err(ClientError::Closed) => return,
                    Err(err) => {
                        tracing::warn!(
                            address = %session.config.address,
                            error = %err,
                            "connect failed, retrying"
                        );
                        tokio::time::sleep(session.config.timeout).await;
                    }
                }
            }
            let _ = notify.send(());
        });
        done
    }

    /// Shuts the session down: disables auto-reconnect, stops the
    /// heartbeat task, tears down the connection, and drops parked
    /// responses. Terminal; a closed session refuses new dials.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.auto_reconnect.store(false, Ordering::SeqCst);
        self.stop.notify_waiters();
        self.teardown().await;
        self.pending.clear();
    }

    /// Drops both connection halves. The next dial recreates them.
    async fn teardown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.reader.lock().await.take();
    }

    fn spawn_heartbeat(
        session: Weak<Session>,
        closed: Arc<AtomicBool>,
        stop: Arc<Notify>,
        interval: Duration,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stop.notified() => {}
                }
                if closed.load(Ordering::SeqCst) {
                    return;
                }
                let session = match session.upgrade() {
                    Some(session) => session,
                    None => return,
                };
                if !session.is_connected() {
                    continue;
                }

                let mut probe = Frame::new();
                probe.set_cmd(headers::cmd::HEARTBEAT);
                if let Err(err) = session.send(&mut probe).await {
                    tracing::warn!(error = %err, "heartbeat send failed");
                }
            }
        });
    }
}
