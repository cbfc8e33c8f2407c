//! Gateway connection
//!
//! Owns one socket at a time. Each socket gets a writer task fed through a
//! bounded channel, a heartbeat task once HELLO arrives, and a read loop on
//! the calling task. When a socket closes the closure is classified, the
//! session kept or cleared, and a new socket opened after a growing delay.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chat_common::GatewayConfig;
use chat_core::{Presence, ShardInfo};
use futures_util::{Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::heartbeat::{run_heartbeat, HeartbeatMonitor};
use super::limiter::SendLimiter;
use super::session::Session;
use super::shutdown::ShutdownSignal;
use super::start_limit::SessionStartGovernor;
use super::state::{ConnectionState, StateCell};
use super::writer::{run_writer, CloseRequest, Outbound};
use crate::codec::{Codec, InboundDecoder};
use crate::dispatch::Dispatcher;
use crate::error::{CodecError, DispatchError, GatewayError, GatewayResult};
use crate::events::Event;
use crate::protocol::{
    CloseCode, GatewayMessage, IdentifyPayload, IdentifyProperties, OpCode, ResumePayload,
};

const OUTBOUND_BUFFER: usize = 64;
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity and tuning of a connection
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Raw token sent in IDENTIFY and RESUME
    pub token: String,
    /// Reported as browser and device in IDENTIFY
    pub client_name: String,
    pub gateway: GatewayConfig,
    pub shard: ShardInfo,
}

/// Everything a connection needs from its owner
pub struct ConnectionParts {
    pub settings: ConnectionSettings,
    /// Gateway base URL as returned by `GET /gateway/bot`
    pub url: Url,
    pub governor: Arc<SessionStartGovernor>,
    pub limiter: Arc<SendLimiter>,
    pub dispatcher: Dispatcher,
    pub shutdown: ShutdownSignal,
}

/// How a socket ended
#[derive(Debug)]
enum Closure {
    Shutdown,
    Closed(CloseRequest),
}

/// Outcome of one read loop wake-up
enum Wake {
    Shutdown,
    CloseRequested(CloseRequest),
    Frame(Option<Result<Message, tungstenite::Error>>),
}

/// Per-socket resources, dropped on teardown
struct Link {
    outbound: mpsc::Sender<Outbound>,
    close: mpsc::Sender<CloseRequest>,
    close_rx: mpsc::Receiver<CloseRequest>,
    cancel: CancellationToken,
    decoder: InboundDecoder,
    monitor: Option<Arc<HeartbeatMonitor>>,
    heartbeat_task: Option<JoinHandle<()>>,
}

impl Link {
    /// Queue a close frame without waiting on a full channel
    fn request_close(&self, request: CloseRequest) {
        if self.outbound.try_send(Outbound::Close(request)).is_err() {
            tracing::debug!("Outbound queue unavailable, dropping close frame");
        }
    }

    async fn send(&self, item: Outbound) -> GatewayResult<()> {
        self.outbound
            .send(item)
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }
}

/// A single gateway connection with resume and reconnect handling
pub struct GatewayConnection {
    settings: ConnectionSettings,
    url: Url,
    codec: Codec,
    session: Arc<Session>,
    limiter: Arc<SendLimiter>,
    governor: Arc<SessionStartGovernor>,
    dispatcher: Dispatcher,
    shutdown: ShutdownSignal,
    state: StateCell,
    reconnects: AtomicU32,
    presence: RwLock<Presence>,
    outbound: Mutex<Option<mpsc::Sender<Outbound>>>,
    heartbeat: RwLock<Option<Arc<HeartbeatMonitor>>>,
}

impl GatewayConnection {
    pub fn new(parts: ConnectionParts) -> Self {
        let ConnectionParts {
            settings,
            url,
            governor,
            limiter,
            dispatcher,
            shutdown,
        } = parts;

        let presence = Presence::new(settings.gateway.status, None);
        Self {
            codec: Codec::new(settings.gateway.encoding),
            session: Arc::new(Session::new(settings.shard)),
            settings,
            url,
            limiter,
            governor,
            dispatcher,
            shutdown,
            state: StateCell::new(ConnectionState::Connecting),
            reconnects: AtomicU32::new(0),
            presence: RwLock::new(presence),
            outbound: Mutex::new(None),
            heartbeat: RwLock::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Closures since the last READY, RECONNECT or INVALID_SESSION
    pub fn reconnect_count(&self) -> u32 {
        self.reconnects.load(Ordering::Acquire)
    }

    /// Round trip of the most recent acknowledged heartbeat
    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.read().as_ref().and_then(|m| m.latency())
    }

    pub fn presence(&self) -> Presence {
        self.presence.read().clone()
    }

    /// Replace the presence; sent now when the session is active and
    /// otherwise carried by the next IDENTIFY.
    pub async fn update_presence(&self, presence: Presence) -> GatewayResult<()> {
        presence.validate()?;
        *self.presence.write() = presence.clone();

        if self.state() != ConnectionState::Active {
            return Ok(());
        }
        let Some(sender) = self.outbound.lock().clone() else {
            return Ok(());
        };
        let message = GatewayMessage::presence_update(&presence).map_err(CodecError::from)?;
        sender
            .send(Outbound::control(message))
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }

    /// Close the socket with 1000 and stop reconnecting
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Connect and keep the connection alive until shutdown or a fatal error
    pub async fn run(&self) -> GatewayResult<()> {
        let result = self.run_connections().await;
        self.state.set(ConnectionState::Terminated);
        match &result {
            Ok(()) => tracing::info!(shard = ?self.session.shard(), "Gateway connection stopped"),
            Err(e) => tracing::error!(error = %e, "Gateway connection terminated"),
        }
        result
    }

    async fn run_connections(&self) -> GatewayResult<()> {
        loop {
            if self.shutdown.is_shutdown() {
                return Ok(());
            }

            let close = match self.connect_once().await {
                Ok(Closure::Shutdown) => return Ok(()),
                Ok(Closure::Closed(close)) => close,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Gateway connection failed");
                    CloseRequest::new(CloseCode::ABNORMAL, e.to_string())
                }
            };

            self.handle_closure(&close)?;
            if self.shutdown.is_shutdown() {
                return Ok(());
            }

            let attempt = self.reconnects.fetch_add(1, Ordering::AcqRel) + 1;
            let max = self.settings.gateway.max_reconnects;
            if attempt > max {
                return Err(GatewayError::ReconnectsExhausted { max });
            }

            let delay = Duration::from_secs(
                u64::from(attempt) + self.settings.gateway.reconnect_base_delay_secs,
            );
            self.state.set(ConnectionState::Reconnecting);
            tracing::info!(
                attempt,
                max,
                delay_secs = delay.as_secs(),
                resumable = self.session.is_resumable(),
                "Reconnecting to gateway"
            );

            tokio::select! {
                () = self.shutdown.cancelled() => return Ok(()),
                () = sleep(delay) => {}
            }
        }
    }

    /// Decide what a closed socket means for the session
    fn handle_closure(&self, close: &CloseRequest) -> GatewayResult<()> {
        tracing::info!(code = close.code, reason = %close.reason, "Gateway socket closed");

        if CloseCode::is_fatal_code(close.code) {
            return Err(GatewayError::FatalClose {
                code: close.code,
                reason: close.reason.clone(),
            });
        }
        if CloseCode::clears_session(close.code) {
            tracing::debug!(code = close.code, "Close code invalidates session");
            self.session.clear();
        }
        Ok(())
    }

    async fn connect_once(&self) -> GatewayResult<Closure> {
        self.state.set(ConnectionState::Connecting);

        // Only a fresh IDENTIFY spends a session start
        let permit = if self.session.is_resumable() {
            None
        } else {
            tokio::select! {
                () = self.shutdown.cancelled() => return Ok(Closure::Shutdown),
                permit = self.governor.acquire() => Some(permit?),
            }
        };

        let (socket, _) = tokio::select! {
            () = self.shutdown.cancelled() => return Ok(Closure::Shutdown),
            connected = connect_async(self.url.as_str()) => connected?,
        };
        tracing::info!(url = %self.url, "Connected to gateway");
        self.state.set(ConnectionState::Handshaking);

        let (sink, stream) = socket.split();
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (close_tx, close_rx) = mpsc::channel(1);
        let writer = tokio::spawn(run_writer(
            sink,
            out_rx,
            self.codec,
            Arc::clone(&self.limiter),
        ));
        *self.outbound.lock() = Some(out_tx.clone());

        let mut link = Link {
            outbound: out_tx,
            close: close_tx,
            close_rx,
            cancel: self.shutdown.child_token(),
            decoder: InboundDecoder::new(self.codec, self.settings.gateway.compress),
            monitor: None,
            heartbeat_task: None,
        };

        // HELLO may come before or after this, the server decides
        let result = match self.send_handshake(&link).await {
            Ok(()) => {
                drop(permit);
                self.read_loop(stream, &mut link).await
            }
            Err(e) => Err(e),
        };
        self.teardown(link, writer).await;
        result
    }

    async fn read_loop<S>(&self, mut stream: S, link: &mut Link) -> GatewayResult<Closure>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let wake = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => Wake::Shutdown,
                Some(request) = link.close_rx.recv() => Wake::CloseRequested(request),
                frame = stream.next() => Wake::Frame(frame),
            };

            let decoded = match wake {
                Wake::Shutdown => {
                    link.request_close(CloseRequest::new(CloseCode::NORMAL, "shutting down"));
                    return Ok(Closure::Shutdown);
                }
                Wake::CloseRequested(request) => {
                    link.request_close(request.clone());
                    return Ok(Closure::Closed(request));
                }
                Wake::Frame(None) => {
                    return Ok(Closure::Closed(CloseRequest::new(
                        CloseCode::ABNORMAL,
                        "stream ended",
                    )));
                }
                Wake::Frame(Some(Err(e))) => {
                    return Ok(Closure::Closed(CloseRequest::new(
                        CloseCode::ABNORMAL,
                        e.to_string(),
                    )));
                }
                Wake::Frame(Some(Ok(Message::Close(frame)))) => {
                    let close = frame.map_or_else(
                        || CloseRequest::new(CloseCode::NO_STATUS, ""),
                        |f| CloseRequest::new(u16::from(f.code), f.reason.to_string()),
                    );
                    return Ok(Closure::Closed(close));
                }
                Wake::Frame(Some(Ok(Message::Text(text)))) => link.decoder.text(&text).map(Some),
                Wake::Frame(Some(Ok(Message::Binary(data)))) => link.decoder.binary(&data),
                Wake::Frame(Some(Ok(_))) => continue,
            };

            match decoded {
                Ok(Some(frame)) => {
                    if let Some(close) = self.handle_frame(frame, link).await? {
                        link.request_close(close.clone());
                        return Ok(Closure::Closed(close));
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Dropping undecodable frame"),
            }
        }
    }

    /// Act on one inbound frame; `Some` asks for the socket to close
    async fn handle_frame(
        &self,
        frame: GatewayMessage,
        link: &mut Link,
    ) -> GatewayResult<Option<CloseRequest>> {
        if let Some(seq) = frame.s {
            self.session.observe(seq);
        }

        match frame.op {
            OpCode::Dispatch => {
                self.handle_dispatch(frame.t, frame.d)?;
            }
            OpCode::Hello => self.handle_hello(&frame, link),
            OpCode::HeartbeatAck => {
                if let Some(latency) = link.monitor.as_ref().and_then(|m| m.ack(Instant::now())) {
                    tracing::trace!(latency_ms = latency.as_millis() as u64, "Heartbeat acknowledged");
                }
            }
            OpCode::Heartbeat => {
                tracing::debug!("Server requested heartbeat");
                let beat = GatewayMessage::heartbeat(self.session.last_sequence());
                link.send(Outbound::heartbeat(beat)).await?;
            }
            OpCode::Reconnect => {
                tracing::info!("Server requested reconnect");
                self.session.clear();
                self.reconnects.store(0, Ordering::Release);
                return Ok(Some(CloseRequest::new(
                    CloseCode::RECONNECT_REQUESTED,
                    "reconnect requested",
                )));
            }
            OpCode::InvalidSession => {
                let resumable = frame.is_resumable();
                tracing::warn!(resumable, "Session invalidated");
                if !resumable {
                    self.session.clear();
                }
                self.reconnects.store(0, Ordering::Release);
                return Ok(Some(CloseRequest::new(
                    CloseCode::RECONNECT_REQUESTED,
                    "invalid session",
                )));
            }
            other => {
                tracing::debug!(op = %other, "Ignoring unexpected opcode");
            }
        }
        Ok(None)
    }

    /// Start the heartbeat once the interval is known
    fn handle_hello(&self, frame: &GatewayMessage, link: &mut Link) {
        let Some(hello) = frame.as_hello() else {
            tracing::warn!("HELLO without a heartbeat interval");
            return;
        };
        let interval = Duration::from_millis(hello.heartbeat_interval);
        tracing::debug!(heartbeat_interval_ms = hello.heartbeat_interval, trace = ?hello.trace, "Received HELLO");

        if link.monitor.is_none() {
            let monitor = Arc::new(HeartbeatMonitor::new(interval));
            *self.heartbeat.write() = Some(Arc::clone(&monitor));
            link.heartbeat_task = Some(tokio::spawn(run_heartbeat(
                Arc::clone(&monitor),
                Arc::clone(&self.session),
                link.outbound.clone(),
                link.close.clone(),
                link.cancel.clone(),
            )));
            link.monitor = Some(monitor);
        }
    }

    /// RESUME when the session allows it, IDENTIFY otherwise
    async fn send_handshake(&self, link: &Link) -> GatewayResult<()> {
        let message = match self.session.resume_target() {
            Ok(Some((session_id, seq))) => {
                tracing::info!(session_id = %session_id, seq, "Resuming session");
                GatewayMessage::resume(&ResumePayload {
                    token: self.settings.token.clone(),
                    session_id,
                    seq,
                })
            }
            Ok(None) => {
                tracing::info!(shard = ?self.session.shard(), "Identifying");
                GatewayMessage::identify(&self.identify_payload())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot resume, identifying instead");
                self.session.clear();
                GatewayMessage::identify(&self.identify_payload())
            }
        }
        .map_err(CodecError::from)?;

        link.send(Outbound::control(message)).await
    }

    fn identify_payload(&self) -> IdentifyPayload {
        let gateway = &self.settings.gateway;
        IdentifyPayload {
            token: self.settings.token.clone(),
            properties: IdentifyProperties::for_client(&self.settings.client_name),
            compress: !gateway.compress,
            large_threshold: gateway.large_threshold,
            shard: self.session.shard(),
            presence: self.presence.read().clone(),
        }
    }

    fn handle_dispatch(&self, name: Option<String>, data: Value) -> GatewayResult<()> {
        let Some(name) = name else {
            tracing::warn!("Dispatch without an event name");
            return Ok(());
        };

        let event = match self.dispatcher.decode(&name, data) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(DispatchError::Malformed { event, reason }) => {
                tracing::warn!(event = %event, reason = %reason, "Dropping malformed dispatch");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match &event {
            Event::Ready(ready) => {
                self.session.establish(ready.session_id.clone());
                self.reconnects.store(0, Ordering::Release);
                self.state.set(ConnectionState::Active);
                tracing::info!(
                    session_id = %ready.session_id,
                    guilds = ready.guilds.len(),
                    "Session ready"
                );
            }
            Event::Resumed(_) => {
                self.state.set(ConnectionState::Active);
                tracing::info!(seq = self.session.sequence(), "Session resumed");
            }
            _ => {}
        }

        self.dispatcher.deliver(event);
        Ok(())
    }

    async fn teardown(&self, link: Link, writer: JoinHandle<()>) {
        self.state.set(ConnectionState::Closing);
        link.cancel.cancel();
        *self.outbound.lock() = None;

        let Link {
            outbound,
            close,
            heartbeat_task,
            ..
        } = link;
        if let Some(task) = heartbeat_task {
            task.abort();
        }
        drop(outbound);
        drop(close);

        let abort = writer.abort_handle();
        if timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
            tracing::warn!("Writer did not drain in time, aborting");
            abort.abort();
        }
    }
}

impl std::fmt::Debug for GatewayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConnection")
            .field("url", &self.url.as_str())
            .field("state", &self.state.get())
            .field("session", &self.session)
            .field("reconnects", &self.reconnect_count())
            .finish_non_exhaustive()
    }
}
