//! Channel task and its handle
//!
//! The task owns the socket for its whole life: connect, serve, back off,
//! reconnect. The handle only shares the state cell and a command queue.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use iofog_codec::{encode_message_frame, is_protocol_ping, pong_payload, IoMessage};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, Interval};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::dispatch::{dispatch_frame, FrameSink};
use super::watcher::{AckWatcher, SweepAction};
use super::{ChannelOptions, ChannelRole, ChannelState};
use crate::error::{ChannelError, SdkError};
use crate::handlers::Handlers;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Callback run each time the channel (re)opens
pub type OnOpen = Arc<dyn Fn(&ChannelHandle) + Send + Sync>;

/// Close code sent by the gateway when it drops the socket without a frame
const ABNORMAL_CLOSURE: u16 = 1006;

#[derive(Debug)]
enum Command {
    Send(IoMessage),
    Close,
}

/// Cloneable handle to a running channel task
#[derive(Clone)]
pub struct ChannelHandle {
    role: ChannelRole,
    publisher_id: Arc<str>,
    state: Arc<RwLock<ChannelState>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ChannelHandle {
    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Queue a message on the message channel, stamped with this client's
    /// publisher identity
    pub fn send_message(&self, message: &IoMessage) -> Result<(), ChannelError> {
        if self.role != ChannelRole::Message || !self.is_open() {
            error!("Cannot send message: {} channel is not open", self.role);
            return Err(ChannelError::NotOpen { role: self.role });
        }
        let mut message = message.clone();
        message.publisher = self.publisher_id.to_string();
        self.commands
            .send(Command::Send(message))
            .map_err(|_| ChannelError::TaskStopped { role: self.role })
    }

    /// Ask the task to send a normal-closure frame and stop
    pub fn close(&self) {
        if self.commands.send(Command::Close).is_err() {
            debug!("{} channel task already stopped", self.role);
        }
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("role", &self.role)
            .field("state", &self.state())
            .finish()
    }
}

/// Start a channel task for `url`
pub(crate) fn spawn_channel(
    role: ChannelRole,
    url: String,
    publisher_id: &str,
    handlers: Handlers,
    options: ChannelOptions,
    on_open: Option<OnOpen>,
) -> Result<(ChannelHandle, JoinHandle<()>), ChannelError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| ChannelError::NoRuntime)?;
    validate_url(role, &url)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(RwLock::new(ChannelState::Connecting));
    let handle = ChannelHandle {
        role,
        publisher_id: Arc::from(publisher_id),
        state: state.clone(),
        commands: tx.clone(),
    };

    let watcher = match (role, options.ack_retry) {
        (ChannelRole::Message, Some(policy)) => Some(AckWatcher::new(policy)),
        _ => None,
    };
    let task = ChannelTask {
        role,
        url,
        publisher_id: handle.publisher_id.clone(),
        handlers,
        on_open,
        connect_timeout: options.connect_timeout,
        close_timeout: options.close_timeout,
        backoff: Backoff::new(options.reconnect),
        watcher,
        state,
        commands: rx,
        self_sender: tx.downgrade(),
    };
    let join = runtime.spawn(task.run());
    Ok((handle, join))
}

fn validate_url(role: ChannelRole, url: &str) -> Result<(), ChannelError> {
    let invalid = |reason: String| ChannelError::InvalidUrl {
        role,
        url: url.to_string(),
        reason,
    };
    let parsed = url::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// How a connected session ended
enum SessionEnd {
    /// Explicit close, normal closure by the gateway, or all handles dropped
    Closed,
    Failed(ChannelError),
}

struct ChannelTask {
    role: ChannelRole,
    url: String,
    publisher_id: Arc<str>,
    handlers: Handlers,
    on_open: Option<OnOpen>,
    connect_timeout: Duration,
    close_timeout: Duration,
    backoff: Backoff,
    watcher: Option<AckWatcher>,
    state: Arc<RwLock<ChannelState>>,
    commands: mpsc::UnboundedReceiver<Command>,
    self_sender: mpsc::WeakUnboundedSender<Command>,
}

impl ChannelTask {
    async fn run(mut self) {
        loop {
            self.set_state(ChannelState::Connecting);
            let end = match self.connect().await {
                Ok(ws) => {
                    self.backoff.reset();
                    self.set_state(ChannelState::Open);
                    info!("{} channel open: {}", self.role, self.url);
                    self.notify_open();
                    self.serve(ws).await
                }
                Err(e) => SessionEnd::Failed(e),
            };

            let err = match end {
                SessionEnd::Closed => break,
                SessionEnd::Failed(err) => err,
            };

            let recoverable = err.is_recoverable();
            let reason = err.to_string();
            if !matches!(err, ChannelError::ClosedByPeer { .. }) {
                self.handlers.emit_error(&SdkError::Channel(err));
            }
            if !recoverable {
                error!("{} channel failed permanently: {}", self.role, reason);
                break;
            }

            self.set_state(ChannelState::Connecting);
            let delay = self.backoff.next_delay();
            info!(
                "Reconnecting {} channel in {}ms (attempt {}): {}",
                self.role,
                delay.as_millis(),
                self.backoff.attempts(),
                reason
            );
            if !self.wait_backoff(delay).await {
                break;
            }
        }

        self.set_state(ChannelState::Closed);
        info!("{} channel closed", self.role);
    }

    fn set_state(&self, state: ChannelState) {
        *self.state.write() = state;
    }

    async fn connect(&self) -> Result<WsStream, ChannelError> {
        debug!("Connecting {} channel to {}", self.role, self.url);
        match timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((ws, response))) => {
                debug!(
                    "{} channel handshake response: {:?}",
                    self.role,
                    response.status()
                );
                Ok(ws)
            }
            Ok(Err(e)) => {
                warn!("{} channel connection error: {}", self.role, e);
                Err(ChannelError::WebSocket(e))
            }
            Err(_) => Err(ChannelError::ConnectTimeout {
                role: self.role,
                timeout_ms: self.connect_timeout.as_millis() as u64,
            }),
        }
    }

    fn notify_open(&self) {
        let Some(on_open) = &self.on_open else {
            return;
        };
        // Upgrade fails only when every external handle is gone
        if let Some(commands) = self.self_sender.upgrade() {
            let handle = ChannelHandle {
                role: self.role,
                publisher_id: self.publisher_id.clone(),
                state: self.state.clone(),
                commands,
            };
            on_open(&handle);
        }
    }

    /// Sleep out a backoff delay; false when a close arrived meanwhile
    async fn wait_backoff(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => {
                        warn!("Dropping message: {} channel is reconnecting", self.role);
                    }
                    Some(Command::Close) | None => {
                        debug!("{} channel reconnect cancelled", self.role);
                        return false;
                    }
                },
            }
        }
    }

    async fn serve(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let mut sweep = self.watcher.as_ref().map(|w| {
            let period = w.policy().sweep_interval;
            interval_at(Instant::now() + period, period)
        });

        loop {
            tokio::select! {
                inbound = stream.next() => {
                    if let Some(end) = self.on_inbound(&mut sink, inbound).await {
                        return end;
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send(message)) => {
                        if let Some(watcher) = self.watcher.as_mut() {
                            watcher.track(&message);
                        }
                        if let Err(e) = self.write_message(&mut sink, &message).await {
                            return SessionEnd::Failed(e);
                        }
                    }
                    Some(Command::Close) | None => {
                        return self.close_normally(&mut sink, &mut stream).await;
                    }
                },
                _ = tick(&mut sweep) => {
                    if let Some(end) = self.on_sweep(&mut sink, &mut stream).await {
                        return end;
                    }
                }
            }
        }
    }

    async fn on_inbound(
        &mut self,
        sink: &mut WsSink,
        inbound: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> Option<SessionEnd> {
        match inbound {
            Some(Ok(Message::Binary(data))) => {
                dispatch_frame(
                    self.role,
                    &data,
                    &self.handlers,
                    self.watcher.as_mut(),
                    sink,
                )
                .await
                .err()
                .map(SessionEnd::Failed)
            }
            Some(Ok(Message::Ping(payload))) => {
                if is_protocol_ping(&payload) {
                    debug!("{} channel ping, sending pong", self.role);
                    if let Err(e) = sink.send(Message::Pong(pong_payload())).await {
                        return Some(SessionEnd::Failed(e.into()));
                    }
                }
                None
            }
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map(|f| u16::from(f.code)).unwrap_or(ABNORMAL_CLOSURE);
                if code == iofog_config::service::channels::NORMAL_CLOSURE_CODE {
                    info!("{} channel closed by gateway", self.role);
                    Some(SessionEnd::Closed)
                } else {
                    warn!("{} channel closed by gateway with code {}", self.role, code);
                    Some(SessionEnd::Failed(ChannelError::ClosedByPeer {
                        role: self.role,
                        code,
                    }))
                }
            }
            Some(Ok(other)) => {
                debug!("Ignoring non-binary frame on {} channel: {:?}", self.role, other);
                None
            }
            Some(Err(e)) => Some(SessionEnd::Failed(e.into())),
            None => Some(SessionEnd::Failed(ChannelError::ClosedByPeer {
                role: self.role,
                code: ABNORMAL_CLOSURE,
            })),
        }
    }

    async fn on_sweep(
        &mut self,
        sink: &mut WsSink,
        stream: &mut SplitStream<WsStream>,
    ) -> Option<SessionEnd> {
        let action = self.watcher.as_mut()?.sweep();
        match action {
            SweepAction::Idle => None,
            SweepAction::Resend(message) => {
                debug!("Re-sending unacknowledged message");
                self.write_message(sink, &message)
                    .await
                    .err()
                    .map(SessionEnd::Failed)
            }
            SweepAction::Close { attempts } => {
                warn!(
                    "No acknowledgment after {} attempts, closing {} channel",
                    attempts, self.role
                );
                self.handlers.emit_error(&SdkError::Channel(
                    ChannelError::RetriesExhausted { attempts },
                ));
                Some(self.close_normally(sink, stream).await)
            }
        }
    }

    /// Frame and write one outbound message; an unframeable message is
    /// reported and dropped without failing the session
    async fn write_message(
        &mut self,
        sink: &mut WsSink,
        message: &IoMessage,
    ) -> Result<(), ChannelError> {
        match encode_message_frame(message) {
            Ok(frame) => sink.send_frame(frame).await,
            Err(e) => {
                warn!("Dropping outbound message on {} channel: {}", self.role, e);
                self.handlers.emit_error(&SdkError::Codec(e));
                Ok(())
            }
        }
    }

    async fn close_normally(
        &mut self,
        sink: &mut WsSink,
        stream: &mut SplitStream<WsStream>,
    ) -> SessionEnd {
        self.set_state(ChannelState::Closing);
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            debug!("{} channel close frame not sent: {}", self.role, e);
            return SessionEnd::Closed;
        }
        // Drain until the gateway echoes the close
        let drain = async {
            while let Some(Ok(message)) = stream.next().await {
                if message.is_close() {
                    break;
                }
            }
        };
        if timeout(self.close_timeout, drain).await.is_err() {
            debug!("{} channel close handshake timed out", self.role);
        }
        SessionEnd::Closed
    }
}

async fn tick(sweep: &mut Option<Interval>) {
    match sweep {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        self.send(Message::Binary(frame)).await.map_err(ChannelError::from)
    }
}
