//! Streaming session with the direction service.
//!
//! [`DirectionStream`] owns at most one logical session at a time. It decodes
//! inbound frames into [`StreamEvent`]s for its subscriber, silently drops
//! outbound messages while not open, and after any close retries once per
//! fixed delay for as long as a connection is wanted.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::protocol::{
    decode_server_message, AircraftStatus, ClientMessage, DirectionSample, ServerMessage, TargetId,
};

/// Delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// What a transport hands back to the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Error(String),
}

/// One open transport session, seen from the client side.
///
/// Dropping `outbound` asks the transport to close; the session is over once
/// `inbound` yields `None`.
pub struct Session {
    pub outbound: UnboundedSender<String>,
    pub inbound: UnboundedReceiver<Frame>,
}

/// The transport's half of a [`Session`].
pub struct SessionPeer {
    /// Text frames the client wants sent
    pub from_client: UnboundedReceiver<String>,
    /// Frames to deliver to the client
    pub to_client: UnboundedSender<Frame>,
}

impl Session {
    pub fn pair() -> (Session, SessionPeer) {
        let (outbound, from_client) = unbounded_channel();
        let (to_client, inbound) = unbounded_channel();
        (
            Session { outbound, inbound },
            SessionPeer {
                from_client,
                to_client,
            },
        )
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, endpoint: &str) -> Result<Session, TransportError>;
}

/// WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, endpoint: &str) -> Result<Session, TransportError> {
        let (socket, _response) = connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (session, peer) = Session::pair();
        tokio::spawn(pump(socket, peer));
        Ok(session)
    }
}

/// Shuttle frames between the socket and the session channels until either
/// side goes away.
async fn pump(socket: WebSocketStream<MaybeTlsStream<TcpStream>>, mut peer: SessionPeer) {
    let (mut sink, mut source) = socket.split();
    loop {
        tokio::select! {
            outgoing = peer.from_client.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        let _ = peer.to_client.send(Frame::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if peer.to_client.send(Frame::Text(text.as_str().to_owned())).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = peer.to_client.send(Frame::Error(e.to_string()));
                    break;
                }
            },
        }
    }
}

/// Events delivered to the stream's subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Opened,
    Position(DirectionSample),
    AircraftStatus(AircraftStatus),
    /// Transport trouble; the session closes right after
    Error(String),
    Closed,
}

struct Inner {
    state: ConnectionState,
    wants_reconnect: bool,
    status_subscribed: bool,
    /// Bumped for every new session and on disconnect; anything tagged with
    /// an older generation is stale.
    generation: u64,
    outbound: Option<UnboundedSender<String>>,
    closer: Option<oneshot::Sender<()>>,
}

struct Shared {
    endpoint: String,
    transport: Arc<dyn Transport>,
    reconnect_delay: Duration,
    events: UnboundedSender<StreamEvent>,
    inner: Mutex<Inner>,
}

/// Handle to the resilient direction stream. Clones share one session.
#[derive(Clone)]
pub struct DirectionStream {
    shared: Arc<Shared>,
}

impl DirectionStream {
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn Transport>,
        reconnect_delay: Duration,
        events: UnboundedSender<StreamEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.into(),
                transport,
                reconnect_delay,
                events,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    wants_reconnect: false,
                    status_subscribed: false,
                    generation: 0,
                    outbound: None,
                    closer: None,
                }),
            }),
        }
    }

    /// Also deliver aircraft status messages to the subscriber.
    pub fn subscribe_aircraft_status(&self) {
        self.shared.lock().status_subscribed = true;
    }

    /// Open a session unless one is already connecting or open.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Close the session and stop reconnecting. No event is delivered for the
    /// closed session afterwards.
    pub fn disconnect(&self) {
        let mut inner = self.shared.lock();
        inner.wants_reconnect = false;
        if inner.state != ConnectionState::Disconnected {
            info!(endpoint = %self.shared.endpoint, "disconnecting from direction service");
        }
        inner.state = ConnectionState::Disconnected;
        inner.generation += 1;
        inner.outbound = None;
        inner.closer = None;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn wants_reconnect(&self) -> bool {
        self.shared.lock().wants_reconnect
    }

    /// Report the observer position. Dropped unless the session is open.
    pub fn send_location(&self, latitude: f64, longitude: f64, elevation: f64) -> bool {
        self.send(ClientMessage::UpdateLocation {
            latitude,
            longitude,
            elevation,
        })
    }

    /// Ask the service to track another target. Dropped unless the session is open.
    pub fn switch_target(&self, target: TargetId) -> bool {
        self.send(ClientMessage::SwitchTarget { target })
    }

    fn send(&self, message: ClientMessage) -> bool {
        let inner = self.shared.lock();
        let (ConnectionState::Open, Some(outbound)) = (inner.state, inner.outbound.as_ref()) else {
            trace!(?message, "direction stream not open, dropping message");
            return false;
        };
        match message.encode() {
            Ok(text) => outbound.send(text).is_ok(),
            Err(err) => {
                warn!(%err, "failed to encode outbound message");
                false
            }
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connect(self: &Arc<Self>) {
        let generation = {
            let mut inner = self.lock();
            inner.wants_reconnect = true;
            Self::begin_session(&mut inner)
        };
        if let Some(generation) = generation {
            tokio::spawn(self.clone().run_session(generation));
        }
    }

    fn begin_session(inner: &mut Inner) -> Option<u64> {
        if inner.state != ConnectionState::Disconnected {
            trace!(state = ?inner.state, "session already active");
            return None;
        }
        inner.state = ConnectionState::Connecting;
        inner.generation += 1;
        Some(inner.generation)
    }

    async fn run_session(self: Arc<Self>, generation: u64) {
        debug!(endpoint = %self.endpoint, generation, "opening direction stream");
        let Session {
            outbound,
            mut inbound,
        } = match self.transport.open(&self.endpoint).await {
            Ok(session) => session,
            Err(err) => {
                warn!(endpoint = %self.endpoint, %err, "direction stream connection failed");
                self.emit(generation, StreamEvent::Error(err.to_string()));
                self.session_closed(generation);
                return;
            }
        };

        let (closer, mut closed) = oneshot::channel::<()>();
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                // Disconnected while connecting; dropping the session closes it.
                return;
            }
            inner.state = ConnectionState::Open;
            inner.outbound = Some(outbound);
            inner.closer = Some(closer);
        }
        info!(endpoint = %self.endpoint, "connected to direction service");
        self.emit(generation, StreamEvent::Opened);

        loop {
            let frame = tokio::select! {
                frame = inbound.recv() => frame,
                _ = &mut closed => None,
            };
            match frame {
                Some(Frame::Text(text)) => self.dispatch(generation, &text),
                Some(Frame::Error(err)) => {
                    warn!(%err, "direction stream transport error");
                    self.emit(generation, StreamEvent::Error(err));
                    break;
                }
                None => break,
            }
        }
        self.session_closed(generation);
    }

    fn dispatch(&self, generation: u64, text: &str) {
        match decode_server_message(text) {
            Ok(Some(ServerMessage::PositionUpdate(sample))) => {
                self.emit(generation, StreamEvent::Position(sample))
            }
            Ok(Some(ServerMessage::AircraftStatus(status))) => {
                self.emit(generation, StreamEvent::AircraftStatus(status))
            }
            Ok(None) => debug!(frame = text, "ignoring unknown message type"),
            Err(err) => warn!(%err, frame = text, "dropping malformed frame"),
        }
    }

    /// Deliver `event` unless its session has been superseded.
    fn emit(&self, generation: u64, event: StreamEvent) {
        let inner = self.lock();
        if inner.generation != generation {
            trace!(?event, "dropping event from stale session");
            return;
        }
        if matches!(event, StreamEvent::AircraftStatus(_)) && !inner.status_subscribed {
            return;
        }
        let _ = self.events.send(event);
    }

    fn session_closed(self: &Arc<Self>, generation: u64) {
        let reconnect = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.state = ConnectionState::Disconnected;
            inner.outbound = None;
            inner.closer = None;
            inner.wants_reconnect
        };
        self.emit(generation, StreamEvent::Closed);

        if !reconnect {
            debug!("direction stream closed");
            return;
        }
        info!(
            delay_ms = self.reconnect_delay.as_millis() as u64,
            "direction stream closed, reconnecting"
        );
        let shared = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(shared.reconnect_delay).await;
            shared.reconnect(generation);
        });
    }

    /// Reconnect after the session `generation` closed, unless anything else
    /// happened to the stream in the meantime.
    fn reconnect(self: &Arc<Self>, generation: u64) {
        let next = {
            let mut inner = self.lock();
            if !inner.wants_reconnect || inner.generation != generation {
                return;
            }
            Self::begin_session(&mut inner)
        };
        if let Some(next) = next {
            tokio::spawn(self.clone().run_session(next));
        }
    }
}
