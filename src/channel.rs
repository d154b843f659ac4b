//! Auto-reconnecting WebSocket channel to the ask-agent backend.
//!
//! The channel owns its own thread with a single-threaded tokio runtime;
//! the TUI loop stays synchronous and polls incoming [`ChannelMsg`]s the
//! same way it polls keyboard events. Frames are parsed here and delivered
//! in arrival order; unrecognized frames are dropped before the session
//! ever sees them. Reconnection is the channel's concern alone: a session
//! spanning a disconnect is simply abandoned.

use crate::protocol::{AskRequest, ServerEvent};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// The well-known agent endpoint path.
pub const AGENT_WS_PATH: &str = "/ws/ask-agent";

/// Where the agent lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    tls: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("server address is empty")]
    Empty,
    #[error("server address must be host[:port], without a scheme: {0}")]
    HasScheme(String),
    #[error("invalid port in server address: {0}")]
    BadPort(String),
}

impl Endpoint {
    /// Parse a `host[:port]` address. The scheme is not part of the
    /// address; it is negotiated from the TLS flag.
    pub fn parse(server: &str, tls: bool) -> Result<Self, EndpointError> {
        let server = server.trim();
        if server.is_empty() {
            return Err(EndpointError::Empty);
        }
        if server.contains("://") {
            return Err(EndpointError::HasScheme(server.to_string()));
        }
        if let Some((_, port)) = server.rsplit_once(':') {
            if port.parse::<u16>().is_err() {
                return Err(EndpointError::BadPort(port.to_string()));
            }
        }
        Ok(Self {
            host: server.to_string(),
            tls,
        })
    }

    /// Full connection URL: `ws` or `wss` by TLS setting, fixed path.
    pub fn url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.host, AGENT_WS_PATH)
    }
}

/// Fixed-delay, unbounded reconnect policy. A value so it can be swapped
/// for a different backoff without touching the session or the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    pub const fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// How long to wait before the next connection attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

/// Messages from the channel thread to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMsg {
    /// The socket is open (initially and after each reconnect).
    Connected,
    /// An established socket was lost; reconnection is already underway.
    Disconnected,
    /// One parsed server frame, in arrival order.
    Event(ServerEvent),
}

/// Handle held by the UI: sends queries, exposes connection state. The
/// read side arrives through the receiver returned by [`ChannelHandle::connect`].
pub struct ChannelHandle {
    outbound: UnboundedSender<String>,
    connected: Arc<AtomicBool>,
}

impl ChannelHandle {
    /// Spawn the channel thread and start connecting. Returns the handle
    /// and the receiver the UI loop drains.
    pub fn connect(endpoint: Endpoint, policy: ReconnectPolicy) -> (Self, mpsc::Receiver<ChannelMsg>) {
        let (outbound_tx, outbound_rx) = unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel();
        let connected = Arc::new(AtomicBool::new(false));

        let url = endpoint.url();
        let flag = connected.clone();
        thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("failed to build channel runtime: {}", e);
                    return;
                }
            };
            rt.block_on(run_channel(url, policy, flag, outbound_rx, events_tx));
        });

        (
            Self {
                outbound: outbound_tx,
                connected,
            },
            events_rx,
        )
    }

    /// Test double: no thread, no socket. Reports the given connection
    /// state and records outbound queries on the returned receiver.
    pub fn stub(connected: bool) -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                outbound: tx,
                connected: Arc::new(AtomicBool::new(connected)),
            },
            rx,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue one query for transmission. Returns false when the socket is
    /// down (the caller surfaces a local connection-error notice instead).
    pub fn send(&self, query: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.outbound.send(query.to_string()).is_ok()
    }
}

/// Connect-read-reconnect loop. Runs until the UI side hangs up.
async fn run_channel(
    url: String,
    policy: ReconnectPolicy,
    connected: Arc<AtomicBool>,
    mut outbound: UnboundedReceiver<String>,
    events: mpsc::Sender<ChannelMsg>,
) {
    loop {
        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!("connect to {} failed: {}", url, e);
                tokio::time::sleep(policy.delay()).await;
                continue;
            }
        };
        info!("connected to {}", url);

        // Queries queued while offline belong to an abandoned exchange;
        // drop them instead of replaying.
        while outbound.try_recv().is_ok() {}

        connected.store(true, Ordering::SeqCst);
        if events.send(ChannelMsg::Connected).is_err() {
            return;
        }

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                query = outbound.recv() => {
                    let Some(query) = query else {
                        // UI dropped the handle; shut down.
                        return;
                    };
                    let frame = match serde_json::to_string(&AskRequest::new(query)) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("failed to encode request: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(WsMessage::Text(frame.into())).await {
                        warn!("send failed: {}", e);
                        break;
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(msg)) => {
                            let text = match msg.to_text() {
                                Ok(text) => text,
                                Err(_) => continue, // ping/pong/close frames
                            };
                            match ServerEvent::decode(text) {
                                Some(event) => {
                                    if events.send(ChannelMsg::Event(event)).is_err() {
                                        return;
                                    }
                                }
                                None => debug!("ignoring unrecognized frame"),
                            }
                        }
                        Some(Err(e)) => {
                            warn!("websocket error: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        connected.store(false, Ordering::SeqCst);
        info!("disconnected from {}, reconnecting", url);
        if events.send(ChannelMsg::Disconnected).is_err() {
            return;
        }
        tokio::time::sleep(policy.delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_scheme_negotiation() {
        let plain = Endpoint::parse("127.0.0.1:8000", false).unwrap();
        assert_eq!(plain.url(), "ws://127.0.0.1:8000/ws/ask-agent");

        let secure = Endpoint::parse("agent.example.com", true).unwrap();
        assert_eq!(secure.url(), "wss://agent.example.com/ws/ask-agent");
    }

    #[test]
    fn test_endpoint_rejects_bad_addresses() {
        assert_eq!(Endpoint::parse("", false), Err(EndpointError::Empty));
        assert_eq!(Endpoint::parse("   ", false), Err(EndpointError::Empty));
        assert!(matches!(
            Endpoint::parse("ws://host", false),
            Err(EndpointError::HasScheme(_))
        ));
        assert!(matches!(
            Endpoint::parse("host:notaport", false),
            Err(EndpointError::BadPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("host:99999", false),
            Err(EndpointError::BadPort(_))
        ));
    }

    #[test]
    fn test_reconnect_policy_default_is_one_second() {
        assert_eq!(ReconnectPolicy::default().delay(), Duration::from_secs(1));
        assert_eq!(
            ReconnectPolicy::fixed(Duration::from_millis(50)).delay(),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn test_stub_send_respects_connection_state() {
        let (handle, mut rx) = ChannelHandle::stub(true);
        assert!(handle.is_connected());
        assert!(handle.send("hello"));
        assert_eq!(rx.try_recv().ok().as_deref(), Some("hello"));

        let (handle, mut rx) = ChannelHandle::stub(false);
        assert!(!handle.is_connected());
        assert!(!handle.send("hello"));
        assert!(rx.try_recv().is_err());
    }
}
