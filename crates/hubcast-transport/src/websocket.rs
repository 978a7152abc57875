//! WebSocket client connections using `tokio-tungstenite`.
//!
//! A client opens a socket and sends one handshake text frame naming the
//! hub protocol it wants:
//!
//! ```text
//! client → {"protocol":"json","version":1}\x1e
//! server → {}\x1e                            (accepted)
//! server → {"error":"..."}\x1e + close       (rejected)
//! ```
//!
//! After that the server only writes payloads for that protocol. Frames
//! the client sends are read and dropped, so pings get answered and a
//! client close is noticed without waiting for the next broadcast.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, TransferFormat, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Terminates every handshake frame.
const RECORD_SEPARATOR: u8 = 0x1e;

/// How long a client has to upgrade and send its handshake after connecting.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Negotiated connections waiting to be picked up from [`WebSocketTransport::incoming`].
const INCOMING_CAPACITY: usize = 64;

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

#[derive(Debug, Deserialize)]
struct HandshakeRequest {
    protocol: String,
    version: u32,
}

#[derive(Debug, Default, Serialize)]
struct HandshakeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Listens for WebSocket clients and negotiates their hub protocol.
///
/// [`accept`](Self::accept) only takes the TCP connection; the upgrade and
/// the handshake happen in [`PendingConnection::negotiate`], so one slow
/// client never holds up the listener. [`incoming`](Self::incoming) runs
/// that loop for you with one task per client.
pub struct WebSocketTransport {
    listener: TcpListener,
    supported: Arc<[(String, TransferFormat)]>,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds to `addr`, accepting clients that ask for one of `supported`.
    ///
    /// `supported` pairs each protocol name with the frame type its
    /// payloads are sent in.
    pub async fn bind(
        addr: &str,
        supported: impl IntoIterator<Item = (String, TransferFormat)>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let supported: Arc<[_]> = supported.into_iter().collect();
        tracing::info!(
            addr,
            protocols = supported.len(),
            "WebSocket transport listening"
        );
        Ok(Self {
            listener,
            supported,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Sets how long a client gets to finish the upgrade and handshake.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP client. Nothing is read from the socket yet.
    pub async fn accept(&self) -> Result<PendingConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingConnection {
            stream,
            addr,
            supported: Arc::clone(&self.supported),
            timeout: self.handshake_timeout,
        })
    }

    /// Runs the accept loop in the background and yields every client that
    /// completes its handshake.
    ///
    /// Each client is negotiated on its own task. Clients that fail or time
    /// out are logged and dropped. Once the receiver is dropped the loop
    /// stops at the next accepted socket.
    pub fn incoming(self) -> mpsc::Receiver<WebSocketConnection> {
        let (tx, rx) = mpsc::channel(INCOMING_CAPACITY);
        tokio::spawn(async move {
            while !tx.is_closed() {
                let pending = match self.accept().await {
                    Ok(pending) => pending,
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                        continue;
                    }
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    let addr = pending.peer_addr();
                    match pending.negotiate().await {
                        Ok(conn) => {
                            if tx.send(conn).await.is_err() {
                                tracing::debug!(%addr, "no receiver for negotiated client");
                            }
                        }
                        Err(e) => {
                            tracing::debug!(%addr, error = %e, "client rejected");
                        }
                    }
                });
            }
            tracing::debug!("WebSocket accept loop stopped");
        });
        rx
    }
}

/// A TCP client that has not upgraded or negotiated a protocol yet.
pub struct PendingConnection {
    stream: TcpStream,
    addr: SocketAddr,
    supported: Arc<[(String, TransferFormat)]>,
    timeout: Duration,
}

impl PendingConnection {
    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Performs the WebSocket upgrade and the protocol handshake.
    ///
    /// Both steps together must finish within the transport's handshake
    /// timeout.
    ///
    /// # Errors
    /// - `TransportError::Handshake` if the handshake is malformed, names an
    ///   unsupported protocol, or times out. Malformed and unsupported
    ///   requests get an `{"error":..}` reply before the socket is closed.
    /// - `TransportError::AcceptFailed` if the upgrade fails.
    pub async fn negotiate(self) -> Result<WebSocketConnection, TransportError> {
        let addr = self.addr;
        let handshake = upgrade_and_handshake(self.stream, addr, &self.supported);
        match tokio::time::timeout(self.timeout, handshake).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(%addr, "handshake timed out");
                Err(TransportError::Handshake("handshake timed out".into()))
            }
        }
    }
}

async fn upgrade_and_handshake(
    stream: TcpStream,
    addr: SocketAddr,
    supported: &[(String, TransferFormat)],
) -> Result<WebSocketConnection, TransportError> {
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| {
            TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;

    let request = match read_handshake(&mut ws).await {
        Ok(request) => request,
        Err(TransportError::Handshake(reason)) => {
            reject(&mut ws, addr, &reason).await;
            return Err(TransportError::Handshake(reason));
        }
        Err(e) => return Err(e),
    };

    let format = supported
        .iter()
        .find(|(name, _)| *name == request.protocol)
        .map(|(_, format)| *format);

    let Some(format) = format else {
        let reason = format!("protocol '{}' is not supported", request.protocol);
        reject(&mut ws, addr, &reason).await;
        return Err(TransportError::Handshake(reason));
    };

    write_handshake(&mut ws, &HandshakeResponse::default()).await?;

    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(
        %id,
        %addr,
        protocol = %request.protocol,
        version = request.version,
        "accepted WebSocket client"
    );

    let (sink, stream) = ws.split();
    let closed = Arc::new(AtomicBool::new(false));
    let reader = tokio::spawn(drain(id, stream, Arc::clone(&closed)));

    Ok(WebSocketConnection {
        id,
        protocol: request.protocol,
        format,
        sink: Mutex::new(sink),
        closed,
        reader,
    })
}

/// Sends the error reply and closes. Failures only get logged; the client
/// is being dropped either way.
async fn reject(ws: &mut WsStream, addr: SocketAddr, reason: &str) {
    let response = HandshakeResponse {
        error: Some(reason.to_string()),
    };
    if let Err(e) = write_handshake(ws, &response).await {
        tracing::debug!(%addr, error = %e, "could not send handshake error");
    }
    if let Err(e) = ws.close(None).await {
        tracing::debug!(%addr, error = %e, "could not close rejected client");
    }
    tracing::debug!(%addr, reason, "handshake rejected");
}

async fn read_handshake(ws: &mut WsStream) -> Result<HandshakeRequest, TransportError> {
    loop {
        let frame = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Binary(data))) => data.to_vec(),
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::ConnectionClosed(
                    "closed before handshake".into(),
                ));
            }
            Some(Ok(_)) => continue, // skip ping/pong/frame
            Some(Err(e)) => {
                return Err(TransportError::Handshake(e.to_string()));
            }
        };

        let body = frame.strip_suffix(&[RECORD_SEPARATOR]).ok_or_else(|| {
            TransportError::Handshake("missing record separator".into())
        })?;
        return serde_json::from_slice(body)
            .map_err(|e| TransportError::Handshake(format!("invalid handshake: {e}")));
    }
}

async fn write_handshake(
    ws: &mut WsStream,
    response: &HandshakeResponse,
) -> Result<(), TransportError> {
    let mut text = serde_json::to_string(response)
        .map_err(|e| TransportError::Handshake(e.to_string()))?;
    text.push(RECORD_SEPARATOR as char);
    ws.send(Message::text(text)).await.map_err(|e| {
        TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            e,
        ))
    })
}

/// Reads client frames until the client goes away.
///
/// Reading is what lets tungstenite answer pings and complete the closing
/// handshake; the frames themselves carry nothing a broadcast hub needs.
async fn drain(id: ConnectionId, mut stream: SplitStream<WsStream>, closed: Arc<AtomicBool>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %id, error = %e, "read failed");
                break;
            }
        }
    }
    closed.store(true, Ordering::Release);
    tracing::debug!(conn_id = %id, "client disconnected");
}

/// A WebSocket client that completed the protocol handshake.
///
/// Once the client closes its side, [`is_closed`](Self::is_closed) turns
/// `true` and every `send` fails with `TransportError::ConnectionClosed`,
/// so a [`ClientFanout`](crate::ClientFanout) drops it on the next
/// broadcast.
pub struct WebSocketConnection {
    id: ConnectionId,
    protocol: String,
    format: TransferFormat,
    sink: Mutex<SplitSink<WsStream, Message>>,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl WebSocketConnection {
    /// Returns `true` once the client has closed or the socket failed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn write(&self, msg: Message) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(format!(
                "{} disconnected",
                self.id
            )));
        }
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn transfer_format(&self) -> TransferFormat {
        self.format
    }

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match self.format {
            TransferFormat::Text => {
                let text = String::from_utf8(data.to_vec()).map_err(|e| {
                    TransportError::SendFailed(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e,
                    ))
                })?;
                Message::text(text)
            }
            TransferFormat::Binary => Message::binary(data.to_vec()),
        };
        self.write(msg).await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }
}
