//! TCP transport for tagged messages.
//!
//! This is the byte-stream collaborator: it owns sockets and connection
//! lifecycle and nothing else. Frames go out as one `write_all` each and come
//! in as one `read` each; the framing layer interprets them.
//!
//! # Tasks
//!
//! - One accept task per [`Listener`]
//! - One receive task per connection (accepted or dialed)
//!
//! Every task reports through an `mpsc::Sender<NetEvent>`; nothing here
//! touches the current tree.
//!
//! # Failure Model
//!
//! Sends are fire-and-forget: no acknowledgment, no retry. A failed send
//! marks the [`Link`] closed; a failed or empty read ends the receive task
//! with [`NetEvent::Disconnected`]. Neither surfaces as a core error.

use crate::error::Result;
use crate::framing::{encode_message, Message};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Transport tunables.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// Largest frame a single read can return
    pub max_message_bytes: usize,

    /// Capacity of the event channel handed to the session
    pub event_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 1 << 20,
            event_capacity: 64,
        }
    }
}

impl TransportConfig {
    /// Event channel sized for this config.
    pub fn event_channel(&self) -> (mpsc::Sender<NetEvent>, mpsc::Receiver<NetEvent>) {
        mpsc::channel(self.event_capacity.max(1))
    }
}

/// Something that happened on the transport.
#[derive(Debug)]
pub enum NetEvent {
    /// Listener accepted a connection; the link sends to that peer
    Accepted(Link),

    /// One read from a peer
    Frame { peer: SocketAddr, bytes: Vec<u8> },

    /// Peer closed or reset the connection
    Disconnected { peer: SocketAddr },
}

/// Sending side of one connection.
#[derive(Debug)]
pub struct Link {
    peer: SocketAddr,
    writer: OwnedWriteHalf,
    open: bool,
    frames_sent: u64,
}

impl Link {
    fn new(peer: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            peer,
            writer,
            open: true,
            frames_sent: 0,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Frames fully written on this link.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Write one framed message. Returns whether the link is still open.
    pub async fn send(&mut self, message: &Message) -> bool {
        if !self.open {
            return false;
        }

        let frame = encode_message(message);
        match self.writer.write_all(&frame).await {
            Ok(()) => {
                self.frames_sent += 1;
                debug!(peer = %self.peer, tag = %char::from(message.tag()), bytes = frame.len(), "sent frame");
            }
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "send failed, closing link");
                self.open = false;
            }
        }
        self.open
    }

    /// Shut down the write side. The peer sees end-of-stream.
    pub async fn close(&mut self) {
        if self.open {
            if let Err(e) = self.writer.shutdown().await {
                debug!(peer = %self.peer, error = %e, "shutdown failed");
            }
            self.open = false;
        }
    }
}

/// A bound server endpoint with its accept task.
#[derive(Debug)]
pub struct Listener {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl Listener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting. Established connections keep running.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Bind `addr` and accept connections in the background.
///
/// Each accepted connection is announced as [`NetEvent::Accepted`] before any
/// of its frames.
///
/// # Errors
/// Propagates bind failures (address in use, permission denied).
pub async fn listen(
    addr: impl ToSocketAddrs,
    config: TransportConfig,
    events: mpsc::Sender<NetEvent>,
) -> Result<Listener> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "listening");

    let task = tokio::spawn(accept_loop(listener, config, events));
    Ok(Listener { local_addr, task })
}

/// Dial `addr`. Frames from the peer arrive on `events`.
///
/// # Errors
/// Propagates connect failures (refused, unreachable).
pub async fn connect(
    addr: impl ToSocketAddrs,
    config: TransportConfig,
    events: mpsc::Sender<NetEvent>,
) -> Result<Link> {
    let stream = TcpStream::connect(addr).await?;
    let peer = stream.peer_addr()?;
    info!(%peer, "connected");

    let (reader, writer) = stream.into_split();
    tokio::spawn(receive_loop(peer, reader, config.max_message_bytes, events));
    Ok(Link::new(peer, writer))
}

async fn accept_loop(listener: TcpListener, config: TransportConfig, events: mpsc::Sender<NetEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!(%peer, "accepted connection");
                let (reader, writer) = stream.into_split();

                if events.send(NetEvent::Accepted(Link::new(peer, writer))).await.is_err() {
                    debug!("event channel closed, stopping accept loop");
                    return;
                }
                tokio::spawn(receive_loop(peer, reader, config.max_message_bytes, events.clone()));
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn receive_loop(
    peer: SocketAddr,
    mut reader: OwnedReadHalf,
    max_message_bytes: usize,
    events: mpsc::Sender<NetEvent>,
) {
    let mut buf = vec![0u8; max_message_bytes.max(1)];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                info!(%peer, "peer closed connection");
                break;
            }
            Ok(n) => {
                debug!(%peer, bytes = n, "received frame");
                let event = NetEvent::Frame {
                    peer,
                    bytes: buf[..n].to_vec(),
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(%peer, error = %e, "connection lost");
                break;
            }
        }
    }

    let _ = events.send(NetEvent::Disconnected { peer }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::WeightedAlphabet;
    use crate::framing::decode_message;

    #[tokio::test]
    async fn test_accept_and_receive() {
        let config = TransportConfig::default();
        let (server_tx, mut server_rx) = config.event_channel();
        let (client_tx, _client_rx) = config.event_channel();

        let listener = listen("127.0.0.1:0", config, server_tx).await.unwrap();
        let mut link = connect(listener.local_addr(), config, client_tx).await.unwrap();

        let accepted = server_rx.recv().await.unwrap();
        assert!(matches!(accepted, NetEvent::Accepted(_)));

        let alphabet = WeightedAlphabet::from_entries([('a', 1.0), ('b', 2.0)]).unwrap();
        assert_eq!(link.frames_sent(), 0);
        assert!(link.send(&Message::TreeUpdate(alphabet.clone())).await);
        assert_eq!(link.frames_sent(), 1);

        match server_rx.recv().await.unwrap() {
            NetEvent::Frame { bytes, .. } => {
                assert_eq!(decode_message(&bytes).unwrap(), Message::TreeUpdate(alphabet));
            }
            other => panic!("expected frame, got {other:?}"),
        }

        link.close().await;
        assert!(!link.is_open());
        // A closed link writes nothing
        assert!(!link.send(&Message::ciphertext("1").unwrap()).await);
        assert_eq!(link.frames_sent(), 1);
        assert!(matches!(
            server_rx.recv().await.unwrap(),
            NetEvent::Disconnected { .. }
        ));

        listener.shutdown();
    }

    #[tokio::test]
    async fn test_server_can_send_back() {
        let config = TransportConfig::default();
        let (server_tx, mut server_rx) = config.event_channel();
        let (client_tx, mut client_rx) = config.event_channel();

        let listener = listen("127.0.0.1:0", config, server_tx).await.unwrap();
        let _link = connect(listener.local_addr(), config, client_tx).await.unwrap();

        let mut server_link = match server_rx.recv().await.unwrap() {
            NetEvent::Accepted(link) => link,
            other => panic!("expected accept, got {other:?}"),
        };
        assert!(server_link.send(&Message::ciphertext("0101").unwrap()).await);

        match client_rx.recv().await.unwrap() {
            NetEvent::Frame { bytes, .. } => assert_eq!(bytes, b"c0101"),
            other => panic!("expected frame, got {other:?}"),
        }

        listener.shutdown();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
            probe.local_addr().unwrap()
        };
        let (tx, _rx) = TransportConfig::default().event_channel();
        assert!(connect(addr, TransportConfig::default(), tx).await.is_err());
    }
}
