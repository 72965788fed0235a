//! Minimal topic broker for the TCP bus.
//!
//! Accepts client connections, tracks exact-topic subscriptions, and fans
//! published messages out to every subscriber of the message's topic. This
//! is deliberately small: no retained messages, no wildcards, no QoS. When
//! started with credentials, a connection must authenticate before sending
//! anything else; a successful `auth` is acknowledged with `auth_ok`, a
//! rejection gets an `error` frame before the connection closes. The check
//! is a plain comparison, not a security layer.

use crate::frame::Frame;
use crate::message::BusMessage;
use crate::DEFAULT_CHANNEL_CAPACITY;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Errors from running the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A connected client's outbound queue, tagged for cleanup on disconnect.
#[derive(Clone)]
struct Subscriber {
    conn_id: u64,
    outbound: mpsc::Sender<Frame>,
}

/// The topic broker.
pub struct Broker {
    listener: TcpListener,
    credentials: Option<(String, String)>,
    subscriptions: Arc<DashMap<String, Vec<Subscriber>>>,
    next_conn_id: AtomicU64,
}

impl Broker {
    /// Bind the broker to an address.
    pub async fn bind(
        addr: &str,
        credentials: Option<(String, String)>,
    ) -> Result<Self, BrokerError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            credentials,
            subscriptions: Arc::new(DashMap::new()),
            next_conn_id: AtomicU64::new(0),
        })
    }

    /// The bound address (useful when binding to port 0).
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, BrokerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until the process exits.
    pub async fn run(self) -> Result<(), BrokerError> {
        info!(addr = %self.local_addr()?, "Broker listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
            debug!(conn_id, peer = %peer, "Client connected");

            let subscriptions = Arc::clone(&self.subscriptions);
            let credentials = self.credentials.clone();
            tokio::spawn(async move {
                handle_client(stream, conn_id, credentials, subscriptions).await;
            });
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    conn_id: u64,
    credentials: Option<(String, String)>,
    subscriptions: Arc<DashMap<String, Vec<Subscriber>>>,
) {
    let (read_half, mut write_half) = stream.into_split();

    // Writer task: drain this client's outbound queue onto the socket.
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(DEFAULT_CHANNEL_CAPACITY);
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let line = match frame.to_line() {
                Ok(l) => l,
                Err(e) => {
                    warn!(error = %e, "Failed to encode outbound frame");
                    continue;
                }
            };
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut authenticated = credentials.is_none();
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let frame = match Frame::parse(&line) {
            Ok(f) => f,
            Err(e) => {
                warn!(conn_id, error = %e, "Discarding undecodable frame");
                continue;
            }
        };

        match frame {
            Frame::Auth { username, password } => match &credentials {
                Some((expect_user, expect_pass))
                    if *expect_user == username && *expect_pass == password =>
                {
                    authenticated = true;
                    let _ = outbound_tx.send(Frame::AuthOk).await;
                    debug!(conn_id, username = %username, "Client authenticated");
                }
                Some(_) => {
                    warn!(conn_id, username = %username, "Rejected bad credentials");
                    let _ = outbound_tx
                        .send(Frame::Error {
                            reason: "bad credentials".to_string(),
                        })
                        .await;
                    break;
                }
                // No credentials configured; acknowledge so the client
                // does not wait out its auth timeout.
                None => {
                    let _ = outbound_tx.send(Frame::AuthOk).await;
                }
            },
            Frame::Subscribe { topic } => {
                if !authenticated {
                    warn!(conn_id, "Subscribe before auth, closing connection");
                    let _ = outbound_tx
                        .send(Frame::Error {
                            reason: "not authenticated".to_string(),
                        })
                        .await;
                    break;
                }
                debug!(conn_id, topic = %topic, "Subscription added");
                subscriptions.entry(topic).or_default().push(Subscriber {
                    conn_id,
                    outbound: outbound_tx.clone(),
                });
            }
            Frame::Publish { message } => {
                if !authenticated {
                    warn!(conn_id, "Publish before auth, closing connection");
                    let _ = outbound_tx
                        .send(Frame::Error {
                            reason: "not authenticated".to_string(),
                        })
                        .await;
                    break;
                }
                fan_out(&subscriptions, message);
            }
            Frame::AuthOk | Frame::Error { .. } => {
                warn!(conn_id, "Ignoring broker-only frame from client");
            }
        }
    }

    // Disconnect: remove this connection's subscriptions everywhere, then
    // let the writer drain so a final error frame reaches the client.
    for mut entry in subscriptions.iter_mut() {
        entry.value_mut().retain(|s| s.conn_id != conn_id);
    }
    drop(outbound_tx);
    let _ = writer.await;
    debug!(conn_id, "Client disconnected");
}

/// Deliver a message to every subscriber of its topic, pruning dead queues.
fn fan_out(subscriptions: &DashMap<String, Vec<Subscriber>>, message: BusMessage) {
    let Some(mut entry) = subscriptions.get_mut(&message.topic) else {
        debug!(topic = %message.topic, "Message dropped (no subscribers)");
        return;
    };

    let mut delivered = 0usize;
    entry.value_mut().retain(|subscriber| {
        let frame = Frame::Publish {
            message: message.clone(),
        };
        match subscriber.outbound.try_send(frame) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(topic = %message.topic, conn_id = subscriber.conn_id, "Subscriber queue full, message dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    });
    debug!(topic = %message.topic, receivers = delivered, "Message fanned out");
}
