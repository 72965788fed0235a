//! TCP bus client.
//!
//! Connects to the broker in [`crate::broker`] and speaks the line-delimited
//! JSON frame protocol. A background task demultiplexes inbound `publish`
//! frames to per-topic channels; outbound frames share one write half behind
//! a mutex.

use crate::frame::Frame;
use crate::message::BusMessage;
use crate::transport::{Subscription, Transport, TransportError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Strip the optional `tcp://` scheme from a broker address.
fn host_port(server: &str) -> &str {
    server.strip_prefix("tcp://").unwrap_or(server)
}

/// Client connection to the TCP bus broker.
#[derive(Debug)]
pub struct TcpBus {
    writer: Mutex<OwnedWriteHalf>,
    routes: Arc<DashMap<String, mpsc::Sender<BusMessage>>>,
}

impl TcpBus {
    /// Connect to the broker, authenticating when credentials are given.
    ///
    /// Authentication is acknowledged by the broker before this returns, so
    /// bad credentials fail the connect instead of surfacing later as a
    /// dead subscription. The whole exchange (TCP + auth) is bounded by
    /// `timeout`; callers are expected to treat failure as fatal.
    pub async fn connect(
        server: &str,
        credentials: Option<(String, String)>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addr = host_port(server);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Connection(format!("connect to {addr} timed out")))?
            .map_err(|e| TransportError::Connection(format!("connect to {addr}: {e}")))?;

        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        if let Some((username, password)) = credentials {
            let line = Frame::Auth { username, password }
                .to_line()
                .map_err(|e| TransportError::Connection(e.to_string()))?;
            write_half
                .write_all(line.as_bytes())
                .await
                .map_err(|e| TransportError::Connection(format!("auth: {e}")))?;
            tokio::time::timeout(timeout, await_auth_ok(&mut lines))
                .await
                .map_err(|_| {
                    TransportError::Connection("authentication timed out".to_string())
                })??;
        }

        let routes: Arc<DashMap<String, mpsc::Sender<BusMessage>>> = Arc::new(DashMap::new());
        tokio::spawn(demux_inbound(lines, Arc::clone(&routes)));

        debug!(server = %addr, "Connected to bus broker");
        Ok(Self {
            writer: Mutex::new(write_half),
            routes,
        })
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), std::io::Error> {
        let line = frame
            .to_line()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await
    }
}

/// Block until the broker answers the auth frame.
async fn await_auth_ok(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Result<(), TransportError> {
    match lines.next_line().await {
        Ok(Some(line)) => match Frame::parse(&line) {
            Ok(Frame::AuthOk) => Ok(()),
            Ok(Frame::Error { reason }) => Err(TransportError::Connection(format!(
                "authentication rejected: {reason}"
            ))),
            Ok(_) => Err(TransportError::Connection(
                "unexpected frame during authentication".to_string(),
            )),
            Err(e) => Err(TransportError::Connection(format!("auth reply: {e}"))),
        },
        Ok(None) => Err(TransportError::Connection(
            "connection closed during authentication".to_string(),
        )),
        Err(e) => Err(TransportError::Connection(format!("auth reply: {e}"))),
    }
}

/// Read inbound frames and route each publish to its topic's channel.
///
/// Ends when the broker closes the connection or reports an error; clearing
/// the route map drops the per-topic senders, which ends the matching
/// subscriptions.
async fn demux_inbound(
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    routes: Arc<DashMap<String, mpsc::Sender<BusMessage>>>,
) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let frame = match Frame::parse(&line) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, "Discarding undecodable frame from broker");
                        continue;
                    }
                };
                match frame {
                    Frame::Publish { message } => {
                        let Some(route) = routes.get(&message.topic) else {
                            debug!(topic = %message.topic, "No local subscriber, message dropped");
                            continue;
                        };
                        if route.try_send(message).is_err() {
                            warn!(topic = %route.key(), "Subscriber buffer full or gone, message dropped");
                        }
                    }
                    Frame::Error { reason } => {
                        warn!(reason = %reason, "Broker rejected the connection");
                        break;
                    }
                    _ => {
                        warn!("Ignoring unexpected frame from broker");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Bus connection read failed");
                break;
            }
        }
    }
    debug!("Bus connection closed");
    routes.clear();
}

#[async_trait]
impl Transport for TcpBus {
    async fn publish(&self, message: BusMessage) -> Result<(), TransportError> {
        let topic = message.topic.clone();
        self.send_frame(&Frame::Publish { message })
            .await
            .map_err(|e| TransportError::PublishFailure {
                topic,
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        if self.routes.insert(topic.to_string(), tx).is_some() {
            // Keep the replacement; one subscription per topic per client.
            warn!(topic = %topic, "Replacing existing subscription");
        }

        if let Err(e) = self
            .send_frame(&Frame::Subscribe {
                topic: topic.to_string(),
            })
            .await
        {
            self.routes.remove(topic);
            return Err(TransportError::SubscribeFailure {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }

        debug!(topic = %topic, "Subscribed via broker");
        Ok(Subscription::channel(topic, rx))
    }
}
