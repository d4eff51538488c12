//! `ClientConnection`: the per-websocket reader/writer task pair that
//! bridges one transport connection to a `SessionHandle`.
//!
//! Grounded on `discord_proxy::connection::GatewayConnection::into_parts`,
//! which splits a `tokio-tungstenite` stream into its `SplitSink`/
//! `SplitStream` halves for use with two independent tasks rather than one
//! task juggling both directions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use collabhub_config::ConnectionConfig;
use collabhub_core::{ClientMessage, EnvelopeError, Participant, RawEnvelope, ServerMessage, UserId};

use crate::session::SessionHandle;

/// A live websocket connection to the server's generic TCP transport.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owns one participant's connection: a reader task parsing inbound frames
/// into `ClientMessage`s and forwarding them to the session, and a writer
/// task draining a bounded outbound queue back onto the socket.
pub struct ClientConnection {
    user_id: UserId,
    session: SessionHandle,
    config: ConnectionConfig,
    closed: Arc<AtomicBool>,
    close_lock: Arc<Mutex<()>>,
}

impl ClientConnection {
    /// Admit `participant` into `session`'s event loop (bounded by
    /// `registration_timeout_secs`), then run the reader/writer task pair
    /// over `stream` until the connection closes.
    ///
    /// Returns once both tasks have finished, having already unregistered
    /// the participant from the session.
    pub async fn run(
        stream: WsStream,
        participant: Participant,
        session: SessionHandle,
        config: ConnectionConfig,
        registration_timeout: Duration,
    ) -> anyhow::Result<()> {
        let user_id = participant.user_id;
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity);

        session
            .register(participant, outbound_tx, registration_timeout)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        let conn = Self {
            user_id,
            session: session.clone(),
            config,
            closed: Arc::new(AtomicBool::new(false)),
            close_lock: Arc::new(Mutex::new(())),
        };

        let (writer, reader) = stream.split();
        let reader_fut = conn.run_reader(reader);
        let writer_fut = conn.run_writer(writer, outbound_rx);

        tokio::select! {
            _ = reader_fut => {},
            _ = writer_fut => {},
        }

        session.unregister(user_id).await;
        Ok(())
    }

    async fn run_reader(&self, mut reader: SplitStream<WsStream>) {
        let read_timeout = Duration::from_secs(self.config.read_timeout_secs);
        loop {
            let next = tokio::time::timeout(read_timeout, reader.next()).await;
            let frame = match next {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => {
                    debug!(user_id = %self.user_id, error = %e, "websocket read error, closing");
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    debug!(user_id = %self.user_id, "read deadline exceeded, closing");
                    break;
                }
            };

            match frame {
                Message::Text(text) => {
                    if text.len() > self.config.max_message_bytes {
                        warn!(user_id = %self.user_id, len = text.len(), "message exceeds size limit, dropping");
                        continue;
                    }
                    self.dispatch_text(&text).await;
                }
                Message::Binary(bytes) => {
                    if bytes.len() > self.config.max_message_bytes {
                        warn!(user_id = %self.user_id, len = bytes.len(), "message exceeds size limit, dropping");
                        continue;
                    }
                }
                Message::Pong(_) => {
                    // Refreshes the read deadline implicitly: the next loop
                    // iteration starts a fresh timeout.
                }
                Message::Ping(_) | Message::Frame(_) => {}
                Message::Close(_) => break,
            }

            if self.closed.load(Ordering::Acquire) {
                break;
            }
        }
    }

    async fn dispatch_text(&self, text: &str) {
        let raw: RawEnvelope = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(user_id = %self.user_id, error = %e, "malformed envelope, dropping");
                return;
            }
        };
        match ClientMessage::parse(&raw) {
            Ok(message) => self.session.send_inbound(self.user_id, message).await,
            Err(EnvelopeError::UnknownType(kind)) => {
                debug!(user_id = %self.user_id, message_type = %kind, "unknown message type, dropping");
            }
            Err(e @ EnvelopeError::MalformedPayload { .. }) => {
                debug!(user_id = %self.user_id, error = %e, "malformed payload, dropping");
            }
        }
    }

    async fn run_writer(&self, mut writer: SplitSink<WsStream, Message>, mut outbound_rx: mpsc::Receiver<ServerMessage>) {
        let write_timeout = Duration::from_secs(self.config.write_timeout_secs);
        let mut ping_interval = tokio::time::interval(Duration::from_secs(self.config.ping_interval_secs));
        ping_interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                biased;
                msg = outbound_rx.recv() => {
                    let Some(msg) = msg else { break };
                    let Ok(json) = serde_json::to_string(&msg) else { continue };
                    let send = tokio::time::timeout(write_timeout, writer.send(Message::Text(json.into()))).await;
                    match send {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            debug!(user_id = %self.user_id, error = %e, "websocket write error, closing");
                            break;
                        }
                        Err(_) => {
                            warn!(user_id = %self.user_id, "write deadline exceeded, closing");
                            break;
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    if writer.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        self.mark_closed();
        let _ = writer.send(Message::Close(None)).await;
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Idempotently mark this connection closed. Safe to call more than
    /// once, or concurrently with the writer task closing it on its own —
    /// the compare-and-swap under `close_lock` ensures only the first caller
    /// acts.
    pub async fn close(&self) {
        let _guard = self.close_lock.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.session.unregister(self.user_id).await;
    }
}

/// `true` if `origin` is acceptable for `config`: dev mode accepts
/// everything, otherwise `origin` must appear in `allowed_origins`.
#[must_use]
pub fn origin_allowed(config: &ConnectionConfig, origin: Option<&str>) -> bool {
    if config.dev_mode {
        return true;
    }
    match origin {
        Some(origin) => config.allowed_origins.iter().any(|allowed| allowed == origin),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dev_mode: bool, allowed: Vec<&str>) -> ConnectionConfig {
        ConnectionConfig {
            allowed_origins: allowed.into_iter().map(str::to_string).collect(),
            dev_mode,
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn dev_mode_accepts_any_origin() {
        let cfg = config(true, vec![]);
        assert!(origin_allowed(&cfg, Some("https://evil.example")));
        assert!(origin_allowed(&cfg, None));
    }

    #[test]
    fn production_mode_requires_allow_listed_origin() {
        let cfg = config(false, vec!["https://app.example.com"]);
        assert!(origin_allowed(&cfg, Some("https://app.example.com")));
        assert!(!origin_allowed(&cfg, Some("https://evil.example")));
        assert!(!origin_allowed(&cfg, None));
    }
}
