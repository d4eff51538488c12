//! The TCP accept loop and per-connection websocket handshake.
//!
//! Grounded on `astrid_kernel::socket::spawn_socket_server`'s accept loop
//! shape (`TcpListener`/`UnixListener::accept` in a loop, one `tokio::spawn`
//! per connection, accept errors logged and the loop continues) generalized
//! from a length-prefixed Unix Domain Socket IPC frame to a websocket
//! upgrade over TCP, since this engine's transport is a full-duplex message
//! channel rather than a specific wire framing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{debug, info, warn};

use collabhub_core::Participant;
use collabhub_session::connection::origin_allowed;
use collabhub_session::{ClientConnection, Services, SessionHub};

/// What the handshake callback captured from the upgrade request, since the
/// callback itself is synchronous and cannot look anything up.
#[derive(Default, Clone)]
struct HandshakeInfo {
    origin: Option<String>,
    query: String,
}

/// Bind `bind_addr` and accept connections forever, upgrading each to a
/// websocket and handing it to [`ClientConnection::run`]. Runs until the
/// listener itself fails to bind; individual accept/handshake failures are
/// logged and do not stop the loop.
pub async fn run_accept_loop(bind_addr: String, hub: Arc<SessionHub>, services: Arc<Services>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "accept loop bound");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept tcp connection");
                continue;
            },
        };

        let hub = Arc::clone(&hub);
        let services = Arc::clone(&services);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, hub, services).await {
                debug!(%peer, error = %e, "connection handler exited with error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, hub: Arc<SessionHub>, services: Arc<Services>) -> anyhow::Result<()> {
    let captured: Arc<Mutex<HandshakeInfo>> = Arc::new(Mutex::new(HandshakeInfo::default()));
    let captured_in_callback = Arc::clone(&captured);
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let origin = request
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let query = request.uri().query().unwrap_or("").to_string();
        *captured_in_callback.lock().unwrap() = HandshakeInfo { origin, query };
        Ok(response)
    };

    let mut ws_stream = tokio_tungstenite::accept_hdr_async(MaybeTlsStream::Plain(stream), callback).await?;
    let info = captured.lock().unwrap().clone();

    let connection_config = services.config.connection;
    if !origin_allowed(&connection_config, info.origin.as_deref()) {
        warn!(origin = ?info.origin, "rejecting websocket upgrade: origin not allowed");
        let _ = ws_stream.send(Message::Close(None)).await;
        return Ok(());
    }

    let params: HashMap<String, String> = url::form_urlencoded::parse(info.query.as_bytes())
        .into_owned()
        .collect();

    let diagram_id_raw = params
        .get("diagram_id")
        .ok_or_else(|| anyhow::anyhow!("missing diagram_id query parameter"))?;
    let diagram_id = SessionHub::parse_diagram_id(diagram_id_raw)?;

    let provider = params.get("provider").cloned().unwrap_or_else(|| "local".to_string());
    let provider_id = params
        .get("provider_id")
        .ok_or_else(|| anyhow::anyhow!("missing provider_id query parameter"))?;
    let display_name = params.get("display_name").cloned().unwrap_or_else(|| provider_id.clone());
    let email = params.get("email").cloned();

    let user_id = services.user_directory.lookup(&provider, provider_id).await?;
    let Some(role) = services.access_checker.role(user_id, diagram_id).await else {
        debug!(%user_id, %diagram_id, "rejecting connection: no access to diagram");
        let _ = ws_stream.send(Message::Close(None)).await;
        return Ok(());
    };

    let participant = Participant {
        user_id,
        display_name,
        email,
        provider,
        role,
        joined_at: Utc::now(),
    };

    let session = hub.get_or_create(diagram_id).await?;
    let registration_timeout = Duration::from_secs(services.config.session.registration_timeout_secs);

    ClientConnection::run(ws_stream, participant, session, connection_config, registration_timeout).await
}
