use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tungstenite::HandshakeError;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::{Message, Role, WebSocket};

use super::{Client, ClientId, Hub};

/// Endpoint served on the live-reload port.
pub const WS_PATH: &str = "/__forge/ws";

/// A client that never finishes its upgrade request is dropped after this.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Writing half of a browser connection.
struct WsClient {
    ws: WebSocket<TcpStream>,
}

impl Client for WsClient {
    fn send(&mut self, text: &str) -> tungstenite::Result<()> {
        self.ws.send(Message::text(text.to_owned()))
    }

    fn close(&mut self) {
        let _ = self.ws.close(None);
        let _ = self.ws.flush();
        // Unblocks the reader thread
        let _ = self.ws.get_ref().shutdown(Shutdown::Both);
    }
}

/// Upgrade a freshly accepted socket, register it and spawn its reader.
///
/// Requests for any path other than [`WS_PATH`] are answered with 404.
pub fn accept(hub: &Arc<Hub>, stream: TcpStream) -> tungstenite::Result<ClientId> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

    let ws = tungstenite::accept_hdr(stream, only_reload_path).map_err(|e| match e {
        HandshakeError::Failure(e) => e,
        HandshakeError::Interrupted(_) => tungstenite::Error::Io(io::ErrorKind::WouldBlock.into()),
    })?;
    ws.get_ref().set_read_timeout(None)?;

    let reader = ws.get_ref().try_clone()?;
    let id = hub.register(Box::new(WsClient { ws }));

    let hub_for_reader = Arc::clone(hub);
    let spawned = thread::Builder::new()
        .name(format!("ws-reader-{id}"))
        .spawn(move || read_until_closed(&hub_for_reader, id, reader));

    if let Err(e) = spawned {
        hub.unregister(id);
        return Err(e.into());
    }
    Ok(id)
}

fn only_reload_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == WS_PATH {
        return Ok(response);
    }
    let mut rejected = ErrorResponse::new(Some("404 Not Found".to_owned()));
    *rejected.status_mut() = StatusCode::NOT_FOUND;
    Err(rejected)
}

/// Block on the read half until the peer goes away, then unregister.
///
/// Inbound payloads are not interpreted.
fn read_until_closed(hub: &Hub, id: ClientId, stream: TcpStream) {
    let mut ws = WebSocket::from_raw_socket(stream, Role::Server, None);
    loop {
        match ws.read() {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    hub.unregister(id);
}
