//! WebSocket log stream adapter.
//!
//! Connects to `{ws-server}/api/stream/{kind}/{target}`; every text or
//! binary frame carries one JSON log entry.

use desk_sync::{ErrorInfo, ErrorKind};
use desk_tail::{LogEntry, LogStream, LogStreamService, OpenFuture, TailRequest};
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, trace};
use url::Url;

use crate::client::{classify_status, endpoint};

/// [`LogStreamService`] over the console's WebSocket stream endpoints.
#[derive(Debug, Clone)]
pub struct WsLogStream {
    base: Url,
    token: Option<String>,
}

impl WsLogStream {
    /// Create an adapter for a `ws://` or `wss://` base URL.
    #[must_use]
    pub const fn new(base: Url, token: Option<String>) -> Self {
        Self { base, token }
    }

    /// Endpoint URL for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn stream_url(&self, request: &TailRequest) -> Result<Url, ErrorInfo> {
        endpoint(&self.base, &["api", "stream", request.kind(), request.target()])
    }
}

impl LogStreamService for WsLogStream {
    fn subscribe(&self, request: &TailRequest) -> OpenFuture {
        let url = self.stream_url(request);
        let token = self.token.clone();
        Box::pin(async move {
            let url = url?;
            let mut ws_request = url
                .as_str()
                .into_client_request()
                .map_err(|e| ErrorInfo::transport(format!("invalid stream URL: {e}")))?;
            if let Some(token) = token {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ErrorInfo::auth(format!("invalid token: {e}")))?;
                ws_request.headers_mut().insert(AUTHORIZATION, value);
            }

            debug!(%url, "connecting log stream");
            let (ws, _response) = connect_async(ws_request).await.map_err(classify_ws)?;

            let entries = futures::stream::unfold(ws, |mut ws| async move {
                loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            return Some((decode_entry(text.as_bytes()), ws));
                        }
                        Some(Ok(Message::Binary(data))) => return Some((decode_entry(&data), ws)),
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "log stream closed by server");
                            return None;
                        }
                        Some(Ok(other)) => trace!(?other, "ignoring control frame"),
                        Some(Err(e)) => {
                            return Some((Err(ErrorInfo::transport(e.to_string())), ws));
                        }
                        None => return None,
                    }
                }
            });

            let stream: LogStream = Box::pin(entries);
            Ok::<_, ErrorInfo>(stream)
        })
    }
}

/// Decode one pushed frame.
///
/// A payload that arrives as a JSON-encoded string is decoded in place.
pub fn decode_entry(data: &[u8]) -> Result<LogEntry, ErrorInfo> {
    let mut entry: LogEntry = serde_json::from_slice(data)
        .map_err(|e| ErrorInfo::protocol(format!("invalid log entry: {e}")))?;

    let decoded = match &entry.payload {
        serde_json::Value::String(body) => serde_json::from_str(body).ok(),
        _ => None,
    };
    if let Some(decoded) = decoded {
        entry.payload = decoded;
    }
    Ok(entry)
}

fn classify_ws(err: tungstenite::Error) -> ErrorInfo {
    match &err {
        tungstenite::Error::Http(response) => {
            let kind = reqwest::StatusCode::from_u16(response.status().as_u16())
                .map_or(ErrorKind::Server, classify_status);
            ErrorInfo::new(kind, format!("stream rejected: {}", response.status()))
        }
        tungstenite::Error::Url(_) => ErrorInfo::transport(format!("invalid stream URL: {err}")),
        _ => ErrorInfo::transport(err.to_string()),
    }
}
