//! `WsConnector` — resolves the subscribe capability and opens the event
//! socket.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use stackwatch_core::{Connector, FrameStream, StreamError};

use crate::session::Session;

/// Schema name of the capability that grants access to the event socket.
pub const SUBSCRIBE_CAPABILITY: &str = "subscribe";

/// Event names requested from the server unless overridden.
pub const DEFAULT_EVENT_NAMES: &[&str] = &["resource.change", "service.kubernetes.change"];

/// Connector for the platform's WebSocket event stream.
pub struct WsConnector {
    session: Arc<dyn Session>,
    event_names: Vec<String>,
}

impl WsConnector {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            event_names: DEFAULT_EVENT_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the requested `eventNames`.
    pub fn with_event_names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.event_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn event_names(&self) -> &[String] {
        &self.event_names
    }

    /// Resolve the subscribe capability into the socket URL.
    pub async fn stream_url(&self) -> Result<Url, StreamError> {
        let capability = self
            .session
            .capability(SUBSCRIBE_CAPABILITY)
            .await
            .ok_or(StreamError::Unauthorized)?;
        build_stream_url(&capability.collection, &self.event_names)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<FrameStream, StreamError> {
        let url = self.stream_url().await?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| StreamError::InvalidUrl {
                link: url.to_string(),
                reason: e.to_string(),
            })?;
        self.session.authorize(&mut request)?;

        info!(url = %url, "opening event stream");
        let (ws, response) = match connect_async(request).await {
            Ok(conn) => conn,
            Err(WsError::Http(response)) => {
                check_upgrade(response.status())?;
                return Err(StreamError::Transport("upgrade rejected".into()));
            }
            Err(e) => return Err(StreamError::Transport(e.to_string())),
        };
        check_upgrade(response.status())?;
        info!(url = %url, "event stream open");

        Ok(frames(ws))
    }
}

/// Turn a capability collection link into the event socket URL.
///
/// `http` becomes `ws` and `https` becomes `wss`; path and existing query
/// are kept, and one `eventNames` pair is appended per name.
pub fn build_stream_url(link: &str, event_names: &[String]) -> Result<Url, StreamError> {
    let invalid = |reason: String| StreamError::InvalidUrl {
        link: link.to_string(),
        reason,
    };
    let mut url = Url::parse(link).map_err(|e| invalid(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch scheme to '{scheme}'")))?;

    {
        let mut query = url.query_pairs_mut();
        for name in event_names {
            query.append_pair("eventNames", name);
        }
    }
    Ok(url)
}

/// Accept only `101 Switching Protocols`.
pub fn check_upgrade(status: StatusCode) -> Result<(), StreamError> {
    if status == StatusCode::SWITCHING_PROTOCOLS {
        return Ok(());
    }
    Err(StreamError::Handshake {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
    })
}

/// Adapt an open socket into a [`FrameStream`].
///
/// Text and binary messages become frames. A close or read error is yielded
/// once as a transport error, after which the stream ends.
fn frames<S>(ws: WebSocketStream<S>) -> FrameStream
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    Box::pin(futures::stream::unfold(Some(ws), |state| async move {
        let mut ws = state?;
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    debug!(len = text.len(), "text frame");
                    return Some((Ok(Bytes::from(text)), Some(ws)));
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "binary frame");
                    return Some((Ok(Bytes::from(data)), Some(ws)));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "event stream closed by server");
                    let err = StreamError::Transport("connection closed by server".into());
                    return Some((Err(err), None));
                }
                // tungstenite queues the pong itself and flushes it on the next read
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    warn!(error = %e, "event stream read failed");
                    return Some((Err(StreamError::Transport(e.to_string())), None));
                }
                None => {
                    let err = StreamError::Transport("connection closed".into());
                    return Some((Err(err), None));
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        DEFAULT_EVENT_NAMES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn https_becomes_wss_and_keeps_query() {
        let url = build_stream_url("https://rancher.example.com/v2-beta/projects/1a5/subscribe?sockId=3", &names())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://rancher.example.com/v2-beta/projects/1a5/subscribe?sockId=3\
             &eventNames=resource.change&eventNames=service.kubernetes.change"
        );
    }

    #[test]
    fn http_becomes_ws_and_keeps_port() {
        let url = build_stream_url("http://10.0.0.4:8080/v2/subscribe", &names()).unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(8080));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("eventNames".into(), "resource.change".into()),
                ("eventNames".into(), "service.kubernetes.change".into()),
            ]
        );
    }

    #[test]
    fn malformed_link_is_invalid_url() {
        let err = build_stream_url("::not a url::", &names()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidUrl { .. }));
        let err = build_stream_url("ftp://host/subscribe", &names()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidUrl { reason, .. } if reason.contains("ftp")));
    }

    #[test]
    fn only_101_passes() {
        assert!(check_upgrade(StatusCode::SWITCHING_PROTOCOLS).is_ok());
        let err = check_upgrade(StatusCode::OK).unwrap_err();
        assert!(matches!(err, StreamError::Handshake { status: 200, ref reason } if reason == "OK"));
    }
}
