//! Socket-level tests against an in-process server.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use stackwatch_core::{decode_frame, Connector, StreamError};
use stackwatch_ws::{StaticSession, WsConnector};

fn connector(link: &str) -> WsConnector {
    let session = StaticSession::new()
        .with_capability("subscribe", link)
        .with_bearer_token("secret");
    WsConnector::new(Arc::new(session))
}

#[tokio::test]
async fn missing_capability_is_unauthorized() {
    let connector = WsConnector::new(Arc::new(StaticSession::new()));
    let err = connector.connect().await.err().unwrap();
    assert!(matches!(err, StreamError::Unauthorized));
}

#[tokio::test]
async fn non_101_response_is_handshake_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let _ = sock.read(&mut buf).await;
        sock.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();
    });

    let err = connector(&format!("http://{addr}/v2/subscribe"))
        .connect()
        .await
        .err()
        .unwrap();
    match err {
        StreamError::Handshake { status, reason } => {
            assert_eq!(status, 200);
            assert_eq!(reason, "OK");
        }
        other => panic!("expected handshake error, got {other:?}"),
    }
}

#[tokio::test]
async fn frames_flow_until_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        let mut seen_uri = String::new();
        let mut seen_auth = String::new();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            seen_uri = req.uri().to_string();
            seen_auth = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(sock, callback)
            .await
            .unwrap();

        let first = serde_json::json!({
            "name": "resource.change",
            "resourceType": "container",
            "resourceId": "1i1",
            "data": {"resource": {"id": "1i1"}}
        });
        ws.send(Message::Text(first.to_string())).await.unwrap();
        ws.send(Message::Ping(vec![1])).await.unwrap();
        ws.send(Message::Text("{broken".into())).await.unwrap();
        ws.send(Message::Binary(br#"{"name":"ping"}"#.to_vec())).await.unwrap();
        ws.close(None).await.unwrap();
        (seen_uri, seen_auth)
    });

    let mut frames = connector(&format!("http://{addr}/v2/subscribe"))
        .connect()
        .await
        .unwrap();

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(decode_frame(&first).unwrap().resource_id, "1i1");

    // the malformed frame is still delivered; skipping it is the reader's job
    let broken = frames.next().await.unwrap().unwrap();
    assert!(decode_frame(&broken).is_err());

    let ping = frames.next().await.unwrap().unwrap();
    assert_eq!(decode_frame(&ping).unwrap().name, "ping");

    let end = frames.next().await.unwrap();
    assert!(matches!(end, Err(StreamError::Transport(_))));
    assert!(frames.next().await.is_none());

    let (uri, auth) = server.await.unwrap();
    assert_eq!(
        uri,
        "/v2/subscribe?eventNames=resource.change&eventNames=service.kubernetes.change"
    );
    assert_eq!(auth, "Bearer secret");
}
