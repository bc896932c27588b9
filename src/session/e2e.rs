//! Scenario tests driving a stub HTTP signer and a stub push-channel socket
//! end to end, per the design's end-to-end scenario list. These live inside
//! the crate (rather than in `tests/e2e.rs`) because they need to build raw
//! `codec::proto` fixtures, which aren't part of the crate's public surface.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::codec::proto;
use crate::config::ClientConfigBuilder;
use crate::hub::ClientHub;
use crate::model::Event;

/// Starts a one-shot websocket server: accepts a single connection, sends
/// `frames` as binary messages (a short delay between each so the reader
/// task processes them one at a time), then closes the socket.
async fn spawn_push_stub(frames: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            let _ = ws.send(WsMessage::Binary(frame)).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = ws.close(None).await;
    });

    format!("ws://{addr}")
}

fn push_frame(response: proto::WebcastResponse) -> Vec<u8> {
    proto::PushFrame {
        log_id: 1,
        payload_type: "msg".to_string(),
        payload: response.encode_to_vec(),
    }
    .encode_to_vec()
}

fn chat_message(text: &str) -> proto::Message {
    proto::Message {
        method: "WebcastChatMessage".to_string(),
        payload: proto::ChatMessage {
            common: Some(proto::Common {
                method: "WebcastChatMessage".to_string(),
                create_time: 1700000000,
                display_text: None,
                room_id: "7123".to_string(),
            }),
            user: None,
            content: text.to_string(),
        }
        .encode_to_vec(),
    }
}

fn viewers_message(total: u64) -> proto::Message {
    proto::Message {
        method: "WebcastRoomUserSeqMessage".to_string(),
        payload: proto::RoomUserSeqMessage { total }.encode_to_vec(),
    }
}

fn control_message(action: i32) -> proto::Message {
    proto::Message {
        method: "WebcastControlMessage".to_string(),
        payload: proto::ControlMessage {
            common: Some(proto::Common {
                method: "WebcastControlMessage".to_string(),
                create_time: 1700000000,
                display_text: None,
                room_id: "7123".to_string(),
            }),
            action,
        }
        .encode_to_vec(),
    }
}

/// Mounts a `webcast/fetch/` responder standing in for the signer, and
/// returns a hub configured to sign through it.
async fn hub_signed_via(handshake_response: proto::WebcastResponse) -> (MockServer, ClientHub) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webcast/fetch/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(handshake_response.encode_to_vec()))
        .mount(&server)
        .await;

    let config = ClientConfigBuilder::default()
        .signing_url(format!("{}/", server.uri()))
        .disable_signing_limits_validation()
        .build();
    let hub = ClientHub::new(config).await.unwrap();
    (server, hub)
}

#[tokio::test]
async fn happy_path_backlog_then_live_frames_then_disconnect() {
    let push_url = spawn_push_stub(vec![
        push_frame(proto::WebcastResponse {
            cursor: "c2".to_string(),
            messages: vec![chat_message("live one")],
            ..Default::default()
        }),
        push_frame(proto::WebcastResponse {
            cursor: "c3".to_string(),
            messages: vec![chat_message("live two")],
            ..Default::default()
        }),
        push_frame(proto::WebcastResponse {
            cursor: "c4".to_string(),
            messages: vec![viewers_message(42)],
            ..Default::default()
        }),
    ])
    .await;

    let mut route_params = HashMap::new();
    route_params.insert("cursor".to_string(), "abc".to_string());
    let (_server, hub) = hub_signed_via(proto::WebcastResponse {
        cursor: "c1".to_string(),
        push_server: push_url,
        route_params_map: route_params,
        messages: vec![chat_message("backlog one"), chat_message("backlog two"), chat_message("backlog three")],
        ..Default::default()
    })
    .await;

    let session = hub.track_room("7123").await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = session.recv().await {
        events.push(event);
    }

    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::Chat(_) => "chat",
            Event::Viewers(_) => "viewers",
            Event::Disconnect(_) => "disconnect",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["chat", "chat", "chat", "chat", "chat", "viewers", "disconnect"]);

    match &events[5] {
        Event::Viewers(v) => assert_eq!(v.viewer_count, 42),
        other => panic!("expected Viewers event, got {other:?}"),
    }
    // The first three chats came from the handshake backlog.
    for event in &events[0..3] {
        match event {
            Event::Chat(c) => assert!(c.meta.is_history),
            other => panic!("expected backlog Chat event, got {other:?}"),
        }
    }
    // The two live chats did not travel through the backlog path.
    for event in &events[3..5] {
        match event {
            Event::Chat(c) => assert!(!c.meta.is_history),
            other => panic!("expected live Chat event, got {other:?}"),
        }
    }

    assert_eq!(session.cursor().await, "c4");
}

#[tokio::test]
async fn stream_ended_control_tears_down_session_within_fifty_millis() {
    let push_url = spawn_push_stub(vec![push_frame(proto::WebcastResponse {
        cursor: "c2".to_string(),
        messages: vec![control_message(3)], // STREAM_ENDED
        ..Default::default()
    })])
    .await;

    let mut route_params = HashMap::new();
    route_params.insert("cursor".to_string(), "abc".to_string());
    let (_server, hub) = hub_signed_via(proto::WebcastResponse {
        cursor: "c1".to_string(),
        push_server: push_url,
        route_params_map: route_params,
        ..Default::default()
    })
    .await;

    let session = hub.track_room("7123").await.unwrap();

    let control = session.recv().await.unwrap();
    assert!(matches!(control, Event::Control(ref c) if c.action.ends_stream()));

    let disconnect = tokio::time::timeout(Duration::from_millis(50), session.recv())
        .await
        .expect("session should close within 50ms of STREAM_ENDED");
    assert!(matches!(disconnect, Some(Event::Disconnect(_))));
    assert!(session.recv().await.is_none());
}
