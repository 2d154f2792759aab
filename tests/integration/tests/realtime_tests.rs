//! End-to-end tests for the realtime update client

use integration_tests::{test_client, test_client_with_heartbeat, TestServer};
use maestro_realtime::{Channel, ConnectionState, EntityKind, EventType};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn subscribe_before_connect_replays_exactly_once() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 3);

    client.subscribe_channel(Channel::new(EntityKind::Student, "42"));
    client.connect().await;

    let mut conn = server.accept().await;
    let frame = conn.recv_json().await;
    assert_eq!(frame["type"], "subscribe");
    assert_eq!(frame["channel"], "student/42/updates");

    // No duplicate subscribe for the same channel.
    assert!(conn.try_recv_json(Duration::from_millis(200)).await.is_none());

    client.disconnect();
}

#[tokio::test]
async fn auth_frame_is_sent_first_when_token_is_stored() {
    let mut server = TestServer::start().await;
    let (client, tokens) = test_client(server.url(), 3);
    tokens.set_token("bearer-xyz");

    client.subscribe_channel(Channel::new(EntityKind::Orchestra, "7"));
    client.connect().await;

    let mut conn = server.accept().await;
    let first = conn.recv_json().await;
    assert_eq!(first["type"], "auth");
    assert_eq!(first["token"], "bearer-xyz");

    let second = conn.recv_json().await;
    assert_eq!(second["type"], "subscribe");
    assert_eq!(second["channel"], "orchestra/7/updates");

    client.disconnect();
}

#[tokio::test]
async fn heartbeat_frames_arrive_while_connected() {
    let mut server = TestServer::start().await;
    let (client, _tokens) =
        test_client_with_heartbeat(server.url(), 3, Duration::from_millis(50));

    client.connect().await;
    let mut conn = server.accept().await;

    let frame = conn.recv_json().await;
    assert_eq!(frame["type"], "heartbeat");
    assert!(frame["timestamp"].is_string());

    client.disconnect();
}

#[tokio::test]
async fn typed_and_wildcard_handlers_run_once_in_order() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 3);

    let calls: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let calls_typed = calls.clone();
    let _typed = client.on(EventType::AttendanceUpdate, move |envelope| {
        assert_eq!(envelope.entity_id.as_deref(), Some("S1"));
        assert_eq!(envelope.data["present"], true);
        calls_typed.lock().push("typed".to_string());
    });
    let calls_any = calls.clone();
    let _any = client.on_any(move |envelope| {
        calls_any.lock().push(format!("wildcard:{}", envelope.event));
    });

    client.connect().await;
    let mut conn = server.accept().await;

    conn.send_text(
        r#"{"type":"attendance_update","data":{"present":true},"entityId":"S1","timestamp":"2025-09-01T10:15:00Z"}"#,
    )
    .await;

    for _ in 0..100 {
        if calls.lock().len() == 2 {
            break;
        }
        settle().await;
    }
    assert_eq!(
        *calls.lock(),
        vec!["typed".to_string(), "wildcard:attendance_update".to_string()]
    );

    client.disconnect();
}

#[tokio::test]
async fn malformed_and_unknown_frames_do_not_break_the_channel() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 3);

    let hits = Arc::new(Mutex::new(0_u32));
    let hits_in = hits.clone();
    let _guard = client.on(EventType::ScheduleUpdate, move |_| {
        *hits_in.lock() += 1;
    });

    client.connect().await;
    let mut conn = server.accept().await;

    conn.send_text("{{{ definitely not json").await;
    conn.send_text(r#"{"type":"grading_update","data":{}}"#).await;
    conn.send_text(r#"{"type":"schedule_update","entityId":"L3"}"#).await;

    for _ in 0..100 {
        if *hits.lock() == 1 {
            break;
        }
        settle().await;
    }
    assert_eq!(*hits.lock(), 1);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
}

#[tokio::test]
async fn abnormal_close_reconnects_and_replays_subscriptions() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 5);

    client.subscribe_channel(Channel::new(EntityKind::Rehearsal, "r-9"));
    client.connect().await;

    let mut first = server.accept().await;
    let frame = first.recv_json().await;
    assert_eq!(frame["type"], "subscribe");

    // Kill the connection without a close handshake.
    first.abort();

    // The client comes back on its own and re-arms the channel.
    let mut second = server.accept().await;
    let replayed = second.recv_json().await;
    assert_eq!(replayed["type"], "subscribe");
    assert_eq!(replayed["channel"], "rehearsal/r-9/updates");

    // A successful reconnect resets the attempt counter.
    for _ in 0..100 {
        if client.is_connected() {
            break;
        }
        settle().await;
    }
    assert_eq!(client.status().reconnect_attempts, 0);

    client.disconnect();
}

#[tokio::test]
async fn server_normal_close_does_not_reconnect() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 5);

    client.connect().await;
    let mut conn = server.accept().await;

    // A code-1000 close is as final as a manual disconnect.
    conn.send_close(CloseCode::Normal).await;

    for _ in 0..100 {
        if client.state() == ConnectionState::Disconnected {
            break;
        }
        settle().await;
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(server.try_accept(Duration::from_millis(500)).await.is_none());
    assert_eq!(client.status().reconnect_attempts, 0);

    // Only an explicit connect() brings the client back.
    client.connect().await;
    let _conn = server.accept().await;
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
}

#[tokio::test]
async fn server_abnormal_close_code_still_reconnects() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 5);

    client.subscribe_channel(Channel::new(EntityKind::Document, "d-1"));
    client.connect().await;

    let mut conn = server.accept().await;
    let frame = conn.recv_json().await;
    assert_eq!(frame["type"], "subscribe");

    // Going-away (1001) is not a normal closure; the client comes back.
    conn.send_close(CloseCode::Away).await;

    let mut second = server.accept().await;
    let replayed = second.recv_json().await;
    assert_eq!(replayed["type"], "subscribe");
    assert_eq!(replayed["channel"], "document/d-1/updates");

    client.disconnect();
}

#[tokio::test]
async fn manual_disconnect_schedules_no_reconnect() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 5);

    client.connect().await;
    let _conn = server.accept().await;

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    assert!(server.try_accept(Duration::from_millis(300)).await.is_none());
    assert_eq!(client.status().reconnect_attempts, 0);
}

#[tokio::test]
async fn reconnect_gives_up_after_max_attempts() {
    // Bind a port, then drop the listener so every dial is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let (client, _tokens) = test_client(&url, 3);
    client.connect().await;

    // Three retries at 20/40/80ms; give them room to fail.
    tokio::time::sleep(Duration::from_millis(600)).await;

    let status = client.status();
    assert!(!status.is_connected);
    assert_eq!(status.reconnect_attempts, 3);

    // No fourth automatic attempt.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(client.status().reconnect_attempts, 3);
}

#[tokio::test]
async fn disconnect_while_connecting_cancels_the_attempt() {
    // TEST-NET-1 blackholes the dial, keeping the client in Connecting.
    let (client, _tokens) = test_client("ws://192.0.2.1:81", 5);

    let dialing = client.clone();
    let task = tokio::spawn(async move { dialing.connect().await });

    settle().await;
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Whenever the abandoned dial resolves, it must not revive the client
    // or schedule a retry.
    let _ = task.await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.status().reconnect_attempts, 0);
}

#[tokio::test]
async fn repeated_connect_calls_open_a_single_connection() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 3);

    client.connect().await;
    client.connect().await;
    client.connect().await;

    let _conn = server.accept().await;
    assert!(server.try_accept(Duration::from_millis(300)).await.is_none());
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
}

#[tokio::test]
async fn subscribe_while_connected_sends_immediately() {
    let mut server = TestServer::start().await;
    let (client, _tokens) = test_client(server.url(), 3);

    client.connect().await;
    let mut conn = server.accept().await;

    client.subscribe_channel(Channel::new(EntityKind::Theory, "T2"));
    let frame = conn.recv_json().await;
    assert_eq!(frame["type"], "subscribe");
    assert_eq!(frame["channel"], "theory/T2/updates");

    client.unsubscribe_channel(&Channel::new(EntityKind::Theory, "T2"));
    let frame = conn.recv_json().await;
    assert_eq!(frame["type"], "unsubscribe");
    assert_eq!(frame["channel"], "theory/T2/updates");

    client.disconnect();
}
