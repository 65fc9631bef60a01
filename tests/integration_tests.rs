//! Integration tests for Leek
//!
//! Everything runs over loopback sockets: a real listener on an ephemeral
//! port and the direct transport standing in for the Tor proxy.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use leek::config::{Encryption, SendMode, TransportConfig};
use leek::crypto::{load_or_create_key, SessionKey};
use leek::listener::{INVALID_CIPHERTEXT_BODY, INVALID_FORMAT_BODY, INVALID_JSON_BODY};
use leek::message::{EncryptedCodec, PlainCodec, SharedCodec};
use leek::{
    AutoSender, Dispatcher, DirectTransport, FixedAddress, InteractiveSender, Listener,
    ScriptedLines, SendOutcome, Session, SessionConfig,
};

/// Start a listener on a free port and return its address.
async fn start_listener(codec: SharedCodec) -> String {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), codec)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    listener.spawn();
    addr.to_string()
}

/// Send raw bytes and return the raw response.
async fn raw_exchange(addr: &str, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn post_request(body: &str) -> Vec<u8> {
    format!(
        "POST / HTTP/1.1\r\nHost: peer.onion\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

fn dispatcher(codec: SharedCodec, addr: &str) -> Dispatcher {
    Dispatcher::new(codec, Arc::new(DirectTransport::new(addr)), "me.onion")
}

/// A plaintext text envelope posted by hand is acknowledged.
#[tokio::test]
async fn test_plaintext_post_acknowledged() {
    let addr = start_listener(Arc::new(PlainCodec::new())).await;

    let body = r#"{"sender":"abc.onion","timestamp":"2024-01-01T00:00:00Z","type":"text","content":"hi"}"#;
    let response = raw_exchange(&addr, &post_request(body)).await;

    assert!(response.starts_with("HTTP/1.1 200"), "got {}", response);
    assert!(response.ends_with("\r\n\r\nOK"), "got {}", response);
}

/// Rejections carry the documented literal bodies.
#[tokio::test]
async fn test_rejection_bodies() {
    let addr = start_listener(Arc::new(PlainCodec::new())).await;

    let missing = r#"{"sender":"a","timestamp":"t","type":"text"}"#;
    let response = raw_exchange(&addr, &post_request(missing)).await;
    assert!(response.starts_with("HTTP/1.1 400"));
    assert!(response.ends_with(INVALID_FORMAT_BODY));

    let response = raw_exchange(&addr, &post_request("not json")).await;
    assert!(response.starts_with("HTTP/1.1 400"));
    assert!(response.ends_with(INVALID_JSON_BODY));
}

/// Methods other than POST are refused without touching the codec.
#[tokio::test]
async fn test_get_is_unsupported() {
    let addr = start_listener(Arc::new(PlainCodec::new())).await;

    let response = raw_exchange(&addr, b"GET / HTTP/1.1\r\nHost: peer.onion\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 501"), "got {}", response);
}

/// The listener keeps serving after a malformed request.
#[tokio::test]
async fn test_listener_survives_garbage() {
    let addr = start_listener(Arc::new(PlainCodec::new())).await;

    let response = raw_exchange(&addr, b"\x00\x01\x02 nonsense\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 500"), "got {}", response);

    let outcome = dispatcher(Arc::new(PlainCodec::new()), &addr)
        .send_text(1, "still there?")
        .await;
    assert!(outcome.is_delivered());
}

/// Both peers sharing a key can talk.
#[tokio::test]
async fn test_encrypted_end_to_end() {
    let key = SessionKey::generate();
    let addr = start_listener(Arc::new(EncryptedCodec::new(key.clone()))).await;

    let outcome = dispatcher(Arc::new(EncryptedCodec::new(key)), &addr)
        .send_text(1, "sealed hello")
        .await;
    assert!(outcome.is_delivered());
}

/// Mismatched keys are rejected as ciphertext failures.
#[tokio::test]
async fn test_key_mismatch_rejected() {
    let addr = start_listener(Arc::new(EncryptedCodec::new(SessionKey::generate()))).await;

    let outcome = dispatcher(Arc::new(EncryptedCodec::new(SessionKey::generate())), &addr)
        .send_text(1, "wrong key")
        .await;
    match outcome {
        SendOutcome::Refused { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, INVALID_CIPHERTEXT_BODY);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

/// A plaintext sender cannot talk to an encrypted listener.
#[tokio::test]
async fn test_mode_mismatch_rejected() {
    let addr = start_listener(Arc::new(EncryptedCodec::new(SessionKey::generate()))).await;

    let outcome = dispatcher(Arc::new(PlainCodec::new()), &addr)
        .send_text(1, "plain")
        .await;
    assert!(matches!(outcome, SendOutcome::Refused { status: 400, .. }));
}

/// An unreachable peer fails every step while the counter keeps counting.
#[tokio::test]
async fn test_autosender_unreachable_peer() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = closed.local_addr().unwrap().to_string();
    drop(closed);

    let mut sender = AutoSender::new(dispatcher(Arc::new(PlainCodec::new()), &addr))
        .with_interval(Duration::ZERO);

    for n in 1..=5 {
        assert_eq!(sender.counter(), n);
        assert!(matches!(sender.step().await, SendOutcome::Failed(_)));
    }
    assert_eq!(sender.counter(), 6);
}

/// The autosender delivers numbered messages to a live peer.
#[tokio::test]
async fn test_autosender_delivers() {
    let addr = start_listener(Arc::new(PlainCodec::new())).await;
    let mut sender = AutoSender::new(dispatcher(Arc::new(PlainCodec::new()), &addr))
        .with_interval(Duration::ZERO);

    assert!(sender.step().await.is_delivered());
    assert!(sender.step().await.is_delivered());
    assert_eq!(sender.counter(), 3);
}

/// The first encrypted run creates the key, the second loads the same bytes.
#[test]
fn test_key_persists_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.env");

    let first = load_or_create_key(&path).unwrap();
    assert!(path.exists());
    let second = load_or_create_key(&path).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

/// Each typed line is sent once and `exit` ends the session.
#[tokio::test]
async fn test_interactive_sender_over_socket() {
    let addr = start_listener(Arc::new(PlainCodec::new())).await;
    let mut sender = InteractiveSender::new(dispatcher(Arc::new(PlainCodec::new()), &addr));
    let mut lines = ScriptedLines::new(["first", "second", "  exit  ", "third"]);

    let attempts = sender.run(&mut lines).await.unwrap();
    assert_eq!(attempts, 2);
    assert_eq!(lines.remaining(), 1);
}

/// Two full sessions, one talking to the other directly.
#[tokio::test]
async fn test_two_sessions_talk() {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("shared.env");

    let mut transport = TransportConfig::default();
    transport.listen_addr = "127.0.0.1:0".parse().unwrap();

    let mut bob_config = SessionConfig::new(transport.clone(), &key_file);
    bob_config.peer = Some("alice.onion".into());
    bob_config.send_mode = Some(SendMode::Manual);
    bob_config.encryption = Some(Encryption::Encrypted);
    let bob = Session::new(bob_config, FixedAddress("bob.onion".into()));
    let bob_prepared = bob.prepare(&mut ScriptedLines::default()).await.unwrap();
    let bob_addr = bob_prepared.listen_addr().unwrap();
    let (_bob_running, bob_listener) = bob_prepared.start_listener();

    let mut alice_config = SessionConfig::new(transport, &key_file);
    alice_config.direct = Some(bob_addr.to_string());
    alice_config.qr_output = Some(dir.path().join("alice.txt"));
    let alice = Session::new(alice_config, FixedAddress("alice.onion".into()));

    let mut input = ScriptedLines::new(["http://bob.onion", "2", "y", "hello bob", "exit"]);
    let prepared = alice.prepare(&mut input).await.unwrap();
    assert_eq!(prepared.mode.to_string(), "encrypted-manual");
    assert!(dir.path().join("alice.txt").exists());

    let (running, alice_listener) = prepared.start_listener();
    running.send(&mut input).await.unwrap();
    assert_eq!(input.remaining(), 0);

    // Bob's listener accepts a message sealed with the shared key
    let key = load_or_create_key(&key_file).unwrap();
    let outcome = dispatcher(Arc::new(EncryptedCodec::new(key)), &bob_addr.to_string())
        .send_text(2, "are you there?")
        .await;
    assert!(outcome.is_delivered());

    alice_listener.abort();
    bob_listener.abort();
}
