//! End-to-end sessions against a live responder.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use tls_ping_responder::config::IdentityFiles;
use tls_ping_responder::lifecycle::startup::{network_channel, ResponderTask, TaskState};
use tls_ping_responder::{Responder, ServerIdentity, SessionEvent, Shutdown, PING_REQUEST};

mod common;
use common::{connect, loopback_config, next_event, start_responder, ClientCert, STEP_TIMEOUT};

async fn read_greeting<S: tokio::io::AsyncRead + Unpin>(stream: &mut S) -> Vec<u8> {
    let mut greeting = vec![0u8; PING_REQUEST.len()];
    tokio::time::timeout(STEP_TIMEOUT, stream.read_exact(&mut greeting))
        .await
        .expect("timed out waiting for the ping request")
        .unwrap();
    greeting
}

#[tokio::test]
async fn test_trusted_client_receives_ping_and_is_logged() {
    let mut server = start_responder(loopback_config()).await;

    let mut client = connect(server.addr, ClientCert::Trusted).await.unwrap();
    assert_eq!(read_greeting(&mut client).await, PING_REQUEST);

    client.write_all(b"hello").await.unwrap();
    client.shutdown().await.unwrap();

    let accepted = next_event(&mut server.events).await;
    let session_id = match accepted {
        SessionEvent::Accepted { session_id, .. } => session_id,
        other => panic!("expected Accepted, got {:?}", other),
    };

    match next_event(&mut server.events).await {
        SessionEvent::Closed {
            session_id: closed_id,
            summary,
            ..
        } => {
            assert_eq!(closed_id, session_id);
            assert!(summary.greeting_sent);
            assert_eq!(summary.bytes_received, 5);
        }
        other => panic!("expected Closed, got {:?}", other),
    }

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_server_closes_after_client_disconnects() {
    let mut server = start_responder(loopback_config()).await;

    let mut client = connect(server.addr, ClientCert::Trusted).await.unwrap();
    let greeting = read_greeting(&mut client).await;
    assert_eq!(greeting.len(), 41);
    assert_eq!(greeting.last(), Some(&0));
    client.shutdown().await.unwrap();

    // Server answers with close_notify, so the client sees a clean EOF and
    // nothing beyond the terminated request.
    let mut rest = Vec::new();
    tokio::time::timeout(STEP_TIMEOUT, client.read_to_end(&mut rest))
        .await
        .expect("server never closed the session")
        .unwrap();
    assert!(rest.is_empty());

    next_event(&mut server.events).await;
    match next_event(&mut server.events).await {
        SessionEvent::Closed { summary, .. } => assert_eq!(summary.bytes_received, 0),
        other => panic!("expected Closed, got {:?}", other),
    }

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_burst_larger_than_one_read_is_counted_in_full() {
    let mut server = start_responder(loopback_config()).await;

    let mut client = connect(server.addr, ClientCert::Trusted).await.unwrap();
    read_greeting(&mut client).await;
    client.write_all(&vec![b'x'; 3000]).await.unwrap();
    client.shutdown().await.unwrap();

    next_event(&mut server.events).await;
    match next_event(&mut server.events).await {
        SessionEvent::Closed { summary, .. } => {
            assert_eq!(summary.bytes_received, 3000);
            assert!(summary.reads >= 3);
            assert!(summary.largest_read <= 1023);
        }
        other => panic!("expected Closed, got {:?}", other),
    }

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_clients_are_served_one_at_a_time() {
    let mut server = start_responder(loopback_config()).await;

    let mut first = connect(server.addr, ClientCert::Trusted).await.unwrap();
    read_greeting(&mut first).await;

    // The second client's TCP connect lands in the backlog, but nobody runs
    // its handshake until the first session is gone.
    let addr = server.addr;
    let second = tokio::spawn(async move { connect(addr, ClientCert::Trusted).await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!second.is_finished());
    assert_eq!(server.tracker.active_count(), 1);

    first.shutdown().await.unwrap();

    let mut second = tokio::time::timeout(STEP_TIMEOUT, second)
        .await
        .expect("second client was never served")
        .unwrap()
        .unwrap();
    assert_eq!(read_greeting(&mut second).await, PING_REQUEST);
    second.write_all(b"second").await.unwrap();
    second.shutdown().await.unwrap();

    let mut closed = Vec::new();
    while closed.len() < 2 {
        if let SessionEvent::Closed { summary, .. } = next_event(&mut server.events).await {
            closed.push(summary.bytes_received);
        }
    }
    assert_eq!(closed, vec![0, 6]);
    assert_eq!(server.tracker.peak_active(), 1);

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pem_identity_from_files() {
    let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    let mut config = loopback_config();
    config.tls.identity = Some(IdentityFiles {
        ca_cert_path: format!("{}/ca.pem", fixtures),
        cert_path: format!("{}/server.pem", fixtures),
        key_path: format!("{}/server.key.pem", fixtures),
    });

    let identity = ServerIdentity::from_config(&config.tls).unwrap();
    let responder = Responder::bind(&config, &identity).unwrap();
    let addr = responder.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(responder.run(shutdown.subscribe()));

    let mut client = connect(addr, ClientCert::Trusted).await.unwrap();
    assert_eq!(read_greeting(&mut client).await, PING_REQUEST);
    client.shutdown().await.unwrap();

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_task_serves_once_network_is_ready() {
    let shutdown = Shutdown::new();
    let (monitor, ready) = network_channel();
    let mut task = ResponderTask::launch(ready, loopback_config(), &shutdown);
    let mut events = task.subscribe();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(task.state(), TaskState::WaitingForNetwork);

    monitor.station_got_ip("127.0.0.1".parse().unwrap());
    let addr = tokio::time::timeout(STEP_TIMEOUT, task.wait_running())
        .await
        .unwrap()
        .expect("task terminated during setup");

    let mut client = connect(addr, ClientCert::Trusted).await.unwrap();
    assert_eq!(read_greeting(&mut client).await, PING_REQUEST);
    client.write_all(b"pong").await.unwrap();
    client.shutdown().await.unwrap();

    next_event(&mut events).await;
    match next_event(&mut events).await {
        SessionEvent::Closed { summary, .. } => assert_eq!(summary.bytes_received, 4),
        other => panic!("expected Closed, got {:?}", other),
    }

    shutdown.trigger();
    task.join().await.unwrap();
}
