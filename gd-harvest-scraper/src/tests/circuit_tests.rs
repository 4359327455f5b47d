use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use super::*;

/// Accept one control connection, answer each command line with the next
/// canned reply, and return the commands received.
async fn fake_control_port(
    replies: Vec<&'static str>,
) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let mut received = Vec::new();
        let mut replies = replies.into_iter();
        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line);
            match replies.next() {
                Some(reply) => write_half.write_all(reply.as_bytes()).await.unwrap(),
                None => break,
            }
        }
        received
    });
    (addr, handle)
}

#[test]
fn test_default_socks_ports() {
    let ports = default_socks_ports();
    assert_eq!(ports.len(), 20);
    assert_eq!(ports[0], 9050);
    assert_eq!(ports[1], 9052);
    assert_eq!(ports[19], 9070);
    assert!(!ports.contains(&9051));
}

#[test]
fn test_proxy_url() {
    let circuit = ProxyCircuit {
        index: 3,
        socks_port: Some(9054),
    };
    assert_eq!(
        circuit.proxy_url("127.0.0.1").as_deref(),
        Some("socks5h://127.0.0.1:9054")
    );
    let direct = ProxyCircuit {
        index: 0,
        socks_port: None,
    };
    assert_eq!(direct.proxy_url("127.0.0.1"), None);
    assert_eq!(direct.to_string(), "circuit 0 (direct)");
}

#[test]
fn test_quote_escapes() {
    assert_eq!(quote("password"), "\"password\"");
    assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
}

#[tokio::test]
async fn test_new_identity_exchange() {
    let (addr, server) = fake_control_port(vec!["250 OK\r\n", "250 OK\r\n"]).await;
    TorControl::new(addr, "password").new_identity().await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(received[0], "AUTHENTICATE \"password\"");
    assert_eq!(received[1], "SIGNAL NEWNYM");
}

#[tokio::test]
async fn test_multi_line_reply_accepted() {
    let (addr, server) =
        fake_control_port(vec!["250-AUTH ok\r\n250 OK\r\n", "250 OK\r\n"]).await;
    TorControl::new(addr, "pw").new_identity().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_bad_password_rejected() {
    let (addr, server) =
        fake_control_port(vec!["515 Authentication failed: Password did not match\r\n"]).await;
    let err = TorControl::new(addr, "wrong").new_identity().await.unwrap_err();
    match err {
        RotationError::Rejected { command, code, message } => {
            assert_eq!(command, "AUTHENTICATE");
            assert_eq!(code, "515");
            assert!(message.starts_with("Authentication failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let received = server.await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_closed_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });
    let err = TorControl::new(addr, "pw").new_identity().await.unwrap_err();
    assert!(matches!(err, RotationError::Closed | RotationError::Io(_)));
}

#[tokio::test]
async fn test_silent_control_port_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let _server = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    let err = TorControl::new(addr, "pw")
        .with_timeout(Duration::from_millis(200))
        .new_identity()
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::Timeout(_)));
}

#[tokio::test]
async fn test_disabled_rotator_is_noop() {
    let circuit = ProxyCircuit {
        index: 0,
        socks_port: None,
    };
    Rotator::Disabled.rotate(&circuit).await.unwrap();
}

#[test]
fn test_rotator_from_config() {
    let config = HarvestConfig::default();
    match Rotator::from_config(&config) {
        Rotator::Tor(tor) => assert_eq!(tor.addr(), "127.0.0.1:9051"),
        Rotator::Disabled => panic!("proxying is on by default"),
    }
    let direct = HarvestConfig {
        use_proxy: false,
        ..Default::default()
    };
    assert!(matches!(Rotator::from_config(&direct), Rotator::Disabled));
}
