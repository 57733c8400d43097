// ============================================
// File: crates/ooband-server/tests/smtp_flow.rs
// ============================================
//! End-to-end capture: a real client registers over the HTTP API, a
//! message and an HTTP request arrive over real sockets, and the client polls
//! and decrypts them.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use ooband_client::{Client, ClientOptions, Protocol};
use ooband_core::protocol::identifier::reflect_label;
use ooband_server::{Server, ServerConfig};

fn local_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.network.domain = "127.0.0.1".into();
    config.network.listen_ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.network.protocols = vec![Protocol::Http, Protocol::Smtp];
    config.network.http_port = 0;
    config.network.smtp_ports = vec![0];
    config
}

/// Reads one (possibly multi-line) SMTP reply and returns its code.
async fn read_reply<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.len() >= 4, "short reply: {line:?}");
        if line.as_bytes()[3] == b' ' {
            return line[..3].to_owned();
        }
    }
}

async fn send_mail(addr: SocketAddr, recipient: &str) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    assert_eq!(read_reply(&mut reader).await, "220");
    let dialogue = [
        ("EHLO scanner.test\r\n".to_owned(), "250"),
        ("MAIL FROM:<sender@scanner.test>\r\n".to_owned(), "250"),
        (format!("RCPT TO:<{recipient}>\r\n"), "250"),
        ("DATA\r\n".to_owned(), "354"),
        ("Subject: hello\r\n\r\n..dot stuffed\r\n.\r\n".to_owned(), "250"),
        ("QUIT\r\n".to_owned(), "221"),
    ];
    for (command, expected) in dialogue {
        writer.write_all(command.as_bytes()).await.unwrap();
        assert_eq!(read_reply(&mut reader).await, expected, "after {command:?}");
    }
}

async fn send_request(addr: SocketAddr, host: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET /landing HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_smtp_and_http_interactions_reach_client() {
    let server = Server::new(local_config());
    let running = server.start().await.unwrap();
    let http_addr = running.addrs().http;
    let smtp_addr = running.addrs().smtp[0];

    let client = Client::new(ClientOptions::new(format!("http://{http_addr}")))
        .await
        .unwrap();
    assert_eq!(running.registry().count(), 1);

    let mail_host = client.url();
    send_mail(smtp_addr, &format!("victim@{mail_host}")).await;

    let http_host = client.url();
    let response = send_request(http_addr, &http_host).await;
    assert!(response.starts_with("HTTP/1.1 200"));
    let label = http_host.split('.').next().unwrap();
    assert!(response.contains(&reflect_label(&http_host, label.len())));

    let interactions = client.poll().await.unwrap();
    assert_eq!(interactions.len(), 2);

    let smtp = &interactions[0];
    assert_eq!(smtp.protocol, Protocol::Smtp);
    assert_eq!(smtp.unique_id, mail_host.split('.').next().unwrap());
    assert_eq!(smtp.smtp_from.as_deref(), Some("sender@scanner.test"));
    assert_eq!(smtp.remote_address, "127.0.0.1");
    assert!(smtp.raw_request.contains(".dot stuffed"));
    assert!(!smtp.raw_request.contains("..dot"));

    let http = &interactions[1];
    assert_eq!(http.protocol, Protocol::Http);
    assert_eq!(http.unique_id, label);
    assert!(http.raw_request.starts_with("GET /landing"));

    assert!(client.poll().await.unwrap().is_empty());

    client.close().await.unwrap();
    assert_eq!(running.registry().count(), 0);

    server.shutdown();
    running.join().await;
}

#[tokio::test]
async fn test_unregistered_mail_is_accepted_but_not_stored() {
    let server = Server::new(local_config());
    let running = server.start().await.unwrap();

    send_mail(running.addrs().smtp[0], "user@short.domain.com").await;
    assert_eq!(running.registry().count(), 0);

    server.shutdown();
    running.join().await;
}
