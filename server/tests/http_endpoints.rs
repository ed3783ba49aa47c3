#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests over a real socket.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use wohnfair_ml_config::Settings;
use wohnfair_ml_server::{HttpServer, ServerConfig};

struct RawResponse {
    status_line: String,
    headers: String,
    body: String,
}

fn get(addr: SocketAddr, path: &str) -> RawResponse {
    request(addr, "GET", path)
}

fn request(addr: SocketAddr, method: &str, path: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    write!(
        stream,
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();
    stream.flush().unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).expect("read response");
    let (head, body) = raw.split_once("\r\n\r\n").expect("header terminator");
    let (status_line, headers) = head.split_once("\r\n").unwrap_or((head, ""));
    RawResponse {
        status_line: status_line.to_string(),
        headers: headers.to_ascii_lowercase(),
        body: body.to_string(),
    }
}

fn start(workers: usize) -> (SocketAddr, wohnfair_ml_server::ShutdownHandle, std::thread::JoinHandle<()>) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        workers,
        ..ServerConfig::from_settings(&Settings::default())
    };
    let server = HttpServer::bind(config).expect("bind");
    let addr = server.local_addr().expect("ip listener");
    let shutdown = server.shutdown_handle();
    let handle = std::thread::spawn(move || server.run().expect("server run"));
    (addr, shutdown, handle)
}

#[test]
fn healthz_and_status() {
    let (addr, shutdown, handle) = start(2);

    let health = get(addr, "/healthz");
    assert!(health.status_line.starts_with("HTTP/1.1 200"), "{}", health.status_line);
    assert_eq!(health.body, "ok\n");
    assert!(health.headers.contains("content-type: text/plain; charset=utf-8"));

    let status = get(addr, "/status");
    assert!(status.status_line.starts_with("HTTP/1.1 200"));
    assert_eq!(status.body, "running\n");

    shutdown.shutdown();
    handle.join().unwrap();
}

#[test]
fn metrics_exposition_counts_requests() {
    let (addr, shutdown, handle) = start(1);

    get(addr, "/healthz");
    get(addr, "/healthz");
    let metrics = get(addr, "/metrics");

    assert!(metrics.status_line.starts_with("HTTP/1.1 200"));
    assert!(metrics.headers.contains("text/plain; version=0.0.4"));
    assert!(metrics.body.contains("# TYPE wohnfair_ml_requests_total counter"));
    assert!(metrics.body.contains("# TYPE wohnfair_ml_request_duration_seconds histogram"));
    assert!(
        metrics
            .body
            .contains(r#"wohnfair_ml_requests_total{endpoint="/healthz",method="GET"} 2"#)
    );

    shutdown.shutdown();
    handle.join().unwrap();
}

#[test]
fn unknown_path_and_wrong_method() {
    let (addr, shutdown, handle) = start(1);

    assert!(get(addr, "/train").status_line.starts_with("HTTP/1.1 404"));
    assert!(
        request(addr, "DELETE", "/status")
            .status_line
            .starts_with("HTTP/1.1 405")
    );

    shutdown.shutdown();
    handle.join().unwrap();
}
