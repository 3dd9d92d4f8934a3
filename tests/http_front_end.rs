//! End-to-end requests over the loopback HTTP front end

use pipeline_video::config::Config;
use pipeline_video::server;
use std::net::SocketAddr;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

async fn start() -> Running {
    let cfg = Config::from_toml_str(
        r#"
        [server]
        port = 0

        [logging]
        level = "error"
        access_log = false
        "#,
    )
    .unwrap();

    let (listener, state) = server::bootstrap(&cfg).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server::run(listener, state, async move {
        let _ = stopped.await;
        Ok(())
    }));

    Running { addr, stop, task }
}

/// Send one request and return the status line, headers, and body
async fn request(addr: SocketAddr, target: &str, range: Option<&str>) -> (String, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    if let Some(range) = range {
        raw.push_str(&format!("Range: {range}\r\n"));
    }
    raw.push_str("\r\n");
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    let head = String::from_utf8(response[..split].to_vec()).unwrap();
    let body = response[split + 4..].to_vec();
    let (status_line, headers) = head.split_once("\r\n").unwrap_or((&head, ""));
    (status_line.to_string(), headers.to_ascii_lowercase(), body)
}

fn write_video(dir: &TempDir) -> (String, Vec<u8>) {
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, &data).unwrap();
    (path.to_str().unwrap().to_string(), data)
}

#[tokio::test]
async fn partial_content_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (path, data) = write_video(&dir);
    let running = start().await;

    let (status, headers, body) = request(running.addr, &path, Some("bytes=100-199")).await;
    assert_eq!(status, "HTTP/1.1 206 Partial Content");
    assert!(headers.contains("content-range: bytes 100-199/1000"));
    assert!(headers.contains("content-length: 100"));
    assert!(headers.contains("accept-ranges: bytes"));
    assert!(headers.contains("content-type: video/mp4"));
    assert_eq!(body, &data[100..200]);

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn full_content_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (path, data) = write_video(&dir);
    let running = start().await;

    let (status, headers, body) = request(running.addr, &path, None).await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("content-length: 1000"));
    assert!(!headers.contains("content-range"));
    assert_eq!(body, data);

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn unsatisfiable_range_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _) = write_video(&dir);
    let running = start().await;

    let (status, headers, _) = request(running.addr, &path, Some("bytes=1000-1005")).await;
    assert_eq!(
        status,
        "HTTP/1.1 416 Range Not Satisfiable: bytes 1000-1005/1000"
    );
    assert!(headers.contains("content-range: bytes */1000"));

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_file_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.mp4");
    let running = start().await;

    let (status, _, body) = request(running.addr, missing.to_str().unwrap(), None).await;
    assert_eq!(status, "HTTP/1.1 404 Not Found");
    assert!(body.is_empty());

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn encoded_path_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"spaced out".to_vec();
    let path = dir.path().join("with space.mp4");
    std::fs::write(&path, &data).unwrap();
    let running = start().await;

    let target = path.to_str().unwrap().replace(' ', "%20");
    let (status, _, body) = request(running.addr, &target, Some("bytes=0-5")).await;
    assert_eq!(status, "HTTP/1.1 206 Partial Content");
    assert_eq!(body, b"spaced");

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}
