//! Tests for daimon-sink: failure mapping of the HTTP adapter against raw TCP peers

use daimon_core::{BatchRequest, Event, Mode};
use daimon_sink::*;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Read one full HTTP request (headers plus Content-Length body).
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|l| {
                    let lower = l.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return text;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Serve exactly one canned response; returns the base URL.
async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut stream).await;
        let response = format!(
            "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });
    format!("http://{}", addr)
}

#[test]
fn sink_error_display() {
    assert_eq!(SinkError::Timeout.to_string(), "timed out");
    assert_eq!(SinkError::Status(503).to_string(), "http status 503");
    assert!(SinkError::Malformed("x".into()).to_string().contains("malformed"));
}

#[test]
fn base_url_trailing_slash_trimmed() {
    let sink = HttpSink::new("http://localhost:8001/");
    assert_eq!(sink.base_url(), "http://localhost:8001");
}

#[tokio::test]
async fn quick_check_success() {
    let base = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"salience":0.9,"should_emerge":true,"mode":"emerge","emergence_reason":"Detected: drop","detected_keywords":["drop"]}"#,
    )
    .await;
    let resp = HttpSink::new(base).quick_check("drop table users").await.unwrap();
    assert!(resp.should_emerge);
    assert_eq!(resp.mode, Mode::Emerge);
    assert_eq!(resp.detected_keywords, vec!["drop".to_string()]);
}

#[tokio::test]
async fn quick_check_status_error() {
    let base = serve_once("HTTP/1.1 503 Service Unavailable", r#"{"detail":"down"}"#).await;
    let err = HttpSink::new(base).quick_check("drop table").await.unwrap_err();
    assert_eq!(err, SinkError::Status(503));
}

#[tokio::test]
async fn quick_check_malformed_body() {
    let base = serve_once("HTTP/1.1 200 OK", r#"{"unexpected":true}"#).await;
    let err = HttpSink::new(base).quick_check("drop table").await.unwrap_err();
    assert!(matches!(err, SinkError::Malformed(_)), "got {:?}", err);
}

#[tokio::test]
async fn quick_check_out_of_range_salience_is_malformed() {
    let base = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"salience":7.0,"should_emerge":true,"mode":"emerge"}"#,
    )
    .await;
    let err = HttpSink::new(base).quick_check("drop table").await.unwrap_err();
    assert!(matches!(err, SinkError::Malformed(_)));
}

#[tokio::test]
async fn quick_check_contradicting_answer_is_malformed() {
    let base = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"salience":0.9,"should_emerge":true,"mode":"silent"}"#,
    )
    .await;
    let err = HttpSink::new(base).quick_check("drop table").await.unwrap_err();
    assert!(matches!(err, SinkError::Malformed(_)), "got {:?}", err);
}

#[tokio::test]
async fn quick_check_times_out_on_silent_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    let sink = HttpSink::new(format!("http://{}", addr))
        .with_timeouts(Duration::from_millis(50), Duration::from_millis(50));
    let err = sink.quick_check("drop table").await.unwrap_err();
    assert_eq!(err, SinkError::Timeout);
}

#[tokio::test]
async fn deliver_batch_to_closed_port_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let sink = HttpSink::new(format!("http://{}", addr));
    let batch = BatchRequest {
        heartbeats: vec![Event::shell("ls")],
        ..Default::default()
    };
    let err = sink.deliver_batch(&batch).await.unwrap_err();
    assert!(matches!(err, SinkError::Unavailable(_)), "got {:?}", err);
}

#[tokio::test]
async fn deliver_batch_success() {
    let base = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"status":"ok","stored":1,"insights":[]}"#,
    )
    .await;
    let batch = BatchRequest {
        heartbeats: vec![Event::shell("ls")],
        ..Default::default()
    };
    let resp = HttpSink::new(base).deliver_batch(&batch).await.unwrap();
    assert_eq!(resp.status, "ok");
    assert_eq!(resp.stored, 1);
}
