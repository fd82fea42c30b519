//! End-to-end behavior of the delaying relay.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

mod common;

use common::MockReply;

#[tokio::test]
async fn fast_upstream_is_padded_to_the_delay() {
    let upstream = common::start_upstream(|_| async {
        MockReply::ok("hello").after(Duration::from_millis(100))
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 1.0)).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{}/ping", proxy.addr))
        .send()
        .await
        .expect("proxy unreachable");
    let status = res.status();
    let body = res.text().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello");
    assert!(elapsed >= Duration::from_millis(950), "released early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1800), "held too long: {elapsed:?}");
}

#[tokio::test]
async fn slow_upstream_is_not_delayed_further() {
    let upstream = common::start_upstream(|_| async {
        MockReply::ok("slow").after(Duration::from_millis(600))
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 0.2)).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{}/", proxy.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "slow");
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(600));
    assert!(elapsed < Duration::from_millis(1000), "delay was added on top: {elapsed:?}");
}

#[tokio::test]
async fn zero_delay_is_a_plain_relay() {
    let upstream = common::start_fixed_upstream("now").await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 0.0)).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{}/", proxy.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "now");
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn request_and_response_are_forwarded_unchanged() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let upstream = common::start_upstream(move |seen| {
        let _ = seen_tx.send(seen);
        async {
            MockReply::raw(
                "HTTP/1.1 201 Created\r\n\
                 Date: Mon, 05 Jan 2026 10:00:00 GMT\r\n\
                 X-Upstream: first\r\n\
                 X-Upstream: second\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: 11\r\n\
                 Connection: close\r\n\r\n"
                    .to_string(),
                "{\"id\":4242}",
            )
        }
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 0.0)).await;

    let res = common::client()
        .post(format!("http://{}/v1/items?limit=5&sort=desc", proxy.addr))
        .header("x-trace", "abc123")
        .header("content-type", "text/plain")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let upstream_values: Vec<_> = res
        .headers()
        .get_all("x-upstream")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(upstream_values, vec!["first", "second"]);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.headers()["date"], "Mon, 05 Jan 2026 10:00:00 GMT");
    assert!(res.headers().get("x-request-id").is_none());
    assert_eq!(res.text().await.unwrap(), "{\"id\":4242}");

    let seen = seen_rx.recv().await.unwrap();
    assert_eq!(seen.request_line, "POST /v1/items?limit=5&sort=desc HTTP/1.1");
    assert_eq!(seen.header("host"), Some(proxy.addr.to_string().as_str()));
    assert_eq!(seen.header("x-trace"), Some("abc123"));
    assert_eq!(seen.header("content-type"), Some("text/plain"));
    assert_eq!(seen.body, b"hello");
}

#[tokio::test]
async fn no_header_is_added_when_upstream_sends_only_framing() {
    let upstream = common::start_fixed_upstream("bare").await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 0.0)).await;

    let res = common::client()
        .get(format!("http://{}/", proxy.addr))
        .send()
        .await
        .unwrap();

    let mut names: Vec<_> = res.headers().keys().map(|k| k.as_str().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["connection", "content-length"]);
    assert!(res.headers().get("date").is_none());
    assert_eq!(res.text().await.unwrap(), "bare");
}

#[tokio::test]
async fn upstream_error_status_is_relayed_after_the_delay() {
    let upstream = common::start_upstream(|_| async {
        MockReply::raw(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\n"
                .to_string(),
            "busy",
        )
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 0.5)).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{}/", proxy.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "busy");
    assert!(started.elapsed() >= Duration::from_millis(450));
}

#[tokio::test]
async fn no_header_byte_reaches_the_client_before_release() {
    let upstream = common::start_upstream(|_| async {
        MockReply::ok("late body").body_after(Duration::from_millis(300))
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 1.0)).await;

    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    let started = Instant::now();
    stream
        .write_all(b"GET /early HTTP/1.1\r\nHost: example.test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut first = [0u8; 1];
    stream.read_exact(&mut first).await.unwrap();
    let first_byte_at = started.elapsed();
    assert!(
        first_byte_at >= Duration::from_millis(950),
        "first byte after {first_byte_at:?}"
    );

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    let raw = String::from_utf8_lossy(&rest);
    assert!(raw.starts_with("TTP/1.1 200"));
    assert!(raw.ends_with("late body"));
}

#[tokio::test]
async fn concurrent_requests_are_delayed_independently() {
    let upstream = common::start_fixed_upstream("pong").await;
    let proxy = common::start_proxy(common::proxy_config(upstream, 1.0)).await;
    let client = common::client();

    let started = Instant::now();
    let url = format!("http://{}/", proxy.addr);
    let (a, b) = tokio::join!(client.get(&url).send(), client.get(&url).send());
    let elapsed = started.elapsed();

    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);
    assert!(elapsed >= Duration::from_millis(950));
    assert!(elapsed < Duration::from_millis(1800), "requests were serialized: {elapsed:?}");
}
