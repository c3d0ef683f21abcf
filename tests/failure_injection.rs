//! Failure injection tests for the relay.

use std::time::{Duration, Instant};

use serde_json::Value;

mod common;

async fn gateway_error(res: reqwest::Response) -> Value {
    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()["content-type"], "application/json");
    let payload: Value = res.json().await.unwrap();

    assert_eq!(payload["error"], "Gateway Error");
    assert!(payload["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(payload["details"].is_string());
    payload
}

#[tokio::test]
async fn unresolvable_upstream_yields_gateway_error() {
    let mut config = common::relay_config("127.0.0.1:1".parse().unwrap());
    config.upstream.url = "http://upstream.invalid".into();
    config.timeouts.request_secs = Some(10);
    let (relay, shutdown) = common::spawn_relay(config).await;

    let res = common::client()
        .post(format!("http://{}/upload", relay))
        .body("payload")
        .send()
        .await
        .unwrap();
    let payload = gateway_error(res).await;

    assert!(["connect", "timeout"].contains(&payload["kind"].as_str().unwrap()));
    shutdown.trigger();
}

#[tokio::test]
async fn refused_connection_yields_gateway_error() {
    let upstream = common::closed_port().await;
    let (relay, shutdown) = common::spawn_relay(common::relay_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{}/files/1", relay))
        .send()
        .await
        .unwrap();
    let payload = gateway_error(res).await;

    assert_eq!(payload["kind"], "connect");
    assert!(!payload["details"].as_str().unwrap().is_empty());
    shutdown.trigger();
}

#[tokio::test]
async fn silent_upstream_times_out() {
    let upstream = common::start_silent_backend().await;
    let mut config = common::relay_config(upstream);
    config.timeouts.request_secs = Some(1);
    let (relay, shutdown) = common::spawn_relay(config).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{}/slow", relay))
        .send()
        .await
        .unwrap();
    let payload = gateway_error(res).await;

    assert_eq!(payload["kind"], "timeout");
    assert!(started.elapsed() < Duration::from_secs(5));
    shutdown.trigger();
}

#[tokio::test]
async fn upstream_error_status_is_not_a_gateway_error() {
    let upstream = common::start_raw_backend(
        "HTTP/1.1 503 Service Unavailable\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 11\r\n\
         Connection: close\r\n\r\nmaintenance",
    )
    .await;
    let (relay, shutdown) = common::spawn_relay(common::relay_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{}/", relay))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "maintenance");
    shutdown.trigger();
}

#[tokio::test]
async fn mid_stream_failure_keeps_status_and_aborts_body() {
    let upstream = common::start_raw_backend(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/octet-stream\r\n\
         Content-Length: 100\r\n\
         Connection: close\r\n\r\npartial",
    )
    .await;
    let (relay, shutdown) = common::spawn_relay(common::relay_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{}/download", relay))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.bytes().await.is_err());
    shutdown.trigger();
}

#[tokio::test]
async fn relay_keeps_serving_after_failures() {
    let upstream = common::closed_port().await;
    let (relay, shutdown) = common::spawn_relay(common::relay_config(upstream)).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client.get(format!("http://{}/", relay)).send().await.unwrap();
        assert_eq!(res.status(), 502);
    }

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("http://{}/", relay))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), 200);
    shutdown.trigger();
}
