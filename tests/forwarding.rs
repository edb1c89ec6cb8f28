//! End-to-end forwarding through a running gateway.

mod common;

use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{echo_upstream, gateway_config, http_client, start_gateway, start_upstream, Recorder};

async fn setup() -> (common::TestGateway, Recorder) {
    let recorder = Recorder::default();
    let upstream = start_upstream(echo_upstream(recorder.clone())).await;
    let gateway = start_gateway(gateway_config(upstream)).await;
    (gateway, recorder)
}

#[tokio::test]
async fn test_get_forwards_path_and_query() {
    let (gateway, recorder) = setup().await;

    let res = http_client()
        .get(gateway.url("/api/members/5/recommendations?top_n=3"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers().clone();
    assert_eq!(headers[CONTENT_TYPE], "application/json");
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert!(headers.get("x-upstream-only").is_none());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/members/5/recommendations");
    assert_eq!(body["query"], "top_n=3");

    let seen = recorder.last();
    assert_eq!(seen.method, reqwest::Method::GET);
    assert_eq!(seen.uri, "/members/5/recommendations?top_n=3");
    assert_eq!(seen.content_type.as_deref(), Some("application/json"));
    assert_eq!(seen.body, "");
}

#[tokio::test]
async fn test_bodyless_methods_drop_inbound_body() {
    let (gateway, recorder) = setup().await;
    let client = http_client();

    for method in [reqwest::Method::GET, reqwest::Method::DELETE, reqwest::Method::OPTIONS] {
        let res = client
            .request(method.clone(), gateway.url("/api/members/5"))
            .body(r#"{"ignored": true}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{method}");

        let seen = recorder.last();
        assert_eq!(seen.method, method);
        assert_eq!(seen.body, "", "{method}");
    }
}

#[tokio::test]
async fn test_post_put_patch_send_json_body() {
    let (gateway, recorder) = setup().await;
    let client = http_client();
    let payload = json!({"email": "member9@gym.com", "membership_level": "Elite"});

    for method in [reqwest::Method::POST, reqwest::Method::PUT, reqwest::Method::PATCH] {
        let res = client
            .request(method.clone(), gateway.url("/api/members/"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["body"], payload, "{method}");

        let seen: Value = serde_json::from_str(&recorder.last().body).unwrap();
        assert_eq!(seen, payload);
    }
}

#[tokio::test]
async fn test_non_json_body_sent_as_json_string() {
    let (gateway, recorder) = setup().await;

    http_client()
        .post(gateway.url("/api/notes"))
        .body("hello gym")
        .send()
        .await
        .unwrap();

    assert_eq!(recorder.last().body, r#""hello gym""#);
}

#[tokio::test]
async fn test_empty_post_body_stays_empty() {
    let (gateway, recorder) = setup().await;

    http_client()
        .post(gateway.url("/api/members/"))
        .send()
        .await
        .unwrap();

    assert_eq!(recorder.last().body, "");
}

#[tokio::test]
async fn test_prefix_root_and_empty_query() {
    let (gateway, recorder) = setup().await;
    let client = http_client();

    let res = client.get(gateway.url("/api")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/");

    let res = client.get(gateway.url("/api/members/?")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/members/");
    assert_eq!(body["query"], Value::Null);
    assert_eq!(recorder.last().uri, "/members/");
}

#[tokio::test]
async fn test_text_upstream_relayed_verbatim() {
    let (gateway, _) = setup().await;
    let client = http_client();

    let res = client.get(gateway.url("/api/text")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(res.text().await.unwrap(), "plain words");

    let res = client.get(gateway.url("/api/no-content-type")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "raw bytes");
}

#[tokio::test]
async fn test_upstream_status_passed_through() {
    let (gateway, _) = setup().await;
    let client = http_client();

    let res = client.get(gateway.url("/api/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"detail": "Not found"}));

    let res = client.post(gateway.url("/api/created")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["member_id"], 51);
}

#[tokio::test]
async fn test_invalid_json_from_upstream_is_failure() {
    let (gateway, _) = setup().await;

    let res = http_client()
        .get(gateway.url("/api/bad-json"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Backend connection failed");
}

#[tokio::test]
async fn test_inbound_headers_not_forwarded() {
    let (gateway, recorder) = setup().await;

    http_client()
        .get(gateway.url("/api/members/"))
        .header("authorization", "Bearer member-token")
        .header(CONTENT_TYPE, "text/plain")
        .send()
        .await
        .unwrap();

    let seen = recorder.last();
    assert_eq!(seen.authorization, None);
    assert_eq!(seen.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_unreachable_upstream_returns_diagnostic() {
    let dead = common::unreachable_addr().await;
    let gateway = start_gateway(gateway_config(dead)).await;

    let res = http_client()
        .get(gateway.url("/api/members/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

    let body: Value = res.json().await.unwrap();
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert_eq!(body["error"], "Backend connection failed");
    assert_eq!(body["backend"], format!("http://{}", dead));
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_cors_when_enabled() {
    let dead = common::unreachable_addr().await;
    let mut config = gateway_config(dead);
    config.cors.include_on_failure = true;
    let gateway = start_gateway(config).await;

    let res = http_client()
        .get(gateway.url("/api/members/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_unsupported_method_never_reaches_upstream() {
    let (gateway, recorder) = setup().await;

    let res = http_client()
        .head(gateway.url("/api/members/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET, POST, PUT, DELETE, PATCH, OPTIONS");
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let recorder = Recorder::default();
    let upstream = start_upstream(echo_upstream(recorder.clone())).await;
    let mut config = gateway_config(upstream);
    config.limits.max_body_bytes = 16;
    let gateway = start_gateway(config).await;

    let res = http_client()
        .post(gateway.url("/api/members/"))
        .body("x".repeat(64))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_request_id_propagated_or_generated() {
    let (gateway, _) = setup().await;
    let client = http_client();

    let res = client
        .get(gateway.url("/api/members/"))
        .header("x-request-id", "front-desk-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "front-desk-42");

    let res = client.get(gateway.url("/api/members/")).send().await.unwrap();
    let id = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_reload_switches_upstream() {
    let first = Recorder::default();
    let second = Recorder::default();
    let first_addr = start_upstream(echo_upstream(first.clone())).await;
    let second_addr = start_upstream(echo_upstream(second.clone())).await;

    let gateway = start_gateway(gateway_config(first_addr)).await;
    let client = http_client();

    client.get(gateway.url("/api/plans")).send().await.unwrap();
    assert_eq!(first.count(), 1);

    gateway.state.apply_update(gateway_config(second_addr)).unwrap();

    client.get(gateway.url("/api/plans")).send().await.unwrap();
    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 1);
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let (gateway, _) = setup().await;
    let client = http_client();

    assert!(client.get(gateway.url("/api/")).send().await.is_ok());

    gateway.shutdown.trigger();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let fresh = http_client();
    assert!(fresh.get(gateway.url("/api/")).send().await.is_err());
}
