//! End-to-end tests over real sockets.

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use gatekeeper::auth::Role;

mod common;

#[tokio::test]
async fn test_health_is_never_gated() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 1)).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].as_u64().unwrap() > 0);
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_and_invalid_tokens() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 100)).await;
    let client = common::client();
    let url = format!("http://{}/performance/my", addr);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "No token provided");

    let res = client.get(&url).bearer_auth("not.a.token").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired token");

    let res = client
        .get(&url)
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}

#[tokio::test]
async fn test_role_gates() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 100)).await;
    let client = common::client();

    let player = common::token("p1", Role::Player);
    let scout = common::token("s1", Role::Scout);
    let admin = common::token("a1", Role::Admin);

    let res = client
        .get(format!("http://{}/admin/users", addr))
        .bearer_auth(&player)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Access denied");

    let res = client
        .get(format!("http://{}/admin/users", addr))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Scouts may read players but not the full performance table.
    let res = client
        .get(format!("http://{}/coach/players", addr))
        .bearer_auth(&scout)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(format!("http://{}/performance/all", addr))
        .bearer_auth(&scout)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Any authenticated role passes a group without a role list.
    let res = client
        .get(format!("http://{}/performance/my", addr))
        .bearer_auth(&player)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_forwards_principal_and_strips_spoofed_headers() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 100)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/coach/compare?ids=1,2", addr))
        .bearer_auth(common::token("c7", Role::Coach))
        .header("x-principal-id", "someone-else")
        .header("x-principal-role", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/coach/compare?ids=1,2");
    assert_eq!(body["principal_id"], "c7");
    assert_eq!(body["principal_role"], "coach");

    // Public groups never carry identity headers, even when the caller sends them.
    let res = client
        .post(format!("http://{}/auth/login", addr))
        .header("x-principal-id", "forged")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["principal_id"].is_null());

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_rejects_after_budget() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 3)).await;
    let client = common::client();
    let url = format!("http://{}/auth/login", addr);

    for _ in 0..3 {
        let res = client.post(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client.post(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_header: u64 = res
        .headers()
        .get("retry-after")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Too many requests. Please try again later.");
    let retry_after = body["retryAfter"].as_u64().unwrap();
    assert!((1..=60).contains(&retry_after));
    assert_eq!(retry_header, retry_after);

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_runs_before_authentication() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 2)).await;
    let client = common::client();
    let url = format!("http://{}/performance/my", addr);

    // Unauthenticated attempts still spend the budget.
    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
    let res = client
        .get(&url)
        .bearer_auth(common::token("p1", Role::Player))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    shutdown.trigger();
}

#[tokio::test]
async fn test_limiters_are_isolated_but_shared_across_groups() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 2)).await;
    let client = common::client();
    let token = common::token("c1", Role::Coach);

    // Exhaust the "api" limiter through two different groups.
    for path in ["/coach/compare", "/recommendations"] {
        let res = client
            .get(format!("http://{}{}", addr, path))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = client
        .get(format!("http://{}/performance/my", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    // The "auth" limiter keeps its own counters.
    let res = client.post(format!("http://{}/auth/login", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 1)).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(format!("http://{}/nowhere", addr)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Route not found");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let upstream = common::closed_port().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 100)).await;

    let res = common::client()
        .post(format!("http://{}/auth/login", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Upstream request failed");

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_never_exceed_budget() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 10)).await;
    let client = common::client();
    let admitted = Arc::new(AtomicU32::new(0));

    let mut tasks = Vec::new();
    for _ in 0..40 {
        let client = client.clone();
        let admitted = admitted.clone();
        let url = format!("http://{}/auth/login", addr);
        tasks.push(tokio::spawn(async move {
            let res = client.post(url).send().await.unwrap();
            if res.status() == StatusCode::OK {
                admitted.fetch_add(1, Ordering::SeqCst);
            } else {
                assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 10);
    shutdown.trigger();
}

#[tokio::test]
async fn test_unlimited_group_is_never_throttled() {
    let upstream = common::start_echo_upstream().await;
    let config = common::with_open_route(common::test_config(upstream, 1), "/public", upstream);
    let (addr, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client.get(format!("http://{}/public/info", addr)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_receives_normalized_path() {
    let upstream = common::start_echo_upstream().await;
    let (addr, shutdown) = common::start_gateway(common::test_config(upstream, 100)).await;
    let client = common::client();
    let admin = common::token("a1", Role::Admin);

    let res = client
        .get(format!("http://{}/performance//all?season=2024", addr))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/performance/all?season=2024");

    // A case variant of a restricted prefix is still the restricted group.
    let res = client
        .get(format!("http://{}/PERFORMANCE/all", addr))
        .bearer_auth(common::token("p1", Role::Player))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let upstream = common::start_slow_upstream(std::time::Duration::from_secs(3)).await;
    let mut config = common::test_config(upstream, 100);
    config.timeouts.request_secs = 1;
    let (addr, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .post(format!("http://{}/auth/login", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);

    shutdown.trigger();
}
