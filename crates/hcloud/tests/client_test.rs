//! Integration tests for the Cloud API client against a loopback stub

mod common;

use common::StubServer;
use hcloud::client::DEFAULT_TIMEOUT;
use hcloud::{ApiError, CloudApi, HcloudClient, LabelSelector};
use std::net::IpAddr;

fn client(stub: &StubServer) -> HcloudClient {
    HcloudClient::with_endpoint("test-token", stub.url(), DEFAULT_TIMEOUT).unwrap()
}

fn vrrp_selector() -> LabelSelector {
    [("role", "vrrp"), ("cluster", "prod")].into_iter().collect()
}

#[tokio::test]
async fn test_floating_ips_sends_selector_and_token() {
    let stub = StubServer::start(vec![(
        200,
        r#"{
            "floating_ips": [
                {"id": 1, "ip": "203.0.113.10", "server": 42, "labels": {"role": "vrrp", "cluster": "prod"}},
                {"id": 2, "ip": "203.0.113.11", "server": null, "labels": {"role": "vrrp", "cluster": "prod"}}
            ],
            "meta": {"pagination": {"page": 1, "per_page": 50, "next_page": null}}
        }"#,
    )])
    .await;

    let fips = client(&stub).floating_ips(&vrrp_selector()).await.unwrap();

    assert_eq!(fips.len(), 2);
    assert_eq!(fips[0].ip, "203.0.113.10");
    assert_eq!(fips[1].server, None);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert!(requests[0].target.starts_with("/floating_ips?"));
    assert!(
        requests[0]
            .target
            .contains("label_selector=cluster%3D%3Dprod%2Crole%3D%3Dvrrp"),
        "unexpected target: {}",
        requests[0].target
    );
    assert_eq!(requests[0].header("authorization"), Some("Bearer test-token"));
}

#[tokio::test]
async fn test_floating_ips_follows_pagination() {
    let stub = StubServer::start(vec![
        (
            200,
            r#"{"floating_ips": [{"id": 1, "ip": "203.0.113.10"}],
                "meta": {"pagination": {"page": 1, "next_page": 2}}}"#,
        ),
        (
            200,
            r#"{"floating_ips": [{"id": 2, "ip": "203.0.113.11"}, {"id": 3, "ip": "203.0.113.12"}],
                "meta": {"pagination": {"page": 2, "next_page": null}}}"#,
        ),
    ])
    .await;

    let fips = client(&stub).floating_ips(&vrrp_selector()).await.unwrap();

    let ids: Vec<u64> = fips.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].target.contains("page=1"));
    assert!(requests[1].target.contains("page=2"));
}

#[tokio::test]
async fn test_assign_floating_ip_posts_server() {
    let stub = StubServer::start(vec![(
        201,
        r#"{"action": {"id": 13, "command": "assign_floating_ip", "status": "running"}}"#,
    )])
    .await;

    let action = client(&stub).assign_floating_ip(4711, 42).await.unwrap();
    assert_eq!(action.id, 13);

    let requests = stub.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/floating_ips/4711/actions/assign");
    assert_eq!(requests[0].json(), serde_json::json!({"server": 42}));
}

#[tokio::test]
async fn test_api_error_body_is_decoded() {
    let stub = StubServer::start(vec![(
        401,
        r#"{"error": {"code": "unauthorized", "message": "unable to authenticate"}}"#,
    )])
    .await;

    let err = client(&stub).assign_floating_ip(1, 2).await.unwrap_err();
    match err {
        ApiError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 401);
            assert_eq!(code, "unauthorized");
            assert_eq!(message, "unable to authenticate");
        }
        other => panic!("Expected ApiError::Api, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_action_is_an_error() {
    let stub = StubServer::start(vec![(
        201,
        r#"{"action": {"id": 14, "command": "assign_floating_ip", "status": "error",
            "error": {"code": "locked", "message": "resource is locked"}}}"#,
    )])
    .await;

    let err = client(&stub).assign_floating_ip(1, 2).await.unwrap_err();
    assert!(matches!(err, ApiError::ActionFailed { id: 14, .. }));
}

#[tokio::test]
async fn test_missing_server_is_reported() {
    let stub = StubServer::start(vec![(
        404,
        r#"{"error": {"code": "not_found", "message": "server with ID '42' not found"}}"#,
    )])
    .await;

    let err = client(&stub).server(42).await.unwrap_err();
    assert!(matches!(err, ApiError::ServerNotFound(42)));
    assert_eq!(err.to_string(), "Server with ID 42 not found");
}

#[tokio::test]
async fn test_private_networks_converts_memberships() {
    let stub = StubServer::start(vec![(
        200,
        r#"{"server": {"id": 42, "name": "vrrp-a", "private_net": [
            {"network": 7, "ip": "10.0.0.5", "alias_ips": ["10.0.0.100"], "mac_address": "86:00:00:2a:7d:e0"},
            {"network": 8, "ip": "fd00:1234:5678:9abc::5", "alias_ips": []}
        ]}}"#,
    )])
    .await;

    let memberships = client(&stub).private_networks(42).await.unwrap();

    assert_eq!(memberships.len(), 2);
    assert_eq!(memberships[0].network, 7);
    assert_eq!(memberships[0].ip, "10.0.0.5".parse::<IpAddr>().unwrap());
    assert_eq!(memberships[0].alias_ips, vec!["10.0.0.100"]);
    assert!(memberships[0].ip_range.is_none());
    assert!(memberships[1].ip.is_ipv6());

    // Range lookup is off by default: only the server was fetched
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_private_networks_resolves_subnet_ranges() {
    let stub = StubServer::start(vec![
        (
            200,
            r#"{"server": {"id": 42, "private_net": [{"network": 7, "ip": "10.0.1.5"}]}}"#,
        ),
        (
            200,
            r#"{"network": {"id": 7, "name": "internal", "ip_range": "10.0.0.0/16",
                "subnets": [{"ip_range": "10.0.1.0/24", "gateway": "10.0.0.1"}]}}"#,
        ),
    ])
    .await;

    let memberships = client(&stub)
        .with_subnet_ranges(true)
        .private_networks(42)
        .await
        .unwrap();

    assert_eq!(
        memberships[0].ip_range.map(|r| r.to_string()),
        Some("10.0.1.0/24".to_string())
    );
    assert_eq!(stub.requests()[1].target, "/networks/7");
}

#[tokio::test]
async fn test_change_alias_ips_sends_full_list() {
    let stub = StubServer::start(vec![(
        201,
        r#"{"action": {"id": 15, "command": "change_alias_ips", "status": "running"}}"#,
    )])
    .await;

    let aliases = vec!["10.0.0.50".to_string(), "10.0.0.100/32".to_string()];
    client(&stub).change_alias_ips(42, 7, &aliases).await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests[0].target, "/servers/42/actions/change_alias_ips");
    assert_eq!(
        requests[0].json(),
        serde_json::json!({"network": 7, "alias_ips": ["10.0.0.50", "10.0.0.100/32"]})
    );
}
