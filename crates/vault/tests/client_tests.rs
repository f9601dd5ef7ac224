//! Integration tests for the vault client against a mock server.

use httpmock::Method::{DELETE, GET, POST, PUT};
use httpmock::MockServer;
use porter_vault::{TokenCreateRequest, VaultClient, VaultError};
use serde_json::json;
use std::collections::HashMap;

fn client(server: &MockServer) -> VaultClient {
    VaultClient::new(&server.base_url(), "root-token").unwrap()
}

#[tokio::test]
async fn put_policy_writes_the_acl_endpoint() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/v1/sys/policies/acl/cf-i")
            .header("x-vault-token", "root-token")
            .body_contains("capabilities");
        then.status(204);
    });

    client(&server)
        .put_policy("cf-i", r#"path "cf/i" { capabilities = ["list"] }"#)
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn list_mounts_parses_enveloped_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/sys/mounts");
        then.status(200).json_body(json!({
            "request_id": "x",
            "data": {
                "cf/broker/": { "type": "generic" },
                "cf/i/transit/": { "type": "transit" }
            }
        }));
    });

    let mounts = client(&server).list_mounts().await.unwrap();
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts["cf/broker/"].engine_type, "generic");
    assert_eq!(mounts["cf/i/transit/"].engine_type, "transit");
}

#[tokio::test]
async fn list_mounts_parses_legacy_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/sys/mounts");
        then.status(200).json_body(json!({
            "sys/": { "type": "system" },
            "cf/broker/": { "type": "generic" }
        }));
    });

    let mounts = client(&server).list_mounts().await.unwrap();
    assert_eq!(mounts["cf/broker/"].engine_type, "generic");
}

#[tokio::test]
async fn mount_posts_engine_type() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/sys/mounts/cf/g/secret")
            .json_body(json!({ "type": "generic" }));
        then.status(204);
    });

    client(&server).mount("/cf/g/secret", "generic").await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn read_returns_none_on_missing_path() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/cf/broker/missing");
        then.status(404).json_body(json!({ "errors": [] }));
    });

    let secret = client(&server).read("cf/broker/missing").await.unwrap();
    assert!(secret.is_none());
}

#[tokio::test]
async fn list_passes_the_list_flag() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/cf/broker")
            .query_param("list", "true");
        then.status(200).json_body(json!({
            "data": { "keys": ["i-1/", "i-2/"] }
        }));
    });

    let secret = client(&server).list("cf/broker").await.unwrap().unwrap();
    let keys = secret.data.unwrap()["keys"].clone();
    assert_eq!(keys, json!(["i-1/", "i-2/"]));
    mock.assert();
}

#[tokio::test]
async fn write_posts_the_payload() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/cf/broker/i")
            .json_body(json!({ "json": "{}" }));
        then.status(204);
    });

    let mut data = serde_json::Map::new();
    data.insert("json".to_string(), json!("{}"));
    client(&server).write("cf/broker/i", &data).await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn create_token_with_role_hits_the_role_endpoint() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/auth/token/create/cf-i")
            .body_contains("cf-bind-b");
        then.status(200).json_body(json!({
            "auth": {
                "client_token": "s.new",
                "accessor": "acc",
                "lease_duration": 432000,
                "renewable": true
            }
        }));
    });

    let request = TokenCreateRequest {
        policies: vec!["cf-i".to_string()],
        metadata: HashMap::from([
            ("cf-instance-id".to_string(), "i".to_string()),
            ("cf-binding-id".to_string(), "b".to_string()),
        ]),
        display_name: "cf-bind-b".to_string(),
        renewable: Some(true),
    };

    let secret = client(&server)
        .create_token_with_role(&request, "cf-i")
        .await
        .unwrap();
    assert_eq!(secret.auth.unwrap().client_token, "s.new");
    mock.assert();
}

#[tokio::test]
async fn renew_token_as_self_authenticates_as_the_target_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/auth/token/renew-self")
            .header("x-vault-token", "s.target");
        then.status(200).json_body(json!({
            "auth": { "client_token": "s.target", "accessor": "a", "lease_duration": 60, "renewable": true }
        }));
    });

    let secret = client(&server)
        .renew_token_as_self("s.target", 0)
        .await
        .unwrap();
    assert_eq!(secret.auth.unwrap().lease_duration, 60);
    mock.assert();
}

#[tokio::test]
async fn revoke_accessor_posts_the_accessor() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/auth/token/revoke-accessor")
            .json_body(json!({ "accessor": "acc" }));
        then.status(204);
    });

    client(&server).revoke_accessor("acc").await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/v1/sys/policies/acl/cf-i");
        then.status(400)
            .json_body(json!({ "errors": ["bad request", "second line"] }));
    });

    let err = client(&server).delete_policy("cf-i").await.unwrap_err();
    match err {
        VaultError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad request; second line");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
