//! Shared test fixtures: a mock vault and a broker wired against it.

use async_trait::async_trait;
use httpmock::Method::{DELETE, GET, POST, PUT};
use httpmock::{Mock, MockServer};
use porter_core::codec;
use porter_core::config::ServiceConfig;
use porter_server::Broker;
use porter_server::platform::{PlatformDirectory, PlatformError};
use porter_vault::VaultClient;
use serde::Serialize;
use serde_json::json;

#[allow(dead_code)]
pub const TEST_ADVERTISE_ADDR: &str = "https://vault.example.com/";

/// A mock vault API server.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
pub struct MockVault {
    pub server: MockServer,
}

#[allow(dead_code)]
impl MockVault {
    pub fn start() -> Self {
        Self {
            server: MockServer::start(),
        }
    }

    pub fn client(&self) -> VaultClient {
        VaultClient::new(&self.server.base_url(), "test-token").expect("mock vault client")
    }

    /// Mount table listing containing exactly `paths` (reported with the
    /// trailing slash the vault uses).
    pub fn mock_mount_table(&self, paths: &[&str]) -> Mock<'_> {
        let mut data = serde_json::Map::new();
        for path in paths {
            data.insert(
                format!("{}/", path.trim_matches('/')),
                json!({ "type": "generic" }),
            );
        }
        self.server.mock(|when, then| {
            when.method(GET).path("/v1/sys/mounts");
            then.status(200).json_body(json!({ "data": data }));
        })
    }

    /// Expect a mount creation for `path` with the given engine type.
    pub fn mock_mount_create(&self, path: &str, engine_type: &str) -> Mock<'_> {
        let path = format!("/v1/sys/mounts/{}", path.trim_matches('/'));
        self.server.mock(|when, then| {
            when.method(POST)
                .path(path)
                .json_body(json!({ "type": engine_type }));
            then.status(204);
        })
    }

    /// Expect an unmount of `path`.
    pub fn mock_unmount(&self, path: &str) -> Mock<'_> {
        let path = format!("/v1/sys/mounts/{}", path.trim_matches('/'));
        self.server.mock(|when, then| {
            when.method(DELETE).path(path);
            then.status(204);
        })
    }

    /// Expect a policy write.
    pub fn mock_put_policy(&self, name: &str) -> Mock<'_> {
        let path = format!("/v1/sys/policies/acl/{name}");
        self.server.mock(|when, then| {
            when.method(PUT).path(path);
            then.status(204);
        })
    }

    /// Expect a policy delete.
    pub fn mock_delete_policy(&self, name: &str) -> Mock<'_> {
        let path = format!("/v1/sys/policies/acl/{name}");
        self.server.mock(|when, then| {
            when.method(DELETE).path(path);
            then.status(204);
        })
    }

    /// Directory listing under `path` (must end in `/`).
    pub fn mock_list(&self, path: &str, keys: &[&str]) -> Mock<'_> {
        let path = format!("/v1/{}", path.trim_start_matches('/'));
        let keys = json!(keys);
        self.server.mock(|when, then| {
            when.method(GET).path(path).query_param("list", "true");
            then.status(200).json_body(json!({ "data": { "keys": keys } }));
        })
    }

    /// Missing directory listing under `path`.
    pub fn mock_list_missing(&self, path: &str) -> Mock<'_> {
        let path = format!("/v1/{}", path.trim_start_matches('/'));
        self.server.mock(|when, then| {
            when.method(GET).path(path).query_param("list", "true");
            then.status(404).json_body(json!({ "errors": [] }));
        })
    }

    /// Read of a persisted object at `path`, returning `value` in the
    /// broker's storage envelope.
    pub fn mock_read_envelope<T: Serialize>(&self, path: &str, value: &T) -> Mock<'_> {
        let path = format!("/v1/{}", path.trim_start_matches('/'));
        let data = codec::encode_envelope(value).expect("envelope");
        self.server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(json!({ "data": data }));
        })
    }

    /// Missing persisted object at `path`.
    pub fn mock_read_missing(&self, path: &str) -> Mock<'_> {
        let path = format!("/v1/{}", path.trim_start_matches('/'));
        self.server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(404).json_body(json!({ "errors": [] }));
        })
    }

    /// Expect a write to `path`.
    pub fn mock_write(&self, path: &str) -> Mock<'_> {
        let path = format!("/v1/{}", path.trim_start_matches('/'));
        self.server.mock(|when, then| {
            when.method(POST).path(path);
            then.status(204);
        })
    }

    /// Expect a delete of `path`.
    pub fn mock_delete(&self, path: &str) -> Mock<'_> {
        let path = format!("/v1/{}", path.trim_start_matches('/'));
        self.server.mock(|when, then| {
            when.method(DELETE).path(path);
            then.status(204);
        })
    }

    /// Token creation against `role`, answering with the given token and
    /// accessor.
    pub fn mock_token_create(&self, role: &str, token: &str, accessor: &str) -> Mock<'_> {
        let path = format!("/v1/auth/token/create/{role}");
        let body = json!({
            "auth": {
                "client_token": token,
                "accessor": accessor,
                "policies": [role],
                "lease_duration": 432000,
                "renewable": true
            }
        });
        self.server.mock(|when, then| {
            when.method(POST).path(path);
            then.status(200).json_body(body);
        })
    }

    /// Successful renew-self for `token`.
    pub fn mock_renew_self(&self, token: &str) -> Mock<'_> {
        let body = json!({
            "auth": {
                "client_token": token,
                "accessor": "renewed",
                "lease_duration": 300,
                "renewable": true
            }
        });
        self.server.mock(|when, then| {
            when.method(POST)
                .path("/v1/auth/token/renew-self")
                .header("x-vault-token", token);
            then.status(200).json_body(body);
        })
    }

    /// Expect an accessor revocation.
    pub fn mock_revoke_accessor(&self, accessor: &str) -> Mock<'_> {
        let body = json!({ "accessor": accessor });
        self.server.mock(|when, then| {
            when.method(POST)
                .path("/v1/auth/token/revoke-accessor")
                .json_body(body);
            then.status(204);
        })
    }
}

/// A broker against the mock vault, with self-renewal off and no platform
/// directory.
#[allow(dead_code)]
pub fn test_broker(vault: &MockVault) -> Broker {
    Broker::new(
        vault.client(),
        ServiceConfig::default(),
        TEST_ADVERTISE_ADDR.to_string(),
        false,
        None,
    )
}

/// A platform directory answering every lookup from fixed names.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct StaticDirectory {
    pub organization: String,
    pub space: String,
    pub service_instance: String,
}

#[async_trait]
impl PlatformDirectory for StaticDirectory {
    async fn organization_name(&self, _guid: &str) -> Result<String, PlatformError> {
        Ok(self.organization.clone())
    }

    async fn space_name(&self, _guid: &str) -> Result<String, PlatformError> {
        Ok(self.space.clone())
    }

    async fn service_instance_name(&self, _guid: &str) -> Result<String, PlatformError> {
        Ok(self.service_instance.clone())
    }
}
