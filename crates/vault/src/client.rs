//! The vault HTTP client.

use crate::error::{VaultError, VaultResult};
use crate::types::{MountOutput, Secret, TokenCreateRequest};
use reqwest::{Method, StatusCode, Url};
use serde_json::{Map, Value};
use std::collections::HashMap;

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Client for the subset of the vault API the broker consumes.
#[derive(Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl VaultClient {
    /// Create a client for the vault at `address`, authenticating with
    /// `token`.
    pub fn new(address: &str, token: &str) -> VaultResult<Self> {
        // Url::join treats a base without a trailing slash differently.
        let address = if address.ends_with('/') {
            address.to_string()
        } else {
            format!("{address}/")
        };
        let base_url = Url::parse(&address)
            .map_err(|err| VaultError::InvalidAddress(format!("{address}: {err}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.to_string(),
        })
    }

    /// A copy of this client authenticating as a different token. Used to
    /// renew issued tokens as themselves.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> VaultResult<Url> {
        let path = format!("v1/{}", path.trim_start_matches('/'));
        self.base_url
            .join(&path)
            .map_err(|err| VaultError::InvalidAddress(format!("{path}: {err}")))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http.request(method, url).header(TOKEN_HEADER, &self.token)
    }

    /// Surface an error-status response as [`VaultError::Api`], joining the
    /// body's `errors` entries into a single message.
    async fn check(response: reqwest::Response) -> VaultResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                let errors = value.get("errors")?.as_array()?;
                let joined: Vec<String> = errors
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect();
                Some(joined.join("; "))
            })
            .unwrap_or(body);

        Err(VaultError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // ---- sys: policies -------------------------------------------------

    /// Write an ACL policy.
    pub async fn put_policy(&self, name: &str, document: &str) -> VaultResult<()> {
        let url = self.url(&format!("sys/policies/acl/{name}"))?;
        let body = serde_json::json!({ "policy": document });
        let response = self.request(Method::PUT, url).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Delete an ACL policy.
    pub async fn delete_policy(&self, name: &str) -> VaultResult<()> {
        let url = self.url(&format!("sys/policies/acl/{name}"))?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    // ---- sys: mounts ---------------------------------------------------

    /// Fetch the live mount table. Accepts both the enveloped (`data`) and
    /// the legacy top-level response shape.
    pub async fn list_mounts(&self) -> VaultResult<HashMap<String, MountOutput>> {
        let url = self.url("sys/mounts")?;
        let response = self.request(Method::GET, url).send().await?;
        let body: Value = Self::check(response).await?.json().await?;

        let entries = match body.get("data") {
            Some(Value::Object(data)) => data,
            _ => body.as_object().ok_or_else(|| {
                VaultError::Contract("mount list response is not an object".to_string())
            })?,
        };

        let mut mounts = HashMap::new();
        for (path, entry) in entries {
            if !entry.is_object() {
                continue;
            }
            let output: MountOutput = serde_json::from_value(entry.clone())
                .map_err(|err| VaultError::Contract(format!("mount entry {path}: {err}")))?;
            mounts.insert(path.clone(), output);
        }
        Ok(mounts)
    }

    /// Mount a secret engine at `path`.
    pub async fn mount(&self, path: &str, engine_type: &str) -> VaultResult<()> {
        let url = self.url(&format!("sys/mounts/{}", path.trim_matches('/')))?;
        let body = serde_json::json!({ "type": engine_type });
        let response = self.request(Method::POST, url).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Unmount the secret engine at `path`.
    pub async fn unmount(&self, path: &str) -> VaultResult<()> {
        let url = self.url(&format!("sys/mounts/{}", path.trim_matches('/')))?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    // ---- logical -------------------------------------------------------

    /// Read a secret. Returns `None` when the path does not exist.
    pub async fn read(&self, path: &str) -> VaultResult<Option<Secret>> {
        let url = self.url(path)?;
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    /// Write a secret payload.
    pub async fn write(&self, path: &str, data: &Map<String, Value>) -> VaultResult<()> {
        let url = self.url(path)?;
        let response = self.request(Method::POST, url).json(data).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// List the keys under a path. Returns `None` when the path does not
    /// exist or holds nothing.
    pub async fn list(&self, path: &str) -> VaultResult<Option<Secret>> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().append_pair("list", "true");
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    /// Delete a secret.
    pub async fn delete(&self, path: &str) -> VaultResult<()> {
        let url = self.url(path)?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    // ---- auth: tokens --------------------------------------------------

    /// Create a token against a token role.
    pub async fn create_token_with_role(
        &self,
        request: &TokenCreateRequest,
        role: &str,
    ) -> VaultResult<Secret> {
        let url = self.url(&format!("auth/token/create/{role}"))?;
        let response = self.request(Method::POST, url).json(request).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Renew the client's own token.
    pub async fn renew_self(&self, increment: u64) -> VaultResult<Secret> {
        let url = self.url("auth/token/renew-self")?;
        let body = serde_json::json!({ "increment": increment });
        let response = self.request(Method::POST, url).json(&body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Renew `token` by executing renew-self as that token. Returns the
    /// freshest lease and reveals whether the token is still renewable.
    pub async fn renew_token_as_self(&self, token: &str, increment: u64) -> VaultResult<Secret> {
        self.with_token(token).renew_self(increment).await
    }

    /// Look up the client's own token.
    pub async fn lookup_self(&self) -> VaultResult<Secret> {
        let url = self.url("auth/token/lookup-self")?;
        let response = self.request(Method::GET, url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Revoke a token by its accessor.
    pub async fn revoke_accessor(&self, accessor: &str) -> VaultResult<()> {
        let url = self.url("auth/token/revoke-accessor")?;
        let body = serde_json::json!({ "accessor": accessor });
        let response = self.request(Method::POST, url).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}
