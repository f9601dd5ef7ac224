//! Configuration types shared across crates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// HTTP listener configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Basic-auth credentials protecting the broker API.
///
/// Both fields are required; the platform supplies them when registering
/// the broker.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub username: String,
    /// WARNING: Prefer the PORTER_SECURITY__PASSWORD env var over storing
    /// this in a config file.
    #[serde(default)]
    pub password: String,
}

/// Vault connection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Address the broker itself uses to reach the vault.
    #[serde(default = "default_vault_address")]
    pub address: String,
    /// Token the broker authenticates with. Required.
    /// WARNING: Prefer the PORTER_VAULT__TOKEN env var over storing this
    /// in a config file.
    #[serde(default)]
    pub token: String,
    /// Address advertised to bound applications. Falls back to `address`.
    /// Both are retained for compatibility with deployments that front the
    /// vault differently for applications than for the broker.
    #[serde(default)]
    pub advertise_address: Option<String>,
    /// Whether the broker renews its own token in the background.
    #[serde(default = "default_renew_token")]
    pub renew_token: bool,
}

fn default_vault_address() -> String {
    "https://127.0.0.1:8200".to_string()
}

fn default_renew_token() -> bool {
    true
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: default_vault_address(),
            token: String::new(),
            advertise_address: None,
            renew_token: default_renew_token(),
        }
    }
}

impl VaultConfig {
    /// The normalized address the broker connects to.
    pub fn normalized_address(&self) -> String {
        normalize_addr(&self.address)
    }

    /// The normalized address delivered to bound applications.
    pub fn normalized_advertise_address(&self) -> String {
        match &self.advertise_address {
            Some(addr) if !addr.is_empty() => normalize_addr(addr),
            _ => self.normalized_address(),
        }
    }
}

/// Marketplace identity of the offered service and its single plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Catalog identifier of the service. Distinct from any service
    /// *instance* guid; the two are never interchangeable.
    #[serde(default = "default_service_id")]
    pub id: String,
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_service_description")]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_plan_name")]
    pub plan_name: String,
    #[serde(default = "default_plan_description")]
    pub plan_description: String,
}

fn default_service_id() -> String {
    "0654695e-0760-a1d4-1cad-5dd87b75ed99".to_string()
}

fn default_service_name() -> String {
    "vault".to_string()
}

fn default_service_description() -> String {
    "Vault Service Broker".to_string()
}

fn default_plan_name() -> String {
    "shared".to_string()
}

fn default_plan_description() -> String {
    "Secure access to Vault's storage and transit backends".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id: default_service_id(),
            name: default_service_name(),
            description: default_service_description(),
            tags: Vec::new(),
            plan_name: default_plan_name(),
            plan_description: default_plan_description(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl AppConfig {
    /// Validate that every required setting is present. Failures here are
    /// fatal at startup and never surface at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.security.username.is_empty() {
            return Err(Error::MissingConfig("security.username"));
        }
        if self.security.password.is_empty() {
            return Err(Error::MissingConfig("security.password"));
        }
        if self.vault.token.is_empty() {
            return Err(Error::MissingConfig("vault.token"));
        }
        Ok(())
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** The credentials are dummies.
    pub fn for_testing() -> Self {
        Self {
            security: SecurityConfig {
                username: "broker".to_string(),
                password: "broker-password".to_string(),
            },
            vault: VaultConfig {
                token: "test-token".to_string(),
                renew_token: false,
                ..VaultConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Normalize a vault address.
///
/// A missing scheme defaults to `https`. A scheme containing a dot is
/// really a bare host written before the first `:` (legacy input such as
/// `vault.example.com:8200`) and is rewritten as one. The path always ends
/// in exactly one `/`.
pub fn normalize_addr(addr: &str) -> String {
    if addr.is_empty() {
        return String::new();
    }

    let (scheme, rest) = match addr.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !scheme.contains('.') => {
            (scheme.to_string(), rest.to_string())
        }
        Some((_, rest)) => ("https".to_string(), rest.to_string()),
        None => ("https".to_string(), addr.to_string()),
    };

    let (host, path) = match rest.split_once('/') {
        Some((host, path)) => (host.to_string(), path.to_string()),
        None => (rest, String::new()),
    };

    let path = format!("/{}", path.trim_end_matches('/'));
    let path = if path == "/" {
        path
    } else {
        format!("{path}/")
    };

    format!("{scheme}://{host}{path}")
}
