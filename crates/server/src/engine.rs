//! The tenant lifecycle engine.
//!
//! Each provisioned tenant gets an isolated policy, a periodic token role,
//! and a set of secret-engine mounts. Each binding gets a renewable token
//! whose lease a background task keeps alive until unbind or shutdown. All
//! broker state needed to survive a restart is persisted through the vault
//! itself under `cf/broker/`.

use crate::catalog::{Service, ServicePlan};
use crate::error::{ApiResult, BrokerError};
use crate::mounts::MountCoordinator;
use crate::platform::PlatformDirectory;
use crate::renewal;
use porter_core::codec;
use porter_core::config::ServiceConfig;
use porter_core::policy;
use porter_core::{BindingInfo, InstanceDetails, Mount, SecretEngine};
use porter_vault::{TokenCreateRequest, VaultClient};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Periodic TTL of every tenant token role, in seconds (5 days). Each
/// renewal extends the lease by this much.
pub const TOKEN_ROLE_PERIOD_SECS: u64 = 5 * 24 * 60 * 60;

/// Credentials delivered to a bound application.
#[derive(Clone, Debug, Serialize)]
pub struct BindingCredentials {
    /// The advertised vault address.
    pub address: String,
    pub auth: CredentialsAuth,
    /// Backends private to the instance.
    pub backends: CredentialsBackends,
    /// Backends shared with the wider org and space.
    pub backends_shared: CredentialsSharedBackends,
}

#[derive(Clone, Debug, Serialize)]
pub struct CredentialsAuth {
    pub accessor: String,
    pub token: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CredentialsBackends {
    pub generic: String,
    pub transit: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CredentialsSharedBackends {
    pub organization: String,
    pub space: String,
}

/// A live binding: its persisted identity plus the transient renewal
/// machinery.
struct BoundToken {
    info: BindingInfo,
    /// Per-binding stop signal, fired exactly once on unbind.
    stop: watch::Sender<bool>,
    #[allow(dead_code)]
    task: JoinHandle<()>,
}

/// Running/stopped state, guarded by the lifecycle lock.
#[derive(Default)]
struct Lifecycle {
    running: bool,
    /// Broker-wide shutdown signal, fired exactly once on stop.
    shutdown: Option<watch::Sender<bool>>,
}

/// The service broker engine.
pub struct Broker {
    vault: VaultClient,
    platform: Option<Arc<dyn PlatformDirectory>>,
    service: ServiceConfig,
    advertise_address: String,
    renew_own_token: bool,

    mounts: MountCoordinator,
    instances: Mutex<HashMap<String, InstanceDetails>>,
    binds: Mutex<HashMap<String, BoundToken>>,
    lifecycle: Mutex<Lifecycle>,
}

impl Broker {
    pub fn new(
        vault: VaultClient,
        service: ServiceConfig,
        advertise_address: String,
        renew_own_token: bool,
        platform: Option<Arc<dyn PlatformDirectory>>,
    ) -> Self {
        Self {
            mounts: MountCoordinator::new(vault.clone()),
            vault,
            platform,
            service,
            advertise_address,
            renew_own_token,
            instances: Mutex::new(HashMap::new()),
            binds: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Start the broker: ensure the persistence mount exists, rehydrate
    /// every persisted instance and binding, and start the renewers.
    /// A no-op when already running.
    pub async fn start(&self) -> ApiResult<()> {
        tracing::info!("starting broker");

        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.running {
            tracing::debug!("broker is already running");
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if self.renew_own_token {
            renewal::spawn_self_renewer(self.vault.clone(), shutdown_rx.clone());
        }

        // All persisted state lives under this mount.
        let broker_mount = [Mount::absolute("broker")];
        tracing::debug!(path = %broker_mount[0], "ensuring broker mount");
        self.mounts.mount(&broker_mount).await?;

        tracing::debug!("restoring persisted state");
        for instance_id in self.list_dir("cf/broker/").await? {
            let instance_id = instance_id.trim_matches('/');

            self.restore_instance(instance_id).await?;

            let bindings = self.list_dir(&format!("cf/broker/{instance_id}/")).await?;
            for binding_id in bindings {
                let binding_id = binding_id.trim_matches('/');
                self.restore_binding(instance_id, binding_id, &shutdown_rx)
                    .await?;
            }
        }

        let restored_binds = self.binds.lock().await.len();
        let restored_instances = self.instances.lock().await.len();
        tracing::info!(
            "restored {} binds and {} instances",
            restored_binds,
            restored_instances
        );

        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.running = true;
        Ok(())
    }

    /// Stop the broker: fire the broker-wide shutdown signal so every
    /// renewer exits at its next suspension. A no-op when not running.
    /// Unbinds in flight complete normally.
    pub async fn stop(&self) {
        tracing::info!("stopping broker");

        let mut lifecycle = self.lifecycle.lock().await;
        if !lifecycle.running {
            return;
        }

        if let Some(shutdown) = lifecycle.shutdown.take() {
            let _ = shutdown.send(true);
        }
        lifecycle.running = false;
    }

    /// Whether the broker is currently running.
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.running
    }

    /// The catalog: one bindable service with one free plan.
    pub fn services(&self) -> Vec<Service> {
        tracing::info!("listing services");
        vec![Service {
            id: self.service.id.clone(),
            name: self.service.name.clone(),
            description: self.service.description.clone(),
            tags: self.service.tags.clone(),
            bindable: true,
            plan_updateable: false,
            plans: vec![ServicePlan {
                id: format!("{}.{}", self.service.id, self.service.plan_name),
                name: self.service.plan_name.clone(),
                description: self.service.plan_description.clone(),
                free: true,
            }],
        }]
    }

    /// Provision a new tenant: policy, periodic token role, mounts, and the
    /// persisted instance record.
    ///
    /// Nothing is rolled back on failure; every step is idempotent, so a
    /// retried provision converges.
    pub async fn provision(
        &self,
        instance_id: &str,
        organization_guid: &str,
        space_guid: &str,
    ) -> ApiResult<()> {
        tracing::info!(
            instance_id,
            organization_guid,
            space_guid,
            "provisioning instance"
        );

        let mut details = InstanceDetails::new(organization_guid, space_guid, instance_id);
        if let Some(platform) = &self.platform {
            details.organization_name = platform.organization_name(organization_guid).await?;
            details.space_name = platform.space_name(space_guid).await?;
            details.service_instance_name = platform.service_instance_name(instance_id).await?;
        }

        tracing::debug!(instance_id, "generating policy");
        let policy = policy::render_policy(&details);

        let policy_name = format!("cf-{instance_id}");
        tracing::debug!(%policy_name, "creating policy");
        self.vault.put_policy(&policy_name, &policy).await?;

        let role_path = format!("auth/token/roles/cf-{instance_id}");
        let mut role = Map::new();
        role.insert(
            "allowed_policies".to_string(),
            Value::String(policy_name.clone()),
        );
        role.insert("period".to_string(), Value::from(TOKEN_ROLE_PERIOD_SECS));
        role.insert("renewable".to_string(), Value::Bool(true));
        tracing::debug!(%role_path, "creating token role");
        self.vault.write(&role_path, &role).await?;

        let mounts = tenant_mounts(&details);
        tracing::debug!(count = mounts.len(), "creating mounts");
        self.mounts.mount(&mounts).await?;

        let instance_path = format!("cf/broker/{instance_id}");
        tracing::debug!(%instance_path, "storing instance metadata");
        let data = codec::encode_envelope(&details)?;
        self.vault.write(&instance_path, &data).await?;

        tracing::debug!(instance_id, "saving instance to cache");
        self.instances
            .lock()
            .await
            .insert(instance_id.to_string(), details);

        Ok(())
    }

    /// Deprovision a tenant: unmount its backends, delete its token role,
    /// policy, and persisted record.
    pub async fn deprovision(&self, instance_id: &str) -> ApiResult<()> {
        tracing::info!(instance_id, "deprovisioning instance");

        let mut mounts = vec![
            Mount::scoped(instance_id, SecretEngine::Kv),
            Mount::scoped(instance_id, SecretEngine::Transit),
        ];
        let cached = self.instances.lock().await.get(instance_id).cloned();
        if let Some(instance) = cached {
            if !instance.service_instance_name.is_empty() {
                mounts.push(Mount::named(
                    &instance.service_instance_name,
                    instance_id,
                    SecretEngine::Kv,
                ));
                mounts.push(Mount::named(
                    &instance.service_instance_name,
                    instance_id,
                    SecretEngine::Transit,
                ));
            }
        }

        tracing::debug!(count = mounts.len(), "removing mounts");
        self.mounts.unmount(&mounts).await?;

        let role_path = format!("auth/token/roles/cf-{instance_id}");
        tracing::debug!(%role_path, "deleting token role");
        self.vault.delete(&role_path).await?;

        let policy_name = format!("cf-{instance_id}");
        tracing::debug!(%policy_name, "deleting policy");
        self.vault.delete_policy(&policy_name).await?;

        let instance_path = format!("cf/broker/{instance_id}");
        tracing::debug!(%instance_path, "deleting instance metadata");
        self.vault.delete(&instance_path).await?;

        tracing::debug!(instance_id, "removing instance from cache");
        self.instances.lock().await.remove(instance_id);

        Ok(())
    }

    /// Bind an application to a tenant: issue a renewable token against the
    /// tenant's role, persist the binding, and start its renewer.
    pub async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
    ) -> ApiResult<BindingCredentials> {
        tracing::info!(instance_id, binding_id, "binding service");

        let role_name = format!("cf-{instance_id}");
        let request = TokenCreateRequest {
            policies: vec![role_name.clone()],
            metadata: HashMap::from([
                ("cf-instance-id".to_string(), instance_id.to_string()),
                ("cf-binding-id".to_string(), binding_id.to_string()),
            ]),
            display_name: format!("cf-bind-{binding_id}"),
            renewable: Some(true),
        };
        tracing::debug!(%role_name, "creating token");
        let secret = self.vault.create_token_with_role(&request, &role_name).await?;
        let Some(auth) = secret.auth else {
            return Err(BrokerError::Contract(format!(
                "token created with role {role_name} has no auth"
            )));
        };

        tracing::debug!(instance_id, "looking up instance in cache");
        let instance = self.instances.lock().await.get(instance_id).cloned();
        let Some(instance) = instance else {
            return Err(BrokerError::UnknownInstance(instance_id.to_string()));
        };

        let info = BindingInfo {
            organization: instance.organization_guid.clone(),
            space: instance.space_guid.clone(),
            binding: binding_id.to_string(),
            client_token: auth.client_token.clone(),
            accessor: auth.accessor.clone(),
        };

        let path = format!("cf/broker/{instance_id}/{binding_id}");
        tracing::debug!(%path, "storing binding metadata");
        let data = codec::encode_envelope(&info)?;
        if let Err(err) = self.vault.write(&path, &data).await {
            // The token is already issued; revoke it so it does not leak.
            if let Err(revoke_err) = self.vault.revoke_accessor(&info.accessor).await {
                tracing::warn!(
                    accessor = %info.accessor,
                    error = %revoke_err,
                    "failed to revoke accessor"
                );
            }
            return Err(err.into());
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = renewal::spawn_token_renewer(
            self.vault.clone(),
            info.client_token.clone(),
            info.accessor.clone(),
            Some(stop_rx),
            self.shutdown_rx().await,
        );

        tracing::debug!(binding_id, "saving binding to cache");
        self.binds.lock().await.insert(
            binding_id.to_string(),
            BoundToken {
                info,
                stop: stop_tx,
                task,
            },
        );

        Ok(BindingCredentials {
            address: self.advertise_address.clone(),
            auth: CredentialsAuth {
                accessor: auth.accessor,
                token: auth.client_token,
            },
            backends: CredentialsBackends {
                generic: format!("cf/{instance_id}/secret"),
                transit: format!("cf/{instance_id}/transit"),
            },
            backends_shared: CredentialsSharedBackends {
                organization: format!("cf/{}/secret", instance.organization_guid),
                space: format!("cf/{}/secret", instance.space_guid),
            },
        })
    }

    /// Release a binding: revoke its token, delete the persisted record,
    /// and stop its renewer.
    pub async fn unbind(&self, instance_id: &str, binding_id: &str) -> ApiResult<()> {
        tracing::info!(instance_id, binding_id, "unbinding service");

        let path = format!("cf/broker/{instance_id}/{binding_id}");
        tracing::debug!(%path, "reading binding metadata");
        let secret = self.vault.read(&path).await?;
        let Some(secret) = secret.filter(|s| s.has_data()) else {
            return Err(BrokerError::UnknownBinding(binding_id.to_string()));
        };
        let info: BindingInfo = codec::decode_envelope(&secret.data.unwrap_or_default())?;

        tracing::debug!(accessor = %info.accessor, "revoking accessor");
        self.vault.revoke_accessor(&info.accessor).await?;

        tracing::debug!(%path, "deleting binding metadata");
        self.vault.delete(&path).await?;

        tracing::debug!(binding_id, "removing binding from cache");
        let mut binds = self.binds.lock().await;
        if let Some(existing) = binds.remove(binding_id) {
            let _ = existing.stop.send(true);
        }

        Ok(())
    }

    /// Instance updates only apply with multiple plans; this broker has one.
    pub async fn update(&self, instance_id: &str) {
        tracing::info!(instance_id, "updating service");
    }

    /// Only meaningful for asynchronous provisioning, which this broker
    /// does not do.
    pub async fn last_operation(&self, instance_id: &str) {
        tracing::info!(instance_id, "returning last operation");
    }

    /// Number of instances in the in-memory index.
    pub async fn instance_count(&self) -> usize {
        self.instances.lock().await.len()
    }

    /// Number of live bindings in the in-memory index.
    pub async fn bind_count(&self) -> usize {
        self.binds.lock().await.len()
    }

    /// The accessor of a live binding, if present.
    pub async fn binding_accessor(&self, binding_id: &str) -> Option<String> {
        self.binds
            .lock()
            .await
            .get(binding_id)
            .map(|bound| bound.info.accessor.clone())
    }

    /// A receiver for the broker-wide shutdown signal. When the broker is
    /// not running the receiver reports shutdown immediately.
    async fn shutdown_rx(&self) -> watch::Receiver<bool> {
        let lifecycle = self.lifecycle.lock().await;
        match &lifecycle.shutdown {
            Some(shutdown) => shutdown.subscribe(),
            None => watch::channel(true).1,
        }
    }

    /// Restore one persisted instance into the index. Corrupt entries are
    /// skipped so a single broken record cannot keep the broker offline.
    async fn restore_instance(&self, instance_id: &str) -> ApiResult<()> {
        tracing::info!(instance_id, "restoring instance");

        let path = format!("cf/broker/{instance_id}");
        let secret = self.vault.read(&path).await?;
        let Some(secret) = secret.filter(|s| s.has_data()) else {
            tracing::info!(%path, "persisted instance has no data");
            return Ok(());
        };

        match codec::decode_envelope::<InstanceDetails>(&secret.data.unwrap_or_default()) {
            Ok(details) => {
                self.instances
                    .lock()
                    .await
                    .insert(instance_id.to_string(), details);
            }
            Err(err) => {
                tracing::warn!(%path, error = %err, "skipping corrupt instance entry");
            }
        }
        Ok(())
    }

    /// Restore one persisted binding and start its renewer. Corrupt entries
    /// are skipped.
    async fn restore_binding(
        &self,
        instance_id: &str,
        binding_id: &str,
        shutdown: &watch::Receiver<bool>,
    ) -> ApiResult<()> {
        tracing::info!(instance_id, binding_id, "restoring binding");

        let path = format!("cf/broker/{instance_id}/{binding_id}");
        let secret = self.vault.read(&path).await?;
        let Some(secret) = secret.filter(|s| s.has_data()) else {
            tracing::info!(%path, "persisted binding has no data");
            return Ok(());
        };

        let info = match codec::decode_envelope::<BindingInfo>(&secret.data.unwrap_or_default()) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(%path, error = %err, "skipping corrupt binding entry");
                return Ok(());
            }
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = renewal::spawn_token_renewer(
            self.vault.clone(),
            info.client_token.clone(),
            info.accessor.clone(),
            Some(stop_rx),
            shutdown.clone(),
        );

        self.binds.lock().await.insert(
            binding_id.to_string(),
            BoundToken {
                info,
                stop: stop_tx,
                task,
            },
        );
        Ok(())
    }

    /// List the keys under a vault directory. A missing or empty directory
    /// yields an empty list.
    async fn list_dir(&self, path: &str) -> ApiResult<Vec<String>> {
        tracing::debug!(path, "listing directory");

        let Some(secret) = self.vault.list(path).await? else {
            tracing::debug!(path, "directory has no data");
            return Ok(Vec::new());
        };
        let Some(data) = secret.data.filter(|data| !data.is_empty()) else {
            tracing::debug!(path, "directory has no data");
            return Ok(Vec::new());
        };

        let keys = data
            .get("keys")
            .ok_or_else(|| BrokerError::Contract(format!("list of {path} has no keys")))?;
        let keys = keys.as_array().ok_or_else(|| {
            BrokerError::Contract(format!("list of {path}: keys is not an array"))
        })?;

        keys.iter()
            .map(|key| {
                key.as_str().map(str::to_string).ok_or_else(|| {
                    BrokerError::Contract(format!("list of {path}: key {key} is not a string"))
                })
            })
            .collect()
    }
}

/// The mount set for a tenant: org, space, and instance KV plus instance
/// transit, duplicated with name prefixes when names are resolved.
fn tenant_mounts(details: &InstanceDetails) -> Vec<Mount> {
    let mut mounts = vec![
        Mount::scoped(&details.organization_guid, SecretEngine::Kv),
        Mount::scoped(&details.space_guid, SecretEngine::Kv),
        Mount::scoped(&details.service_instance_guid, SecretEngine::Kv),
        Mount::scoped(&details.service_instance_guid, SecretEngine::Transit),
    ];

    if details.names_populated() {
        mounts.extend([
            Mount::named(
                &details.organization_name,
                &details.organization_guid,
                SecretEngine::Kv,
            ),
            Mount::named(&details.space_name, &details.space_guid, SecretEngine::Kv),
            Mount::named(
                &details.service_instance_name,
                &details.service_instance_guid,
                SecretEngine::Kv,
            ),
            Mount::named(
                &details.service_instance_name,
                &details.service_instance_guid,
                SecretEngine::Transit,
            ),
        ]);
    }

    mounts
}
