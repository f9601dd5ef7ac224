//! Idempotent mount-table coordination.

use porter_core::Mount;
use porter_vault::{VaultClient, VaultResult};
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Serializes all mount-table mutations against the vault.
///
/// Both operations diff the desired set against the live mount table and
/// only act on the difference, so a retried call converges to the same end
/// state. Partial progress on error is left in place; callers retry.
pub struct MountCoordinator {
    vault: VaultClient,
    table_lock: Mutex<()>,
}

impl MountCoordinator {
    pub fn new(vault: VaultClient) -> Self {
        Self {
            vault,
            table_lock: Mutex::new(()),
        }
    }

    /// Mount every entry of `mounts` that is not already mounted.
    pub async fn mount(&self, mounts: &[Mount]) -> VaultResult<()> {
        let _guard = self.table_lock.lock().await;
        let live = self.live_paths().await?;

        for mount in mounts {
            let path = mount.path();
            let path = path.trim_matches('/');
            if live.contains(path) {
                continue;
            }
            tracing::debug!(path, "mounting backend");
            self.vault.mount(path, mount.engine().engine_type()).await?;
        }
        Ok(())
    }

    /// Unmount every entry of `mounts` that is currently mounted.
    pub async fn unmount(&self, mounts: &[Mount]) -> VaultResult<()> {
        let _guard = self.table_lock.lock().await;
        let live = self.live_paths().await?;

        for mount in mounts {
            let path = mount.path();
            let path = path.trim_matches('/');
            if !live.contains(path) {
                continue;
            }
            tracing::debug!(path, "unmounting backend");
            self.vault.unmount(path).await?;
        }
        Ok(())
    }

    /// The live mount paths, trimmed of surrounding slashes. The vault
    /// reports paths with a trailing slash.
    async fn live_paths(&self) -> VaultResult<HashSet<String>> {
        Ok(self
            .vault
            .list_mounts()
            .await?
            .into_keys()
            .map(|path| path.trim_matches('/').to_string())
            .collect())
    }
}
