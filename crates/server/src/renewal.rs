//! Per-token renewal tasks.
//!
//! Every live binding owns one background task that keeps its token
//! renewed until the binding is released or the broker shuts down. The
//! broker's own token gets the same treatment when self-renewal is
//! enabled.

use porter_vault::{RenewEvent, TokenRenewer, VaultClient};
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawn a renewal task for one issued token.
///
/// `stop` is the per-binding cancellation signal; `None` means only the
/// broker-wide `shutdown` signal can end the task.
pub fn spawn_token_renewer(
    vault: VaultClient,
    token: String,
    accessor: String,
    stop: Option<watch::Receiver<bool>>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(renew_auth(vault, token, accessor, stop, shutdown))
}

/// Spawn the renewal task for the broker's own token.
pub fn spawn_self_renewer(vault: VaultClient, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(renew_own_token(vault, shutdown))
}

async fn renew_auth(
    vault: VaultClient,
    token: String,
    accessor: String,
    mut stop: Option<watch::Receiver<bool>>,
    mut shutdown: watch::Receiver<bool>,
) {
    // Spread renewal start over a few seconds so a broker restarting with
    // many bindings does not stampede the vault.
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..5000));
    tokio::select! {
        _ = tokio::time::sleep(jitter) => {}
        _ = stop_requested(&mut stop) => {
            tracing::info!(%accessor, "stopping renewer: unbind requested");
            return;
        }
        _ = shutdown_signalled(&mut shutdown) => return,
    }

    // Renew rather than look up: it yields the freshest lease and reveals
    // whether the token is still renewable at all.
    let initial = match vault.renew_token_as_self(&token, 0).await {
        Ok(secret) => secret,
        Err(err) => {
            tracing::error!(%accessor, error = %err, "error renewing token");
            return;
        }
    };

    let mut renewer = TokenRenewer::start(vault, token, &initial);

    loop {
        tokio::select! {
            event = renewer.next() => match event {
                Some(RenewEvent::Renewed(auth)) => {
                    let remaining = auth
                        .map(|auth| format!("{}s", auth.lease_duration))
                        .unwrap_or_else(|| "no auth data".to_string());
                    tracing::info!(%accessor, %remaining, "successfully renewed token");
                }
                Some(RenewEvent::Done(error)) => {
                    if let Some(error) = error {
                        tracing::error!(%accessor, %error, "renewal failed");
                    }
                    tracing::warn!(%accessor, "renewer stopped: token probably expired");
                    break;
                }
                None => {
                    tracing::warn!(%accessor, "renewer stopped: token probably expired");
                    break;
                }
            },
            _ = stop_requested(&mut stop) => {
                tracing::info!(%accessor, "stopping renewer: unbind requested");
                break;
            }
            _ = shutdown_signalled(&mut shutdown) => break,
        }
    }

    renewer.stop();
}

/// Renew the broker's own token, unless it never expires.
async fn renew_own_token(vault: VaultClient, shutdown: watch::Receiver<bool>) {
    let secret = match vault.lookup_self().await {
        Ok(secret) => secret,
        Err(err) => {
            tracing::error!(error = %err, "failed to look up own vault token");
            return;
        }
    };

    // A token with an explicitly null expire_time never expires; a missing
    // key still means expiring.
    if let Some(data) = &secret.data {
        if matches!(data.get("expire_time"), Some(Value::Null)) {
            tracing::info!("vault token never expires, stopping renewal process");
            return;
        }
    }

    let secret = match vault.renew_self(0).await {
        Ok(secret) => secret,
        Err(err) => {
            tracing::error!(error = %err, "failed to renew own vault token");
            return;
        }
    };
    let Some(auth) = secret.auth else {
        tracing::error!("renew-self came back with empty auth");
        return;
    };

    renew_auth(vault, auth.client_token, auth.accessor, None, shutdown).await;
}

/// Resolves once the per-binding stop signal fires. A task without one
/// waits forever here.
async fn stop_requested(stop: &mut Option<watch::Receiver<bool>>) {
    match stop.as_mut() {
        // A dropped sender also ends the wait, which only happens when the
        // binding is removed.
        Some(rx) => {
            let _ = rx.wait_for(|stopped| *stopped).await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves once the broker-wide shutdown signal fires.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}
