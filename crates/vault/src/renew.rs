//! Streaming token renewer.
//!
//! A [`TokenRenewer`] owns one background task that keeps a single token's
//! lease alive, renewing at half the remaining lease. Consumers drain
//! [`RenewEvent`]s from it; dropping (or stopping) the renewer releases the
//! task on every exit path.

use crate::client::VaultClient;
use crate::error::VaultError;
use crate::types::Auth;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One observation from the renewal loop.
#[derive(Debug)]
pub enum RenewEvent {
    /// A renewal succeeded. The auth block is absent when the vault
    /// answered without one.
    Renewed(Option<Auth>),
    /// The loop terminated; no further renewals will happen. Carries the
    /// terminating error, if any.
    Done(Option<VaultError>),
}

/// A running renewer for one token.
pub struct TokenRenewer {
    events: mpsc::Receiver<RenewEvent>,
    handle: JoinHandle<()>,
}

impl TokenRenewer {
    /// Start renewing `token`, seeded with the lease from `initial` (the
    /// response of a fresh renew call for the same token).
    pub fn start(client: VaultClient, token: String, initial: &crate::types::Secret) -> Self {
        let (lease, renewable) = match &initial.auth {
            Some(auth) => (auth.lease_duration, auth.renewable),
            None => (initial.lease_duration, initial.renewable),
        };

        let (tx, events) = mpsc::channel(8);
        let handle = tokio::spawn(renew_loop(client, token, lease, renewable, tx));

        Self { events, handle }
    }

    /// Wait for the next renewal event. Returns `None` once the loop task
    /// is gone.
    pub async fn next(&mut self) -> Option<RenewEvent> {
        self.events.recv().await
    }

    /// Release the renewer. Dropping has the same effect.
    pub fn stop(self) {}
}

impl Drop for TokenRenewer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn renew_loop(
    client: VaultClient,
    token: String,
    mut lease: u64,
    renewable: bool,
    tx: mpsc::Sender<RenewEvent>,
) {
    if !renewable {
        let _ = tx.send(RenewEvent::Done(None)).await;
        return;
    }

    loop {
        // Renew at half the lease so a missed cycle still has slack.
        let wait = Duration::from_secs((lease / 2).max(1));
        tokio::time::sleep(wait).await;

        match client.renew_token_as_self(&token, 0).await {
            Ok(secret) => {
                if let Some(auth) = &secret.auth {
                    lease = auth.lease_duration;
                }
                if tx.send(RenewEvent::Renewed(secret.auth)).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = tx.send(RenewEvent::Done(Some(err))).await;
                return;
            }
        }
    }
}
