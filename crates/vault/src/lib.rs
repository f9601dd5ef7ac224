//! Vault API client for the porter service broker.
//!
//! A thin HTTP client over the subset of the vault API the broker uses:
//! ACL policies, the mount table, logical secrets, and the token endpoints,
//! plus a streaming renewer that keeps a single lease alive until stopped.

pub mod client;
pub mod error;
pub mod renew;
pub mod types;

pub use client::VaultClient;
pub use error::{VaultError, VaultResult};
pub use renew::{RenewEvent, TokenRenewer};
pub use types::{Auth, Secret, TokenCreateRequest};
