//! Service broker for vault tenants.
//!
//! This crate hosts the tenant lifecycle engine and its HTTP surface:
//! - Provision/deprovision of per-tenant policies, token roles, and mounts
//! - Bind/unbind of renewable credentials
//! - Background renewal of every issued token (and the broker's own)
//! - State recovery from the vault after a restart
//! - The service-broker protocol endpoints

pub mod auth;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod mounts;
pub mod platform;
pub mod renewal;
pub mod routes;
pub mod state;

pub use auth::BrokerCredentials;
pub use engine::Broker;
pub use error::BrokerError;
pub use routes::create_router;
pub use state::AppState;
