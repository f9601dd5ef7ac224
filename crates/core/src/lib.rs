//! Core domain types for the porter service broker.
//!
//! This crate holds everything that is pure logic: mount naming, tenant
//! policy rendering, the persistence envelope, and configuration. It knows
//! nothing about HTTP or the vault API itself.

pub mod codec;
pub mod config;
pub mod error;
pub mod mount;
pub mod policy;
pub mod tenant;

pub use error::{Error, Result};
pub use mount::{Mount, SecretEngine};
pub use tenant::{BindingInfo, InstanceDetails};
