//! HTTP request handlers for the service-broker protocol.

pub mod bindings;
pub mod catalog;
pub mod instances;

pub use bindings::*;
pub use catalog::*;
pub use instances::*;

use serde::Serialize;

/// The empty object several protocol endpoints answer with.
#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}
