//! Application state shared across handlers.

use crate::auth::BrokerCredentials;
use crate::engine::Broker;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The tenant lifecycle engine.
    pub broker: Arc<Broker>,
    /// Basic-auth credentials protecting the API.
    pub credentials: Arc<BrokerCredentials>,
}

impl AppState {
    pub fn new(broker: Arc<Broker>, credentials: BrokerCredentials) -> Self {
        Self {
            broker,
            credentials: Arc::new(credentials),
        }
    }
}
