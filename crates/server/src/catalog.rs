//! Service catalog wire types.

use serde::Serialize;

/// A service offered in the marketplace catalog.
#[derive(Clone, Debug, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub bindable: bool,
    /// Field name kept as the broker protocol spells it.
    #[serde(rename = "plan_updateable")]
    pub plan_updateable: bool,
    pub plans: Vec<ServicePlan>,
}

/// A plan of a service.
#[derive(Clone, Debug, Serialize)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub free: bool,
}
