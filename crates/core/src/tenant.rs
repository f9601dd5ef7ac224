//! Tenant identity records.
//!
//! Both record types are persisted through the vault under `cf/broker/` and
//! must keep the field names of any pre-existing persisted state, hence the
//! explicit serde renames.

use serde::{Deserialize, Serialize};

/// The identity of a provisioned tenant.
///
/// The three guids are always present; the names are populated only when a
/// platform directory is configured, and are either all present or all
/// absent once stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDetails {
    #[serde(rename = "OrganizationGUID")]
    pub organization_guid: String,

    #[serde(rename = "OrganizationName", default)]
    pub organization_name: String,

    #[serde(rename = "SpaceGUID")]
    pub space_guid: String,

    #[serde(rename = "SpaceName", default)]
    pub space_name: String,

    #[serde(rename = "ServiceInstanceGUID")]
    pub service_instance_guid: String,

    #[serde(rename = "ServiceInstanceName", default)]
    pub service_instance_name: String,
}

impl InstanceDetails {
    /// Build guid-only details, as used when no platform directory is
    /// configured.
    pub fn new(
        organization_guid: impl Into<String>,
        space_guid: impl Into<String>,
        service_instance_guid: impl Into<String>,
    ) -> Self {
        Self {
            organization_guid: organization_guid.into(),
            space_guid: space_guid.into(),
            service_instance_guid: service_instance_guid.into(),
            ..Self::default()
        }
    }

    /// Whether all three human-readable names are present. This decides
    /// which policy template is rendered and whether named mounts exist.
    pub fn names_populated(&self) -> bool {
        !self.organization_name.is_empty()
            && !self.space_name.is_empty()
            && !self.service_instance_name.is_empty()
    }
}

/// The identity of a single credential issuance.
///
/// The transient stop signal for the binding's renewer lives with the
/// broker's in-memory index, not here; this struct is exactly the persisted
/// shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingInfo {
    #[serde(rename = "Organization")]
    pub organization: String,

    #[serde(rename = "Space")]
    pub space: String,

    #[serde(rename = "Binding")]
    pub binding: String,

    #[serde(rename = "ClientToken")]
    pub client_token: String,

    #[serde(rename = "Accessor")]
    pub accessor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_populated_requires_all_three() {
        let mut details = InstanceDetails::new("o", "s", "i");
        assert!(!details.names_populated());

        details.organization_name = "org-x".to_string();
        details.space_name = "sp-y".to_string();
        assert!(!details.names_populated());

        details.service_instance_name = "inst-z".to_string();
        assert!(details.names_populated());
    }

    #[test]
    fn instance_details_uses_persisted_field_names() {
        let details = InstanceDetails::new("o", "s", "i");
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["OrganizationGUID"], "o");
        assert_eq!(json["SpaceGUID"], "s");
        assert_eq!(json["ServiceInstanceGUID"], "i");
    }

    #[test]
    fn binding_info_uses_persisted_field_names() {
        let info = BindingInfo {
            organization: "o".to_string(),
            space: "s".to_string(),
            binding: "b".to_string(),
            client_token: "t".to_string(),
            accessor: "a".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["Organization"], "o");
        assert_eq!(json["ClientToken"], "t");
        assert_eq!(json["Accessor"], "a");
    }
}
