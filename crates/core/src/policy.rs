//! Tenant policy rendering.
//!
//! Each provisioned tenant gets a vault policy granting access to its own
//! instance and space scopes plus read-only access to its organization
//! scope. The capability asymmetry is the authorization model: orgs are
//! shared read-only, space and instance paths are read-write.

use crate::tenant::InstanceDetails;

/// Policy template for tenants without resolved names.
///
/// Placeholders:
/// - `{instance_guid}` - service instance guid
/// - `{space_guid}` - space guid
/// - `{org_guid}` - organization guid
const POLICY_WITHOUT_NAMES: &str = r#"
path "cf/{instance_guid}" {
  capabilities = ["list"]
}

path "cf/{instance_guid}/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}

path "cf/{space_guid}" {
  capabilities = ["list"]
}

path "cf/{space_guid}/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}

path "cf/{org_guid}" {
  capabilities = ["list"]
}

path "cf/{org_guid}/*" {
  capabilities = ["read", "list"]
}
"#;

/// Policy template for tenants with resolved names. Identical to the
/// guid-only template but additionally covers the `<name>-<guid>` mount
/// path variants.
const POLICY_WITH_NAMES: &str = r#"
path "cf/{instance_name}-{instance_guid}" {
  capabilities = ["list"]
}

path "cf/{instance_guid}" {
  capabilities = ["list"]
}

path "cf/{instance_name}-{instance_guid}/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}

path "cf/{instance_guid}/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}

path "cf/{space_name}-{space_guid}" {
  capabilities = ["list"]
}

path "cf/{space_guid}" {
  capabilities = ["list"]
}

path "cf/{space_name}-{space_guid}/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}

path "cf/{space_guid}/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}

path "cf/{org_name}-{org_guid}" {
  capabilities = ["list"]
}

path "cf/{org_guid}" {
  capabilities = ["list"]
}

path "cf/{org_name}-{org_guid}/*" {
  capabilities = ["read", "list"]
}

path "cf/{org_guid}/*" {
  capabilities = ["read", "list"]
}
"#;

/// Render the policy document for a tenant.
///
/// The with-names template is used iff all three names are populated;
/// partially-resolved names fall back to the guid-only template.
pub fn render_policy(details: &InstanceDetails) -> String {
    let template = if details.names_populated() {
        POLICY_WITH_NAMES
    } else {
        POLICY_WITHOUT_NAMES
    };

    template
        .replace("{instance_name}", &details.service_instance_name)
        .replace("{instance_guid}", &details.service_instance_guid)
        .replace("{space_name}", &details.space_name)
        .replace("{space_guid}", &details.space_guid)
        .replace("{org_name}", &details.organization_name)
        .replace("{org_guid}", &details.organization_guid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_details() -> InstanceDetails {
        InstanceDetails {
            organization_guid: "O".to_string(),
            organization_name: "org-x".to_string(),
            space_guid: "S".to_string(),
            space_name: "sp-y".to_string(),
            service_instance_guid: "I".to_string(),
            service_instance_name: "inst-z".to_string(),
        }
    }

    #[test]
    fn guid_only_policy_covers_all_scopes() {
        let policy = render_policy(&InstanceDetails::new("O", "S", "I"));

        assert!(policy.contains(r#"path "cf/O" {"#));
        assert!(policy.contains(r#"path "cf/S" {"#));
        assert!(policy.contains(r#"path "cf/I" {"#));
        assert!(policy.contains(r#"path "cf/O/*" {"#));
        assert!(policy.contains(r#"path "cf/S/*" {"#));
        assert!(policy.contains(r#"path "cf/I/*" {"#));
    }

    #[test]
    fn org_scope_is_read_only() {
        let policy = render_policy(&InstanceDetails::new("O", "S", "I"));

        let org_block = policy
            .split("path ")
            .find(|block| block.starts_with(r#""cf/O/*""#))
            .expect("org wildcard block");
        assert!(org_block.contains(r#"["read", "list"]"#));
        assert!(!org_block.contains("create"));
        assert!(!org_block.contains("update"));
        assert!(!org_block.contains("delete"));
    }

    #[test]
    fn space_and_instance_scopes_are_read_write() {
        let policy = render_policy(&InstanceDetails::new("O", "S", "I"));

        for scope in [r#""cf/S/*""#, r#""cf/I/*""#] {
            let block = policy
                .split("path ")
                .find(|b| b.starts_with(scope))
                .expect("wildcard block");
            assert!(block.contains(r#"["create", "read", "update", "delete", "list"]"#));
        }
    }

    #[test]
    fn named_policy_duplicates_each_scope() {
        let policy = render_policy(&named_details());

        assert!(policy.contains(r#"path "cf/I/*" {"#));
        assert!(policy.contains(r#"path "cf/inst-z-I/*" {"#));
        assert!(policy.contains(r#"path "cf/sp-y-S/*" {"#));
        assert!(policy.contains(r#"path "cf/org-x-O/*" {"#));

        // The named org variant keeps the read-only capabilities.
        let block = policy
            .split("path ")
            .find(|b| b.starts_with(r#""cf/org-x-O/*""#))
            .expect("named org block");
        assert!(block.contains(r#"["read", "list"]"#));
    }

    #[test]
    fn partial_names_render_guid_only_policy() {
        let mut details = named_details();
        details.space_name = String::new();

        let policy = render_policy(&details);
        assert!(!policy.contains("inst-z"));
        assert!(!policy.contains("org-x"));
    }

    #[test]
    fn no_placeholders_survive_rendering() {
        for details in [InstanceDetails::new("O", "S", "I"), named_details()] {
            let policy = render_policy(&details);
            assert!(!policy.contains("{org"), "unrendered placeholder: {policy}");
            assert!(!policy.contains("{space"));
            assert!(!policy.contains("{instance"));
        }
    }
}
