use super::InstanaDataObject;
use crate::tagfilter::TagFilter;
use serde::{Deserialize, Serialize};

/// Free text information of a team.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Role assignment of a team member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamRole {
    #[serde(rename = "roleId")]
    pub role_id: String,
    #[serde(rename = "roleName", default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(rename = "viaIdP", default, skip_serializing_if = "Option::is_none")]
    pub via_idp: Option<bool>,
}

/// A user in a team.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<TeamRole>,
}

/// Application perspective restriction of a team scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictedApplicationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricting_application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
}

/// What members of a team may see and do. Empty parts are omitted on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScope {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubernetes_clusters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubernetes_namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mobile_apps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub websites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_dfq_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub business_perspectives: Vec<String>,
    #[serde(rename = "sloIds", default, skip_serializing_if = "Vec::is_empty")]
    pub slo_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synthetic_tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synthetic_credentials: Vec<String>,
    #[serde(rename = "tagIds", default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_application_filter: Option<RestrictedApplicationFilter>,
}

/// An RBAC team.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<TeamInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TeamMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<TeamScope>,
}

impl InstanaDataObject for Team {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_parts_are_omitted() {
        let team = Team {
            tag: "platform".to_string(),
            scope: Some(TeamScope {
                slo_ids: vec!["slo-1".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&team).unwrap(),
            json!({"tag": "platform", "scope": {"sloIds": ["slo-1"]}})
        );
    }

    #[test]
    fn test_member_roles_decode() {
        let member: TeamMember = serde_json::from_value(json!({
            "userId": "u1",
            "roles": [{"roleId": "r1", "viaIdP": true}]
        }))
        .unwrap();
        assert_eq!(member.roles[0].via_idp, Some(true));
        assert_eq!(member.roles[0].role_name, None);
    }
}
