//! `instana_rbac_role`

use super::non_empty_string;
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{ApiMember, InstanaApi, RestResource, Role, SUPPORTED_PERMISSIONS};
use crate::schema::{Attribute, Block, Diagnostics, NestedBlock, Schema, Validator};
use crate::state::{Plan, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "rbac_role";

/// State of a role member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMemberModel {
    pub user_id: String,
}

/// State of an RBAC role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleModel {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "member")]
    pub members: Option<Vec<RoleMemberModel>>,
    pub permissions: Option<Vec<String>>,
}

fn role_schema() -> Schema {
    Schema::v0()
        .with_description("This resource manages RBAC roles in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the role."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the role."),
        )
        .with_attribute(
            "permissions",
            Attribute::required_string_set()
                .with_validator(Validator::one_of(SUPPORTED_PERMISSIONS.iter().copied()))
                .with_description("The permissions granted by the role."),
        )
        .with_block(
            "member",
            NestedBlock::set(
                Block::new()
                    .with_attribute(
                        "user_id",
                        Attribute::required_string().with_description("The user id of the member."),
                    )
                    .with_description("A member of the role."),
            ),
        )
}

/// Resource handle for RBAC roles.
#[derive(Debug)]
pub struct RoleResource {
    metadata: ResourceMetaData,
}

impl RoleResource {
    /// Create the handle.
    pub fn new() -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, role_schema(), 1),
        }
    }
}

impl Default for RoleResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for RoleResource {
    type Object = Role;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<Role>> {
        api.roles()
    }

    fn update_state(&self, state: &mut State, _plan: Option<&Plan>, role: &Role) -> Diagnostics {
        let members = role
            .members
            .iter()
            .map(|member| RoleMemberModel {
                user_id: member.user_id.clone(),
            })
            .collect();
        state.set(&RoleModel {
            id: Some(role.id.clone()),
            name: role.name.clone(),
            members: Some(members),
            permissions: Some(role.permissions.clone()),
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<Role, Diagnostics> {
        let model: RoleModel = model_from(plan, state)?;
        Ok(Role {
            id: model.id.as_deref().and_then(non_empty_string).unwrap_or_default(),
            name: model.name,
            members: model
                .members
                .unwrap_or_default()
                .into_iter()
                .map(|member| ApiMember {
                    user_id: member.user_id,
                    email: None,
                })
                .collect(),
            permissions: model.permissions.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn role() -> Role {
        Role {
            id: "role-1".to_string(),
            name: "Operators".to_string(),
            members: vec![
                ApiMember {
                    user_id: "u1".to_string(),
                    email: None,
                },
                ApiMember {
                    user_id: "u2".to_string(),
                    email: None,
                },
            ],
            permissions: vec!["CAN_VIEW_LOGS".to_string(), "CAN_CONFIGURE_AGENTS".to_string()],
        }
    }

    #[test]
    fn test_round_trip() {
        let resource = RoleResource::new();
        let mut state = State::new();
        assert!(resource.update_state(&mut state, None, &role()).is_empty());

        assert_eq!(state.raw()["member"], json!([{"user_id": "u1"}, {"user_id": "u2"}]));
        assert!(validate(&resource.metadata().schema, state.raw()).is_empty());

        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        assert_eq!(mapped, role());
    }

    #[test]
    fn test_no_members_is_empty_list() {
        let resource = RoleResource::new();
        let mut state = State::new();
        let role = Role {
            members: vec![],
            ..role()
        };
        assert!(resource.update_state(&mut state, None, &role).is_empty());
        assert_eq!(state.raw()["member"], json!([]));

        let plan = Plan::from_value(json!({
            "id": null,
            "name": "Operators",
            "member": null,
            "permissions": ["CAN_VIEW_LOGS"]
        }));
        let mapped = resource.map_state_to_data_object(Some(&plan), None).unwrap();
        assert!(mapped.members.is_empty());
        assert_eq!(mapped.id, "");
        assert_eq!(
            serde_json::to_value(&mapped).unwrap()["members"],
            json!([])
        );
    }

    #[test]
    fn test_unsupported_permission_is_rejected_by_schema() {
        let resource = RoleResource::new();
        let diags = validate(
            &resource.metadata().schema,
            &json!({"name": "r", "permissions": ["CAN_FLY"]}),
        );
        assert!(diags.has_error());
        assert_eq!(diags[0].attribute.as_deref(), Some("permissions.0"));
    }
}
