//! `instana_rbac_group`

use super::{non_empty_string, non_empty_vec};
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{
    ApiMember, Group, InstanaApi, PermissionSet, RestResource, ScopeBinding, SUPPORTED_PERMISSIONS,
};
use crate::schema::{Attribute, Block, Diagnostics, NestedBlock, Schema, Validator};
use crate::state::{Plan, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "rbac_group";

/// Scope role id the API expects when no infrastructure filter is set.
const NO_SCOPE_ROLE_ID: &str = "-1";

/// State of a group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberModel {
    pub user_id: String,
    pub email: Option<String>,
}

/// State of the permission set of a group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupPermissionSetModel {
    pub application_ids: Option<Vec<String>>,
    pub infra_dfq_filter: Option<String>,
    pub kubernetes_cluster_uuids: Option<Vec<String>>,
    pub kubernetes_namespaces_uuids: Option<Vec<String>>,
    pub mobile_app_ids: Option<Vec<String>>,
    pub website_ids: Option<Vec<String>>,
    pub permissions: Option<Vec<String>>,
}

/// State of an RBAC group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupModel {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "member")]
    pub members: Option<Vec<GroupMemberModel>>,
    pub permission_set: Option<GroupPermissionSetModel>,
}

fn scope_ids(bindings: &[ScopeBinding]) -> Option<Vec<String>> {
    non_empty_vec(bindings.iter().map(|b| b.scope_id.clone()).collect())
}

fn scope_bindings(ids: Option<Vec<String>>) -> Vec<ScopeBinding> {
    ids.unwrap_or_default()
        .into_iter()
        .map(ScopeBinding::scope)
        .collect()
}

fn scope_set(description: &str) -> Attribute {
    Attribute::optional_string_set().with_description(description)
}

fn group_schema() -> Schema {
    let permission_set = Block::new()
        .with_description("The permission set of the group.")
        .with_attribute(
            "application_ids",
            scope_set("The application ids the group has access to."),
        )
        .with_attribute(
            "infra_dfq_filter",
            Attribute::optional_string()
                .with_description("The infrastructure dynamic focus query restricting the group."),
        )
        .with_attribute(
            "kubernetes_cluster_uuids",
            scope_set("The kubernetes cluster uuids the group has access to."),
        )
        .with_attribute(
            "kubernetes_namespaces_uuids",
            scope_set("The kubernetes namespace uuids the group has access to."),
        )
        .with_attribute(
            "mobile_app_ids",
            scope_set("The mobile app ids the group has access to."),
        )
        .with_attribute("website_ids", scope_set("The website ids the group has access to."))
        .with_attribute(
            "permissions",
            scope_set("The permissions granted to the group.")
                .with_validator(Validator::one_of(SUPPORTED_PERMISSIONS.iter().copied())),
        );

    Schema::v0()
        .with_description("This resource manages RBAC groups in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the group."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the group."),
        )
        .with_block(
            "member",
            NestedBlock::set(
                Block::new()
                    .with_attribute(
                        "user_id",
                        Attribute::required_string().with_description("The user id of the member."),
                    )
                    .with_attribute(
                        "email",
                        Attribute::optional_string().with_description("The email of the member."),
                    ),
            ),
        )
        .with_block("permission_set", NestedBlock::single(permission_set))
}

/// Resource handle for RBAC groups.
#[derive(Debug)]
pub struct GroupResource {
    metadata: ResourceMetaData,
}

impl GroupResource {
    /// Create the handle.
    pub fn new() -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, group_schema(), 1),
        }
    }
}

impl Default for GroupResource {
    fn default() -> Self {
        Self::new()
    }
}

fn permission_set_to_model(set: &PermissionSet) -> GroupPermissionSetModel {
    GroupPermissionSetModel {
        application_ids: scope_ids(&set.application_ids),
        infra_dfq_filter: set
            .infra_dfq_filter
            .as_ref()
            .and_then(|binding| non_empty_string(&binding.scope_id)),
        kubernetes_cluster_uuids: scope_ids(&set.kubernetes_cluster_uuids),
        kubernetes_namespaces_uuids: scope_ids(&set.kubernetes_namespace_uids),
        mobile_app_ids: scope_ids(&set.mobile_app_ids),
        website_ids: scope_ids(&set.website_ids),
        permissions: non_empty_vec(set.permissions.clone()),
    }
}

fn permission_set_from_model(model: Option<GroupPermissionSetModel>) -> PermissionSet {
    let Some(model) = model else {
        return PermissionSet::default();
    };
    let infra_dfq_filter = match model.infra_dfq_filter {
        Some(filter) => ScopeBinding::scope(filter),
        None => ScopeBinding {
            scope_id: String::new(),
            scope_role_id: Some(NO_SCOPE_ROLE_ID.to_string()),
        },
    };
    PermissionSet {
        application_ids: scope_bindings(model.application_ids),
        infra_dfq_filter: Some(infra_dfq_filter),
        kubernetes_cluster_uuids: scope_bindings(model.kubernetes_cluster_uuids),
        kubernetes_namespace_uids: scope_bindings(model.kubernetes_namespaces_uuids),
        mobile_app_ids: scope_bindings(model.mobile_app_ids),
        website_ids: scope_bindings(model.website_ids),
        permissions: model.permissions.unwrap_or_default(),
    }
}

impl ResourceHandle for GroupResource {
    type Object = Group;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<Group>> {
        api.groups()
    }

    fn update_state(&self, state: &mut State, _plan: Option<&Plan>, group: &Group) -> Diagnostics {
        let members = group
            .members
            .iter()
            .map(|member| GroupMemberModel {
                user_id: member.user_id.clone(),
                email: member.email.clone(),
            })
            .collect();
        let permission_set = if group.permission_set.is_empty() {
            None
        } else {
            Some(permission_set_to_model(&group.permission_set))
        };
        state.set(&GroupModel {
            id: Some(group.id.clone()),
            name: group.name.clone(),
            members: non_empty_vec(members),
            permission_set,
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<Group, Diagnostics> {
        let model: GroupModel = model_from(plan, state)?;
        Ok(Group {
            id: model.id.unwrap_or_default(),
            name: model.name,
            members: model
                .members
                .unwrap_or_default()
                .into_iter()
                .map(|member| ApiMember {
                    user_id: member.user_id,
                    email: member.email,
                })
                .collect(),
            permission_set: permission_set_from_model(model.permission_set),
        })
    }
}
