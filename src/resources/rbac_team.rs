//! `instana_rbac_team`
//!
//! Teams bundle members, their roles and a scope describing what the team
//! may access. The restricted application filter carries a tag filter,
//! which is stored in state as its normalized expression string.

use super::{non_empty_vec, normalize_tag_filter, parse_tag_filter, unsupported};
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{
    InstanaApi, RestResource, RestrictedApplicationFilter, Team, TeamInfo, TeamMember, TeamRole,
    TeamScope,
};
use crate::schema::{Attribute, Block, Diagnostics, NestedBlock, Schema, Validator};
use crate::state::{Plan, State};
use crate::tagfilter::{default_mapper, SharedTagFilterMapper};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "rbac_team";

/// Scopes accepted for a restricted application filter.
pub const SUPPORTED_RESTRICTED_APPLICATION_FILTER_SCOPES: &[&str] = &[
    "INCLUDE_NO_DOWNSTREAM",
    "INCLUDE_IMMEDIATE_DOWNSTREAM_DATABASE_AND_MESSAGING",
    "INCLUDE_ALL_DOWNSTREAM",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamInfoModel {
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamMemberRoleModel {
    pub role_id: String,
    pub role_name: Option<String>,
    pub via_idp: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamMemberModel {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Option<Vec<TeamMemberRoleModel>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamRestrictedApplicationFilterModel {
    pub label: Option<String>,
    pub restricting_application_id: Option<String>,
    pub scope: Option<String>,
    pub tag_filter_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamScopeModel {
    pub access_permissions: Option<Vec<String>>,
    pub applications: Option<Vec<String>>,
    pub kubernetes_clusters: Option<Vec<String>>,
    pub kubernetes_namespaces: Option<Vec<String>>,
    pub mobile_apps: Option<Vec<String>>,
    pub websites: Option<Vec<String>>,
    pub infra_dfq_filter: Option<String>,
    pub action_filter: Option<String>,
    pub log_filter: Option<String>,
    pub business_perspectives: Option<Vec<String>>,
    pub slo_ids: Option<Vec<String>>,
    pub synthetic_tests: Option<Vec<String>>,
    pub synthetic_credentials: Option<Vec<String>>,
    pub tag_ids: Option<Vec<String>>,
    pub restricted_application_filter: Option<TeamRestrictedApplicationFilterModel>,
}

/// State of an RBAC team.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamModel {
    pub id: Option<String>,
    pub tag: String,
    pub info: Option<TeamInfoModel>,
    #[serde(rename = "member")]
    pub members: Option<Vec<TeamMemberModel>>,
    pub scope: Option<TeamScopeModel>,
}

fn string_set(description: &str) -> Attribute {
    Attribute::optional_string_set().with_description(description)
}

fn team_schema() -> Schema {
    let roles = Block::new()
        .with_attribute(
            "role_id",
            Attribute::required_string().with_description("The ID of the role."),
        )
        .with_attribute(
            "role_name",
            Attribute::optional_computed_string().with_description("The name of the role."),
        )
        .with_attribute(
            "via_idp",
            Attribute::optional_computed_bool()
                .with_description("Whether the role was assigned through the identity provider."),
        );

    let member = Block::new()
        .with_attribute(
            "user_id",
            Attribute::required_string().with_description("The user id of the member."),
        )
        .with_attribute(
            "email",
            Attribute::optional_computed_string().with_description("The email of the member."),
        )
        .with_attribute(
            "name",
            Attribute::optional_computed_string().with_description("The name of the member."),
        )
        .with_block("roles", NestedBlock::set(roles));

    let restricted_application_filter = Block::new()
        .with_attribute("label", Attribute::optional_string())
        .with_attribute(
            "restricting_application_id",
            Attribute::optional_computed_string(),
        )
        .with_attribute(
            "scope",
            Attribute::optional_string().with_validator(Validator::one_of(
                SUPPORTED_RESTRICTED_APPLICATION_FILTER_SCOPES.iter().copied(),
            )),
        )
        .with_attribute(
            "tag_filter_expression",
            Attribute::optional_string().with_description("Tag filter restricting the applications."),
        );

    let scope = Block::new()
        .with_attribute("access_permissions", string_set("Permissions granted within the scope."))
        .with_attribute("applications", string_set("Accessible application ids."))
        .with_attribute("kubernetes_clusters", string_set("Accessible kubernetes clusters."))
        .with_attribute("kubernetes_namespaces", string_set("Accessible kubernetes namespaces."))
        .with_attribute("mobile_apps", string_set("Accessible mobile apps."))
        .with_attribute("websites", string_set("Accessible websites."))
        .with_attribute("infra_dfq_filter", Attribute::optional_string())
        .with_attribute("action_filter", Attribute::optional_string())
        .with_attribute("log_filter", Attribute::optional_string())
        .with_attribute("business_perspectives", string_set("Accessible business perspectives."))
        .with_attribute("slo_ids", string_set("Accessible SLOs."))
        .with_attribute("synthetic_tests", string_set("Accessible synthetic tests."))
        .with_attribute("synthetic_credentials", string_set("Accessible synthetic credentials."))
        .with_attribute("tag_ids", string_set("Accessible tags."))
        .with_block(
            "restricted_application_filter",
            NestedBlock::single(restricted_application_filter),
        );

    Schema::v0()
        .with_description("This resource manages RBAC teams in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the team."),
        )
        .with_attribute(
            "tag",
            Attribute::required_string().with_description("The tag of the team."),
        )
        .with_block(
            "info",
            NestedBlock::single(Block::new().with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the team."),
            )),
        )
        .with_block("member", NestedBlock::set(member))
        .with_block("scope", NestedBlock::single(scope))
}

/// Resource handle for RBAC teams.
#[derive(Debug)]
pub struct TeamResource {
    metadata: ResourceMetaData,
    tag_filter_mapper: SharedTagFilterMapper,
}

impl TeamResource {
    /// Create the handle with the default tag filter mapper.
    pub fn new() -> Self {
        Self::with_tag_filter_mapper(default_mapper())
    }

    /// Create the handle with a custom tag filter mapper.
    pub fn with_tag_filter_mapper(tag_filter_mapper: SharedTagFilterMapper) -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, team_schema(), 1),
            tag_filter_mapper,
        }
    }

    fn scope_to_model(&self, scope: &TeamScope) -> Result<TeamScopeModel, Diagnostics> {
        let restricted_application_filter = match &scope.restricted_application_filter {
            Some(filter) => Some(TeamRestrictedApplicationFilterModel {
                label: filter.label.clone(),
                restricting_application_id: filter.restricting_application_id.clone(),
                scope: filter.scope.clone(),
                tag_filter_expression: normalize_tag_filter(
                    self.tag_filter_mapper.as_ref(),
                    filter.tag_filter_expression.as_ref(),
                    "scope.restricted_application_filter.tag_filter_expression",
                )?,
            }),
            None => None,
        };
        Ok(TeamScopeModel {
            access_permissions: non_empty_vec(scope.access_permissions.clone()),
            applications: non_empty_vec(scope.applications.clone()),
            kubernetes_clusters: non_empty_vec(scope.kubernetes_clusters.clone()),
            kubernetes_namespaces: non_empty_vec(scope.kubernetes_namespaces.clone()),
            mobile_apps: non_empty_vec(scope.mobile_apps.clone()),
            websites: non_empty_vec(scope.websites.clone()),
            infra_dfq_filter: scope.infra_dfq_filter.clone(),
            action_filter: scope.action_filter.clone(),
            log_filter: scope.log_filter.clone(),
            business_perspectives: non_empty_vec(scope.business_perspectives.clone()),
            slo_ids: non_empty_vec(scope.slo_ids.clone()),
            synthetic_tests: non_empty_vec(scope.synthetic_tests.clone()),
            synthetic_credentials: non_empty_vec(scope.synthetic_credentials.clone()),
            tag_ids: non_empty_vec(scope.tag_ids.clone()),
            restricted_application_filter,
        })
    }

    fn scope_from_model(&self, model: TeamScopeModel) -> Result<TeamScope, Diagnostics> {
        let restricted_application_filter = match model.restricted_application_filter {
            Some(filter) => {
                if let Some(scope) = filter.scope.as_deref() {
                    if !SUPPORTED_RESTRICTED_APPLICATION_FILTER_SCOPES.contains(&scope) {
                        return Err(unsupported(
                            "Unsupported restricted application filter scope",
                            format!("{} is not a supported scope", scope),
                            "scope.restricted_application_filter.scope",
                        ));
                    }
                }
                Some(RestrictedApplicationFilter {
                    label: filter.label,
                    restricting_application_id: filter.restricting_application_id,
                    scope: filter.scope,
                    tag_filter_expression: parse_tag_filter(
                        self.tag_filter_mapper.as_ref(),
                        filter.tag_filter_expression.as_deref(),
                        "scope.restricted_application_filter.tag_filter_expression",
                    )?,
                })
            },
            None => None,
        };
        Ok(TeamScope {
            access_permissions: model.access_permissions.unwrap_or_default(),
            applications: model.applications.unwrap_or_default(),
            kubernetes_clusters: model.kubernetes_clusters.unwrap_or_default(),
            kubernetes_namespaces: model.kubernetes_namespaces.unwrap_or_default(),
            mobile_apps: model.mobile_apps.unwrap_or_default(),
            websites: model.websites.unwrap_or_default(),
            infra_dfq_filter: model.infra_dfq_filter,
            action_filter: model.action_filter,
            log_filter: model.log_filter,
            business_perspectives: model.business_perspectives.unwrap_or_default(),
            slo_ids: model.slo_ids.unwrap_or_default(),
            synthetic_tests: model.synthetic_tests.unwrap_or_default(),
            synthetic_credentials: model.synthetic_credentials.unwrap_or_default(),
            tag_ids: model.tag_ids.unwrap_or_default(),
            restricted_application_filter,
        })
    }
}

impl Default for TeamResource {
    fn default() -> Self {
        Self::new()
    }
}

fn member_to_model(member: &TeamMember) -> TeamMemberModel {
    let roles = member
        .roles
        .iter()
        .map(|role| TeamMemberRoleModel {
            role_id: role.role_id.clone(),
            role_name: role.role_name.clone(),
            via_idp: role.via_idp,
        })
        .collect();
    TeamMemberModel {
        user_id: member.user_id.clone(),
        email: member.email.clone(),
        name: member.name.clone(),
        roles: non_empty_vec(roles),
    }
}

fn member_from_model(member: TeamMemberModel) -> TeamMember {
    TeamMember {
        user_id: member.user_id,
        email: member.email,
        name: member.name,
        roles: member
            .roles
            .unwrap_or_default()
            .into_iter()
            .map(|role| TeamRole {
                role_id: role.role_id,
                role_name: role.role_name,
                via_idp: role.via_idp,
            })
            .collect(),
    }
}

impl ResourceHandle for TeamResource {
    type Object = Team;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<Team>> {
        api.teams()
    }

    fn update_state(&self, state: &mut State, _plan: Option<&Plan>, team: &Team) -> Diagnostics {
        let scope = match team.scope.as_ref().map(|s| self.scope_to_model(s)).transpose() {
            Ok(scope) => scope,
            Err(diags) => return diags,
        };
        state.set(&TeamModel {
            id: Some(team.id.clone()),
            tag: team.tag.clone(),
            info: team.info.as_ref().map(|info| TeamInfoModel {
                description: info.description.clone(),
            }),
            members: non_empty_vec(team.members.iter().map(member_to_model).collect()),
            scope,
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<Team, Diagnostics> {
        let model: TeamModel = model_from(plan, state)?;
        let scope = model.scope.map(|s| self.scope_from_model(s)).transpose()?;
        Ok(Team {
            id: model.id.unwrap_or_default(),
            tag: model.tag,
            info: model
                .info
                .and_then(|info| info.description)
                .map(|description| TeamInfo {
                    description: Some(description),
                }),
            members: model
                .members
                .unwrap_or_default()
                .into_iter()
                .map(member_from_model)
                .collect(),
            scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagfilter::{LogicalOperator, TagFilter};
    use crate::validation::validate;
    use serde_json::json;

    fn tag_filter() -> TagFilter {
        TagFilter::expression(
            LogicalOperator::And,
            vec![TagFilter::string_comparison(
                "DESTINATION",
                "service.name",
                "EQUALS",
                "checkout",
            )],
        )
    }

    fn team() -> Team {
        Team {
            id: "team-1".to_string(),
            tag: "platform".to_string(),
            info: Some(TeamInfo {
                description: Some("Platform engineering".to_string()),
            }),
            members: vec![TeamMember {
                user_id: "u1".to_string(),
                email: Some("u1@example.com".to_string()),
                name: Some("User One".to_string()),
                roles: vec![TeamRole {
                    role_id: "r1".to_string(),
                    role_name: Some("Viewer".to_string()),
                    via_idp: Some(false),
                }],
            }],
            scope: Some(TeamScope {
                access_permissions: vec!["LIMITED_APPLICATIONS_SCOPE".to_string()],
                applications: vec!["app-1".to_string()],
                kubernetes_clusters: vec!["c1".to_string()],
                kubernetes_namespaces: vec!["ns1".to_string()],
                mobile_apps: vec!["m1".to_string()],
                websites: vec!["w1".to_string()],
                infra_dfq_filter: Some("entity.zone:prod".to_string()),
                action_filter: Some("action.type:script".to_string()),
                log_filter: Some("log.level:error".to_string()),
                business_perspectives: vec!["bp1".to_string()],
                slo_ids: vec!["slo-1".to_string()],
                synthetic_tests: vec!["st1".to_string()],
                synthetic_credentials: vec!["cred1".to_string()],
                tag_ids: vec!["tag1".to_string()],
                restricted_application_filter: Some(RestrictedApplicationFilter {
                    label: Some("checkout".to_string()),
                    restricting_application_id: Some("app-1".to_string()),
                    scope: Some("INCLUDE_ALL_DOWNSTREAM".to_string()),
                    tag_filter_expression: Some(tag_filter()),
                }),
            }),
        }
    }

    #[test]
    fn test_round_trip() {
        let resource = TeamResource::new();
        let mut state = State::new();
        assert!(resource.update_state(&mut state, None, &team()).is_empty());

        assert!(state.raw()["scope"]["restricted_application_filter"]["tag_filter_expression"]
            .is_string());
        assert!(validate(&resource.metadata().schema, state.raw()).is_empty());

        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        assert_eq!(mapped, team());
    }

    #[test]
    fn test_minimal_team_maps_to_nulls() {
        let resource = TeamResource::new();
        let mut state = State::new();
        let team = Team {
            id: "team-1".to_string(),
            tag: "platform".to_string(),
            ..Default::default()
        };
        assert!(resource.update_state(&mut state, None, &team).is_empty());
        assert_eq!(
            state.raw(),
            &json!({"id": "team-1", "tag": "platform", "info": null, "member": null, "scope": null})
        );

        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        assert_eq!(mapped, team);
        assert_eq!(
            serde_json::to_value(&mapped).unwrap(),
            json!({"id": "team-1", "tag": "platform"})
        );
    }

    #[test]
    fn test_invalid_tag_filter_expression() {
        let resource = TeamResource::new();
        let plan = Plan::from_value(json!({
            "tag": "platform",
            "scope": {"restricted_application_filter": {"tag_filter_expression": "service.name EQUALS"}}
        }));

        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        assert_eq!(diags[0].summary, "Failed to parse tag filter expression");
    }

    #[test]
    fn test_unmappable_tag_filter_from_api() {
        let resource = TeamResource::new();
        let mut team = team();
        if let Some(scope) = team.scope.as_mut() {
            scope.restricted_application_filter = Some(RestrictedApplicationFilter {
                tag_filter_expression: Some(TagFilter::string_comparison(
                    "DESTINATION",
                    "service.name",
                    "MATCHES",
                    "x",
                )),
                ..Default::default()
            });
        }

        let mut state = State::new();
        let diags = resource.update_state(&mut state, None, &team);
        assert_eq!(diags[0].summary, "Failed to map tag filter expression");
        assert!(state.is_null());
    }

    #[test]
    fn test_unsupported_scope() {
        let resource = TeamResource::new();
        let plan = Plan::from_value(json!({
            "tag": "platform",
            "scope": {"restricted_application_filter": {"scope": "INCLUDE_EVERYTHING"}}
        }));

        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        assert_eq!(diags[0].summary, "Unsupported restricted application filter scope");
    }
}
