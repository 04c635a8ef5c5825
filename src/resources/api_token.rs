//! `instana_api_token`

use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{
    for_each_api_token_permission, ApiToken, InstanaApi, RestResource, API_TOKEN_PERMISSION_FLAGS,
};
use crate::schema::{Attribute, Diagnostics, Schema};
use crate::state::{Plan, State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "api_token";

macro_rules! api_token_model {
    ($($field:ident => $json:literal,)*) => {
        /// State of an API token.
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        pub struct ApiTokenModel {
            pub id: Option<String>,
            pub access_granting_token: Option<String>,
            pub internal_id: Option<String>,
            pub name: String,
            $(pub $field: Option<bool>,)*
        }

        impl ApiTokenModel {
            fn from_api(token: &ApiToken) -> Self {
                Self {
                    id: Some(token.id.clone()),
                    access_granting_token: Some(token.access_granting_token.clone()),
                    internal_id: Some(token.internal_id.clone()),
                    name: token.name.clone(),
                    $($field: Some(token.$field),)*
                }
            }

            fn to_api(&self) -> ApiToken {
                ApiToken {
                    id: self.id.clone().unwrap_or_default(),
                    access_granting_token: self.access_granting_token.clone().unwrap_or_default(),
                    internal_id: self.internal_id.clone().unwrap_or_default(),
                    name: self.name.clone(),
                    $($field: self.$field.unwrap_or(false),)*
                }
            }
        }
    };
}

for_each_api_token_permission!(api_token_model);

fn flag_description(flag: &str) -> String {
    let words = flag.replace('_', " ");
    if flag.starts_with("limited_") {
        format!("Restricts the token to the {}", words.trim_start_matches("limited "))
    } else {
        format!("Grants the permission: {}", words)
    }
}

fn api_token_schema() -> Schema {
    let mut schema = Schema::v0()
        .with_description("This resource manages API tokens in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the API token."),
        )
        .with_attribute(
            "access_granting_token",
            Attribute::computed_string()
                .sensitive()
                .with_description("The token used for the api Client used in the Authorization header to authenticate the client"),
        )
        .with_attribute(
            "internal_id",
            Attribute::computed_string()
                .with_description("The internal ID of the access token from the Instana platform"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the API token."),
        );
    for flag in API_TOKEN_PERMISSION_FLAGS {
        schema = schema.with_attribute(
            *flag,
            Attribute::optional_computed_bool()
                .with_default(json!(false))
                .with_description(flag_description(flag)),
        );
    }
    schema
}

/// Resource handle for API tokens.
#[derive(Debug)]
pub struct ApiTokenResource {
    metadata: ResourceMetaData,
}

impl ApiTokenResource {
    /// Create the handle.
    pub fn new() -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, api_token_schema(), 2)
                .skip_id_generation()
                .with_resource_id_field("internal_id"),
        }
    }
}

impl Default for ApiTokenResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for ApiTokenResource {
    type Object = ApiToken;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<ApiToken>> {
        api.api_tokens()
    }

    fn set_computed_fields(&self, plan: &mut Plan) -> Diagnostics {
        let mut diags = plan.set_attribute("internal_id", &Uuid::new_v4().to_string());
        diags.append(plan.set_attribute("access_granting_token", &Uuid::new_v4().to_string()));
        diags
    }

    fn update_state(&self, state: &mut State, _plan: Option<&Plan>, token: &ApiToken) -> Diagnostics {
        state.set(&ApiTokenModel::from_api(token))
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<ApiToken, Diagnostics> {
        let model: ApiTokenModel = model_from(plan, state)?;
        Ok(model.to_api())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restapi::InstanaDataObject;
    use crate::schema::{AttributeType, PlanModifier};
    use crate::validation::validate;

    fn token() -> ApiToken {
        ApiToken {
            id: "id-1".to_string(),
            access_granting_token: "secret".to_string(),
            internal_id: "internal-1".to_string(),
            name: "ci".to_string(),
            can_configure_llm: true,
            limited_gen_ai_scope: true,
            can_view_logs: true,
            can_configure_service_levels: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_declares_all_flags() {
        let resource = ApiTokenResource::new();
        let attributes = &resource.metadata().schema.block.attributes;
        assert_eq!(attributes.len(), 4 + API_TOKEN_PERMISSION_FLAGS.len());

        let flag = &attributes["can_configure_api_tokens"];
        assert_eq!(flag.attr_type, AttributeType::Bool);
        assert_eq!(flag.default, Some(json!(false)));
        assert!(attributes["id"]
            .plan_modifiers
            .contains(&PlanModifier::UseStateForUnknown));
        assert_eq!(resource.metadata().schema_version, 2);
        assert_eq!(resource.state_upgraders().len(), 2);
    }

    #[test]
    fn test_round_trip() {
        let resource = ApiTokenResource::new();
        let mut state = State::new();
        assert!(resource.update_state(&mut state, None, &token()).is_empty());

        assert_eq!(state.raw()["can_configure_llm"], json!(true));
        assert_eq!(state.raw()["can_configure_users"], json!(false));
        assert!(validate(&resource.metadata().schema, state.raw()).is_empty());

        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        assert_eq!(mapped, token());
    }

    #[test]
    fn test_unset_flags_map_to_false() {
        let resource = ApiTokenResource::new();
        let plan = Plan::from_value(json!({"name": "ci", "can_view_logs": true}));

        let mapped = resource.map_state_to_data_object(Some(&plan), None).unwrap();
        assert!(mapped.can_view_logs);
        assert!(!mapped.can_configure_agents);
        assert_eq!(mapped.id, "");
    }

    #[test]
    fn test_set_computed_fields_generates_ids() {
        let resource = ApiTokenResource::new();
        let mut plan = Plan::from_value(json!({"name": "ci"}));

        assert!(resource.set_computed_fields(&mut plan).is_empty());
        let internal: String = plan.get_attribute("internal_id").unwrap().unwrap();
        let secret: String = plan.get_attribute("access_granting_token").unwrap().unwrap();
        assert!(Uuid::parse_str(&internal).is_ok());
        assert_ne!(internal, secret);

        let mapped = resource.map_state_to_data_object(Some(&plan), None).unwrap();
        assert_eq!(mapped.id_for_resource_path(), internal);
    }

    #[test]
    fn test_invalid_plan_is_diagnostic() {
        let resource = ApiTokenResource::new();
        let plan = Plan::from_value(json!({"name": "ci", "can_view_logs": "yes"}));
        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        assert!(diags.has_error());
    }
}
