//! `instana_website_monitoring_config`

use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{InstanaApi, RestResource, WebsiteMonitoringConfig};
use crate::schema::{Attribute, Diagnostics, Schema};
use crate::state::{Plan, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "website_monitoring_config";

/// State of a website monitoring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteMonitoringConfigModel {
    pub id: Option<String>,
    pub name: String,
    pub app_name: Option<String>,
}

fn website_monitoring_config_schema() -> Schema {
    Schema::v0()
        .with_description("This resource manages Website Monitoring Configurations in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the website monitoring configuration."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the website."),
        )
        .with_attribute(
            "app_name",
            Attribute::computed_string()
                .with_description("The name of the application as shown in Instana."),
        )
}

/// Resource handle for website monitoring configurations.
#[derive(Debug)]
pub struct WebsiteMonitoringConfigResource {
    metadata: ResourceMetaData,
}

impl WebsiteMonitoringConfigResource {
    /// Create the handle.
    pub fn new() -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, website_monitoring_config_schema(), 1),
        }
    }
}

impl Default for WebsiteMonitoringConfigResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for WebsiteMonitoringConfigResource {
    type Object = WebsiteMonitoringConfig;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<WebsiteMonitoringConfig>> {
        api.website_monitoring_configs()
    }

    fn update_state(
        &self,
        state: &mut State,
        _plan: Option<&Plan>,
        config: &WebsiteMonitoringConfig,
    ) -> Diagnostics {
        state.set(&WebsiteMonitoringConfigModel {
            id: Some(config.id.clone()),
            name: config.name.clone(),
            app_name: Some(config.app_name.clone()),
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<WebsiteMonitoringConfig, Diagnostics> {
        let model: WebsiteMonitoringConfigModel = model_from(plan, state)?;
        Ok(WebsiteMonitoringConfig {
            id: model.id.unwrap_or_default(),
            name: model.name,
            app_name: model.app_name.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let resource = WebsiteMonitoringConfigResource::new();
        let config = WebsiteMonitoringConfig {
            id: "web-1".to_string(),
            name: "shop".to_string(),
            app_name: "shop-app".to_string(),
        };
        let mut state = State::new();
        assert!(resource.update_state(&mut state, None, &config).is_empty());
        assert_eq!(
            state.raw(),
            &json!({"id": "web-1", "name": "shop", "app_name": "shop-app"})
        );

        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        assert_eq!(mapped, config);
    }

    #[test]
    fn test_plan_without_computed_fields() {
        let resource = WebsiteMonitoringConfigResource::new();
        let plan = Plan::from_value(json!({"id": null, "name": "shop", "app_name": null}));

        let mapped = resource.map_state_to_data_object(Some(&plan), None).unwrap();
        assert_eq!(mapped.id, "");
        assert_eq!(mapped.app_name, "");
        assert_eq!(serde_json::to_value(&mapped).unwrap()["name"], json!("shop"));
    }
}
