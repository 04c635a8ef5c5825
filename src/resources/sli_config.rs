//! `instana_sli_config`
//!
//! SLI configurations are immutable in the Instana API, so every change
//! replaces the object. The entity is a tagged union: exactly one of the
//! four entity blocks is set, and its name selects the API `sliType`.

use super::{normalize_tag_filter, parse_tag_filter, unsupported};
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{InstanaApi, MetricConfiguration, RestResource, SliConfig, SliEntity};
use crate::schema::{Attribute, Block, Diagnostics, NestedBlock, Schema, Validator};
use crate::state::{Plan, State};
use crate::tagfilter::{default_mapper, SharedTagFilterMapper, TagFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "sli_config";

const SLI_TYPE_APPLICATION_TIME_BASED: &str = "application";
const SLI_TYPE_APPLICATION_EVENT_BASED: &str = "availability";
const SLI_TYPE_WEBSITE_EVENT_BASED: &str = "websiteEventBased";
const SLI_TYPE_WEBSITE_TIME_BASED: &str = "websiteTimeBased";

/// Aggregations accepted for the metric configuration.
pub const SUPPORTED_METRIC_AGGREGATIONS: &[&str] = &[
    "SUM",
    "MEAN",
    "MAX",
    "MIN",
    "P25",
    "P50",
    "P75",
    "P90",
    "P95",
    "P98",
    "P99",
    "P99_9",
    "P99_99",
    "DISTRIBUTION",
    "DISTINCT_COUNT",
    "SUM_POSITIVE",
    "PER_SECOND",
];

/// Boundary scopes of application entities.
pub const SUPPORTED_BOUNDARY_SCOPES: &[&str] = &["ALL", "INBOUND"];

/// Beacon types of website entities.
pub const SUPPORTED_BEACON_TYPES: &[&str] = &[
    "pageLoad",
    "resourceLoad",
    "httpRequest",
    "error",
    "custom",
    "pageChange",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricConfigurationModel {
    pub metric_name: String,
    pub aggregation: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationTimeBasedModel {
    pub application_id: String,
    pub service_id: Option<String>,
    pub endpoint_id: Option<String>,
    pub boundary_scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationEventBasedModel {
    pub application_id: String,
    pub boundary_scope: String,
    pub bad_event_filter_expression: Option<String>,
    pub good_event_filter_expression: Option<String>,
    pub include_internal: Option<bool>,
    pub include_synthetic: Option<bool>,
    pub service_id: Option<String>,
    pub endpoint_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteEventBasedModel {
    pub website_id: String,
    pub bad_event_filter_expression: Option<String>,
    pub good_event_filter_expression: Option<String>,
    pub beacon_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteTimeBasedModel {
    pub website_id: String,
    pub filter_expression: Option<String>,
    pub beacon_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SliEntityModel {
    pub application_time_based: Option<ApplicationTimeBasedModel>,
    pub application_event_based: Option<ApplicationEventBasedModel>,
    pub website_event_based: Option<WebsiteEventBasedModel>,
    pub website_time_based: Option<WebsiteTimeBasedModel>,
}

/// State of an SLI configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SliConfigModel {
    pub id: Option<String>,
    pub name: String,
    pub initial_evaluation_timestamp: Option<i64>,
    pub metric_configuration: Option<MetricConfigurationModel>,
    pub sli_entity: Option<SliEntityModel>,
}

fn boundary_scope() -> Attribute {
    Attribute::required_string()
        .with_validator(Validator::one_of(SUPPORTED_BOUNDARY_SCOPES.iter().copied()))
        .with_description("The boundary scope of the entity.")
}

fn beacon_type() -> Attribute {
    Attribute::required_string()
        .with_validator(Validator::one_of(SUPPORTED_BEACON_TYPES.iter().copied()))
        .with_description("The beacon type of the entity.")
}

fn sli_config_schema() -> Schema {
    let metric_configuration = Block::new()
        .with_attribute("metric_name", Attribute::required_string())
        .with_attribute(
            "aggregation",
            Attribute::required_string()
                .with_validator(Validator::one_of(SUPPORTED_METRIC_AGGREGATIONS.iter().copied())),
        )
        .with_attribute(
            "threshold",
            Attribute::required_float64().with_validator(Validator::AtLeast(0.000001)),
        );

    let application_time_based = Block::new()
        .with_attribute("application_id", Attribute::required_string())
        .with_attribute("service_id", Attribute::optional_string())
        .with_attribute("endpoint_id", Attribute::optional_string())
        .with_attribute("boundary_scope", boundary_scope());

    let application_event_based = Block::new()
        .with_attribute("application_id", Attribute::required_string())
        .with_attribute("boundary_scope", boundary_scope())
        .with_attribute("bad_event_filter_expression", Attribute::required_string())
        .with_attribute("good_event_filter_expression", Attribute::required_string())
        .with_attribute("include_internal", Attribute::optional_bool())
        .with_attribute("include_synthetic", Attribute::optional_bool())
        .with_attribute("service_id", Attribute::optional_string())
        .with_attribute("endpoint_id", Attribute::optional_string());

    let website_event_based = Block::new()
        .with_attribute("website_id", Attribute::required_string())
        .with_attribute("bad_event_filter_expression", Attribute::required_string())
        .with_attribute("good_event_filter_expression", Attribute::required_string())
        .with_attribute("beacon_type", beacon_type());

    let website_time_based = Block::new()
        .with_attribute("website_id", Attribute::required_string())
        .with_attribute("filter_expression", Attribute::optional_string())
        .with_attribute("beacon_type", beacon_type());

    let sli_entity = Block::new()
        .with_block("application_time_based", NestedBlock::single(application_time_based))
        .with_block("application_event_based", NestedBlock::single(application_event_based))
        .with_block("website_event_based", NestedBlock::single(website_event_based))
        .with_block("website_time_based", NestedBlock::single(website_time_based));

    Schema::v0()
        .with_description("This resource manages SLI configurations in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the SLI configuration."),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_validator(Validator::LengthBetween { min: 0, max: 256 })
                .with_description("The name of the SLI configuration."),
        )
        .with_attribute(
            "initial_evaluation_timestamp",
            Attribute::optional_computed_int64()
                .with_description("Timestamp from which the SLI is evaluated."),
        )
        .with_block("metric_configuration", NestedBlock::single(metric_configuration))
        .with_block("sli_entity", NestedBlock::single(sli_entity))
}

/// Resource handle for SLI configurations.
#[derive(Debug)]
pub struct SliConfigResource {
    metadata: ResourceMetaData,
    tag_filter_mapper: SharedTagFilterMapper,
}

impl SliConfigResource {
    /// Create the handle with the default tag filter mapper.
    pub fn new() -> Self {
        Self::with_tag_filter_mapper(default_mapper())
    }

    /// Create the handle with a custom tag filter mapper.
    pub fn with_tag_filter_mapper(tag_filter_mapper: SharedTagFilterMapper) -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, sli_config_schema(), 1).create_only(),
            tag_filter_mapper,
        }
    }

    fn to_state_filter(
        &self,
        filter: Option<&TagFilter>,
        attribute: &str,
    ) -> Result<Option<String>, Diagnostics> {
        normalize_tag_filter(self.tag_filter_mapper.as_ref(), filter, attribute)
    }

    fn to_api_filter(
        &self,
        expression: Option<&str>,
        attribute: &str,
    ) -> Result<Option<TagFilter>, Diagnostics> {
        parse_tag_filter(self.tag_filter_mapper.as_ref(), expression, attribute)
    }

    fn entity_to_model(&self, entity: &SliEntity) -> Result<SliEntityModel, Diagnostics> {
        let mut model = SliEntityModel::default();
        match entity.sli_type.as_str() {
            SLI_TYPE_APPLICATION_TIME_BASED => {
                model.application_time_based = Some(ApplicationTimeBasedModel {
                    application_id: entity.application_id.clone().unwrap_or_default(),
                    service_id: entity.service_id.clone(),
                    endpoint_id: entity.endpoint_id.clone(),
                    boundary_scope: entity.boundary_scope.clone().unwrap_or_default(),
                });
            },
            SLI_TYPE_APPLICATION_EVENT_BASED => {
                let path = "sli_entity.application_event_based";
                model.application_event_based = Some(ApplicationEventBasedModel {
                    application_id: entity.application_id.clone().unwrap_or_default(),
                    boundary_scope: entity.boundary_scope.clone().unwrap_or_default(),
                    bad_event_filter_expression: self.to_state_filter(
                        entity.bad_event_filter_expression.as_ref(),
                        &format!("{}.bad_event_filter_expression", path),
                    )?,
                    good_event_filter_expression: self.to_state_filter(
                        entity.good_event_filter_expression.as_ref(),
                        &format!("{}.good_event_filter_expression", path),
                    )?,
                    include_internal: Some(entity.include_internal.unwrap_or(false)),
                    include_synthetic: Some(entity.include_synthetic.unwrap_or(false)),
                    service_id: entity.service_id.clone(),
                    endpoint_id: entity.endpoint_id.clone(),
                });
            },
            SLI_TYPE_WEBSITE_EVENT_BASED => {
                let path = "sli_entity.website_event_based";
                model.website_event_based = Some(WebsiteEventBasedModel {
                    website_id: entity.website_id.clone().unwrap_or_default(),
                    bad_event_filter_expression: self.to_state_filter(
                        entity.bad_event_filter_expression.as_ref(),
                        &format!("{}.bad_event_filter_expression", path),
                    )?,
                    good_event_filter_expression: self.to_state_filter(
                        entity.good_event_filter_expression.as_ref(),
                        &format!("{}.good_event_filter_expression", path),
                    )?,
                    beacon_type: entity.beacon_type.clone().unwrap_or_default(),
                });
            },
            SLI_TYPE_WEBSITE_TIME_BASED => {
                model.website_time_based = Some(WebsiteTimeBasedModel {
                    website_id: entity.website_id.clone().unwrap_or_default(),
                    filter_expression: self.to_state_filter(
                        entity.filter_expression.as_ref(),
                        "sli_entity.website_time_based.filter_expression",
                    )?,
                    beacon_type: entity.beacon_type.clone().unwrap_or_default(),
                });
            },
            other => {
                return Err(unsupported(
                    "Unsupported SLI entity type",
                    format!("unsupported entity type: {}", other),
                    "sli_entity",
                ))
            },
        }
        Ok(model)
    }

    fn entity_from_model(&self, model: SliEntityModel) -> Result<SliEntity, Diagnostics> {
        if let Some(entity) = model.application_time_based {
            return Ok(SliEntity {
                sli_type: SLI_TYPE_APPLICATION_TIME_BASED.to_string(),
                application_id: Some(entity.application_id),
                service_id: entity.service_id,
                endpoint_id: entity.endpoint_id,
                boundary_scope: Some(entity.boundary_scope),
                ..Default::default()
            });
        }
        if let Some(entity) = model.application_event_based {
            let path = "sli_entity.application_event_based";
            return Ok(SliEntity {
                sli_type: SLI_TYPE_APPLICATION_EVENT_BASED.to_string(),
                application_id: Some(entity.application_id),
                service_id: entity.service_id,
                endpoint_id: entity.endpoint_id,
                boundary_scope: Some(entity.boundary_scope),
                bad_event_filter_expression: self.to_api_filter(
                    entity.bad_event_filter_expression.as_deref(),
                    &format!("{}.bad_event_filter_expression", path),
                )?,
                good_event_filter_expression: self.to_api_filter(
                    entity.good_event_filter_expression.as_deref(),
                    &format!("{}.good_event_filter_expression", path),
                )?,
                include_internal: entity.include_internal,
                include_synthetic: entity.include_synthetic,
                ..Default::default()
            });
        }
        if let Some(entity) = model.website_event_based {
            let path = "sli_entity.website_event_based";
            return Ok(SliEntity {
                sli_type: SLI_TYPE_WEBSITE_EVENT_BASED.to_string(),
                website_id: Some(entity.website_id),
                beacon_type: Some(entity.beacon_type),
                bad_event_filter_expression: self.to_api_filter(
                    entity.bad_event_filter_expression.as_deref(),
                    &format!("{}.bad_event_filter_expression", path),
                )?,
                good_event_filter_expression: self.to_api_filter(
                    entity.good_event_filter_expression.as_deref(),
                    &format!("{}.good_event_filter_expression", path),
                )?,
                ..Default::default()
            });
        }
        if let Some(entity) = model.website_time_based {
            return Ok(SliEntity {
                sli_type: SLI_TYPE_WEBSITE_TIME_BASED.to_string(),
                website_id: Some(entity.website_id),
                beacon_type: Some(entity.beacon_type),
                filter_expression: self.to_api_filter(
                    entity.filter_expression.as_deref(),
                    "sli_entity.website_time_based.filter_expression",
                )?,
                ..Default::default()
            });
        }
        Err(unsupported(
            "Missing SLI entity configuration",
            "exactly one entity block must be configured",
            "sli_entity",
        ))
    }
}

impl Default for SliConfigResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for SliConfigResource {
    type Object = SliConfig;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<SliConfig>> {
        api.sli_configs()
    }

    fn update_state(&self, state: &mut State, _plan: Option<&Plan>, config: &SliConfig) -> Diagnostics {
        let sli_entity = match self.entity_to_model(&config.sli_entity) {
            Ok(entity) => entity,
            Err(diags) => return diags,
        };
        state.set(&SliConfigModel {
            id: Some(config.id.clone()),
            name: config.sli_name.clone(),
            initial_evaluation_timestamp: Some(config.initial_evaluation_timestamp.unwrap_or(0)),
            metric_configuration: config.metric_configuration.as_ref().map(|metric| {
                MetricConfigurationModel {
                    metric_name: metric.metric_name.clone(),
                    aggregation: metric.metric_aggregation.clone(),
                    threshold: metric.threshold,
                }
            }),
            sli_entity: Some(sli_entity),
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<SliConfig, Diagnostics> {
        let model: SliConfigModel = model_from(plan, state)?;
        let sli_entity = self.entity_from_model(model.sli_entity.unwrap_or_default())?;
        Ok(SliConfig {
            id: model.id.unwrap_or_default(),
            sli_name: model.name,
            initial_evaluation_timestamp: model.initial_evaluation_timestamp,
            metric_configuration: model.metric_configuration.map(|metric| MetricConfiguration {
                metric_name: metric.metric_name,
                metric_aggregation: metric.aggregation,
                threshold: metric.threshold,
            }),
            sli_entity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagfilter::LogicalOperator;
    use crate::validation::validate;
    use serde_json::json;

    fn filter(value: &str) -> TagFilter {
        TagFilter::expression(
            LogicalOperator::Or,
            vec![TagFilter::string_comparison("DESTINATION", "call.http.status", "EQUALS", value)],
        )
    }

    fn config(sli_entity: SliEntity) -> SliConfig {
        SliConfig {
            id: "sli-1".to_string(),
            sli_name: "checkout latency".to_string(),
            initial_evaluation_timestamp: Some(1_700_000_000_000),
            metric_configuration: Some(MetricConfiguration {
                metric_name: "latency".to_string(),
                metric_aggregation: "P90".to_string(),
                threshold: 250.0,
            }),
            sli_entity,
        }
    }

    fn round_trip(config: &SliConfig) -> (State, SliConfig) {
        let resource = SliConfigResource::new();
        let mut state = State::new();
        let diags = resource.update_state(&mut state, None, config);
        assert!(diags.is_empty(), "{}", diags);
        assert!(validate(&resource.metadata().schema, state.raw()).is_empty());
        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        (state, mapped)
    }

    #[test]
    fn test_application_time_based_round_trip() {
        let config = config(SliEntity {
            sli_type: "application".to_string(),
            application_id: Some("app-1".to_string()),
            service_id: Some("svc-1".to_string()),
            endpoint_id: Some("ep-1".to_string()),
            boundary_scope: Some("INBOUND".to_string()),
            ..Default::default()
        });
        let (state, mapped) = round_trip(&config);
        assert_eq!(state.raw()["sli_entity"]["application_event_based"], json!(null));
        assert_eq!(mapped, config);
    }

    #[test]
    fn test_application_event_based_round_trip() {
        let config = config(SliEntity {
            sli_type: "availability".to_string(),
            application_id: Some("app-1".to_string()),
            boundary_scope: Some("ALL".to_string()),
            good_event_filter_expression: Some(filter("200")),
            bad_event_filter_expression: Some(filter("500")),
            include_internal: Some(true),
            include_synthetic: Some(false),
            ..Default::default()
        });
        let (_, mapped) = round_trip(&config);
        assert_eq!(mapped, config);
    }

    #[test]
    fn test_website_entities_round_trip() {
        let event_based = config(SliEntity {
            sli_type: "websiteEventBased".to_string(),
            website_id: Some("web-1".to_string()),
            beacon_type: Some("pageLoad".to_string()),
            good_event_filter_expression: Some(filter("ok")),
            bad_event_filter_expression: Some(filter("failed")),
            ..Default::default()
        });
        assert_eq!(round_trip(&event_based).1, event_based);

        let time_based = config(SliEntity {
            sli_type: "websiteTimeBased".to_string(),
            website_id: Some("web-1".to_string()),
            beacon_type: Some("httpRequest".to_string()),
            filter_expression: None,
            ..Default::default()
        });
        let (state, mapped) = round_trip(&time_based);
        assert_eq!(
            state.raw()["sli_entity"]["website_time_based"]["filter_expression"],
            json!(null)
        );
        assert_eq!(mapped, time_based);
    }

    #[test]
    fn test_event_based_flags_default_to_false() {
        let resource = SliConfigResource::new();
        let mut state = State::new();
        let config = config(SliEntity {
            sli_type: "availability".to_string(),
            application_id: Some("app-1".to_string()),
            boundary_scope: Some("ALL".to_string()),
            good_event_filter_expression: Some(filter("200")),
            bad_event_filter_expression: Some(filter("500")),
            ..Default::default()
        });
        assert!(resource.update_state(&mut state, None, &config).is_empty());

        let entity = &state.raw()["sli_entity"]["application_event_based"];
        assert_eq!(entity["include_internal"], json!(false));
        assert_eq!(entity["include_synthetic"], json!(false));
    }

    #[test]
    fn test_unsupported_entity_type() {
        let resource = SliConfigResource::new();
        let mut state = State::new();
        let config = config(SliEntity {
            sli_type: "mobileApp".to_string(),
            ..Default::default()
        });

        let diags = resource.update_state(&mut state, None, &config);
        assert!(diags.has_error());
        assert_eq!(diags[0].summary, "Unsupported SLI entity type");
        assert_eq!(diags[0].detail.as_deref(), Some("unsupported entity type: mobileApp"));
        assert!(state.is_null());
    }

    #[test]
    fn test_missing_entity_is_error() {
        let resource = SliConfigResource::new();
        let plan = Plan::from_value(json!({"name": "n", "sli_entity": null}));
        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        assert_eq!(diags[0].summary, "Missing SLI entity configuration");
    }

    #[test]
    fn test_invalid_filter_expression() {
        let resource = SliConfigResource::new();
        let plan = Plan::from_value(json!({
            "name": "n",
            "sli_entity": {"website_time_based": {
                "website_id": "web-1",
                "beacon_type": "pageLoad",
                "filter_expression": "beacon.page.name EQUALS"
            }}
        }));
        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        assert_eq!(diags[0].summary, "Failed to parse tag filter expression");
    }

    #[test]
    fn test_metadata_is_create_only() {
        let resource = SliConfigResource::new();
        assert!(resource.metadata().create_only);
        assert!(!resource.metadata().skip_id_generation);
    }
}
