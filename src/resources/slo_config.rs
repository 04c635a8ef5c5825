//! `instana_slo_config`
//!
//! An SLO combines three tagged unions: the entity it is measured on, the
//! indicator counting good and bad events, and the time window. On the wire
//! each is a flat object discriminated by `type` (indicators also by
//! `blueprint`); in state each is a block holding exactly one variant.

use super::{non_empty_vec, normalize_tag_filter, parse_tag_filter, unsupported};
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{
    InstanaApi, RbacTag, RestResource, SloConfig, SloEntity, SloIndicator, SloTimeWindow,
};
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Block, Diagnostic, Diagnostics, NestedBlock, Schema,
    Validator,
};
use crate::state::{Plan, State};
use crate::tagfilter::{default_mapper, SharedTagFilterMapper, TagFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "slo_config";

/// Prefix of ids generated for SLOs created through the provider.
pub const SLO_ID_PREFIX: &str = "SLOTF";

const ENTITY_APPLICATION: &str = "application";
const ENTITY_WEBSITE: &str = "website";
const ENTITY_SYNTHETIC: &str = "synthetic";

const BLUEPRINT_LATENCY: &str = "latency";
const BLUEPRINT_AVAILABILITY: &str = "availability";
const BLUEPRINT_TRAFFIC: &str = "traffic";
const BLUEPRINT_CUSTOM: &str = "custom";

const MEASUREMENT_TIME_BASED: &str = "timeBased";
const MEASUREMENT_EVENT_BASED: &str = "eventBased";

const WINDOW_ROLLING: &str = "rolling";
const WINDOW_FIXED: &str = "fixed";

const DEFAULT_AGGREGATION: &str = "MEAN";

/// Comparison operators of traffic indicators.
pub const SUPPORTED_TRAFFIC_OPERATORS: &[&str] = &[">", ">=", "<", "<="];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RbacTagModel {
    pub display_name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationEntityModel {
    pub application_id: Option<String>,
    pub boundary_scope: Option<String>,
    pub filter_expression: Option<String>,
    pub include_internal: Option<bool>,
    pub include_synthetic: Option<bool>,
    pub service_id: Option<String>,
    pub endpoint_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteEntityModel {
    pub website_id: Option<String>,
    pub filter_expression: Option<String>,
    pub beacon_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyntheticEntityModel {
    pub synthetic_test_ids: Option<Vec<String>>,
    pub filter_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityModel {
    pub application: Option<ApplicationEntityModel>,
    pub website: Option<WebsiteEntityModel>,
    pub synthetic: Option<SyntheticEntityModel>,
}

/// Threshold plus aggregation, used by both time based indicators.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeBasedIndicatorModel {
    pub threshold: Option<f64>,
    pub aggregation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventBasedLatencyIndicatorModel {
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventBasedAvailabilityIndicatorModel {}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrafficIndicatorModel {
    pub traffic_type: Option<String>,
    pub threshold: Option<f64>,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomIndicatorModel {
    pub good_event_filter_expression: Option<String>,
    pub bad_event_filter_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorModel {
    pub time_based_latency: Option<TimeBasedIndicatorModel>,
    pub event_based_latency: Option<EventBasedLatencyIndicatorModel>,
    pub time_based_availability: Option<TimeBasedIndicatorModel>,
    pub event_based_availability: Option<EventBasedAvailabilityIndicatorModel>,
    pub traffic: Option<TrafficIndicatorModel>,
    pub custom: Option<CustomIndicatorModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollingTimeWindowModel {
    pub duration: Option<i64>,
    pub duration_unit: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixedTimeWindowModel {
    pub duration: Option<i64>,
    pub duration_unit: Option<String>,
    pub timezone: Option<String>,
    pub start_timestamp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeWindowModel {
    pub rolling: Option<RollingTimeWindowModel>,
    pub fixed: Option<FixedTimeWindowModel>,
}

/// State of an SLO configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SloConfigModel {
    pub id: Option<String>,
    pub name: String,
    pub target: f64,
    pub tags: Option<Vec<String>>,
    pub rbac_tags: Option<Vec<RbacTagModel>>,
    pub entity: Option<EntityModel>,
    pub indicator: Option<IndicatorModel>,
    pub time_window: Option<TimeWindowModel>,
}

fn missing(summary: &str, attribute: &str) -> Diagnostics {
    Diagnostic::error(summary)
        .with_detail(summary)
        .with_attribute(attribute)
        .into()
}

fn string_list() -> Attribute {
    Attribute::new(AttributeType::list(AttributeType::String), AttributeFlags::optional())
}

fn slo_config_schema() -> Schema {
    let application = Block::new()
        .with_attribute("application_id", Attribute::optional_string())
        .with_attribute("boundary_scope", Attribute::optional_string())
        .with_attribute("filter_expression", Attribute::optional_string())
        .with_attribute("include_internal", Attribute::optional_bool())
        .with_attribute("include_synthetic", Attribute::optional_bool())
        .with_attribute("service_id", Attribute::optional_string())
        .with_attribute("endpoint_id", Attribute::optional_string())
        .with_description("An application, service or endpoint.");
    let website = Block::new()
        .with_attribute("website_id", Attribute::optional_string())
        .with_attribute("filter_expression", Attribute::optional_string())
        .with_attribute("beacon_type", Attribute::optional_string())
        .with_description("A website.");
    let synthetic = Block::new()
        .with_attribute("synthetic_test_ids", string_list())
        .with_attribute("filter_expression", Attribute::optional_string())
        .with_description("A set of synthetic tests.");
    let entity = Block::new()
        .with_block(ENTITY_APPLICATION, NestedBlock::single(application))
        .with_block(ENTITY_WEBSITE, NestedBlock::single(website))
        .with_block(ENTITY_SYNTHETIC, NestedBlock::single(synthetic));

    let time_based = || {
        Block::new()
            .with_attribute("threshold", Attribute::optional_float64())
            .with_attribute("aggregation", Attribute::optional_string())
    };
    let indicator = Block::new()
        .with_block("time_based_latency", NestedBlock::single(time_based()))
        .with_block(
            "event_based_latency",
            NestedBlock::single(
                Block::new().with_attribute("threshold", Attribute::optional_float64()),
            ),
        )
        .with_block("time_based_availability", NestedBlock::single(time_based()))
        .with_block("event_based_availability", NestedBlock::single(Block::new()))
        .with_block(
            BLUEPRINT_TRAFFIC,
            NestedBlock::single(
                Block::new()
                    .with_attribute("traffic_type", Attribute::optional_string())
                    .with_attribute("threshold", Attribute::optional_float64())
                    .with_attribute(
                        "operator",
                        Attribute::optional_string().with_validator(Validator::one_of(
                            SUPPORTED_TRAFFIC_OPERATORS.iter().copied(),
                        )),
                    ),
            ),
        )
        .with_block(
            BLUEPRINT_CUSTOM,
            NestedBlock::single(
                Block::new()
                    .with_attribute("good_event_filter_expression", Attribute::optional_string())
                    .with_attribute("bad_event_filter_expression", Attribute::optional_string()),
            ),
        );

    let window = || {
        Block::new()
            .with_attribute("duration", Attribute::optional_int64())
            .with_attribute("duration_unit", Attribute::optional_string())
            .with_attribute("timezone", Attribute::optional_string())
    };
    let time_window = Block::new()
        .with_block(WINDOW_ROLLING, NestedBlock::single(window()))
        .with_block(
            WINDOW_FIXED,
            NestedBlock::single(
                window().with_attribute("start_timestamp", Attribute::optional_float64()),
            ),
        );

    Schema::v0()
        .with_description("This resource manages SLO configurations in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the SLO configuration."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the SLO configuration."),
        )
        .with_attribute(
            "target",
            Attribute::required_float64().with_description("The target of the SLO, e.g. 0.99."),
        )
        .with_attribute("tags", string_list().with_description("Tags of the SLO."))
        .with_block(
            "rbac_tags",
            NestedBlock::list(
                Block::new()
                    .with_attribute("display_name", Attribute::required_string())
                    .with_attribute("id", Attribute::required_string()),
            ),
        )
        .with_block("entity", NestedBlock::single(entity))
        .with_block("indicator", NestedBlock::single(indicator))
        .with_block("time_window", NestedBlock::single(time_window))
}

/// Resource handle for SLO configurations.
#[derive(Debug)]
pub struct SloConfigResource {
    metadata: ResourceMetaData,
    tag_filter_mapper: SharedTagFilterMapper,
}

impl SloConfigResource {
    /// Create the handle with the default tag filter mapper.
    pub fn new() -> Self {
        Self::with_tag_filter_mapper(default_mapper())
    }

    /// Create the handle with a custom tag filter mapper.
    pub fn with_tag_filter_mapper(tag_filter_mapper: SharedTagFilterMapper) -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, slo_config_schema(), 1)
                .skip_id_generation(),
            tag_filter_mapper,
        }
    }

    /// Unset filters are sent as an expression without elements.
    fn to_api_filter(&self, expression: Option<&str>, attribute: &str) -> Result<TagFilter, Diagnostics> {
        Ok(parse_tag_filter(self.tag_filter_mapper.as_ref(), expression, attribute)?
            .unwrap_or_else(TagFilter::empty_expression))
    }

    fn to_state_filter(
        &self,
        filter: Option<&TagFilter>,
        attribute: &str,
    ) -> Result<Option<String>, Diagnostics> {
        normalize_tag_filter(self.tag_filter_mapper.as_ref(), filter, attribute)
    }

    fn entity_from_model(&self, model: Option<EntityModel>) -> Result<SloEntity, Diagnostics> {
        let model = model.unwrap_or_default();
        if let Some(application) = model.application {
            let (Some(application_id), Some(boundary_scope)) =
                (application.application_id, application.boundary_scope)
            else {
                return Err(missing(
                    "application_id and boundary_scope are required for application entity",
                    "entity.application",
                ));
            };
            return Ok(SloEntity {
                entity_type: ENTITY_APPLICATION.to_string(),
                application_id: Some(application_id),
                service_id: application.service_id,
                endpoint_id: application.endpoint_id,
                boundary_scope: Some(boundary_scope),
                include_internal: Some(application.include_internal.unwrap_or(false)),
                include_synthetic: Some(application.include_synthetic.unwrap_or(false)),
                tag_filter_expression: Some(self.to_api_filter(
                    application.filter_expression.as_deref(),
                    "entity.application.filter_expression",
                )?),
                ..Default::default()
            });
        }
        if let Some(website) = model.website {
            let (Some(website_id), Some(beacon_type)) = (website.website_id, website.beacon_type)
            else {
                return Err(missing(
                    "website_id and beacon_type are required for website entity",
                    "entity.website",
                ));
            };
            return Ok(SloEntity {
                entity_type: ENTITY_WEBSITE.to_string(),
                website_id: Some(website_id),
                beacon_type: Some(beacon_type),
                tag_filter_expression: Some(self.to_api_filter(
                    website.filter_expression.as_deref(),
                    "entity.website.filter_expression",
                )?),
                ..Default::default()
            });
        }
        if let Some(synthetic) = model.synthetic {
            let Some(test_ids) = synthetic.synthetic_test_ids.and_then(non_empty_vec) else {
                return Err(missing(
                    "synthetic_test_ids is required for synthetic entity",
                    "entity.synthetic.synthetic_test_ids",
                ));
            };
            return Ok(SloEntity {
                entity_type: ENTITY_SYNTHETIC.to_string(),
                synthetic_test_ids: Some(test_ids),
                tag_filter_expression: Some(self.to_api_filter(
                    synthetic.filter_expression.as_deref(),
                    "entity.synthetic.filter_expression",
                )?),
                ..Default::default()
            });
        }
        Err(unsupported(
            "Missing entity configuration",
            "Exactly one entity configuration is required",
            "entity",
        ))
    }

    fn indicator_from_model(&self, model: Option<IndicatorModel>) -> Result<SloIndicator, Diagnostics> {
        let model = model.unwrap_or_default();
        let indicator = |blueprint: &str, measurement: &str| SloIndicator {
            blueprint: blueprint.to_string(),
            indicator_type: measurement.to_string(),
            aggregation: Some(DEFAULT_AGGREGATION.to_string()),
            ..Default::default()
        };

        if let Some(latency) = model.time_based_latency {
            let (Some(threshold), Some(aggregation)) = (latency.threshold, latency.aggregation) else {
                return Err(missing(
                    "threshold and aggregation are required for time_based_latency indicator",
                    "indicator.time_based_latency",
                ));
            };
            return Ok(SloIndicator {
                threshold,
                aggregation: Some(aggregation),
                ..indicator(BLUEPRINT_LATENCY, MEASUREMENT_TIME_BASED)
            });
        }
        if let Some(latency) = model.event_based_latency {
            let Some(threshold) = latency.threshold else {
                return Err(missing(
                    "threshold is required for event_based_latency indicator",
                    "indicator.event_based_latency",
                ));
            };
            return Ok(SloIndicator {
                threshold,
                ..indicator(BLUEPRINT_LATENCY, MEASUREMENT_EVENT_BASED)
            });
        }
        if let Some(availability) = model.time_based_availability {
            let (Some(threshold), Some(aggregation)) =
                (availability.threshold, availability.aggregation)
            else {
                return Err(missing(
                    "threshold and aggregation are required for time_based_availability indicator",
                    "indicator.time_based_availability",
                ));
            };
            return Ok(SloIndicator {
                threshold,
                aggregation: Some(aggregation),
                ..indicator(BLUEPRINT_AVAILABILITY, MEASUREMENT_TIME_BASED)
            });
        }
        if model.event_based_availability.is_some() {
            return Ok(indicator(BLUEPRINT_AVAILABILITY, MEASUREMENT_EVENT_BASED));
        }
        if let Some(traffic) = model.traffic {
            let (Some(threshold), Some(operator)) = (traffic.threshold, traffic.operator) else {
                return Err(missing(
                    "threshold and operator are required for traffic indicator",
                    "indicator.traffic",
                ));
            };
            return Ok(SloIndicator {
                threshold,
                operator: Some(operator),
                traffic_type: traffic.traffic_type,
                ..indicator(BLUEPRINT_TRAFFIC, MEASUREMENT_TIME_BASED)
            });
        }
        if let Some(custom) = model.custom {
            let Some(good) = custom.good_event_filter_expression else {
                return Err(missing(
                    "good_event_filter_expression is required for custom indicator",
                    "indicator.custom.good_event_filter_expression",
                ));
            };
            return Ok(SloIndicator {
                good_events_filter: Some(
                    self.to_api_filter(Some(&good), "indicator.custom.good_event_filter_expression")?,
                ),
                bad_events_filter: Some(self.to_api_filter(
                    custom.bad_event_filter_expression.as_deref(),
                    "indicator.custom.bad_event_filter_expression",
                )?),
                ..indicator(BLUEPRINT_CUSTOM, MEASUREMENT_EVENT_BASED)
            });
        }
        Err(unsupported(
            "Missing indicator configuration",
            "Exactly one indicator configuration is required",
            "indicator",
        ))
    }

    fn entity_to_model(&self, entity: &SloEntity) -> Result<EntityModel, Diagnostics> {
        let filter = |attribute: &str| {
            self.to_state_filter(entity.tag_filter_expression.as_ref(), attribute)
        };
        let mut model = EntityModel::default();
        match entity.entity_type.as_str() {
            ENTITY_APPLICATION => {
                model.application = Some(ApplicationEntityModel {
                    application_id: entity.application_id.clone(),
                    boundary_scope: entity.boundary_scope.clone(),
                    filter_expression: filter("entity.application.filter_expression")?,
                    include_internal: entity.include_internal,
                    include_synthetic: entity.include_synthetic,
                    service_id: entity.service_id.clone(),
                    endpoint_id: entity.endpoint_id.clone(),
                });
            },
            ENTITY_WEBSITE => {
                model.website = Some(WebsiteEntityModel {
                    website_id: entity.website_id.clone(),
                    filter_expression: filter("entity.website.filter_expression")?,
                    beacon_type: entity.beacon_type.clone(),
                });
            },
            ENTITY_SYNTHETIC => {
                model.synthetic = Some(SyntheticEntityModel {
                    synthetic_test_ids: entity.synthetic_test_ids.clone().and_then(non_empty_vec),
                    filter_expression: filter("entity.synthetic.filter_expression")?,
                });
            },
            other => {
                return Err(unsupported(
                    "Error mapping entity to state",
                    format!("Unsupported entity type: {}", other),
                    "entity",
                ))
            },
        }
        Ok(model)
    }

    fn indicator_to_model(&self, indicator: &SloIndicator) -> Result<IndicatorModel, Diagnostics> {
        let mut model = IndicatorModel::default();
        match (indicator.indicator_type.as_str(), indicator.blueprint.as_str()) {
            (MEASUREMENT_TIME_BASED, BLUEPRINT_LATENCY) => {
                model.time_based_latency = Some(TimeBasedIndicatorModel {
                    threshold: Some(indicator.threshold),
                    aggregation: indicator.aggregation.clone(),
                });
            },
            (MEASUREMENT_EVENT_BASED, BLUEPRINT_LATENCY) => {
                model.event_based_latency = Some(EventBasedLatencyIndicatorModel {
                    threshold: Some(indicator.threshold),
                });
            },
            (MEASUREMENT_TIME_BASED, BLUEPRINT_AVAILABILITY) => {
                model.time_based_availability = Some(TimeBasedIndicatorModel {
                    threshold: Some(indicator.threshold),
                    aggregation: indicator.aggregation.clone(),
                });
            },
            (MEASUREMENT_EVENT_BASED, BLUEPRINT_AVAILABILITY) => {
                model.event_based_availability = Some(EventBasedAvailabilityIndicatorModel {});
            },
            (_, BLUEPRINT_TRAFFIC) => {
                model.traffic = Some(TrafficIndicatorModel {
                    traffic_type: indicator.traffic_type.clone(),
                    threshold: Some(indicator.threshold),
                    operator: indicator.operator.clone(),
                });
            },
            (MEASUREMENT_EVENT_BASED, BLUEPRINT_CUSTOM) => {
                model.custom = Some(CustomIndicatorModel {
                    good_event_filter_expression: self.to_state_filter(
                        indicator.good_events_filter.as_ref(),
                        "indicator.custom.good_event_filter_expression",
                    )?,
                    bad_event_filter_expression: self.to_state_filter(
                        indicator.bad_events_filter.as_ref(),
                        "indicator.custom.bad_event_filter_expression",
                    )?,
                });
            },
            (measurement, blueprint) => {
                return Err(unsupported(
                    "Error mapping indicator to state",
                    format!(
                        "Unsupported indicator type: {}, blueprint: {}",
                        measurement, blueprint
                    ),
                    "indicator",
                ))
            },
        }
        Ok(model)
    }
}

fn time_window_from_model(model: Option<TimeWindowModel>) -> Result<SloTimeWindow, Diagnostics> {
    let model = model.unwrap_or_default();
    if let Some(rolling) = model.rolling {
        let (Some(duration), Some(duration_unit)) = (rolling.duration, rolling.duration_unit) else {
            return Err(missing(
                "duration and duration_unit are required for rolling time window",
                "time_window.rolling",
            ));
        };
        return Ok(SloTimeWindow {
            window_type: WINDOW_ROLLING.to_string(),
            duration,
            duration_unit,
            timezone: rolling.timezone.unwrap_or_default(),
            ..Default::default()
        });
    }
    if let Some(fixed) = model.fixed {
        let (Some(duration), Some(duration_unit), Some(start_timestamp)) =
            (fixed.duration, fixed.duration_unit, fixed.start_timestamp)
        else {
            return Err(missing(
                "duration, duration_unit and start_timestamp are required for fixed time window",
                "time_window.fixed",
            ));
        };
        return Ok(SloTimeWindow {
            window_type: WINDOW_FIXED.to_string(),
            duration,
            duration_unit,
            timezone: fixed.timezone.unwrap_or_default(),
            start_timestamp,
        });
    }
    Err(unsupported(
        "Missing time window configuration",
        "Exactly one time window configuration is required",
        "time_window",
    ))
}

fn time_window_to_model(window: &SloTimeWindow) -> Result<TimeWindowModel, Diagnostics> {
    let timezone = super::non_empty_string(&window.timezone);
    match window.window_type.as_str() {
        WINDOW_ROLLING => Ok(TimeWindowModel {
            rolling: Some(RollingTimeWindowModel {
                duration: Some(window.duration),
                duration_unit: Some(window.duration_unit.clone()),
                timezone,
            }),
            fixed: None,
        }),
        WINDOW_FIXED => Ok(TimeWindowModel {
            rolling: None,
            fixed: Some(FixedTimeWindowModel {
                duration: Some(window.duration),
                duration_unit: Some(window.duration_unit.clone()),
                timezone,
                start_timestamp: Some(window.start_timestamp),
            }),
        }),
        other => Err(unsupported(
            "Error mapping time window to state",
            format!("Unsupported time window type: {}", other),
            "time_window",
        )),
    }
}

impl Default for SloConfigResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for SloConfigResource {
    type Object = SloConfig;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<SloConfig>> {
        api.slo_configs()
    }

    fn set_computed_fields(&self, plan: &mut Plan) -> Diagnostics {
        let id = format!("{}{}", SLO_ID_PREFIX, Uuid::new_v4().simple());
        plan.set_attribute("id", &id)
    }

    fn update_state(&self, state: &mut State, _plan: Option<&Plan>, config: &SloConfig) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let entity = self.entity_to_model(&config.entity);
        let indicator = self.indicator_to_model(&config.indicator);
        let time_window = time_window_to_model(&config.time_window);
        let (entity, indicator, time_window) = match (entity, indicator, time_window) {
            (Ok(entity), Ok(indicator), Ok(time_window)) => (entity, indicator, time_window),
            (entity, indicator, time_window) => {
                for result in [entity.err(), indicator.err(), time_window.err()] {
                    diags.append(result.unwrap_or_default());
                }
                return diags;
            },
        };

        let rbac_tags = config
            .rbac_tags
            .iter()
            .map(|tag| RbacTagModel {
                display_name: tag.display_name.clone(),
                id: tag.id.clone(),
            })
            .collect();
        diags.append(state.set(&SloConfigModel {
            id: Some(config.id.clone()),
            name: config.name.clone(),
            target: config.target,
            tags: non_empty_vec(config.tags.clone()),
            rbac_tags: non_empty_vec(rbac_tags),
            entity: Some(entity),
            indicator: Some(indicator),
            time_window: Some(time_window),
        }));
        diags
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<SloConfig, Diagnostics> {
        let model: SloConfigModel = model_from(plan, state)?;
        let mut diags = Diagnostics::new();
        let entity = self.entity_from_model(model.entity);
        let indicator = self.indicator_from_model(model.indicator);
        let time_window = time_window_from_model(model.time_window);
        let (entity, indicator, time_window) = match (entity, indicator, time_window) {
            (Ok(entity), Ok(indicator), Ok(time_window)) => (entity, indicator, time_window),
            (entity, indicator, time_window) => {
                for result in [entity.err(), indicator.err(), time_window.err()] {
                    diags.append(result.unwrap_or_default());
                }
                return Err(diags);
            },
        };

        Ok(SloConfig {
            id: model.id.unwrap_or_default(),
            name: model.name,
            target: model.target,
            tags: model.tags.unwrap_or_default(),
            entity,
            indicator,
            time_window,
            rbac_tags: model
                .rbac_tags
                .unwrap_or_default()
                .into_iter()
                .map(|tag| RbacTag {
                    display_name: tag.display_name,
                    id: tag.id,
                })
                .collect(),
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
            LogicalOperator::And,
            vec![TagFilter::string_comparison("NOT_APPLICABLE", "call.http.status", "EQUALS", value)],
        )
    }

    fn application_entity() -> SloEntity {
        SloEntity {
            entity_type: "application".to_string(),
            application_id: Some("app-1".to_string()),
            service_id: Some("svc-1".to_string()),
            endpoint_id: None,
            boundary_scope: Some("INBOUND".to_string()),
            include_internal: Some(false),
            include_synthetic: Some(true),
            tag_filter_expression: Some(filter("200")),
            ..Default::default()
        }
    }

    fn config() -> SloConfig {
        SloConfig {
            id: "SLOTF1".to_string(),
            name: "checkout".to_string(),
            target: 0.99,
            tags: vec!["team-a".to_string()],
            entity: application_entity(),
            indicator: SloIndicator {
                blueprint: "latency".to_string(),
                indicator_type: "timeBased".to_string(),
                threshold: 300.0,
                aggregation: Some("P90".to_string()),
                ..Default::default()
            },
            time_window: SloTimeWindow {
                window_type: "rolling".to_string(),
                duration: 7,
                duration_unit: "day".to_string(),
                timezone: "Europe/Berlin".to_string(),
                start_timestamp: 0.0,
            },
            rbac_tags: vec![RbacTag {
                display_name: "Ops".to_string(),
                id: "tag-1".to_string(),
            }],
        }
    }

    fn round_trip(config: &SloConfig) -> (State, SloConfig) {
        let resource = SloConfigResource::new();
        let mut state = State::new();
        let diags = resource.update_state(&mut state, None, config);
        assert!(diags.is_empty(), "{}", diags);
        assert!(validate(&resource.metadata().schema, state.raw()).is_empty());
        let mapped = resource.map_state_to_data_object(None, Some(&state)).unwrap();
        (state, mapped)
    }

    #[test]
    fn test_round_trip() {
        let (state, mapped) = round_trip(&config());
        assert_eq!(state.raw()["entity"]["website"], json!(null));
        assert_eq!(state.raw()["entity"]["application"]["endpoint_id"], json!(null));
        assert_eq!(
            state.raw()["time_window"]["rolling"]["timezone"],
            json!("Europe/Berlin")
        );
        assert_eq!(mapped, config());
    }

    #[test]
    fn test_indicators_round_trip() {
        let indicators = vec![
            SloIndicator {
                blueprint: "latency".to_string(),
                indicator_type: "eventBased".to_string(),
                threshold: 120.0,
                aggregation: Some("MEAN".to_string()),
                ..Default::default()
            },
            SloIndicator {
                blueprint: "availability".to_string(),
                indicator_type: "timeBased".to_string(),
                threshold: 0.5,
                aggregation: Some("MIN".to_string()),
                ..Default::default()
            },
            SloIndicator {
                blueprint: "availability".to_string(),
                indicator_type: "eventBased".to_string(),
                aggregation: Some("MEAN".to_string()),
                ..Default::default()
            },
            SloIndicator {
                blueprint: "traffic".to_string(),
                indicator_type: "timeBased".to_string(),
                threshold: 1000.0,
                aggregation: Some("MEAN".to_string()),
                operator: Some(">=".to_string()),
                traffic_type: Some("all".to_string()),
                ..Default::default()
            },
            SloIndicator {
                blueprint: "custom".to_string(),
                indicator_type: "eventBased".to_string(),
                aggregation: Some("MEAN".to_string()),
                good_events_filter: Some(filter("200")),
                bad_events_filter: Some(filter("500")),
                ..Default::default()
            },
        ];
        for indicator in indicators {
            let config = SloConfig {
                indicator,
                ..config()
            };
            assert_eq!(round_trip(&config).1, config);
        }
    }

    #[test]
    fn test_website_and_synthetic_entities_round_trip() {
        let website = SloConfig {
            entity: SloEntity {
                entity_type: "website".to_string(),
                website_id: Some("web-1".to_string()),
                beacon_type: Some("pageLoad".to_string()),
                tag_filter_expression: Some(filter("ok")),
                ..Default::default()
            },
            ..config()
        };
        assert_eq!(round_trip(&website).1, website);

        let synthetic = SloConfig {
            entity: SloEntity {
                entity_type: "synthetic".to_string(),
                synthetic_test_ids: Some(vec!["t1".to_string(), "t2".to_string()]),
                tag_filter_expression: Some(filter("ok")),
                ..Default::default()
            },
            ..config()
        };
        assert_eq!(round_trip(&synthetic).1, synthetic);
    }

    #[test]
    fn test_fixed_time_window_round_trip() {
        let config = SloConfig {
            time_window: SloTimeWindow {
                window_type: "fixed".to_string(),
                duration: 1,
                duration_unit: "week".to_string(),
                timezone: String::new(),
                start_timestamp: 1_700_000_000_000.0,
            },
            ..config()
        };
        let (state, mapped) = round_trip(&config);
        assert_eq!(state.raw()["time_window"]["fixed"]["timezone"], json!(null));
        assert_eq!(state.raw()["time_window"]["rolling"], json!(null));
        assert_eq!(mapped, config);
    }

    #[test]
    fn test_null_filter_is_sent_as_empty_expression() {
        let resource = SloConfigResource::new();
        let plan = Plan::from_value(json!({
            "name": "checkout",
            "target": 0.95,
            "entity": {"website": {"website_id": "web-1", "beacon_type": "pageLoad"}},
            "indicator": {"event_based_availability": {}},
            "time_window": {"rolling": {"duration": 1, "duration_unit": "day"}}
        }));

        let mapped = resource.map_state_to_data_object(Some(&plan), None).unwrap();
        assert_eq!(
            mapped.entity.tag_filter_expression,
            Some(TagFilter::empty_expression())
        );
        assert_eq!(mapped.indicator.aggregation.as_deref(), Some("MEAN"));
        assert!(mapped.tags.is_empty());
        assert!(mapped.rbac_tags.is_empty());
        assert_eq!(mapped.time_window.timezone, "");

        let mut state = State::new();
        assert!(resource.update_state(&mut state, None, &mapped).is_empty());
        assert_eq!(state.raw()["entity"]["website"]["filter_expression"], json!(null));
        assert_eq!(state.raw()["tags"], json!(null));
    }

    #[test]
    fn test_application_flags_default_to_false() {
        let resource = SloConfigResource::new();
        let plan = Plan::from_value(json!({
            "name": "checkout",
            "target": 0.95,
            "entity": {"application": {"application_id": "app-1", "boundary_scope": "ALL"}},
            "indicator": {"traffic": {"threshold": 10.0, "operator": "<"}},
            "time_window": {"rolling": {"duration": 1, "duration_unit": "day"}}
        }));

        let mapped = resource.map_state_to_data_object(Some(&plan), None).unwrap();
        assert_eq!(mapped.entity.include_internal, Some(false));
        assert_eq!(mapped.entity.include_synthetic, Some(false));
        assert_eq!(mapped.indicator.indicator_type, "timeBased");
        assert_eq!(mapped.indicator.blueprint, "traffic");
    }

    #[test]
    fn test_missing_blocks_report_every_error() {
        let resource = SloConfigResource::new();
        let plan = Plan::from_value(json!({"name": "n", "target": 0.9}));

        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec![
                "Missing entity configuration",
                "Missing indicator configuration",
                "Missing time window configuration"
            ]
        );
    }

    #[test]
    fn test_empty_synthetic_test_ids_is_error() {
        let resource = SloConfigResource::new();
        let plan = Plan::from_value(json!({
            "name": "n",
            "target": 0.9,
            "entity": {"synthetic": {"synthetic_test_ids": []}},
            "indicator": {"event_based_availability": {}},
            "time_window": {"rolling": {"duration": 1, "duration_unit": "day"}}
        }));

        let diags = resource.map_state_to_data_object(Some(&plan), None).unwrap_err();
        assert_eq!(diags[0].summary, "synthetic_test_ids is required for synthetic entity");
    }

    #[test]
    fn test_unsupported_api_values() {
        let resource = SloConfigResource::new();
        let cases = vec![
            (
                SloConfig {
                    entity: SloEntity {
                        entity_type: "infrastructure".to_string(),
                        ..Default::default()
                    },
                    ..config()
                },
                "Unsupported entity type: infrastructure",
            ),
            (
                SloConfig {
                    indicator: SloIndicator {
                        blueprint: "saturation".to_string(),
                        indicator_type: "timeBased".to_string(),
                        ..Default::default()
                    },
                    ..config()
                },
                "Unsupported indicator type: timeBased, blueprint: saturation",
            ),
            (
                SloConfig {
                    time_window: SloTimeWindow {
                        window_type: "calendar".to_string(),
                        ..Default::default()
                    },
                    ..config()
                },
                "Unsupported time window type: calendar",
            ),
        ];
        for (config, detail) in cases {
            let mut state = State::new();
            let diags = resource.update_state(&mut state, None, &config);
            assert!(diags.has_error());
            assert_eq!(diags[0].detail.as_deref(), Some(detail));
            assert!(state.is_null());
        }
    }

    #[test]
    fn test_set_computed_fields_generates_prefixed_id() {
        let resource = SloConfigResource::new();
        let mut plan = Plan::from_value(json!({"name": "n", "target": 0.9}));
        assert!(resource.set_computed_fields(&mut plan).is_empty());

        let id: String = plan.get_attribute("id").unwrap().unwrap();
        assert!(id.starts_with(SLO_ID_PREFIX));
        assert!(resource.metadata().skip_id_generation);
    }
}
