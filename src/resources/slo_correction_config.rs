//! `instana_slo_correction_config`

use super::{non_empty_string, non_empty_vec};
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{InstanaApi, RestResource, Scheduling, SloCorrectionConfig};
use crate::schema::{Attribute, Block, Diagnostics, NestedBlock, Schema, Validator};
use crate::state::{Plan, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "slo_correction_config";

/// Units accepted for `scheduling.duration_unit`. The API expects them upper-case.
pub const SUPPORTED_DURATION_UNITS: &[&str] =
    &["millisecond", "second", "minute", "hour", "day", "week", "month"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulingModel {
    pub start_time: i64,
    pub duration: i64,
    pub duration_unit: String,
    pub recurrent_rule: Option<String>,
    pub recurrent: Option<bool>,
}

/// State of an SLO correction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SloCorrectionConfigModel {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub scheduling: Option<Vec<SchedulingModel>>,
    pub slo_ids: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

fn slo_correction_config_schema() -> Schema {
    let scheduling = Block::new()
        .with_attribute(
            "start_time",
            Attribute::required_int64()
                .with_description("The start time of the scheduling in Unix timestamp in milliseconds."),
        )
        .with_attribute(
            "duration",
            Attribute::required_int64()
                .with_description("The duration of the scheduling in the specified unit."),
        )
        .with_attribute(
            "duration_unit",
            Attribute::required_string()
                .with_validator(Validator::one_of(SUPPORTED_DURATION_UNITS.iter().copied()))
                .with_description("The unit of the duration (e.g. 'minute', 'hour', 'day')."),
        )
        .with_attribute(
            "recurrent_rule",
            Attribute::optional_string().with_description("Recurrent rule for scheduling, if applicable."),
        )
        .with_attribute(
            "recurrent",
            Attribute::optional_computed_bool().with_description("Indicates whether the rule is recurrent."),
        );

    Schema::v0()
        .with_description("This resource manages SLO Correction Configurations in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the SLO Correction Config."),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_validator(Validator::LengthBetween { min: 0, max: 256 })
                .with_description("The name of the SLO Correction Config."),
        )
        .with_attribute(
            "description",
            Attribute::required_string().with_description("The description of the SLO Correction Config."),
        )
        .with_attribute(
            "active",
            Attribute::required_bool().with_description("Indicates whether the Correction Config is active."),
        )
        .with_attribute(
            "slo_ids",
            Attribute::required_string_set()
                .with_description("A set of SLO IDs that this correction config applies to."),
        )
        .with_attribute(
            "tags",
            Attribute::optional_string_set()
                .with_description("A list of tags to be associated with the SLO Correction Config."),
        )
        .with_block("scheduling", NestedBlock::list(scheduling).with_max_items(1))
}

/// Resource handle for SLO correction configurations.
#[derive(Debug)]
pub struct SloCorrectionConfigResource {
    metadata: ResourceMetaData,
}

impl SloCorrectionConfigResource {
    /// Create the handle.
    pub fn new() -> Self {
        Self {
            metadata: ResourceMetaData::new(RESOURCE_NAME, slo_correction_config_schema(), 1),
        }
    }
}

impl Default for SloCorrectionConfigResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for SloCorrectionConfigResource {
    type Object = SloCorrectionConfig;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<SloCorrectionConfig>> {
        api.slo_correction_configs()
    }

    fn update_state(
        &self,
        state: &mut State,
        _plan: Option<&Plan>,
        config: &SloCorrectionConfig,
    ) -> Diagnostics {
        let scheduling = &config.scheduling;
        state.set(&SloCorrectionConfigModel {
            id: Some(config.id.clone()),
            name: config.name.clone(),
            description: config.description.clone(),
            active: config.active,
            scheduling: Some(vec![SchedulingModel {
                start_time: scheduling.start_time,
                duration: scheduling.duration,
                duration_unit: scheduling.duration_unit.to_lowercase(),
                recurrent_rule: scheduling.recurrent_rule.as_deref().and_then(non_empty_string),
                recurrent: Some(scheduling.recurrent),
            }]),
            slo_ids: Some(config.slo_ids.clone()),
            tags: non_empty_vec(config.tags.clone()),
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<SloCorrectionConfig, Diagnostics> {
        let model: SloCorrectionConfigModel = model_from(plan, state)?;
        let scheduling = model
            .scheduling
            .and_then(|entries| entries.into_iter().next())
            .map(|scheduling| Scheduling {
                start_time: scheduling.start_time,
                duration: scheduling.duration,
                duration_unit: scheduling.duration_unit.to_uppercase(),
                recurrent_rule: scheduling.recurrent_rule,
                recurrent: scheduling.recurrent.unwrap_or(false),
            })
            .unwrap_or_default();
        Ok(SloCorrectionConfig {
            id: model.id.unwrap_or_default(),
            name: model.name,
            description: model.description,
            active: model.active,
            scheduling,
            slo_ids: model.slo_ids.unwrap_or_default(),
            tags: model.tags.unwrap_or_default(),
        })
    }
}
