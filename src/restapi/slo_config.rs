//! Service level objectives.
//!
//! Entity, indicator and time window are flat objects on the wire whose
//! `type` (and for indicators `blueprint`) decides which fields matter.

use super::InstanaDataObject;
use crate::tagfilter::TagFilter;
use serde::{Deserialize, Serialize};

/// Tag restricting who can see an SLO.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RbacTag {
    pub display_name: String,
    pub id: String,
}

/// What the SLO is measured on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default)]
    pub boundary_scope: Option<String>,
    #[serde(default)]
    pub include_synthetic: Option<bool>,
    #[serde(default)]
    pub include_internal: Option<bool>,
    #[serde(default)]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub website_id: Option<String>,
    #[serde(default)]
    pub beacon_type: Option<String>,
    #[serde(default)]
    pub synthetic_test_ids: Option<Vec<String>>,
}

/// How good and bad events are counted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloIndicator {
    pub blueprint: String,
    #[serde(rename = "type", default)]
    pub indicator_type: String,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub aggregation: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub traffic_type: Option<String>,
    #[serde(rename = "goodEventsFilter", default)]
    pub good_events_filter: Option<TagFilter>,
    #[serde(rename = "badEventsFilter", default)]
    pub bad_events_filter: Option<TagFilter>,
}

/// Evaluation period of an SLO.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloTimeWindow {
    #[serde(rename = "type")]
    pub window_type: String,
    pub duration: i64,
    pub duration_unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,
    #[serde(rename = "startTimestamp", default)]
    pub start_timestamp: f64,
}

/// A service level objective configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloConfig {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub target: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub entity: SloEntity,
    pub indicator: SloIndicator,
    pub time_window: SloTimeWindow,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rbac_tags: Vec<RbacTag>,
}

impl InstanaDataObject for SloConfig {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_time_window_omits_empty_timezone() {
        let window = SloTimeWindow {
            window_type: "rolling".to_string(),
            duration: 7,
            duration_unit: "day".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&window).unwrap();
        assert!(value.get("timezone").is_none());
        assert_eq!(value["type"], json!("rolling"));
    }

    #[test]
    fn test_decode_without_optional_parts() {
        let config: SloConfig = serde_json::from_value(json!({
            "id": "slo-1",
            "name": "checkout",
            "target": 0.99,
            "entity": {"type": "website", "websiteId": "w1", "beaconType": "pageLoad"},
            "indicator": {"blueprint": "availability", "type": "eventBased"},
            "timeWindow": {"type": "rolling", "duration": 1, "durationUnit": "week"}
        }))
        .unwrap();
        assert!(config.tags.is_empty());
        assert!(config.rbac_tags.is_empty());
        assert_eq!(config.entity.website_id.as_deref(), Some("w1"));
        assert_eq!(config.indicator.aggregation, None);
    }
}
