use super::InstanaDataObject;
use crate::tagfilter::TagFilter;
use serde::{Deserialize, Serialize};

/// Metric an SLI is calculated from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfiguration {
    pub metric_name: String,
    pub metric_aggregation: String,
    pub threshold: f64,
}

/// Entity an SLI is measured on; `sli_type` selects which fields apply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliEntity {
    pub sli_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beacon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<TagFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_event_filter_expression: Option<TagFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad_event_filter_expression: Option<TagFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_internal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_synthetic: Option<bool>,
}

/// A service level indicator configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliConfig {
    #[serde(default)]
    pub id: String,
    pub sli_name: String,
    #[serde(default)]
    pub initial_evaluation_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_configuration: Option<MetricConfiguration>,
    pub sli_entity: SliEntity,
}

impl InstanaDataObject for SliConfig {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_omits_unset_fields() {
        let config = SliConfig {
            id: "sli-1".to_string(),
            sli_name: "latency".to_string(),
            initial_evaluation_timestamp: Some(0),
            metric_configuration: None,
            sli_entity: SliEntity {
                sli_type: "application".to_string(),
                application_id: Some("app-1".to_string()),
                boundary_scope: Some("ALL".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "id": "sli-1",
                "sliName": "latency",
                "initialEvaluationTimestamp": 0,
                "sliEntity": {"sliType": "application", "applicationId": "app-1", "boundaryScope": "ALL"}
            })
        );
    }
}
