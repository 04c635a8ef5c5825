//! Custom event specifications and their rules.

use super::InstanaDataObject;
use crate::tagfilter::TagFilter;
use serde::{Deserialize, Serialize};

/// Wire value of the `warning` severity.
pub const SEVERITY_WARNING: i32 = 5;
/// Wire value of the `critical` severity.
pub const SEVERITY_CRITICAL: i32 = 10;

/// Discriminator of a [`RuleSpecification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    EntityCount,
    EntityCountVerification,
    EntityVerification,
    HostAvailability,
    System,
    Threshold,
    /// Rule kinds this provider does not manage.
    #[serde(other)]
    Unknown,
}

/// Metric selection by pattern for threshold rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricPattern {
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postfix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub operator: String,
}

/// A single rule. Which optional fields are set depends on `rule_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpecification {
    pub rule_type: RuleType,
    pub severity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_pattern: Option<MetricPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_entity_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_duration: Option<i64>,
    #[serde(rename = "systemRuleId", default, skip_serializing_if = "Option::is_none")]
    pub system_rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_after: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter: Option<TagFilter>,
}

impl RuleSpecification {
    /// A rule of the given kind with only the severity set.
    pub fn new(rule_type: RuleType, severity: i32) -> Self {
        Self {
            rule_type,
            severity,
            metric_name: None,
            rollup: None,
            window: None,
            aggregation: None,
            condition_operator: None,
            condition_value: None,
            metric_pattern: None,
            matching_entity_type: None,
            matching_operator: None,
            matching_entity_label: None,
            offline_duration: None,
            system_rule_id: None,
            close_after: None,
            tag_filter: None,
        }
    }
}

/// A custom event specification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventSpecification {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub triggering: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rule_logical_operator: String,
    #[serde(default)]
    pub rules: Vec<RuleSpecification>,
}

impl InstanaDataObject for CustomEventSpecification {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}
