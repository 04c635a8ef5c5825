//! `instana_custom_event_specification`
//!
//! The API holds rules as a list discriminated by `ruleType`. State has one
//! optional block per rule kind instead, so only the first rule of each kind
//! is kept when reading.

use super::{non_empty_string, normalize_tag_filter, parse_tag_filter, unsupported};
use crate::resourcehandle::{model_from, ResourceHandle, ResourceMetaData};
use crate::restapi::{
    CustomEventSpecification, InstanaApi, MetricPattern, RestResource, RuleSpecification,
    RuleType, SEVERITY_CRITICAL, SEVERITY_WARNING,
};
use crate::schema::{Attribute, Block, Diagnostic, Diagnostics, NestedBlock, Schema, Validator};
use crate::state::{Plan, State};
use crate::tagfilter::{default_mapper, SharedTagFilterMapper};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Resource name without provider prefix.
pub const RESOURCE_NAME: &str = "custom_event_specification";

pub const SEVERITY_WARNING_NAME: &str = "warning";
pub const SEVERITY_CRITICAL_NAME: &str = "critical";

/// Logical operators joining the rules.
pub const SUPPORTED_RULE_LOGICAL_OPERATORS: &[&str] = &["AND", "OR"];

const DEFAULT_METRIC_PATTERN_OPERATOR: &str = "EQUALS";

/// Terraform name of an API severity.
pub fn severity_name(severity: i32) -> Result<&'static str, String> {
    match severity {
        SEVERITY_WARNING => Ok(SEVERITY_WARNING_NAME),
        SEVERITY_CRITICAL => Ok(SEVERITY_CRITICAL_NAME),
        other => Err(format!("{} is not a valid severity", other)),
    }
}

/// API value of a Terraform severity.
pub fn severity_value(severity: &str) -> Result<i32, String> {
    match severity {
        SEVERITY_WARNING_NAME => Ok(SEVERITY_WARNING),
        SEVERITY_CRITICAL_NAME => Ok(SEVERITY_CRITICAL),
        other => Err(format!("{} is not a valid severity", other)),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityCountRuleModel {
    pub severity: String,
    pub condition_operator: String,
    pub condition_value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityCountVerificationRuleModel {
    pub severity: String,
    pub condition_operator: String,
    pub condition_value: f64,
    pub matching_entity_type: String,
    pub matching_operator: String,
    pub matching_entity_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityVerificationRuleModel {
    pub severity: String,
    pub matching_entity_type: String,
    pub matching_operator: String,
    pub matching_entity_label: String,
    pub offline_duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostAvailabilityRuleModel {
    pub severity: String,
    pub offline_duration: i64,
    pub close_after: Option<i64>,
    pub tag_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemRuleModel {
    pub severity: String,
    pub system_rule_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricPatternModel {
    pub prefix: String,
    pub postfix: Option<String>,
    pub placeholder: Option<String>,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdRuleModel {
    pub severity: String,
    pub metric_name: String,
    pub rollup: i64,
    pub window: i64,
    pub aggregation: String,
    pub condition_operator: String,
    pub condition_value: f64,
    pub metric_pattern: Option<MetricPatternModel>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RulesModel {
    pub entity_count: Option<EntityCountRuleModel>,
    pub entity_count_verification: Option<EntityCountVerificationRuleModel>,
    pub entity_verification: Option<EntityVerificationRuleModel>,
    pub host_availability: Option<HostAvailabilityRuleModel>,
    pub system: Option<SystemRuleModel>,
    pub threshold: Option<ThresholdRuleModel>,
}

/// State of a custom event specification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomEventSpecificationModel {
    pub id: Option<String>,
    pub name: String,
    pub entity_type: String,
    pub query: Option<String>,
    pub triggering: Option<bool>,
    pub description: Option<String>,
    pub expiration_time: Option<i64>,
    pub enabled: Option<bool>,
    pub rule_logical_operator: Option<String>,
    pub rules: Option<RulesModel>,
}

fn severity() -> Attribute {
    Attribute::required_string()
        .with_validator(Validator::one_of([SEVERITY_WARNING_NAME, SEVERITY_CRITICAL_NAME]))
        .with_description("The severity of the rule, either warning or critical.")
}

/// Optional string planned as `""` when unset. Empty values are sent as absent.
fn empty_string_default() -> Attribute {
    Attribute::optional_computed_string().with_default(json!(""))
}

fn custom_event_specification_schema() -> Schema {
    let entity_count = Block::new()
        .with_attribute("severity", severity())
        .with_attribute("condition_operator", Attribute::required_string())
        .with_attribute("condition_value", Attribute::required_float64());
    let entity_count_verification = Block::new()
        .with_attribute("severity", severity())
        .with_attribute("condition_operator", Attribute::required_string())
        .with_attribute("condition_value", Attribute::required_float64())
        .with_attribute("matching_entity_type", Attribute::required_string())
        .with_attribute("matching_operator", Attribute::required_string())
        .with_attribute("matching_entity_label", Attribute::required_string());
    let entity_verification = Block::new()
        .with_attribute("severity", severity())
        .with_attribute("matching_entity_type", Attribute::required_string())
        .with_attribute("matching_operator", Attribute::required_string())
        .with_attribute("matching_entity_label", Attribute::required_string())
        .with_attribute("offline_duration", Attribute::required_int64());
    let host_availability = Block::new()
        .with_attribute("severity", severity())
        .with_attribute("offline_duration", Attribute::required_int64())
        .with_attribute(
            "close_after",
            Attribute::optional_int64().with_description("Close the issue after this many milliseconds."),
        )
        .with_attribute(
            "tag_filter",
            Attribute::optional_string().with_description("Tag filter restricting the hosts."),
        );
    let system = Block::new()
        .with_attribute("severity", severity())
        .with_attribute("system_rule_id", Attribute::required_string());
    let metric_pattern = Block::new()
        .with_attribute("prefix", Attribute::required_string())
        .with_attribute("postfix", empty_string_default())
        .with_attribute("placeholder", empty_string_default())
        .with_attribute(
            "operator",
            Attribute::optional_computed_string().with_default(json!(DEFAULT_METRIC_PATTERN_OPERATOR)),
        );
    let threshold = Block::new()
        .with_attribute("severity", severity())
        .with_attribute("metric_name", Attribute::required_string())
        .with_attribute("rollup", Attribute::required_int64())
        .with_attribute("window", Attribute::required_int64())
        .with_attribute("aggregation", Attribute::required_string())
        .with_attribute("condition_operator", Attribute::required_string())
        .with_attribute("condition_value", Attribute::required_float64())
        .with_block("metric_pattern", NestedBlock::single(metric_pattern));

    let rules = Block::new()
        .with_block("entity_count", NestedBlock::single(entity_count))
        .with_block("entity_count_verification", NestedBlock::single(entity_count_verification))
        .with_block("entity_verification", NestedBlock::single(entity_verification))
        .with_block("host_availability", NestedBlock::single(host_availability))
        .with_block("system", NestedBlock::single(system))
        .with_block("threshold", NestedBlock::single(threshold));

    Schema::v0()
        .with_description("This resource manages custom event specifications in Instana.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The ID of the custom event specification."),
        )
        .with_attribute("name", Attribute::required_string())
        .with_attribute("entity_type", Attribute::required_string())
        .with_attribute("query", empty_string_default())
        .with_attribute(
            "triggering",
            Attribute::optional_computed_bool().with_default(json!(false)),
        )
        .with_attribute("description", empty_string_default())
        .with_attribute("expiration_time", Attribute::optional_int64())
        .with_attribute("enabled", Attribute::optional_computed_bool().with_default(json!(true)))
        .with_attribute(
            "rule_logical_operator",
            Attribute::optional_computed_string()
                .with_default(json!("AND"))
                .with_validator(Validator::one_of(SUPPORTED_RULE_LOGICAL_OPERATORS.iter().copied())),
        )
        .with_block("rules", NestedBlock::single(rules))
}

/// Resource handle for custom event specifications.
#[derive(Debug)]
pub struct CustomEventSpecificationResource {
    metadata: ResourceMetaData,
    tag_filter_mapper: SharedTagFilterMapper,
}

impl CustomEventSpecificationResource {
    /// Create the handle with the default tag filter mapper.
    pub fn new() -> Self {
        Self::with_tag_filter_mapper(default_mapper())
    }

    /// Create the handle with a custom tag filter mapper.
    pub fn with_tag_filter_mapper(tag_filter_mapper: SharedTagFilterMapper) -> Self {
        Self {
            metadata: ResourceMetaData::new(
                RESOURCE_NAME,
                custom_event_specification_schema(),
                1,
            ),
            tag_filter_mapper,
        }
    }

    fn rules_to_model(&self, rules: &[RuleSpecification]) -> Result<RulesModel, Diagnostics> {
        let mut model = RulesModel::default();
        for (i, rule) in rules.iter().enumerate() {
            let attribute = format!("rules.{}", i);
            let severity = severity_name(rule.severity)
                .map_err(|detail| unsupported("Invalid severity", detail, &attribute))?
                .to_string();
            match rule.rule_type {
                RuleType::EntityCount if model.entity_count.is_none() => {
                    if let (Some(operator), Some(value)) =
                        (&rule.condition_operator, rule.condition_value)
                    {
                        model.entity_count = Some(EntityCountRuleModel {
                            severity,
                            condition_operator: operator.clone(),
                            condition_value: value,
                        });
                    }
                },
                RuleType::EntityCountVerification if model.entity_count_verification.is_none() => {
                    if let (Some(operator), Some(value), Some(entity_type), Some(matching), Some(label)) = (
                        &rule.condition_operator,
                        rule.condition_value,
                        &rule.matching_entity_type,
                        &rule.matching_operator,
                        &rule.matching_entity_label,
                    ) {
                        model.entity_count_verification = Some(EntityCountVerificationRuleModel {
                            severity,
                            condition_operator: operator.clone(),
                            condition_value: value,
                            matching_entity_type: entity_type.clone(),
                            matching_operator: matching.clone(),
                            matching_entity_label: label.clone(),
                        });
                    }
                },
                RuleType::EntityVerification if model.entity_verification.is_none() => {
                    if let (Some(entity_type), Some(matching), Some(label), Some(offline)) = (
                        &rule.matching_entity_type,
                        &rule.matching_operator,
                        &rule.matching_entity_label,
                        rule.offline_duration,
                    ) {
                        model.entity_verification = Some(EntityVerificationRuleModel {
                            severity,
                            matching_entity_type: entity_type.clone(),
                            matching_operator: matching.clone(),
                            matching_entity_label: label.clone(),
                            offline_duration: offline,
                        });
                    }
                },
                RuleType::HostAvailability if model.host_availability.is_none() => {
                    if let Some(offline) = rule.offline_duration {
                        model.host_availability = Some(HostAvailabilityRuleModel {
                            severity,
                            offline_duration: offline,
                            close_after: rule.close_after,
                            tag_filter: normalize_tag_filter(
                                self.tag_filter_mapper.as_ref(),
                                rule.tag_filter.as_ref(),
                                &format!("{}.tag_filter", attribute),
                            )?,
                        });
                    }
                },
                RuleType::System if model.system.is_none() => {
                    if let Some(id) = &rule.system_rule_id {
                        model.system = Some(SystemRuleModel {
                            severity,
                            system_rule_id: id.clone(),
                        });
                    }
                },
                RuleType::Threshold if model.threshold.is_none() => {
                    if let (
                        Some(metric),
                        Some(rollup),
                        Some(window),
                        Some(aggregation),
                        Some(operator),
                        Some(value),
                    ) = (
                        &rule.metric_name,
                        rule.rollup,
                        rule.window,
                        &rule.aggregation,
                        &rule.condition_operator,
                        rule.condition_value,
                    ) {
                        model.threshold = Some(ThresholdRuleModel {
                            severity,
                            metric_name: metric.clone(),
                            rollup,
                            window,
                            aggregation: aggregation.clone(),
                            condition_operator: operator.clone(),
                            condition_value: value,
                            metric_pattern: rule.metric_pattern.as_ref().map(|pattern| {
                                MetricPatternModel {
                                    prefix: pattern.prefix.clone(),
                                    postfix: pattern.postfix.clone(),
                                    placeholder: pattern.placeholder.clone(),
                                    operator: Some(pattern.operator.clone()),
                                }
                            }),
                        });
                    }
                },
                RuleType::Unknown => {
                    return Err(unsupported(
                        "Unsupported rule type",
                        "the rule type is not supported by this provider",
                        &attribute,
                    ))
                },
                _ => {},
            }
        }
        Ok(model)
    }

    fn rules_from_model(&self, model: RulesModel) -> Result<Vec<RuleSpecification>, Diagnostics> {
        let rule = |rule_type: RuleType, severity: &str, attribute: &str| {
            severity_value(severity)
                .map(|severity| RuleSpecification::new(rule_type, severity))
                .map_err(|detail| {
                    Diagnostics::from(
                        Diagnostic::error("Invalid severity")
                            .with_detail(detail)
                            .with_attribute(format!("rules.{}.severity", attribute)),
                    )
                })
        };

        let mut rules = Vec::new();
        if let Some(entity_count) = model.entity_count {
            rules.push(RuleSpecification {
                condition_operator: Some(entity_count.condition_operator),
                condition_value: Some(entity_count.condition_value),
                ..rule(RuleType::EntityCount, &entity_count.severity, "entity_count")?
            });
        }
        if let Some(verification) = model.entity_count_verification {
            rules.push(RuleSpecification {
                condition_operator: Some(verification.condition_operator),
                condition_value: Some(verification.condition_value),
                matching_entity_type: Some(verification.matching_entity_type),
                matching_operator: Some(verification.matching_operator),
                matching_entity_label: Some(verification.matching_entity_label),
                ..rule(
                    RuleType::EntityCountVerification,
                    &verification.severity,
                    "entity_count_verification",
                )?
            });
        }
        if let Some(verification) = model.entity_verification {
            rules.push(RuleSpecification {
                matching_entity_type: Some(verification.matching_entity_type),
                matching_operator: Some(verification.matching_operator),
                matching_entity_label: Some(verification.matching_entity_label),
                offline_duration: Some(verification.offline_duration),
                ..rule(
                    RuleType::EntityVerification,
                    &verification.severity,
                    "entity_verification",
                )?
            });
        }
        if let Some(host) = model.host_availability {
            rules.push(RuleSpecification {
                offline_duration: Some(host.offline_duration),
                close_after: host.close_after,
                tag_filter: parse_tag_filter(
                    self.tag_filter_mapper.as_ref(),
                    host.tag_filter.as_deref(),
                    "rules.host_availability.tag_filter",
                )?,
                ..rule(RuleType::HostAvailability, &host.severity, "host_availability")?
            });
        }
        if let Some(system) = model.system {
            rules.push(RuleSpecification {
                system_rule_id: Some(system.system_rule_id),
                ..rule(RuleType::System, &system.severity, "system")?
            });
        }
        if let Some(threshold) = model.threshold {
            rules.push(RuleSpecification {
                metric_name: Some(threshold.metric_name),
                rollup: Some(threshold.rollup),
                window: Some(threshold.window),
                aggregation: Some(threshold.aggregation),
                condition_operator: Some(threshold.condition_operator),
                condition_value: Some(threshold.condition_value),
                metric_pattern: threshold.metric_pattern.map(|pattern| MetricPattern {
                    prefix: pattern.prefix,
                    postfix: pattern.postfix.as_deref().and_then(non_empty_string),
                    placeholder: pattern.placeholder.as_deref().and_then(non_empty_string),
                    operator: pattern
                        .operator
                        .unwrap_or_else(|| DEFAULT_METRIC_PATTERN_OPERATOR.to_string()),
                }),
                ..rule(RuleType::Threshold, &threshold.severity, "threshold")?
            });
        }
        Ok(rules)
    }
}

impl Default for CustomEventSpecificationResource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandle for CustomEventSpecificationResource {
    type Object = CustomEventSpecification;

    fn metadata(&self) -> &ResourceMetaData {
        &self.metadata
    }

    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<CustomEventSpecification>> {
        api.custom_event_specifications()
    }

    fn update_state(
        &self,
        state: &mut State,
        _plan: Option<&Plan>,
        spec: &CustomEventSpecification,
    ) -> Diagnostics {
        let rules = match self.rules_to_model(&spec.rules) {
            Ok(rules) => rules,
            Err(diags) => return diags,
        };
        state.set(&CustomEventSpecificationModel {
            id: Some(spec.id.clone()),
            name: spec.name.clone(),
            entity_type: spec.entity_type.clone(),
            query: spec.query.clone(),
            triggering: Some(spec.triggering),
            description: spec.description.clone(),
            expiration_time: spec.expiration_time,
            enabled: Some(spec.enabled),
            rule_logical_operator: Some(spec.rule_logical_operator.clone()),
            rules: Some(rules),
        })
    }

    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<CustomEventSpecification, Diagnostics> {
        let model: CustomEventSpecificationModel = model_from(plan, state)?;
        let rules = match model.rules {
            Some(rules) => self.rules_from_model(rules)?,
            None => Vec::new(),
        };
        Ok(CustomEventSpecification {
            id: model.id.unwrap_or_default(),
            name: model.name,
            entity_type: model.entity_type,
            query: model.query.as_deref().and_then(non_empty_string),
            triggering: model.triggering.unwrap_or(false),
            description: model.description.as_deref().and_then(non_empty_string),
            expiration_time: model.expiration_time,
            enabled: model.enabled.unwrap_or(true),
            rule_logical_operator: model
                .rule_logical_operator
                .unwrap_or_else(|| SUPPORTED_RULE_LOGICAL_OPERATORS[0].to_string()),
            rules,
        })
    }
}
