//! Tag filter expressions.
//!
//! Several Instana objects (SLO entities, SLI event filters, team
//! application filters, host availability rules) carry a [`TagFilter`]
//! tree. In state the tree is stored as a single string. Converting between
//! the two goes through the [`TagFilterMapper`] trait so that a full
//! expression language can be plugged in; the crate ships
//! [`JsonTagFilterMapper`], which uses the JSON form of the tree itself as
//! the normalized string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Node kind of a tag filter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagFilterType {
    /// A logical combination of child elements.
    Expression,
    /// A single comparison against a tag.
    TagFilter,
}

/// Logical operator joining the elements of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    /// All elements must match.
    And,
    /// Any element must match.
    Or,
}

/// Comparison operators supported by the Instana API.
pub const SUPPORTED_TAG_FILTER_OPERATORS: &[&str] = &[
    "EQUALS",
    "NOT_EQUAL",
    "CONTAINS",
    "NOT_CONTAIN",
    "STARTS_WITH",
    "ENDS_WITH",
    "NOT_STARTS_WITH",
    "NOT_ENDS_WITH",
    "GREATER_OR_EQUAL_THAN",
    "LESS_OR_EQUAL_THAN",
    "GREATER_THAN",
    "LESS_THAN",
    "IS_EMPTY",
    "NOT_EMPTY",
    "IS_BLANK",
    "NOT_BLANK",
];

/// Instana API representation of a tag filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilter {
    #[serde(rename = "type")]
    pub filter_type: TagFilterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<TagFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl TagFilter {
    /// The filter sent when the user configured none: `AND` over no elements.
    pub fn empty_expression() -> Self {
        Self::expression(LogicalOperator::And, Vec::new())
    }

    /// Build an expression node.
    pub fn expression(operator: LogicalOperator, elements: Vec<TagFilter>) -> Self {
        Self {
            filter_type: TagFilterType::Expression,
            logical_operator: Some(operator),
            elements: Some(elements),
            entity: None,
            name: None,
            key: None,
            operator: None,
            string_value: None,
            number_value: None,
            boolean_value: None,
            value: None,
        }
    }

    /// Build a string comparison leaf.
    pub fn string_comparison(
        entity: impl Into<String>,
        name: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        Self {
            filter_type: TagFilterType::TagFilter,
            logical_operator: None,
            elements: None,
            entity: Some(entity.into()),
            name: Some(name.into()),
            key: None,
            operator: Some(operator.into()),
            string_value: Some(value.clone()),
            number_value: None,
            boolean_value: None,
            value: Some(serde_json::Value::String(value)),
        }
    }

    /// Returns true for an expression without elements.
    pub fn is_empty_expression(&self) -> bool {
        self.filter_type == TagFilterType::Expression
            && self.elements.as_ref().map_or(true, Vec::is_empty)
    }
}

/// Errors raised while converting tag filter expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagFilterError {
    /// The expression string could not be parsed.
    #[error("invalid tag filter expression: {0}")]
    Parse(String),
    /// The API tree cannot be represented as an expression string.
    #[error("unsupported tag filter: {0}")]
    Unsupported(String),
}

/// Converts between the state string of a tag filter and the API tree.
pub trait TagFilterMapper: Send + Sync + fmt::Debug {
    /// Parse an expression string into the API tree.
    fn parse(&self, expression: &str) -> Result<TagFilter, TagFilterError>;

    /// Render the API tree as a normalized expression string.
    ///
    /// Returns `Ok(None)` when the tree carries no condition at all, so that
    /// an unset attribute survives the round trip through the API.
    fn to_normalized_string(&self, filter: &TagFilter) -> Result<Option<String>, TagFilterError>;
}

/// Shared handle to a mapper, as held by resource handles.
pub type SharedTagFilterMapper = Arc<dyn TagFilterMapper>;

/// The mapper used when none is configured.
pub fn default_mapper() -> SharedTagFilterMapper {
    Arc::new(JsonTagFilterMapper)
}

/// Mapper that uses the compact JSON form of [`TagFilter`] as expression string.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTagFilterMapper;

impl JsonTagFilterMapper {
    fn check(filter: &TagFilter, path: &str) -> Result<(), TagFilterError> {
        match filter.filter_type {
            TagFilterType::Expression => {
                if filter.logical_operator.is_none() {
                    return Err(TagFilterError::Unsupported(format!(
                        "{}: expression without logicalOperator",
                        path
                    )));
                }
                for (i, element) in filter.elements.iter().flatten().enumerate() {
                    Self::check(element, &format!("{}.elements.{}", path, i))?;
                }
                Ok(())
            },
            TagFilterType::TagFilter => {
                if filter.name.as_deref().map_or(true, str::is_empty) {
                    return Err(TagFilterError::Unsupported(format!(
                        "{}: tag filter without name",
                        path
                    )));
                }
                match filter.operator.as_deref() {
                    Some(op) if SUPPORTED_TAG_FILTER_OPERATORS.contains(&op) => Ok(()),
                    Some(op) => Err(TagFilterError::Unsupported(format!(
                        "{}: operator {} is not supported",
                        path, op
                    ))),
                    None => Err(TagFilterError::Unsupported(format!(
                        "{}: tag filter without operator",
                        path
                    ))),
                }
            },
        }
    }
}

impl TagFilterMapper for JsonTagFilterMapper {
    fn parse(&self, expression: &str) -> Result<TagFilter, TagFilterError> {
        let filter: TagFilter = serde_json::from_str(expression.trim())
            .map_err(|err| TagFilterError::Parse(err.to_string()))?;
        Self::check(&filter, "$").map_err(|err| TagFilterError::Parse(err.to_string()))?;
        Ok(filter)
    }

    fn to_normalized_string(&self, filter: &TagFilter) -> Result<Option<String>, TagFilterError> {
        if filter.is_empty_expression() {
            return Ok(None);
        }
        Self::check(filter, "$")?;
        serde_json::to_string(filter)
            .map(Some)
            .map_err(|err| TagFilterError::Unsupported(err.to_string()))
    }
}
