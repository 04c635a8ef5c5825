//! Schema validation helpers.
//!
//! Validates a `serde_json::Value` (provider config, plan or state) against a
//! [`Schema`], including the attribute [`Validator`]s declared by resource
//! handles such as `OneOf` on permissions or `LengthBetween` on names.
//!
//! # Example
//!
//! ```
//! use terraform_provider_instana::schema::{Attribute, Schema, Validator};
//! use terraform_provider_instana::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "severity",
//!         Attribute::required_string().with_validator(Validator::one_of(["warning", "critical"])),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "x", "severity": "warning"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "x", "severity": "fatal"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("severity".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, Diagnostics, NestedBlock,
    Schema, Validator,
};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Attribute validators run on present values
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Diagnostics> {
    let diagnostics = validate(schema, value);
    if diagnostics.has_error() {
        Err(diagnostics)
    } else {
        Ok(())
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    !validate(schema, value).has_error()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Diagnostics) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diag =
                Diagnostic::error("Expected object").with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Diagnostics,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                for validator in &attr.validators {
                    apply_validator(validator, v, path, diagnostics);
                }
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Diagnostics,
) {
    let (matches, expected) = match attr_type {
        AttributeType::String => (value.is_string(), "string"),
        AttributeType::Int64 => (is_int64(value), "int64"),
        AttributeType::Float64 => (value.is_number(), "float64"),
        AttributeType::Bool => (value.is_boolean(), "bool"),
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            let Some(items) = value.as_array() else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) { "set" } else { "list" };
                diagnostics.push(type_error(path, expected, value));
                return;
            };
            for (i, item) in items.iter().enumerate() {
                validate_attribute_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
            }
            return;
        },
    };
    if !matches {
        diagnostics.push(type_error(path, expected, value));
    }
}

fn apply_validator(validator: &Validator, value: &Value, path: &str, diagnostics: &mut Diagnostics) {
    match validator {
        Validator::OneOf(allowed) => match value {
            Value::String(s) => check_one_of(allowed, s, path, diagnostics),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Some(s) = item.as_str() {
                        check_one_of(allowed, s, &format!("{}.{}", path, i), diagnostics);
                    }
                }
            },
            _ => {},
        },
        Validator::LengthBetween { min, max } => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len < *min || len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!(
                                "Length must be between {} and {}, got {}",
                                min, max, len
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::SizeAtLeast(min) => {
            if let Some(items) = value.as_array() {
                if items.len() < *min {
                    diagnostics.push(
                        Diagnostic::error(format!("Too few elements for attribute '{}'", path))
                            .with_detail(format!(
                                "At least {} element(s) required, got {}",
                                min,
                                items.len()
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::AtLeast(min) => {
            if let Some(n) = value.as_f64() {
                if n < *min {
                    diagnostics.push(
                        Diagnostic::error(format!("Value too small for attribute '{}'", path))
                            .with_detail(format!("Value must be at least {}, got {}", min, n))
                            .with_attribute(path),
                    );
                }
            }
        },
    }
}

fn check_one_of(allowed: &[String], value: &str, path: &str, diagnostics: &mut Diagnostics) {
    if !allowed.iter().any(|a| a == value) {
        diagnostics.push(
            Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                .with_detail(format!(
                    "Value must be one of [{}], got \"{}\"",
                    allowed.join(", "),
                    value
                ))
                .with_attribute(path),
        );
    }
}

/// Single blocks count as zero or one item; list and set blocks as their length.
fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Diagnostics,
) {
    let items: Vec<(String, &Value)> = match (nested.nesting_mode, value) {
        (_, None | Some(Value::Null)) => Vec::new(),
        (BlockNestingMode::Single, Some(v)) => vec![(path.to_string(), v)],
        (_, Some(Value::Array(arr))) => arr
            .iter()
            .enumerate()
            .map(|(i, item)| (format!("{}.{}", path, i), item))
            .collect(),
        (_, Some(v)) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
            return;
        },
    };

    let count = items.len() as u32;
    if count < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, count
            ))
            .with_attribute(path),
        );
    }
    // max_items 0 means unlimited
    if nested.max_items > 0 && count > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, count
            ))
            .with_attribute(path),
        );
    }

    for (item_path, item) in items {
        validate_block(&nested.block, item, &item_path, diagnostics);
    }
}

pub(crate) fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whole numbers only; `42.0` is accepted because state round trips may widen it.
fn is_int64(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };
    n.as_i64().is_some()
        || n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_and_computed() {
        let schema = Schema::v0()
            .with_attribute("expiration_time", Attribute::optional_int64())
            .with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"expiration_time": null})).is_empty());
        // computed-only attributes are never checked
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"expiration_time": "soon"})).len(),
            1
        );
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("start_time", Attribute::required_int64());

        assert!(validate(&schema, &json!({"start_time": 42})).is_empty());
        assert!(validate(&schema, &json!({"start_time": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"start_time": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"start_time": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_string_set_with_one_of() {
        let schema = Schema::v0().with_attribute(
            "permissions",
            Attribute::required_string_set()
                .with_validator(Validator::one_of(["CAN_VIEW_LOGS", "CAN_DELETE_LOGS"])),
        );

        assert!(validate(&schema, &json!({"permissions": ["CAN_VIEW_LOGS"]})).is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"permissions": ["CAN_VIEW_LOGS", "CAN_FLY"]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("permissions.1".to_string()));
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("CAN_FLY")));

        let diagnostics = validate(&schema, &json!({"permissions": ["a", 123]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("permissions.1".to_string()));
    }

    #[test]
    fn test_validate_length_and_size() {
        let schema = Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_validator(Validator::LengthBetween { min: 1, max: 5 }),
            )
            .with_attribute(
                "synthetic_test_ids",
                Attribute::optional_string_set().with_validator(Validator::SizeAtLeast(1)),
            )
            .with_attribute(
                "target",
                Attribute::optional_float64().with_validator(Validator::AtLeast(0.0)),
            );

        assert!(validate(&schema, &json!({"name": "abc"})).is_empty());
        assert_eq!(validate(&schema, &json!({"name": ""})).len(), 1);
        assert_eq!(validate(&schema, &json!({"name": "abcdef"})).len(), 1);
        assert_eq!(
            validate(&schema, &json!({"name": "a", "synthetic_test_ids": []})).len(),
            1
        );
        assert_eq!(
            validate(&schema, &json!({"name": "a", "target": -1.0})).len(),
            1
        );
    }

    #[test]
    fn test_validator_skipped_on_type_error() {
        let schema = Schema::v0().with_attribute(
            "severity",
            Attribute::required_string().with_validator(Validator::one_of(["warning"])),
        );
        let diagnostics = validate(&schema, &json!({"severity": 5}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_nested_block_single() {
        let schema = Schema::v0().with_block(
            "info",
            NestedBlock::single(
                Block::new().with_attribute("description", Attribute::required_string()),
            ),
        );

        assert!(validate(&schema, &json!({"info": {"description": "x"}})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"info": {"description": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("info.description".to_string()));
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "scheduling",
            NestedBlock::list(Block::new().with_attribute("duration", Attribute::required_int64()))
                .with_min_items(1)
                .with_max_items(1),
        );

        assert!(validate(&schema, &json!({"scheduling": [{"duration": 5}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"scheduling": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"scheduling": [{"duration": 5}, {"duration": 6}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }

    #[test]
    fn test_validate_deeply_nested() {
        let schema = Schema::v0().with_block(
            "member",
            NestedBlock::set(
                Block::new()
                    .with_attribute("user_id", Attribute::required_string())
                    .with_block(
                        "roles",
                        NestedBlock::set(
                            Block::new().with_attribute("role_id", Attribute::required_string()),
                        ),
                    ),
            ),
        );

        let diagnostics = validate(
            &schema,
            &json!({"member": [{"user_id": "u1", "roles": [{"role_id": 7}]}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("member.0.roles.0.role_id".to_string())
        );
    }

    #[test]
    fn test_helpers() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));
        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}
