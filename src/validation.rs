//! Schema validation helpers.
//!
//! Configuration is checked against a [`Schema`] before anything is sent to
//! the device: presence of required fields, value types, the bounds FortiOS
//! enforces (string length, integer range, option lists), set uniqueness and
//! nested block cardinality.
//!
//! # Example
//!
//! ```
//! use fortios_provider::schema::{Schema, Attribute};
//! use fortios_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string().with_length(0, 35))
//!     .with_attribute("distance", Attribute::optional_int64().with_range(1, 255));
//!
//! assert!(validate(&schema, &json!({"name": "aws1", "distance": 10})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "aws1", "distance": 300}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("distance".to_string()));
//! ```

use serde_json::{Map, Value};

use crate::path::AttrPath;
use crate::schema::{
    Attribute, AttributeType, Block, Constraint, Diagnostic, NestedBlock, NestingMode, Schema,
};

/// Validate a configuration value against a schema.
///
/// Returns a list of diagnostics; an empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the device sets these)
/// - Attribute types and constraints must match the schema
/// - Set elements must be unique
/// - Nested blocks are validated recursively with min/max item constraints
/// - Keys the schema does not declare are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, &AttrPath::root(), &mut diagnostics);
    diagnostics
}

/// Validate a configuration value, returning Ok if valid or Err with the
/// diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a configuration value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &AttrPath, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diagnostic =
                Diagnostic::error("Expected object").with_detail(format!("Got {}", type_name(value)));
            if !path.is_root() {
                diagnostic = diagnostic.with_attribute(path.to_string());
            }
            diagnostics.push(diagnostic);
            return;
        }
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &path.field(name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &path.field(name), diagnostics);
    }

    reject_unknown(block, obj, path, diagnostics);
}

fn reject_unknown(
    block: &Block,
    obj: &Map<String, Value>,
    path: &AttrPath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for key in obj.keys() {
        if !block.attributes.contains_key(key) && !block.blocks.contains_key(key) {
            let key_path = path.field(key);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", key_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(key_path.to_string()),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &AttrPath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path.to_string()),
                );
            }
        }
        Some(v) => {
            if validate_attribute_type(&attr.attr_type, v, path, diagnostics) {
                if let Some(constraint) = &attr.constraint {
                    validate_constraint(constraint, v, path, diagnostics);
                }
            }
        }
    }
}

/// Returns whether the value had the declared type.
fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &AttrPath,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let ok = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            match value.as_array() {
                Some(items) => {
                    let mut all_ok = true;
                    for (i, item) in items.iter().enumerate() {
                        all_ok &=
                            validate_attribute_type(element_type, item, &path.index(i), diagnostics);
                    }
                    if matches!(attr_type, AttributeType::Set(_)) {
                        check_unique(items, path, diagnostics);
                    }
                    return all_ok;
                }
                None => false,
            }
        }
    };

    if !ok {
        diagnostics.push(type_error(path, type_label(attr_type), value));
    }
    ok
}

fn validate_constraint(
    constraint: &Constraint,
    value: &Value,
    path: &AttrPath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        Constraint::Length { min, max } => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len < *min || len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected between {} and {} characters, got {}",
                                min, max, len
                            ))
                            .with_attribute(path.to_string()),
                    );
                }
            }
        }
        Constraint::Range { min, max } => {
            if let Some(n) = as_int64(value) {
                if n < *min || n > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Value out of range for attribute '{}'", path))
                            .with_detail(format!("Expected {} to {}, got {}", min, max, n))
                            .with_attribute(path.to_string()),
                    );
                }
            }
        }
        Constraint::OneOf { values } => {
            if let Some(s) = value.as_str() {
                if !values.iter().any(|v| v == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid option for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected one of [{}], got '{}'",
                                values.join(", "),
                                s
                            ))
                            .with_attribute(path.to_string()),
                    );
                }
            }
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &AttrPath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path.to_string()),
                );
            }
        }
        // a single block may also be written as the bare object
        Some(v @ Value::Object(_)) if nested.nesting_mode == NestingMode::Single => {
            validate_block(&nested.block, v, &path.index(0), diagnostics);
        }
        Some(Value::Array(items)) => {
            let len = items.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path.to_string()),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path.to_string()),
                );
            }

            if nested.nesting_mode == NestingMode::Set {
                check_unique(items, path, diagnostics);
            }

            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &path.index(i), diagnostics);
            }
        }
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", type_name(v)))
                    .with_attribute(path.to_string()),
            );
        }
    }
}

fn check_unique(items: &[Value], path: &AttrPath, diagnostics: &mut Vec<Diagnostic>) {
    for (i, item) in items.iter().enumerate() {
        if items[..i].contains(item) {
            diagnostics.push(
                Diagnostic::error(format!("Duplicate set element in '{}'", path))
                    .with_detail(format!("Element {} repeats an earlier element", i))
                    .with_attribute(path.index(i).to_string()),
            );
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    crate::convert::value_type_name(value)
}

fn type_label(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
        AttributeType::Set(_) => "set",
    }
}

fn as_int64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

fn is_int64(value: &Value) -> bool {
    as_int64(value).is_some()
}

fn type_error(path: &AttrPath, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, type_name(got)))
        .with_attribute(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "aws1"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("uuid", Attribute::computed_string());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"uuid": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("policyid", Attribute::required_int64());

        assert!(validate(&schema, &json!({"policyid": 42})).is_empty());
        assert!(validate(&schema, &json!({"policyid": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"policyid": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"policyid": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_constraints() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::optional_string().with_length(0, 35))
            .with_attribute("distance", Attribute::optional_int64().with_range(1, 255))
            .with_attribute("status", Attribute::toggle());

        assert!(validate(
            &schema,
            &json!({"name": "lan", "distance": 255, "status": "enable"})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({
                "name": "x".repeat(36),
                "distance": 0,
                "status": "on"
            }),
        );
        assert_eq!(diagnostics.len(), 3);
        let attrs: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(attrs.contains(&"name".to_string()));
        assert!(attrs.contains(&"distance".to_string()));
        assert!(attrs.contains(&"status".to_string()));
    }

    #[test]
    fn test_type_error_suppresses_constraint_check() {
        let schema =
            Schema::v0().with_attribute("distance", Attribute::optional_int64().with_range(1, 255));
        let diagnostics = validate(&schema, &json!({"distance": "far"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_list_and_set_types() {
        let schema = Schema::v0()
            .with_attribute("tags", Attribute::new(
                AttributeType::list(AttributeType::String),
                crate::schema::AttributeFlags::optional(),
            ))
            .with_attribute("ports", Attribute::new(
                AttributeType::set(AttributeType::Int64),
                crate::schema::AttributeFlags::optional(),
            ));

        assert!(validate(&schema, &json!({"tags": ["a", "b"], "ports": [1, 2]})).is_empty());

        let diagnostics = validate(&schema, &json!({"tags": ["a", 1]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("tags.1".to_string()));

        let diagnostics = validate(&schema, &json!({"ports": [1, 2, 1]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Duplicate"));
        assert_eq!(diagnostics[0].attribute, Some("ports.2".to_string()));
    }

    #[test]
    fn test_validate_max_items() {
        let schema = Schema::v0().with_block(
            "dstaddr",
            NestedBlock::list(Block::new().with_attribute("name", Attribute::required_string()))
                .with_max_items(2),
        );

        assert!(validate(&schema, &json!({"dstaddr": [{"name": "a"}, {"name": "b"}]})).is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"dstaddr": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 2 item(s), got 3"));
        assert_eq!(diagnostics[0].attribute, Some("dstaddr".to_string()));
    }

    #[test]
    fn test_validate_nested_blocks() {
        let schema = Schema::v0()
            .with_block(
                "srcintf",
                NestedBlock::set(Block::new().with_attribute("name", Attribute::required_string()))
                    .with_min_items(1),
            )
            .with_block(
                "voice",
                NestedBlock::single(Block::new().with_attribute("status", Attribute::toggle())),
            );

        assert!(validate(&schema, &json!({"srcintf": [{"name": "port1"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"srcintf": [{"name": "port1"}, {"name": "port1"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Duplicate"));

        let diagnostics = validate(
            &schema,
            &json!({
                "srcintf": [{"name": "port1"}],
                "voice": [{"status": "enable"}, {"status": "disable"}]
            }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));

        let diagnostics = validate(
            &schema,
            &json!({"srcintf": [{"name": "port1"}], "voice": {"status": "loud"}}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("voice.0.status".to_string()));

        let diagnostics = validate(&schema, &json!({"srcintf": [{}]}));
        assert_eq!(diagnostics[0].attribute, Some("srcintf.0.name".to_string()));
    }

    #[test]
    fn test_unsupported_arguments() {
        let schema = Schema::v0().with_block(
            "nic",
            NestedBlock::list(Block::new().with_attribute("name", Attribute::optional_string())),
        );
        let diagnostics = validate(&schema, &json!({"nics": [], "nic": [{"nme": "nic0"}]}));
        let attrs: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(diagnostics.len(), 2);
        assert!(attrs.contains(&"nics".to_string()));
        assert!(attrs.contains(&"nic.0.nme".to_string()));
    }

    #[test]
    fn test_validate_result_and_is_valid() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate_result(&schema, &json!({"name": "x"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
        assert!(is_valid(&schema, &json!({"name": "x"})));
        assert!(!is_valid(&schema, &json!({"name": 1})));
    }

    #[test]
    fn test_non_object_root() {
        let schema = Schema::v0().with_attribute("name", Attribute::optional_string());
        let diagnostics = validate(&schema, &json!("string"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].attribute.is_none());
    }
}
