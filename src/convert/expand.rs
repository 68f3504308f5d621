//! Configuration → device request.

use serde_json::{Map, Value};

use super::{is_set, value_type_name, ConvertContext};
use crate::error::ConversionError;
use crate::path::AttrPath;
use crate::schema::{self, Block, NestedBlock, NestingMode};

/// Build the request body for one object from its configuration.
///
/// A field is sent when its key is present and not `null`. A top-level table
/// the configuration leaves out is sent as `[]` only when the prior state
/// held entries for it, which clears it on the device; otherwise it is left
/// out of the request and the device keeps whatever it has.
pub fn expand_object(
    block: &Block,
    config: &Map<String, Value>,
    ctx: &ConvertContext<'_>,
) -> Result<Map<String, Value>, ConversionError> {
    expand_fields(block, config, ctx, &AttrPath::root())
}

/// Expand a repeated sub-object into its request shape.
///
/// `null` becomes an empty list. `Single` blocks become a bare mapping.
/// Tables with a legacy encoding are joined into a space-separated string
/// when the device firmware predates the table form.
pub fn expand_table(
    nested: &NestedBlock,
    value: &Value,
    ctx: &ConvertContext<'_>,
    path: &AttrPath,
) -> Result<Value, ConversionError> {
    let entries = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| expand_entry(&nested.block, item, ctx, &path.index(i)))
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(_) if nested.nesting_mode == NestingMode::Single => {
            vec![expand_entry(&nested.block, value, ctx, &path.index(0))?]
        }
        other => {
            return Err(ConversionError::UnexpectedType {
                path: path.to_string(),
                expected: "list",
                found: value_type_name(other),
            })
        }
    };

    if nested.nesting_mode == NestingMode::Single {
        let entry = entries.into_iter().next().unwrap_or_default();
        return Ok(Value::Object(entry));
    }

    if let Some(legacy) = &nested.legacy_encoding {
        if ctx.firmware_before(legacy.before) {
            let key = nested
                .block
                .attributes
                .get(&legacy.field)
                .map(|attr| attr.api_key(&legacy.field))
                .unwrap_or_else(|| schema::api_key(&legacy.field, None));
            let tokens: Vec<String> = entries
                .iter()
                .filter_map(|entry| entry.get(&key))
                .map(|token| match token {
                    Value::String(s) => format!("\"{}\"", s),
                    other => other.to_string(),
                })
                .collect();
            return Ok(Value::String(tokens.join(" ")));
        }
    }

    Ok(Value::Array(entries.into_iter().map(Value::Object).collect()))
}

fn expand_entry(
    block: &Block,
    item: &Value,
    ctx: &ConvertContext<'_>,
    path: &AttrPath,
) -> Result<Map<String, Value>, ConversionError> {
    match item {
        Value::Object(map) => expand_fields(block, map, ctx, path),
        other => Err(ConversionError::UnexpectedType {
            path: path.to_string(),
            expected: "object",
            found: value_type_name(other),
        }),
    }
}

fn expand_fields(
    block: &Block,
    config: &Map<String, Value>,
    ctx: &ConvertContext<'_>,
    path: &AttrPath,
) -> Result<Map<String, Value>, ConversionError> {
    let mut request = Map::new();

    for (name, attr) in &block.attributes {
        if attr.flags.is_computed_only() {
            continue;
        }
        match config.get(name) {
            None | Some(Value::Null) => {}
            Some(value) => {
                request.insert(attr.api_key(name), value.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        let table_path = path.field(name);
        let configured = config.get(name).filter(|value| is_set(Some(value)));

        let Some(value) = configured else {
            if path.is_root()
                && nested.nesting_mode != NestingMode::Single
                && is_set(ctx.prior_state.and_then(|p| table_path.lookup(p)))
            {
                request.insert(
                    nested.api_key(name),
                    expand_table(nested, &Value::Null, ctx, &table_path)?,
                );
            }
            continue;
        };

        let expanded = expand_table(nested, value, ctx, &table_path)?;
        if matches!(&expanded, Value::Object(map) if map.is_empty()) {
            continue;
        }
        request.insert(nested.api_key(name), expanded);
    }

    Ok(request)
}
