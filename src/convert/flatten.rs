//! Device response → state.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::sort::sort_table;
use super::{cidr, is_set, value_type_name, ConvertContext, ReadMode};
use crate::error::ConversionError;
use crate::path::AttrPath;
use crate::schema::{self, Attribute, AttributeType, Block, NestedBlock, NestingMode, Normalization};

/// Flatten one API object into its state mapping.
///
/// Fields missing from the response are left out of the result. Tables of
/// an unexpected shape are logged and treated as absent; a field value that
/// cannot be stored is only fatal when the device sent something other than
/// a string, number or list for it.
pub fn flatten_object(
    block: &Block,
    response: &Map<String, Value>,
    ctx: &ConvertContext<'_>,
    path: &AttrPath,
) -> Result<Map<String, Value>, ConversionError> {
    let mut state = Map::new();

    for (name, attr) in &block.attributes {
        let attr_path = path.field(name);

        // Secrets come back encrypted; state keeps what the user configured.
        if attr.flags.sensitive {
            if let Some(prior) = ctx.prior_state.and_then(|p| attr_path.lookup(p)) {
                state.insert(name.clone(), prior.clone());
            }
            continue;
        }

        let Some(raw) = response.get(&attr.api_key(name)) else {
            continue;
        };
        let value = flatten_attribute(attr, raw, ctx, &attr_path);
        if value.is_null() {
            continue;
        }

        if conforms(&attr.attr_type, &value) {
            state.insert(name.clone(), value);
        } else if tolerates_mismatch(raw) {
            warn!(
                path = %attr_path,
                found = value_type_name(raw),
                "Skipping field with an encoding this firmware does not share"
            );
        } else {
            return Err(ConversionError::StateSet {
                path: attr_path.to_string(),
                detail: format!(
                    "expected {}, got {}",
                    type_label(&attr.attr_type),
                    value_type_name(raw)
                ),
            });
        }
    }

    for (name, nested) in &block.blocks {
        let table_path = path.field(name);

        if path.is_root()
            && nested.nesting_mode != NestingMode::Single
            && ctx.read_mode == ReadMode::ReadOnlyIfPresent
            && !is_set(ctx.prior_state.and_then(|p| table_path.lookup(p)))
        {
            continue;
        }

        let raw = response
            .get(&nested.api_key(name))
            .unwrap_or(&Value::Null);
        match flatten_table(nested, raw, ctx, &table_path) {
            Ok(Some(entries)) => {
                state.insert(name.clone(), Value::Array(entries));
            }
            Ok(None) => {}
            Err(err @ ConversionError::UnexpectedType { .. }) => {
                debug!(path = %table_path, error = %err, "Treating malformed table as absent");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(state)
}

/// Flatten a repeated sub-object into a list of state mappings.
///
/// Returns `Ok(None)` for `null`, an empty list, or a list whose first
/// element is `null`. Entries keep the device's order unless the block
/// declares a sort key.
pub fn flatten_table(
    nested: &NestedBlock,
    raw: &Value,
    ctx: &ConvertContext<'_>,
    path: &AttrPath,
) -> Result<Option<Vec<Value>>, ConversionError> {
    let mut entries = match raw {
        Value::Null => return Ok(None),
        Value::Array(items) => {
            if matches!(items.first(), None | Some(Value::Null)) {
                return Ok(None);
            }
            let mut matcher = PriorMatcher::new(nested, ctx, path);
            let mut entries = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let Value::Object(map) = item else {
                    return Err(ConversionError::UnexpectedType {
                        path: path.index(i).to_string(),
                        expected: "object",
                        found: value_type_name(item),
                    });
                };
                let entry_path = path.index(matcher.position(map, i));
                entries.push(Value::Object(flatten_object(
                    &nested.block,
                    map,
                    ctx,
                    &entry_path,
                )?));
            }
            entries
        }
        Value::Object(map) if nested.nesting_mode == NestingMode::Single => {
            if map.is_empty() {
                return Ok(None);
            }
            let entry = flatten_object(&nested.block, map, ctx, &path.index(0))?;
            vec![Value::Object(entry)]
        }
        Value::String(s) if nested.legacy_encoding.is_some() => {
            let field = nested
                .legacy_encoding
                .as_ref()
                .map(|legacy| legacy.field.as_str())
                .unwrap_or("name");
            let entries = split_legacy(s, field);
            if entries.is_empty() {
                return Ok(None);
            }
            entries
        }
        other => {
            return Err(ConversionError::UnexpectedType {
                path: path.to_string(),
                expected: "list",
                found: value_type_name(other),
            })
        }
    };

    if let Some(key) = &nested.sort_key {
        sort_table(&mut entries, key, ctx.sort_order);
    }

    Ok(Some(entries))
}

/// Finds the prior state entry a device entry corresponds to.
///
/// Sorted tables are stored in key order, not device order, so values kept
/// from prior state (secrets, address notation) are matched by the sort key.
/// Unsorted tables match by position.
struct PriorMatcher<'a> {
    api_key: Option<String>,
    sort_key: Option<&'a str>,
    prior: &'a [Value],
    claimed: Vec<bool>,
}

impl<'a> PriorMatcher<'a> {
    fn new(nested: &'a NestedBlock, ctx: &ConvertContext<'a>, path: &AttrPath) -> Self {
        let sort_key = nested.sort_key.as_deref();
        let prior = match sort_key {
            Some(_) => ctx
                .prior_state
                .and_then(|p| path.lookup(p))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            None => &[],
        };
        let api_key = sort_key.map(|key| {
            nested
                .block
                .attributes
                .get(key)
                .map(|attr| attr.api_key(key))
                .unwrap_or_else(|| schema::api_key(key, None))
        });
        Self {
            api_key,
            sort_key,
            prior,
            claimed: vec![false; prior.len()],
        }
    }

    /// Index of the prior entry for the device entry at `index`. Entries
    /// without a counterpart get a position past the end of the prior table.
    fn position(&mut self, entry: &Map<String, Value>, index: usize) -> usize {
        let (Some(api_key), Some(sort_key)) = (&self.api_key, self.sort_key) else {
            return index;
        };
        let Some(wanted) = entry.get(api_key).and_then(key_text) else {
            return self.prior.len() + index;
        };
        let found = self.prior.iter().enumerate().position(|(j, prior)| {
            !self.claimed[j]
                && prior.get(sort_key).and_then(key_text).as_deref() == Some(wanted.as_str())
        });
        match found {
            Some(j) => {
                self.claimed[j] = true;
                j
            }
            None => self.prior.len() + index,
        }
    }
}

fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flatten_attribute(
    attr: &Attribute,
    raw: &Value,
    ctx: &ConvertContext<'_>,
    path: &AttrPath,
) -> Value {
    match attr.normalization {
        Normalization::Ipv4Mask => {
            let prior = ctx
                .prior_state
                .and_then(|p| path.lookup(p))
                .and_then(Value::as_str);
            match (prior, raw) {
                (Some(prior), Value::String(incoming)) => {
                    Value::String(cidr::normalize_like(prior, incoming))
                }
                _ => raw.clone(),
            }
        }
        Normalization::None => match attr.attr_type {
            AttributeType::Int64 => coerce_int(raw),
            _ => raw.clone(),
        },
    }
}

/// Integers sometimes arrive as floats or numeric strings.
fn coerce_int(raw: &Value) -> Value {
    match raw {
        Value::Number(n) if n.is_i64() || n.is_u64() => raw.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => Value::from(f as i64),
            _ => raw.clone(),
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::from(i),
            Err(_) => raw.clone(),
        },
        _ => raw.clone(),
    }
}

fn split_legacy(s: &str, field: &str) -> Vec<Value> {
    s.split_whitespace()
        .map(|token| token.trim_matches('"'))
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut entry = Map::new();
            entry.insert(field.to_string(), Value::String(token.to_string()));
            Value::Object(entry)
        })
        .collect()
}

fn conforms(attr_type: &AttributeType, value: &Value) -> bool {
    match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => value.is_i64() || value.is_u64(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::List(inner) | AttributeType::Set(inner) => value
            .as_array()
            .map(|items| items.iter().all(|item| conforms(inner, item)))
            .unwrap_or(false),
    }
}

/// Scalars and lists the device encodes differently across firmware are
/// skipped instead of failing the read.
fn tolerates_mismatch(raw: &Value) -> bool {
    matches!(raw, Value::String(_) | Value::Number(_) | Value::Array(_))
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
