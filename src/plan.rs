//! Change planning.
//!
//! The planned state is the proposed configuration with schema defaults
//! filled in and device-computed values carried over from the prior state.
//! Differences against the prior state are reported per attribute path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::AttrPath;
use crate::schema::{Block, Schema};

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Dotted path of the attribute, e.g. `isis_interface.0.metric_l1`.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if deleting).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// Plan the transition from `prior` to `proposed`.
///
/// A `null` proposal plans a deletion.
pub fn plan_change(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.and_then(Value::as_object);

    let Some(proposed) = proposed.as_object() else {
        let changes = prior
            .map(|p| {
                p.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    };

    let mut planned = proposed.clone();
    apply_defaults(&schema.block, &mut planned);

    let Some(prior) = prior else {
        let changes = planned
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| AttributeChange::added(k.clone(), v.clone()))
            .collect();
        return PlanResult::with_changes(Value::Object(planned), changes, false);
    };

    // the device owns computed values the configuration leaves open
    for (name, attr) in &schema.block.attributes {
        if !attr.flags.computed || is_present(planned.get(name)) {
            continue;
        }
        if let Some(previous) = prior.get(name).filter(|v| !v.is_null()) {
            planned.insert(name.clone(), previous.clone());
        }
    }

    let mut changes = Vec::new();
    let mut keys: Vec<&String> = prior.keys().chain(planned.keys()).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        diff_values(
            &AttrPath::root().field(key.as_str()),
            prior.get(key),
            planned.get(key),
            &mut changes,
        );
    }

    let requires_replace = changes.iter().any(|change| {
        top_level(&change.path)
            .and_then(|name| schema.block.attributes.get(name))
            .map(|attr| attr.force_new)
            .unwrap_or(false)
    });

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn apply_defaults(block: &Block, object: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            if !is_present(object.get(name)) {
                object.insert(name.clone(), default.clone());
            }
        }
    }
    for (name, nested) in &block.blocks {
        match object.get_mut(name) {
            Some(Value::Array(entries)) => {
                for entry in entries.iter_mut() {
                    if let Value::Object(map) = entry {
                        apply_defaults(&nested.block, map);
                    }
                }
            }
            Some(Value::Object(map)) => apply_defaults(&nested.block, map),
            _ => {}
        }
    }
}

fn diff_values(
    path: &AttrPath,
    before: Option<&Value>,
    after: Option<&Value>,
    changes: &mut Vec<AttributeChange>,
) {
    let before = before.filter(|v| !v.is_null());
    let after = after.filter(|v| !v.is_null());

    match (before, after) {
        (None, None) => {}
        (None, Some(a)) => changes.push(AttributeChange::added(path.to_string(), a.clone())),
        (Some(b), None) => changes.push(AttributeChange::removed(path.to_string(), b.clone())),
        (Some(b), Some(a)) if b == a => {}
        (Some(Value::Object(b)), Some(Value::Object(a))) => {
            let mut keys: Vec<&String> = b.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                diff_values(&path.field(key.as_str()), b.get(key), a.get(key), changes);
            }
        }
        (Some(Value::Array(b)), Some(Value::Array(a))) if b.len() == a.len() => {
            for (i, (x, y)) in b.iter().zip(a.iter()).enumerate() {
                diff_values(&path.index(i), Some(x), Some(y), changes);
            }
        }
        (Some(b), Some(a)) => changes.push(AttributeChange::modified(
            path.to_string(),
            b.clone(),
            a.clone(),
        )),
    }
}

fn top_level(path: &str) -> Option<&str> {
    path.split('.').next()
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}
