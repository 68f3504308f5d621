//! Schema-driven conversion between FortiOS API objects and state.
//!
//! *Flatten* turns a device response (hyphenated keys, bare mappings for
//! single blocks) into state (underscored keys, lists of mappings). *Expand*
//! is the inverse and builds the request body sent to the device. Both walk
//! the [`Block`](crate::schema::Block) tree, so a resource only declares its
//! fields; no per-field converter code exists.
//!
//! Everything that influences a conversion travels in a [`ConvertContext`]:
//! whether unconfigured tables are read back, how tables are ordered, the
//! prior state used for notation-preserving normalization and the firmware
//! version of the device.

pub mod cidr;
mod expand;
mod flatten;
pub mod sort;

pub use expand::{expand_object, expand_table};
pub use flatten::{flatten_object, flatten_table};

use serde_json::Value;

use crate::firmware::FirmwareVersion;

/// Whether nested tables are always read back from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Read every table, including ones the configuration never mentions.
    AlwaysReadAllTables,
    /// Only read tables the prior state already holds entries for, so tables
    /// managed by other resources are left alone.
    #[default]
    ReadOnlyIfPresent,
}

impl ReadMode {
    /// Map the `get_all_tables` resource option.
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some("true") => Self::AlwaysReadAllTables,
            _ => Self::ReadOnlyIfPresent,
        }
    }
}

/// Ordering applied to tables that declare a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Keep the device's order.
    Disabled,
    /// Plain ordering of the key value.
    #[default]
    Alphabetical,
    /// Digit runs compare numerically.
    Natural,
}

impl SortOrder {
    /// Map the `dynamic_sort_subtable` resource option.
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some("false") => Self::Disabled,
            Some("natural") => Self::Natural,
            _ => Self::Alphabetical,
        }
    }
}

/// Per-call settings for a conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertContext<'a> {
    /// Table read-back policy.
    pub read_mode: ReadMode,
    /// Table ordering.
    pub sort_order: SortOrder,
    /// State recorded before this operation, if any.
    pub prior_state: Option<&'a Value>,
    /// Firmware of the device the request is for.
    pub firmware: Option<FirmwareVersion>,
}

impl<'a> ConvertContext<'a> {
    /// A context with default settings and no prior state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table read-back policy.
    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    /// Set the table ordering.
    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Attach the prior state.
    pub fn with_prior_state(mut self, prior_state: &'a Value) -> Self {
        self.prior_state = Some(prior_state);
        self
    }

    /// Set the device firmware.
    pub fn with_firmware(mut self, firmware: Option<FirmwareVersion>) -> Self {
        self.firmware = firmware;
        self
    }

    /// Whether the device predates `version`. Unknown firmware counts as
    /// current.
    pub(crate) fn firmware_before(&self, version: FirmwareVersion) -> bool {
        self.firmware.map(|fw| fw < version).unwrap_or(false)
    }
}

/// Name of a JSON value's dynamic type, for diagnostics.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether `value` holds something: not null and not an empty list.
pub(crate) fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_mapping() {
        assert_eq!(
            ReadMode::from_option(Some("true")),
            ReadMode::AlwaysReadAllTables
        );
        assert_eq!(
            ReadMode::from_option(Some("false")),
            ReadMode::ReadOnlyIfPresent
        );
        assert_eq!(ReadMode::from_option(None), ReadMode::ReadOnlyIfPresent);

        assert_eq!(SortOrder::from_option(Some("false")), SortOrder::Disabled);
        assert_eq!(SortOrder::from_option(Some("natural")), SortOrder::Natural);
        assert_eq!(
            SortOrder::from_option(Some("alphabetical")),
            SortOrder::Alphabetical
        );
        assert_eq!(SortOrder::from_option(Some("true")), SortOrder::Alphabetical);
        assert_eq!(SortOrder::from_option(None), SortOrder::Alphabetical);
    }

    #[test]
    fn test_firmware_before() {
        let ctx = ConvertContext::new().with_firmware(Some(FirmwareVersion::new(6, 2, 0)));
        assert!(ctx.firmware_before(FirmwareVersion::new(6, 2, 4)));
        assert!(!ctx.firmware_before(FirmwareVersion::new(6, 0, 0)));
        assert!(!ConvertContext::new().firmware_before(FirmwareVersion::new(6, 2, 4)));
    }

    #[test]
    fn test_is_set() {
        assert!(!is_set(None));
        assert!(!is_set(Some(&json!(null))));
        assert!(!is_set(Some(&json!([]))));
        assert!(is_set(Some(&json!([{"id": 1}]))));
        assert!(is_set(Some(&json!(""))));
    }
}
