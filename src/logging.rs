//! Logging and tracing utilities.
//!
//! All logs are written to **stderr**; stdout belongs to whatever host
//! process drives the provider.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`, `fortios_provider=debug`)
//!
//! ```bash
//! # Show request bodies and table read decisions
//! RUST_LOG=fortios_provider=debug ./terraform-provider-fortios
//! ```

use serde_json::{Map, Value};
use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, registry::LookupSpan, EnvFilter, Layer};

use crate::schema::Block;

const REDACTED: &str = "<sensitive>";

fn stderr_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level, used when `RUST_LOG` is
/// not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

/// Copy of `value` with every sensitive field of `block` masked.
///
/// Works on both state objects (underscored keys) and request bodies
/// (hyphenated keys), so either can be logged.
pub fn redact_sensitive(block: &Block, value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_object(block, map)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| redact_sensitive(block, item))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn redact_object(block: &Block, map: &Map<String, Value>) -> Map<String, Value> {
    if !block.has_sensitive() {
        return map.clone();
    }

    let mut out = map.clone();
    for (name, attr) in &block.attributes {
        if !attr.flags.sensitive {
            continue;
        }
        for key in [name.clone(), attr.api_key(name)] {
            if let Some(slot) = out.get_mut(&key) {
                if !slot.is_null() {
                    *slot = Value::String(REDACTED.to_string());
                }
            }
        }
    }
    for (name, nested) in &block.blocks {
        for key in [name.clone(), nested.api_key(name)] {
            if let Some(slot) = out.get_mut(&key) {
                *slot = redact_sensitive(&nested.block, slot);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};
    use serde_json::json;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("fortios_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,fortios_provider::convert=debug").is_ok());
    }

    #[test]
    fn test_redact_request_and_state_shapes() {
        let block = Block::new()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("client_secret", Attribute::optional_string().sensitive())
            .with_block(
                "isis_interface",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::optional_string())
                        .with_attribute("auth_password_l1", Attribute::optional_string().sensitive()),
                ),
            );

        let request = json!({
            "name": "azure1",
            "client-secret": "s3cret",
            "isis-interface": [{"name": "port1", "auth-password-l1": "pw"}]
        });
        let redacted = redact_sensitive(&block, &request);
        assert_eq!(redacted["name"], "azure1");
        assert_eq!(redacted["client-secret"], REDACTED);
        assert_eq!(redacted["isis-interface"][0]["auth-password-l1"], REDACTED);
        assert_eq!(redacted["isis-interface"][0]["name"], "port1");

        let state = json!({"name": "azure1", "client_secret": "s3cret", "isis_interface": null});
        let redacted = redact_sensitive(&block, &state);
        assert_eq!(redacted["client_secret"], REDACTED);
        assert!(redacted["isis_interface"].is_null());
    }
}
