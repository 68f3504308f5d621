//! Provider-level configuration.
//!
//! Values come from the provider block first. Anything left unset there is
//! looked up in the environment, the same variables the FortiOS tooling
//! reads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable for [`ProviderConfig::hostname`].
pub const ENV_HOSTNAME: &str = "FORTIOS_ACCESS_HOSTNAME";
/// Environment variable for [`ProviderConfig::token`].
pub const ENV_TOKEN: &str = "FORTIOS_ACCESS_TOKEN";
/// Environment variable for [`ProviderConfig::insecure`].
pub const ENV_INSECURE: &str = "FORTIOS_INSECURE";
/// Environment variable for [`ProviderConfig::cabundlefile`].
pub const ENV_CA_BUNDLE: &str = "FORTIOS_CA_CABUNDLE";
/// Environment variable for [`ProviderConfig::import_table`].
pub const ENV_IMPORT_TABLE: &str = "FORTIOS_IMPORT_TABLE";
/// Environment variable for [`ProviderConfig::http_proxy`].
pub const ENV_HTTPS_PROXY: &str = "HTTPS_PROXY";

/// Settings from the provider block.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Management address of the FortiGate.
    pub hostname: Option<String>,
    /// REST API administrator token.
    pub token: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: Option<bool>,
    /// Path to a CA bundle used to verify the device certificate.
    pub cabundlefile: Option<String>,
    /// Inline CA bundle, as an alternative to `cabundlefile`.
    pub cabundlecontent: Option<String>,
    /// Default virtual domain for every request.
    pub vdom: Option<String>,
    /// Proxy for reaching the device.
    pub http_proxy: Option<String>,
    /// Read back every nested table on import.
    pub import_table: Option<bool>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("hostname", &self.hostname)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("insecure", &self.insecure)
            .field("cabundlefile", &self.cabundlefile)
            .field(
                "cabundlecontent",
                &self.cabundlecontent.as_ref().map(|_| "<redacted>"),
            )
            .field("vdom", &self.vdom)
            .field("http_proxy", &self.http_proxy)
            .field("import_table", &self.import_table)
            .finish()
    }
}

impl ProviderConfig {
    /// Decode the provider block, falling back to the process environment.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Decode the provider block, falling back to `env` for unset fields.
    pub fn from_value_with_env<E>(value: &Value, env: E) -> Result<Self, ProviderError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut config: Self = match value {
            Value::Null => Self::default(),
            other => serde_json::from_value(other.clone())?,
        };

        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if config.hostname.is_none() {
            config.hostname = lookup(ENV_HOSTNAME);
        }
        if config.token.is_none() {
            config.token = lookup(ENV_TOKEN);
        }
        if config.cabundlefile.is_none() {
            config.cabundlefile = lookup(ENV_CA_BUNDLE);
        }
        if config.http_proxy.is_none() {
            config.http_proxy = lookup(ENV_HTTPS_PROXY).or_else(|| lookup("https_proxy"));
        }
        if config.insecure.is_none() {
            if let Some(raw) = lookup(ENV_INSECURE) {
                config.insecure = Some(parse_flag(ENV_INSECURE, &raw)?);
            }
        }
        if config.import_table.is_none() {
            if let Some(raw) = lookup(ENV_IMPORT_TABLE) {
                config.import_table = Some(parse_flag(ENV_IMPORT_TABLE, &raw)?);
            }
        }

        Ok(config)
    }

    /// Check the settings a client needs before connecting.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if self.hostname.as_deref().map_or(true, str::is_empty) {
            diagnostics.push(
                Diagnostic::error("Missing FortiOS hostname")
                    .with_detail(format!("Set `hostname` or {}", ENV_HOSTNAME))
                    .with_attribute("hostname"),
            );
        }
        if self.token.as_deref().map_or(true, str::is_empty) {
            diagnostics.push(
                Diagnostic::error("Missing FortiOS API token")
                    .with_detail(format!("Set `token` or {}", ENV_TOKEN))
                    .with_attribute("token"),
            );
        }
        if self.cabundlefile.is_some() && self.cabundlecontent.is_some() {
            diagnostics.push(
                Diagnostic::error("Conflicting CA bundle settings")
                    .with_detail("Only one of `cabundlefile` and `cabundlecontent` may be set")
                    .with_attribute("cabundlecontent"),
            );
        }
        if self.insecure() {
            diagnostics.push(
                Diagnostic::warning("TLS certificate verification is disabled")
                    .with_attribute("insecure"),
            );
        }

        diagnostics
    }

    /// Whether certificate verification is skipped.
    pub fn insecure(&self) -> bool {
        self.insecure.unwrap_or(false)
    }

    /// Whether imports read back every nested table.
    pub fn import_table(&self) -> bool {
        self.import_table.unwrap_or(false)
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "hostname",
                Attribute::optional_string().with_description("FortiGate management address"),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("REST API administrator token"),
            )
            .with_attribute(
                "insecure",
                Attribute::optional_bool().with_description("Skip TLS certificate verification"),
            )
            .with_attribute("cabundlefile", Attribute::optional_string())
            .with_attribute("cabundlecontent", Attribute::optional_string().sensitive())
            .with_attribute(
                "vdom",
                Attribute::optional_string().with_description("Default virtual domain"),
            )
            .with_attribute("http_proxy", Attribute::optional_string())
            .with_attribute(
                "import_table",
                Attribute::optional_bool()
                    .with_description("Read back every nested table when importing"),
            )
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ProviderError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ProviderError::Configuration(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}
