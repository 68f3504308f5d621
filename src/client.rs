//! The FortiOS REST client seam.
//!
//! The provider never speaks HTTP itself. It hands request bodies to a
//! [`FortiosClient`] and gets decoded JSON objects back. Transport, retries,
//! authentication and vdom scoping are the client's business; the provider
//! only sets the retry count once at configure time.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::ProviderConfig;
use crate::error::ClientError;
use crate::firmware::FirmwareVersion;

/// Operations the provider needs from a FortiOS management API client.
///
/// `path` is the CMDB path of the object type, e.g. `router/static`.
/// `mkey` is the object's primary key, `None` for singleton objects such as
/// `router/isis`. `vdom` overrides the client's default virtual domain.
#[async_trait]
pub trait FortiosClient: Send + Sync + 'static {
    /// Set how often a failed request is retried.
    fn set_retries(&mut self, retries: u32);

    /// Firmware version reported by the device, if known.
    fn firmware_version(&self) -> Option<FirmwareVersion>;

    /// Create an object. Returns the device's result document, which carries
    /// the assigned `mkey` for table objects.
    async fn create(
        &self,
        path: &str,
        object: &Map<String, Value>,
        vdom: Option<&str>,
    ) -> Result<Map<String, Value>, ClientError>;

    /// Read an object. `Ok(None)` means the device does not have it.
    async fn read(
        &self,
        path: &str,
        mkey: Option<&str>,
        vdom: Option<&str>,
    ) -> Result<Option<Map<String, Value>>, ClientError>;

    /// Update an object in place.
    async fn update(
        &self,
        path: &str,
        mkey: Option<&str>,
        object: &Map<String, Value>,
        vdom: Option<&str>,
    ) -> Result<Map<String, Value>, ClientError>;

    /// Delete an object.
    async fn delete(
        &self,
        path: &str,
        mkey: Option<&str>,
        vdom: Option<&str>,
    ) -> Result<(), ClientError>;
}

/// Builds a client from the provider configuration.
pub trait ClientFactory: Send + Sync + 'static {
    /// The client this factory produces.
    type Client: FortiosClient;

    /// Connect to the device described by `config`.
    fn build(&self, config: &ProviderConfig) -> Result<Self::Client, ClientError>;
}

impl<F, C> ClientFactory for F
where
    F: Fn(&ProviderConfig) -> Result<C, ClientError> + Send + Sync + 'static,
    C: FortiosClient,
{
    type Client = C;

    fn build(&self, config: &ProviderConfig) -> Result<C, ClientError> {
        self(config)
    }
}

/// The primary key a create call reported, as a string.
pub fn response_mkey(response: &Map<String, Value>) -> Option<String> {
    match response.get("mkey")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_response_mkey() {
        assert_eq!(response_mkey(&as_map(json!({"mkey": 7}))), Some("7".to_string()));
        assert_eq!(
            response_mkey(&as_map(json!({"mkey": "aws1"}))),
            Some("aws1".to_string())
        );
        assert_eq!(response_mkey(&as_map(json!({"mkey": ""}))), None);
        assert_eq!(response_mkey(&as_map(json!({"status": "success"}))), None);
    }
}
