//! Testing utilities for the provider.
//!
//! [`MemoryClient`] stands in for a FortiGate: it stores objects per CMDB
//! path, assigns primary keys, records every request and can rewrite
//! responses the way the device normalizes values. [`ProviderTester`] drives
//! a [`ProviderService`] through whole lifecycles.
//!
//! # Example
//!
//! ```ignore
//! use fortios_provider::testing::{MemoryClient, ProviderTester};
//! use fortios_provider::FortiosProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_static_route() {
//!     let device = MemoryClient::new().with_mkey_field("router/static", "seq-num");
//!     let factory = {
//!         let device = device.clone();
//!         move |_: &_| Ok(device.clone())
//!     };
//!     let tester = ProviderTester::new(FortiosProvider::new(factory));
//!     tester
//!         .configure(json!({"hostname": "192.0.2.1", "token": "t"}))
//!         .await
//!         .unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("fortios_router_static", json!({"dst": "10.0.0.0/24"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["dst"], "10.0.0.0/24");
//! }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::FortiosClient;
use crate::error::{ClientError, ProviderError};
use crate::firmware::FirmwareVersion;
use crate::plan::PlanResult;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::{has_errors, ImportedResource, ProviderService};

type ResponseHook = Arc<dyn Fn(&str, &mut Map<String, Value>) + Send + Sync>;

/// One call made against a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// `POST`, `GET`, `PUT` or `DELETE`.
    pub method: &'static str,
    /// CMDB path.
    pub path: String,
    /// Primary key, `None` for singletons and creates.
    pub mkey: Option<String>,
    /// Virtual domain override.
    pub vdom: Option<String>,
    /// Request body for writes.
    pub body: Option<Value>,
}

#[derive(Default)]
struct DeviceState {
    objects: BTreeMap<(String, String), Map<String, Value>>,
    mkey_fields: BTreeMap<String, String>,
    next_mkey: BTreeMap<String, u64>,
    requests: Vec<RecordedRequest>,
    failures: VecDeque<ClientError>,
    retries: Option<u32>,
    omit_response_mkey: bool,
    hook: Option<ResponseHook>,
}

/// An in-memory FortiGate.
///
/// Clones share the same device, so a test can keep one handle while the
/// provider owns another.
#[derive(Clone, Default)]
pub struct MemoryClient {
    state: Arc<Mutex<DeviceState>>,
    firmware: Option<FirmwareVersion>,
}

impl fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryClient")
            .field("firmware", &self.firmware)
            .field("objects", &state.objects.len())
            .field("requests", &state.requests.len())
            .finish()
    }
}

impl MemoryClient {
    /// An empty device with unknown firmware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `version` as the device firmware.
    pub fn with_firmware(mut self, version: FirmwareVersion) -> Self {
        self.firmware = Some(version);
        self
    }

    /// Objects under `path` are keyed by the API field `field`. Creates
    /// without that field get the next free integer.
    pub fn with_mkey_field(self, path: &str, field: &str) -> Self {
        self.lock()
            .mkey_fields
            .insert(path.to_string(), field.to_string());
        self
    }

    /// Rewrite every object returned by a read, e.g. to answer addresses in
    /// dotted-mask notation.
    pub fn with_response_hook<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &mut Map<String, Value>) + Send + Sync + 'static,
    {
        self.lock().hook = Some(Arc::new(hook));
        self
    }

    /// Answer creates without an `mkey`.
    pub fn omit_response_mkey(self) -> Self {
        self.lock().omit_response_mkey = true;
        self
    }

    /// Seed an object. `mkey` is `None` for singletons.
    pub fn insert(&self, path: &str, mkey: Option<&str>, object: Value) {
        let object = match object {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.lock()
            .objects
            .insert(object_key(path, mkey), object);
    }

    /// The stored object, as the device holds it.
    pub fn object(&self, path: &str, mkey: Option<&str>) -> Option<Value> {
        self.lock()
            .objects
            .get(&object_key(path, mkey))
            .cloned()
            .map(Value::Object)
    }

    /// Every request made so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// The retry count the provider set, if any.
    pub fn retries(&self) -> Option<u32> {
        self.lock().retries
    }

    /// Make the next request fail with `error`.
    pub fn fail_next(&self, error: ClientError) {
        self.lock().failures.push_back(error);
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        mkey: Option<&str>,
        vdom: Option<&str>,
        body: Option<&Map<String, Value>>,
    ) -> Result<MutexGuard<'_, DeviceState>, ClientError> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            mkey: mkey.map(str::to_string),
            vdom: vdom.map(str::to_string),
            body: body.cloned().map(Value::Object),
        });
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl FortiosClient for MemoryClient {
    fn set_retries(&mut self, retries: u32) {
        self.lock().retries = Some(retries);
    }

    fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.firmware
    }

    async fn create(
        &self,
        path: &str,
        object: &Map<String, Value>,
        vdom: Option<&str>,
    ) -> Result<Map<String, Value>, ClientError> {
        let mut state = self.record("POST", path, None, vdom, Some(object))?;
        let mut stored = object.clone();

        let field = state.mkey_fields.get(path).cloned();
        let configured = field
            .as_ref()
            .and_then(|f| stored.get(f))
            .and_then(key_string);
        let (mkey, mkey_value) = match configured {
            Some(key) => {
                let value = field
                    .as_ref()
                    .and_then(|f| stored.get(f))
                    .cloned()
                    .unwrap_or(Value::Null);
                (key, value)
            }
            None => {
                let counter = state.next_mkey.entry(path.to_string()).or_insert(0);
                *counter += 1;
                let assigned = *counter;
                if let Some(f) = &field {
                    stored.insert(f.clone(), Value::from(assigned));
                }
                (assigned.to_string(), Value::from(assigned))
            }
        };

        let key = object_key(path, Some(&mkey));
        if state.objects.contains_key(&key) {
            return Err(ClientError::Http {
                status: 500,
                message: "A duplicate entry already exists".to_string(),
            });
        }
        state.objects.insert(key, stored);

        let mut response = Map::new();
        response.insert("status".to_string(), Value::from("success"));
        if !state.omit_response_mkey {
            response.insert("mkey".to_string(), mkey_value);
        }
        Ok(response)
    }

    async fn read(
        &self,
        path: &str,
        mkey: Option<&str>,
        vdom: Option<&str>,
    ) -> Result<Option<Map<String, Value>>, ClientError> {
        let state = self.record("GET", path, mkey, vdom, None)?;
        let Some(mut object) = state.objects.get(&object_key(path, mkey)).cloned() else {
            return Ok(None);
        };
        if let Some(hook) = &state.hook {
            hook(path, &mut object);
        }
        Ok(Some(object))
    }

    async fn update(
        &self,
        path: &str,
        mkey: Option<&str>,
        object: &Map<String, Value>,
        vdom: Option<&str>,
    ) -> Result<Map<String, Value>, ClientError> {
        let mut state = self.record("PUT", path, mkey, vdom, Some(object))?;
        let key = object_key(path, mkey);

        let stored = match mkey {
            // singletons always exist
            None => state.objects.entry(key).or_default(),
            Some(_) => state.objects.get_mut(&key).ok_or_else(|| ClientError::Http {
                status: 404,
                message: "Entry not found".to_string(),
            })?,
        };
        for (field, value) in object {
            stored.insert(field.clone(), value.clone());
        }

        let mut response = Map::new();
        response.insert("status".to_string(), Value::from("success"));
        if let Some(mkey) = mkey {
            response.insert("mkey".to_string(), Value::from(mkey));
        }
        Ok(response)
    }

    async fn delete(
        &self,
        path: &str,
        mkey: Option<&str>,
        vdom: Option<&str>,
    ) -> Result<(), ClientError> {
        let mut state = self.record("DELETE", path, mkey, vdom, None)?;
        state
            .objects
            .remove(&object_key(path, mkey))
            .map(|_| ())
            .ok_or_else(|| ClientError::Http {
                status: 404,
                message: "Entry not found".to_string(),
            })
    }
}

fn object_key(path: &str, mkey: Option<&str>) -> (String, String) {
    (path.to_string(), mkey.unwrap_or_default().to_string())
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A test harness for [`ProviderService`] implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run plan → create → read and return the final state.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read_existing(resource_type, created_state).await
    }

    /// Run plan → update → read and return the final state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read_existing(resource_type, updated_state).await
    }

    /// Run plan → delete.
    pub async fn lifecycle_delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Run create → update → delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;
        Ok(updated_state)
    }

    async fn read_existing(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.read(resource_type, state).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("{} disappeared during the lifecycle", resource_type))
        })
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    if has_errors(&diagnostics) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(())
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// Assert that every key of `expected` holds the same value in `state`.
///
/// # Panics
///
/// Panics on the first key that differs.
pub fn assert_state_contains(state: &Value, expected: &Value) {
    let Some(expected) = expected.as_object() else {
        panic!("expected value must be an object, got {}", expected);
    };
    for (key, value) in expected {
        assert_eq!(
            state.get(key),
            Some(value),
            "state differs at '{}': {}",
            key,
            state
        );
    }
}
