//! The FortiOS provider.
//!
//! [`FortiosProvider`] serves every declared object type through
//! [`ProviderService`]. It connects once at configure time; every later
//! operation shares that client.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::{ClientFactory, FortiosClient};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan::{plan_change, PlanResult};
use crate::resource::{OperationContext, ResourceDefinition};
use crate::resources;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::{has_errors, ImportedResource, ProviderService};

/// Retry count handed to the client at configure time.
pub const CLIENT_RETRIES: u32 = 1;

struct Session<C> {
    client: Arc<C>,
    op: OperationContext,
}

/// A provider serving FortiOS objects through clients built by `F`.
pub struct FortiosProvider<F: ClientFactory> {
    factory: F,
    resources: BTreeMap<&'static str, ResourceDefinition>,
    session: RwLock<Option<Session<F::Client>>>,
}

impl<F: ClientFactory> FortiosProvider<F> {
    /// Serve every object type in [`resources::all`].
    pub fn new(factory: F) -> Self {
        Self::with_resources(factory, resources::all())
    }

    /// Serve only the given object types.
    pub fn with_resources(factory: F, definitions: Vec<ResourceDefinition>) -> Self {
        let resources = definitions
            .into_iter()
            .map(|def| (def.type_name, def))
            .collect();
        Self {
            factory,
            resources,
            session: RwLock::new(None),
        }
    }

    /// Whether [`ProviderService::configure`] has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.session.read().await.is_some()
    }

    fn resource(&self, type_name: &str) -> Result<&ResourceDefinition, ProviderError> {
        self.resources.get(type_name).ok_or_else(|| {
            ProviderError::UnknownResource(format!("Unknown resource type: {}", type_name))
        })
    }

    fn data_source(&self, type_name: &str) -> Result<&ResourceDefinition, ProviderError> {
        self.resources.get(type_name).ok_or_else(|| {
            ProviderError::UnknownResource(format!("Unknown data source type: {}", type_name))
        })
    }

    async fn session(&self) -> Result<(Arc<F::Client>, OperationContext), ProviderError> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or_else(|| {
            ProviderError::Configuration("provider used before it was configured".to_string())
        })?;
        Ok((Arc::clone(&session.client), session.op))
    }
}

#[async_trait::async_trait]
impl<F: ClientFactory> ProviderService for FortiosProvider<F> {
    fn schema(&self) -> ProviderSchema {
        self.resources.values().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, def| {
                schema
                    .with_resource(def.type_name, def.resource_schema())
                    .with_data_source(def.type_name, def.data_source_schema())
            },
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = ProviderConfig::from_value(&config)?;
        Ok(config.validate())
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = ProviderConfig::from_value(&config)?;
        let diagnostics = config.validate();
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "Provider configuration rejected");
            return Ok(diagnostics);
        }

        let mut client = self.factory.build(&config).map_err(|e| {
            ProviderError::Configuration(format!("Error creating FortiOS client: {}", e))
        })?;
        client.set_retries(CLIENT_RETRIES);

        let op = OperationContext {
            firmware: client.firmware_version(),
            import_table: config.import_table(),
        };
        match op.firmware {
            Some(version) => info!(
                hostname = config.hostname.as_deref().unwrap_or_default(),
                firmware = %version,
                "Connected to FortiGate"
            ),
            None => info!(
                hostname = config.hostname.as_deref().unwrap_or_default(),
                "Connected to FortiGate, firmware unknown"
            ),
        }

        *self.session.write().await = Some(Session {
            client: Arc::new(client),
            op,
        });
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        if self.session.write().await.take().is_some() {
            debug!("Dropped FortiOS client");
        }
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let def = self.resource(resource_type)?;
        let plan = plan_change(&def.resource_schema(), prior_state.as_ref(), &proposed_state);
        debug!(
            resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Planned change"
        );
        Ok(plan)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let def = self.resource(resource_type)?;
        let (client, op) = self.session().await?;
        def.create(client.as_ref(), op, &planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let def = self.resource(resource_type)?;
        let (client, op) = self.session().await?;
        def.read(client.as_ref(), op, &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let def = self.resource(resource_type)?;
        let (client, op) = self.session().await?;
        def.update(client.as_ref(), op, &prior_state, &planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let def = self.resource(resource_type)?;
        let (client, op) = self.session().await?;
        def.delete(client.as_ref(), op, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let def = self.resource(resource_type)?;
        let (client, op) = self.session().await?;
        let state = def.import(client.as_ref(), op, id).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("Cannot import non-existent {} {}", def.display_name, id))
        })?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let def = self.data_source(data_source_type)?;
        Ok(crate::validation::validate(&def.data_source_schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let def = self.data_source(data_source_type)?;
        let (client, op) = self.session().await?;
        def.read_data_source(client.as_ref(), op, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::firmware::FirmwareVersion;
    use crate::testing::{
        assert_plan_changes_attribute, assert_plan_no_changes, assert_plan_replaces,
        MemoryClient, ProviderTester,
    };
    use serde_json::json;
    use tokio_test::assert_ok;

    type Factory = Box<dyn Fn(&ProviderConfig) -> Result<MemoryClient, ClientError> + Send + Sync>;

    fn factory(device: &MemoryClient) -> Factory {
        let device = device.clone();
        Box::new(move |_: &ProviderConfig| Ok(device.clone()))
    }

    fn device() -> MemoryClient {
        MemoryClient::new()
            .with_firmware(FirmwareVersion::new(7, 2, 4))
            .with_mkey_field("router/static", "seq-num")
            .with_mkey_field("firewall/policy", "policyid")
            .with_mkey_field("system/sdn-connector", "name")
            .with_mkey_field("system.lldp/network-policy", "name")
    }

    async fn configured(device: &MemoryClient) -> ProviderTester<FortiosProvider<Factory>> {
        let tester = ProviderTester::new(FortiosProvider::new(factory(device)));
        assert_ok!(
            tester
                .configure(json!({"hostname": "192.0.2.1", "token": "api-token"}))
                .await
        );
        tester
    }

    #[tokio::test]
    async fn test_configure_sets_retries_once() {
        let device = device();
        let tester = configured(&device).await;
        assert_eq!(device.retries(), Some(CLIENT_RETRIES));
        assert!(tester.provider().is_configured().await);

        tester.provider().stop().await.unwrap();
        assert!(!tester.provider().is_configured().await);
    }

    #[tokio::test]
    async fn test_configure_rejects_missing_token() {
        let device = device();
        let provider = FortiosProvider::new(factory(&device));
        let diagnostics = provider
            .configure(json!({"hostname": "192.0.2.1", "token": ""}))
            .await
            .unwrap();
        crate::testing::assert_error_contains(&diagnostics, "Missing FortiOS API token");
        assert!(!provider.is_configured().await);
        assert_eq!(device.retries(), None);
    }

    #[tokio::test]
    async fn test_factory_failure_is_a_configuration_error() {
        let provider = FortiosProvider::new(|_: &ProviderConfig| -> Result<MemoryClient, ClientError> {
            Err(ClientError::Authentication("bad token".to_string()))
        });
        let err = provider
            .configure(json!({"hostname": "192.0.2.1", "token": "t"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = FortiosProvider::new(factory(&device()));
        let err = provider
            .create("fortios_router_static", json!({"dst": "10.0.0.0/8"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let tester = configured(&device()).await;
        let err = tester
            .create("fortios_router_bgp", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[test]
    fn test_schema_lists_every_object() {
        let provider = FortiosProvider::new(factory(&device()));
        let schema = provider.schema();
        assert_eq!(schema.resources.len(), resources::all().len());
        assert_eq!(schema.data_sources.len(), resources::all().len());
        assert!(schema.provider.block.attributes["token"].flags.sensitive);
        assert!(provider
            .metadata()
            .resources
            .contains(&"fortios_firewall_policy".to_string()));
    }

    #[test]
    fn test_tester_lists_type_names() {
        let tester = ProviderTester::new(FortiosProvider::new(factory(&device())));
        let resource_types = tester.resource_types();
        let data_source_types = tester.data_source_types();

        assert_eq!(resource_types.len(), resources::all().len());
        assert_eq!(resource_types, data_source_types);
        assert!(resource_types.contains(&"fortios_router_isis".to_string()));
        assert!(data_source_types.contains(&"fortios_system_sdnconnector".to_string()));
    }

    #[tokio::test]
    async fn test_full_crud_lifecycle() {
        let device = device();
        let tester = configured(&device).await;

        let created = tester
            .lifecycle_create(
                "fortios_system_sdnconnector",
                json!({
                    "name": "aws1",
                    "type": "aws",
                    "route": [{"name": "r1"}, {"name": "r2"}]
                }),
            )
            .await
            .unwrap();
        assert_eq!(created["id"], "aws1");
        assert_eq!(created["route"], json!([{"name": "r1"}, {"name": "r2"}]));

        let updated = tester
            .lifecycle_update(
                "fortios_system_sdnconnector",
                created.clone(),
                json!({
                    "name": "aws1",
                    "type": "aws",
                    "route": [{"name": "r1"}, {"name": "r3"}]
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated["route"], json!([{"name": "r1"}, {"name": "r3"}]));
        assert_eq!(updated["type"], created["type"]);

        tester
            .lifecycle_delete("fortios_system_sdnconnector", updated.clone())
            .await
            .unwrap();
        assert_eq!(
            tester.read("fortios_system_sdnconnector", updated).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_lifecycle_crud_helper() {
        let device = device();
        let tester = configured(&device).await;
        let state = tester
            .lifecycle_crud(
                "fortios_router_static",
                json!({"dst": "10.0.0.0/24", "gateway": "192.0.2.1", "device": "port1"}),
                json!({"dst": "10.0.0.0/24", "gateway": "192.0.2.254", "device": "port1"}),
            )
            .await
            .unwrap();
        assert_eq!(state["gateway"], "192.0.2.254");
        assert!(device.object("router/static", Some("1")).is_none());
    }

    #[tokio::test]
    async fn test_plan_reports_changes() {
        let tester = configured(&device()).await;
        let prior = json!({"id": "1", "seq_num": 1, "dst": "10.0.0.0/24", "vdomparam": "root"});

        let plan = tester
            .plan_update("fortios_router_static", prior.clone(), json!({"dst": "10.0.0.0/24", "vdomparam": "root"}))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["id"], "1");

        let plan = tester
            .plan_update("fortios_router_static", prior.clone(), json!({"dst": "10.1.0.0/24", "vdomparam": "root"}))
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "dst");
        assert!(!plan.requires_replace);

        let plan = tester
            .plan_update("fortios_router_static", prior, json!({"dst": "10.0.0.0/24", "vdomparam": "dmz"}))
            .await
            .unwrap();
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_import() {
        let device = device();
        device.insert(
            "firewall/policy",
            Some("12"),
            json!({"policyid": 12, "name": "legacy", "srcaddr": [{"name": "all"}]}),
        );
        let tester = configured(&device).await;

        let imported = tester
            .import_resource("fortios_firewall_policy", "12")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state["policyid"], 12);
        assert!(imported[0].state.get("srcaddr").is_none());

        let err = tester
            .import_resource("fortios_firewall_policy", "13")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_import_table_reads_every_table() {
        let device = device();
        device.insert(
            "firewall/policy",
            Some("12"),
            json!({"policyid": 12, "srcaddr": [{"name": "all"}]}),
        );
        let tester = ProviderTester::new(FortiosProvider::new(factory(&device)));
        tester
            .configure(json!({"hostname": "192.0.2.1", "token": "t", "import_table": true}))
            .await
            .unwrap();

        let imported = tester
            .import_resource("fortios_firewall_policy", "12")
            .await
            .unwrap();
        assert_eq!(imported[0].state["srcaddr"], json!([{"name": "all"}]));
    }

    #[tokio::test]
    async fn test_data_source() {
        let device = device();
        device.insert(
            "system.lldp/network-policy",
            Some("phones"),
            json!({"name": "phones", "voice": {"vlan": 100}}),
        );
        let tester = configured(&device).await;

        let state = tester
            .read_data_source("fortios_system_lldp_networkpolicy", json!({"name": "phones"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "phones");
        assert_eq!(state["voice"], json!([{"vlan": 100}]));

        let diagnostics = tester
            .provider()
            .validate_data_source_config("fortios_system_lldp_networkpolicy", json!({}))
            .await
            .unwrap();
        crate::testing::assert_error_contains(&diagnostics, "name");
    }

    #[tokio::test]
    async fn test_missing_single_block_on_the_wire() {
        let device = device();
        let tester = configured(&device).await;
        let state = tester
            .lifecycle_create(
                "fortios_system_lldp_networkpolicy",
                json!({"name": "phones", "comment": "desk phones"}),
            )
            .await
            .unwrap();

        let post = device
            .requests()
            .into_iter()
            .find(|r| r.method == "POST")
            .unwrap();
        assert_eq!(post.body, Some(json!({"name": "phones", "comment": "desk phones"})));
        assert!(state.get("voice").is_none());
    }

    #[tokio::test]
    async fn test_client_errors_surface() {
        let device = device();
        let tester = configured(&device).await;
        device.fail_next(ClientError::Transport("connection reset".to_string()));

        let err = tester
            .read("fortios_router_static", json!({"id": "1"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error reading RouterStatic resource: transport error: connection reset"
        );
    }
}
