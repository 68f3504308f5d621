//! Resource lifecycle.
//!
//! A [`ResourceDefinition`] pairs a FortiOS object type with its field
//! schema. The lifecycle functions move an object through
//! `Absent → Created → Read ⇄ Updated → Deleted → Absent`: configuration is
//! expanded into a request, sent through the [`FortiosClient`], and the
//! device's answer is flattened back into state. Client failures end the
//! operation; retries belong to the client.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::client::{response_mkey, FortiosClient};
use crate::convert::{expand_object, flatten_object, ConvertContext, ReadMode, SortOrder};
use crate::error::{Action, ProviderError};
use crate::firmware::FirmwareVersion;
use crate::logging::redact_sensitive;
use crate::path::AttrPath;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestingMode, Schema};
use crate::validation;

/// State key holding the object identifier.
pub const ID: &str = "id";
/// State key naming the virtual domain the object lives in.
pub const VDOMPARAM: &str = "vdomparam";
/// State key selecting [`ReadMode`].
pub const GET_ALL_TABLES: &str = "get_all_tables";
/// State key selecting [`SortOrder`].
pub const DYNAMIC_SORT_SUBTABLE: &str = "dynamic_sort_subtable";

const META_ATTRIBUTES: [&str; 3] = [VDOMPARAM, GET_ALL_TABLES, DYNAMIC_SORT_SUBTABLE];

/// How an object type is addressed on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Many objects, each addressed by the value of the `mkey` field.
    Table {
        /// Name of the primary key attribute, e.g. `seq_num`.
        mkey: &'static str,
    },
    /// Exactly one object per vdom, created and destroyed by updates.
    Singleton {
        /// Fixed identifier recorded in state.
        id: &'static str,
    },
}

/// Device facts shared by every operation of a configured provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationContext {
    /// Firmware the device reported at configure time.
    pub firmware: Option<FirmwareVersion>,
    /// The provider-level `import_table` switch.
    pub import_table: bool,
}

/// A FortiOS object type exposed as a resource and data source.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Terraform type name, e.g. `fortios_router_static`.
    pub type_name: &'static str,
    /// Name used in error messages, e.g. `RouterStatic`.
    pub display_name: &'static str,
    /// CMDB path, e.g. `router/static`.
    pub path: &'static str,
    /// Addressing scheme.
    pub kind: ResourceKind,
    /// Fields of the object.
    pub block: Block,
}

impl ResourceDefinition {
    /// Create a definition.
    pub fn new(
        type_name: &'static str,
        display_name: &'static str,
        path: &'static str,
        kind: ResourceKind,
        block: Block,
    ) -> Self {
        Self {
            type_name,
            display_name,
            path,
            kind,
            block,
        }
    }

    /// Resource schema: the object fields plus `id` and the meta options.
    pub fn resource_schema(&self) -> Schema {
        let mut block = self.block.clone();
        if let ResourceKind::Table { mkey } = self.kind {
            if let Some(attr) = block.attributes.get_mut(mkey) {
                attr.force_new = true;
            }
        }

        Schema::from_block(block)
            .with_attribute(ID, Attribute::computed_string())
            .with_attribute(
                VDOMPARAM,
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("Virtual domain of the object"),
            )
            .with_attribute(
                GET_ALL_TABLES,
                Attribute::optional_string()
                    .with_one_of(&["true", "false"])
                    .with_description("Read back nested tables the configuration does not list"),
            )
            .with_attribute(
                DYNAMIC_SORT_SUBTABLE,
                Attribute::optional_string()
                    .with_one_of(&["false", "true", "natural", "alphabetical"])
                    .with_description("Ordering of nested tables read back from the device"),
            )
    }

    /// Data source schema: every field computed except the lookup key.
    pub fn data_source_schema(&self) -> Schema {
        let mut block = computed_block(&self.block);
        if let ResourceKind::Table { mkey } = self.kind {
            if let Some(attr) = self.block.attributes.get(mkey) {
                block.attributes.insert(
                    mkey.to_string(),
                    Attribute::new(attr.attr_type.clone(), AttributeFlags::required()),
                );
            }
        }

        Schema::from_block(block)
            .with_attribute(ID, Attribute::computed_string())
            .with_attribute(VDOMPARAM, Attribute::optional_string())
    }

    /// Validate a resource configuration.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.resource_schema(), config)
    }

    /// Create the object and read it back.
    #[instrument(skip_all, fields(resource = self.type_name))]
    pub async fn create<C>(
        &self,
        client: &C,
        op: OperationContext,
        planned: &Value,
    ) -> Result<Value, ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let config = as_object(planned)?;
        let vdom = vdomparam(config);
        let ctx = ConvertContext::new().with_firmware(op.firmware);
        let request = expand_object(&self.block, config, &ctx)?;
        self.log_request("Creating object", &request);

        let id = match self.kind {
            ResourceKind::Singleton { id } => {
                client
                    .update(self.path, None, &request, vdom)
                    .await
                    .map_err(|e| ProviderError::client(Action::Creating, self.display_name, e))?;
                id.to_string()
            }
            ResourceKind::Table { mkey } => {
                let response = client
                    .create(self.path, &request, vdom)
                    .await
                    .map_err(|e| ProviderError::client(Action::Creating, self.display_name, e))?;
                response_mkey(&response)
                    .or_else(|| key_value(config, mkey))
                    .unwrap_or_else(|| self.display_name.to_string())
            }
        };
        info!(id = %id, "Created object");

        let mut prior = config.clone();
        prior.insert(ID.to_string(), Value::String(id.clone()));
        let prior = Value::Object(prior);

        self.read_back(client, op, &id, &prior, None, Action::Creating)
            .await?
            .ok_or_else(|| self.vanished(&id))
    }

    /// Refresh state from the device. `None` means the object is gone.
    #[instrument(skip_all, fields(resource = self.type_name))]
    pub async fn read<C>(
        &self,
        client: &C,
        op: OperationContext,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let prior = as_object(state)?;
        let Some(id) = state_id(prior) else {
            debug!("No id in state, nothing to read");
            return Ok(None);
        };
        self.read_back(client, op, &id, state, None, Action::Reading)
            .await
    }

    /// Send the planned configuration for an existing object and read it back.
    #[instrument(skip_all, fields(resource = self.type_name))]
    pub async fn update<C>(
        &self,
        client: &C,
        op: OperationContext,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let prior_map = as_object(prior)?;
        let config = as_object(planned)?;
        let id = state_id(config)
            .or_else(|| state_id(prior_map))
            .ok_or_else(|| ProviderError::InvalidRequest("update without an id".to_string()))?;
        let vdom = vdomparam(config);

        let ctx = ConvertContext::new()
            .with_prior_state(prior)
            .with_firmware(op.firmware);
        let request = expand_object(&self.block, config, &ctx)?;
        self.log_request("Updating object", &request);

        client
            .update(self.path, self.mkey_for(&id), &request, vdom)
            .await
            .map_err(|e| ProviderError::client(Action::Updating, self.display_name, e))?;
        info!(id = %id, "Updated object");

        let mut next = config.clone();
        next.insert(ID.to_string(), Value::String(id.clone()));
        let next = Value::Object(next);

        self.read_back(client, op, &id, &next, None, Action::Updating)
            .await?
            .ok_or_else(|| self.vanished(&id))
    }

    /// Remove the object. Singletons cannot be removed, so their tables are
    /// emptied instead.
    #[instrument(skip_all, fields(resource = self.type_name))]
    pub async fn delete<C>(
        &self,
        client: &C,
        _op: OperationContext,
        state: &Value,
    ) -> Result<(), ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let prior = as_object(state)?;
        let vdom = vdomparam(prior);

        match self.kind {
            ResourceKind::Table { .. } => {
                let Some(id) = state_id(prior) else {
                    debug!("No id in state, nothing to delete");
                    return Ok(());
                };
                client
                    .delete(self.path, Some(&id), vdom)
                    .await
                    .map_err(|e| ProviderError::client(Action::Deleting, self.display_name, e))?;
                info!(id = %id, "Deleted object");
            }
            ResourceKind::Singleton { id } => {
                let request = self.reset_request();
                self.log_request("Resetting object", &request);
                client
                    .update(self.path, None, &request, vdom)
                    .await
                    .map_err(|e| ProviderError::client(Action::Deleting, self.display_name, e))?;
                info!(id = %id, "Reset object tables");
            }
        }
        Ok(())
    }

    /// Adopt an existing object by identifier.
    #[instrument(skip_all, fields(resource = self.type_name, id = %id))]
    pub async fn import<C>(
        &self,
        client: &C,
        op: OperationContext,
        id: &str,
    ) -> Result<Option<Value>, ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let id = match self.kind {
            ResourceKind::Singleton { id: fixed } if id.is_empty() => fixed.to_string(),
            _ => id.to_string(),
        };
        let mode = if op.import_table {
            ReadMode::AlwaysReadAllTables
        } else {
            ReadMode::ReadOnlyIfPresent
        };

        let mut seed = Map::new();
        seed.insert(ID.to_string(), Value::String(id.clone()));
        let seed = Value::Object(seed);

        self.read_back(client, op, &id, &seed, Some(mode), Action::Reading)
            .await
    }

    /// Look an object up by its key and return every field.
    #[instrument(skip_all, fields(resource = self.type_name))]
    pub async fn read_data_source<C>(
        &self,
        client: &C,
        op: OperationContext,
        config: &Value,
    ) -> Result<Value, ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let config = as_object(config)?;
        let vdom = vdomparam(config);

        let id = match self.kind {
            ResourceKind::Table { mkey } => key_value(config, mkey).ok_or_else(|| {
                ProviderError::Validation(format!("Missing required attribute '{}'", mkey))
            })?,
            ResourceKind::Singleton { id } => id.to_string(),
        };

        let response = client
            .read(self.path, self.mkey_for(&id), vdom)
            .await
            .map_err(|e| ProviderError::client(Action::Describing, self.display_name, e))?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("{} {} not found", self.display_name, id))
            })?;

        let ctx = ConvertContext::new()
            .with_read_mode(ReadMode::AlwaysReadAllTables)
            .with_firmware(op.firmware);
        let mut state = flatten_object(&self.block, &response, &ctx, &AttrPath::root())?;
        state.insert(ID.to_string(), Value::String(id));
        if let Some(vdom) = vdom {
            state.insert(VDOMPARAM.to_string(), Value::String(vdom.to_string()));
        }
        Ok(Value::Object(state))
    }

    async fn read_back<C>(
        &self,
        client: &C,
        op: OperationContext,
        id: &str,
        prior: &Value,
        mode: Option<ReadMode>,
        action: Action,
    ) -> Result<Option<Value>, ProviderError>
    where
        C: FortiosClient + ?Sized,
    {
        let prior_map = as_object(prior)?;
        let vdom = vdomparam(prior_map);

        let response = client
            .read(self.path, self.mkey_for(id), vdom)
            .await
            .map_err(|e| ProviderError::client(action, self.display_name, e))?;
        let Some(response) = response else {
            warn!(id = %id, "Object not found on device, removing from state");
            return Ok(None);
        };

        let ctx = ConvertContext::new()
            .with_read_mode(mode.unwrap_or_else(|| read_mode(prior_map)))
            .with_sort_order(sort_order(prior_map))
            .with_prior_state(prior)
            .with_firmware(op.firmware);
        let mut state = flatten_object(&self.block, &response, &ctx, &AttrPath::root())?;

        state.insert(ID.to_string(), Value::String(id.to_string()));
        for key in META_ATTRIBUTES {
            if let Some(value) = prior_map.get(key).filter(|v| !v.is_null()) {
                state.insert(key.to_string(), value.clone());
            }
        }
        Ok(Some(Value::Object(state)))
    }

    fn mkey_for<'a>(&self, id: &'a str) -> Option<&'a str> {
        match self.kind {
            ResourceKind::Table { .. } => Some(id),
            ResourceKind::Singleton { .. } => None,
        }
    }

    fn reset_request(&self) -> Map<String, Value> {
        self.block
            .blocks
            .iter()
            .filter(|(_, nested)| nested.nesting_mode != NestingMode::Single)
            .map(|(name, nested)| (nested.api_key(name), Value::Array(Vec::new())))
            .collect()
    }

    fn log_request(&self, message: &str, request: &Map<String, Value>) {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let body = redact_sensitive(&self.block, &Value::Object(request.clone()));
            debug!(path = self.path, body = %body, "{}", message);
        }
    }

    fn vanished(&self, id: &str) -> ProviderError {
        ProviderError::NotFound(format!(
            "{} {} was not found after it was written",
            self.display_name, id
        ))
    }
}

fn computed_block(block: &Block) -> Block {
    let mut out = Block::new();
    out.description = block.description.clone();
    for (name, attr) in &block.attributes {
        let mut flags = AttributeFlags::computed();
        flags.sensitive = attr.flags.sensitive;
        let mut computed = Attribute::new(attr.attr_type.clone(), flags);
        computed.description = attr.description.clone();
        computed.api_name = attr.api_name.clone();
        computed.normalization = attr.normalization;
        out.attributes.insert(name.clone(), computed);
    }
    for (name, nested) in &block.blocks {
        let mut nested_out = nested.clone();
        nested_out.block = computed_block(&nested.block);
        nested_out.min_items = 0;
        out.blocks.insert(name.clone(), nested_out);
    }
    out
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, ProviderError> {
    value.as_object().ok_or_else(|| {
        ProviderError::InvalidRequest(format!(
            "expected an object, got {}",
            crate::convert::value_type_name(value)
        ))
    })
}

fn state_id(state: &Map<String, Value>) -> Option<String> {
    key_value(state, ID)
}

fn key_value(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn vdomparam(object: &Map<String, Value>) -> Option<&str> {
    object
        .get(VDOMPARAM)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
}

fn read_mode(state: &Map<String, Value>) -> ReadMode {
    ReadMode::from_option(state.get(GET_ALL_TABLES).and_then(Value::as_str))
}

fn sort_order(state: &Map<String, Value>) -> SortOrder {
    SortOrder::from_option(state.get(DYNAMIC_SORT_SUBTABLE).and_then(Value::as_str))
}
