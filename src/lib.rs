//! FortiOS Provider
//!
//! Schema-driven FortiOS configuration resources for infrastructure-as-code
//! providers. Each FortiOS object type (`router/static`, `firewall/policy`,
//! ...) is declared once as a field schema; a single conversion engine moves
//! values between the device's REST representation and provider state.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Schema types**: The field tree of every object, with vendor key names,
//!   constraints, normalization rules and nested tables
//! - **Conversion engine**: Flatten (device → state) and expand
//!   (configuration → device) driven by the schema
//! - **Resource lifecycle**: Create, read, update, delete, import and
//!   data-source reads over a [`FortiosClient`]
//! - **ProviderService trait**: The operations a plugin host drives, implemented
//!   by [`FortiosProvider`]
//! - **Error types**: Operation, conversion and client errors
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use fortios_provider::{FortiosProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     fortios_provider::init_logging();
//!
//!     // `RestClient` implements `FortiosClient` over HTTPS.
//!     let provider = FortiosProvider::new(|config: &_| RestClient::connect(config));
//!     provider
//!         .configure(json!({"hostname": "192.0.2.1", "token": "..."}))
//!         .await?;
//!
//!     let state = provider
//!         .create(
//!             "fortios_router_static",
//!             json!({"dst": "10.0.0.0/24", "gateway": "192.0.2.254", "device": "port1"}),
//!         )
//!         .await?;
//!     println!("created route {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Operations
//!
//! - **Schema / Metadata**: Provider, resource and data source schemas
//! - **ValidateProviderConfig / Configure**: Connects once and sets the client
//!   retry count
//! - **ValidateResourceConfig / Plan**: Defaults, computed carry-over and
//!   replacement detection
//! - **Create/Read/Update/Delete**: CRUD operations for resources
//! - **Import**: Adopts an existing object by its key
//! - **ReadDataSource**: Reads every field of one object

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod firmware;
pub mod logging;
pub mod path;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod validation;

// Re-export main types at crate root
pub use client::{ClientFactory, FortiosClient};
pub use config::ProviderConfig;
pub use convert::{ConvertContext, ReadMode, SortOrder};
pub use error::{ClientError, ConversionError, ProviderError};
pub use firmware::FirmwareVersion;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use plan::{AttributeChange, PlanResult};
pub use provider::FortiosProvider;
pub use resource::{ResourceDefinition, ResourceKind};
pub use schema::ProviderSchema;
pub use service::{ImportedResource, ProviderMetadata, ProviderService, ServerCapabilities};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
