//! Error types for the FortiOS provider.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The REST client failed while acting on an object.
    #[error("Error {action} {resource} resource: {source}")]
    Client {
        /// What the provider was doing when the call failed.
        action: Action,
        /// Display name of the object type, e.g. `RouterIsis`.
        resource: String,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },

    /// A response could not be converted into state.
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Invalid request from the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Wrap a client error with the operation and object it belongs to.
    pub fn client(action: Action, resource: impl Into<String>, source: ClientError) -> Self {
        Self::Client {
            action,
            resource: resource.into(),
            source,
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::InvalidRequest(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Conversion(err) => err.to_string(),
            Self::Client { source, .. } => source.to_string(),
        }
    }
}

/// The lifecycle step a client error is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create.
    Creating,
    /// Read.
    Reading,
    /// Update.
    Updating,
    /// Delete.
    Deleting,
    /// Data source read.
    Describing,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Action::Creating => "creating",
            Action::Reading => "reading",
            Action::Updating => "updating",
            Action::Deleting => "deleting",
            Action::Describing => "describing",
        };
        f.write_str(verb)
    }
}

/// Failures while converting between API and state shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// A value had a different JSON type than the schema declares.
    #[error("unexpected value at '{path}': expected {expected}, got {found}")]
    UnexpectedType {
        /// Position of the value.
        path: String,
        /// What the schema expected.
        expected: &'static str,
        /// What was found.
        found: &'static str,
    },

    /// A flattened value could not be stored in state.
    #[error("error reading {path}: {detail}")]
    StateSet {
        /// Position of the value.
        path: String,
        /// Why it was rejected.
        detail: String,
    },
}

/// Errors reported by a FortiOS REST client implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The device answered with a non-success HTTP status.
    #[error("HTTP status {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message from the device.
        message: String,
    },

    /// The request never reached the device.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The device answered with something that is not a FortiOS API document.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
