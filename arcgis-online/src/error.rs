use arcgis_rest::ArcGisRestError;
use thiserror::Error;

/// Errors that can occur when using the ArcGIS Online client
#[derive(Error, Debug)]
pub enum ArcGisError {
    /// Error from the underlying REST API
    #[error("{0}")]
    Rest(#[from] ArcGisRestError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed; fatal at startup, the session is never rebuilt
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Item exists but its type has no extraction or creation strategy
    #[error("Unsupported item type: {type_tag}")]
    UnsupportedItemType { type_tag: String },

    /// Service-typed item without a REST endpoint URL
    #[error("Item '{item_id}' has no service URL")]
    MissingServiceUrl { item_id: String },

    /// Requested field is not declared by the layer
    #[error("Field '{field}' does not exist on layer {layer_url}")]
    FieldNotFound { field: String, layer_url: String },

    /// Item definition header does not match `Item: .. | Type: .. | Created: ..`
    #[error("Malformed item header: {message}")]
    MalformedHeader { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ArcGisError {
    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new unsupported-item-type error
    pub fn unsupported_item_type<S: Into<String>>(type_tag: S) -> Self {
        Self::UnsupportedItemType {
            type_tag: type_tag.into(),
        }
    }

    /// Create a new missing-service-URL error
    pub fn missing_service_url<S: Into<String>>(item_id: S) -> Self {
        Self::MissingServiceUrl {
            item_id: item_id.into(),
        }
    }

    /// Create a new field-not-found error
    pub fn field_not_found<S: Into<String>, U: Into<String>>(field: S, layer_url: U) -> Self {
        Self::FieldNotFound {
            field: field.into(),
            layer_url: layer_url.into(),
        }
    }

    /// Create a new malformed-header error
    pub fn malformed_header<S: Into<String>>(message: S) -> Self {
        Self::MalformedHeader {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Type alias for Results using ArcGisError
pub type Result<T> = std::result::Result<T, ArcGisError>;
