pub mod client;
pub mod models;

// Re-export the ergonomic client and configuration for easy access
pub use client::{ArcGisRestError, Configuration, PortalClient};
pub use models::{
    Field, FieldType, LayerDefinition, LayerSummary, PortalItem, QueryResponse, SearchResponse,
    ServiceDefinition, Token,
};
