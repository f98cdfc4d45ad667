pub const DEFAULT_PORTAL_URL: &str = "https://www.arcgis.com";

pub use arcgis_rest as rest;

pub mod client;
pub mod config;
pub mod error;
pub mod item;
pub mod stats;
pub mod table;
pub mod tools;

pub use client::ArcGisClient;
pub use config::ArcGisConfig;
pub use error::{ArcGisError, Result};
pub use item::{ItemHeader, ItemKind};
pub use stats::FieldSummary;
