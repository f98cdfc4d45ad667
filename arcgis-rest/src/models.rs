use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Authentication token issued by the portal's `generateToken` endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The token string, appended to every subsequent request
    pub token: String,
    /// Expiry as epoch milliseconds
    #[serde(default)]
    pub expires: Option<i64>,
}

/// A single content item in the portal catalog
///
/// The `item_type` tag is an open-ended vendor-defined set ("Feature Service",
/// "Web Map", "Dashboard", ...); callers that need a closed set should map it
/// through their own enum rather than matching on the raw string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    /// Creation timestamp as epoch milliseconds
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub owner: Option<String>,
    /// REST endpoint of the backing service, present for service-typed items
    #[serde(default)]
    pub url: Option<String>,
}

/// Result page returned by the portal search endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub results: Vec<PortalItem>,
}

/// Declared field type of a feature-layer attribute column
///
/// Closed enum over the `esriFieldType*` tags the query endpoint reports.
/// Unrecognized tags map to [`FieldType::Other`] so new server-side types
/// degrade to "no type-specific statistics" instead of a parse failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "esriFieldTypeOID")]
    ObjectId,
    #[serde(rename = "esriFieldTypeSmallInteger")]
    SmallInteger,
    #[serde(rename = "esriFieldTypeInteger")]
    Integer,
    #[serde(rename = "esriFieldTypeBigInteger")]
    BigInteger,
    #[serde(rename = "esriFieldTypeSingle")]
    Single,
    #[serde(rename = "esriFieldTypeDouble")]
    Double,
    #[serde(rename = "esriFieldTypeString")]
    String,
    #[serde(rename = "esriFieldTypeDate")]
    Date,
    #[serde(rename = "esriFieldTypeGeometry")]
    Geometry,
    #[serde(rename = "esriFieldTypeGlobalID")]
    GlobalId,
    #[serde(rename = "esriFieldTypeGUID")]
    Guid,
    #[serde(other)]
    Other,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::ObjectId
                | FieldType::SmallInteger
                | FieldType::Integer
                | FieldType::BigInteger
                | FieldType::Single
                | FieldType::Double
        )
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FieldType::Date)
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, FieldType::Geometry)
    }

    /// Human-readable tag for output headers ("Integer", "Date", ...)
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldType::ObjectId => "OID",
            FieldType::SmallInteger => "SmallInteger",
            FieldType::Integer => "Integer",
            FieldType::BigInteger => "BigInteger",
            FieldType::Single => "Single",
            FieldType::Double => "Double",
            FieldType::String => "String",
            FieldType::Date => "Date",
            FieldType::Geometry => "Geometry",
            FieldType::GlobalId => "GlobalID",
            FieldType::Guid => "GUID",
            FieldType::Other => "Other",
        }
    }
}

/// Declared attribute field of a feature layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A single feature returned by a layer query, geometry excluded
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// Response of a feature-layer `query` operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
    #[serde(default, rename = "exceededTransferLimit")]
    pub exceeded_transfer_limit: Option<bool>,
}

/// Sub-layer (or table) entry of a feature-service definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Definition of a whole feature service: its sub-layers and tables plus the
/// remaining service JSON, preserved verbatim for compact re-serialization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    #[serde(default)]
    pub layers: Vec<LayerSummary>,
    #[serde(default)]
    pub tables: Vec<LayerSummary>,
    #[serde(flatten)]
    pub rest: HashMap<String, Value>,
}

/// Definition of a single feature layer; only the declared fields are modeled
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerDefinition {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub rest: HashMap<String, Value>,
}

/// Error envelope the portal embeds in HTTP 200 responses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Wrapper for responses that may carry the portal error envelope
#[derive(Clone, Debug, Deserialize)]
pub struct MaybeError {
    #[serde(default)]
    pub error: Option<PortalErrorBody>,
}

/// Response of the `addItem` / `createService` content operations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub id: Option<String>,
    /// `createService` reports the new item under `itemId`
    #[serde(default, rename = "itemId")]
    pub item_id: Option<String>,
}

impl CreateResponse {
    /// The created item's id, whichever field the endpoint used
    pub fn created_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.item_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_parses_esri_tags() {
        let field: Field =
            serde_json::from_str(r#"{"name": "POP2020", "type": "esriFieldTypeInteger"}"#).unwrap();
        assert_eq!(field.field_type, FieldType::Integer);
        assert!(field.field_type.is_numeric());
        assert!(!field.field_type.is_date());
    }

    #[test]
    fn field_type_unknown_tag_degrades_to_other() {
        let field: Field =
            serde_json::from_str(r#"{"name": "X", "type": "esriFieldTypeXML"}"#).unwrap();
        assert_eq!(field.field_type, FieldType::Other);
        assert!(!field.field_type.is_numeric());
    }

    #[test]
    fn geometry_field_is_flagged() {
        let field: Field =
            serde_json::from_str(r#"{"name": "Shape", "type": "esriFieldTypeGeometry"}"#).unwrap();
        assert!(field.field_type.is_geometry());
    }

    #[test]
    fn create_response_prefers_id_over_item_id() {
        let created: CreateResponse =
            serde_json::from_str(r#"{"success": true, "id": "abc123"}"#).unwrap();
        assert_eq!(created.created_id(), Some("abc123"));

        let service: CreateResponse =
            serde_json::from_str(r#"{"success": true, "itemId": "svc456"}"#).unwrap();
        assert_eq!(service.created_id(), Some("svc456"));
    }

    #[test]
    fn service_definition_keeps_unmodeled_keys() {
        let def: ServiceDefinition = serde_json::from_str(
            r#"{"layers": [{"id": 0, "name": "Parcels"}], "maxRecordCount": 1000}"#,
        )
        .unwrap();
        assert_eq!(def.layers.len(), 1);
        assert_eq!(def.layers[0].name.as_deref(), Some("Parcels"));
        assert!(def.rest.contains_key("maxRecordCount"));
    }
}
