//! Attribute-table shaping: feature query results to CSV text.
//!
//! Column order follows the layer's declared field order, geometry-typed
//! fields are dropped entirely, and null or missing attributes serialize
//! as empty cells. Zero rows yield header-only output.

use arcgis_rest::models::{FeatureRecord, Field};
use serde_json::Value;

/// Serialize query results as CSV text with a header row of field names
pub fn to_csv(fields: &[Field], rows: &[FeatureRecord]) -> String {
    let columns: Vec<&Field> = fields
        .iter()
        .filter(|f| !f.field_type.is_geometry())
        .collect();

    let mut out = columns
        .iter()
        .map(|f| escape(&f.name))
        .collect::<Vec<_>>()
        .join(",");

    for row in rows {
        out.push('\n');
        let cells = columns
            .iter()
            .map(|f| escape(&cell(row.attributes.get(&f.name))))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&cells);
    }

    out
}

/// Render one attribute value as a CSV cell; null and missing are empty
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        // Nested structures should not appear in attributes, but a compact
        // dump beats losing the value
        Some(other) => other.to_string(),
    }
}

/// Quote a cell per RFC 4180 when it contains a delimiter, quote, or newline
fn escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
