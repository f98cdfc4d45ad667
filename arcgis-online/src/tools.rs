//! String-channel tool surface.
//!
//! Every tool catches all failures local to itself and returns a
//! descriptive string in place of its normal output; success and failure
//! share the same textual return channel, distinguished only by content.
//! Nothing here panics or propagates a protocol-level fault.

use crate::client::ArcGisClient;

/// Search for feature layers; one line per sub-layer endpoint
pub async fn search_layers(client: &ArcGisClient, keyword: &str) -> String {
    match client.search_layers(keyword).await {
        Ok(text) => text,
        Err(e) => format!("Error searching layers: {}", e),
    }
}

/// Search the content catalog; one line per item
pub async fn search_content(
    client: &ArcGisClient,
    keyword: &str,
    item_type: Option<&str>,
) -> String {
    match client.search_content(keyword, item_type).await {
        Ok(text) => text,
        Err(e) => format!("Error searching content: {}", e),
    }
}

/// Fetch a feature layer's attribute table as CSV
pub async fn get_feature_table(
    client: &ArcGisClient,
    service_url: &str,
    max_rows: Option<u32>,
) -> String {
    match client.get_feature_table(service_url, max_rows).await {
        Ok(csv) => csv,
        Err(e) => format!("Error fetching table: {}", e),
    }
}

/// Retrieve an item's definition: header line plus compact JSON
pub async fn get_item_definition(client: &ArcGisClient, item_id: &str) -> String {
    match client.get_item_definition(item_id).await {
        Ok(text) => text,
        Err(e) => format!("Error fetching item definition: {}", e),
    }
}

/// Compute descriptive statistics for one field of a layer
pub async fn summarize_field(
    client: &ArcGisClient,
    service_url: &str,
    field_name: &str,
) -> String {
    match client.summarize_field(service_url, field_name).await {
        Ok(text) => text,
        Err(e) => format!("Error summarizing field: {}", e),
    }
}

/// Recreate an item from a definition header plus JSON body
pub async fn recreate_item(client: &ArcGisClient, definition: &str) -> String {
    match client.recreate_item(definition).await {
        Ok(status) => status,
        Err(e) => format!("Error recreating item: {}", e),
    }
}
