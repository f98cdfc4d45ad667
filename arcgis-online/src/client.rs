use std::sync::Arc;

use arcgis_rest::{Configuration, PortalClient};
use serde_json::Value;

use crate::config::ArcGisConfig;
use crate::error::{ArcGisError, Result};
use crate::item::{ItemHeader, ItemKind};
use crate::{stats, table};

/// High-level client for ArcGIS Online
///
/// Wraps the low-level portal client and implements the bridge's tool
/// operations: catalog search, attribute-table extraction, item-definition
/// retrieval, field summarization, and item recreation.
///
/// The client IS the session handle: [`ArcGisClient::connect`] authenticates
/// exactly once and the token is reused for every call. There is no
/// reconnect-on-failure; a failed authentication is fatal at startup, and an
/// expired token surfaces as a portal error on the affected call.
#[derive(Debug)]
pub struct ArcGisClient {
    portal: PortalClient,
    username: String,
}

impl ArcGisClient {
    /// Authenticate against the portal and build the shared session handle
    pub async fn connect(
        config: ArcGisConfig,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        let unauthenticated = Configuration {
            portal_url: config.portal_url.clone(),
            user_agent: Some(config.user_agent.clone()),
            client: http_client,
            token: None,
        };

        let token = PortalClient::new(Arc::new(unauthenticated.clone()))
            .generate_token(username, password)
            .await
            .map_err(|e| ArcGisError::auth(e.to_string()))?;

        let authenticated = Configuration {
            token: Some(token.token),
            ..unauthenticated
        };

        Ok(Self {
            portal: PortalClient::new(Arc::new(authenticated)),
            username: username.to_string(),
        })
    }

    /// Build a client from an already-configured portal client
    ///
    /// Used by tests to point the session at a mock portal.
    pub fn from_portal(portal: PortalClient, username: &str) -> Self {
        Self {
            portal,
            username: username.to_string(),
        }
    }

    /// The account this session authenticated as
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the underlying portal client for advanced operations
    pub fn portal(&self) -> &PortalClient {
        &self.portal
    }

    // === Search and Discovery ===

    /// Search for feature layers by keyword
    ///
    /// Constrains the catalog search to `type:"Feature Service"` and expands
    /// each matching service into its sub-layers: one output line per
    /// sub-layer, `"{title}: {service_url}/{layer_id}"`, so a service with
    /// three sub-layers yields three lines with distinct indices.
    pub async fn search_layers(&self, keyword: &str) -> Result<String> {
        let response = self
            .portal
            .search(keyword, Some("Feature Service"), Some(10))
            .await?;

        let mut lines = Vec::new();
        for item in response.results {
            // Items without a service endpoint cannot be queried as layers
            let Some(url) = item.url else {
                continue;
            };
            let url = url.trim_end_matches('/').to_string();
            let title = item.title.unwrap_or_else(|| item.id.clone());

            let definition = self.portal.service_definition(&url).await?;
            for layer in definition.layers.iter().chain(definition.tables.iter()) {
                lines.push(format!("{}: {}/{}", title, url, layer.id));
            }
        }

        if lines.is_empty() {
            Ok("No matching layers found.".to_string())
        } else {
            Ok(lines.join("\n"))
        }
    }

    /// Search the content catalog by keyword, optionally filtered to one
    /// item type
    ///
    /// One line per match: `"{title}: {id} | Type: {type}"`. The type filter
    /// is a single string by construction; the portal treats a list as
    /// logical AND and silently matches nothing.
    pub async fn search_content(
        &self,
        keyword: &str,
        item_type: Option<&str>,
    ) -> Result<String> {
        let response = self.portal.search(keyword, item_type, Some(20)).await?;

        if response.results.is_empty() {
            return Ok("No matching items found.".to_string());
        }

        let lines: Vec<String> = response
            .results
            .into_iter()
            .map(|item| {
                let title = item.title.unwrap_or_else(|| item.id.clone());
                format!("{}: {} | Type: {}", title, item.id, item.item_type)
            })
            .collect();
        Ok(lines.join("\n"))
    }

    // === Data Retrieval ===

    /// Fetch a feature layer's attribute table as CSV text
    ///
    /// Geometry is excluded entirely; column order follows the layer's
    /// declared field order; nulls serialize as empty cells. `max_rows`
    /// caps the query (the 20-row sampling variant); zero rows yield
    /// header-only output.
    pub async fn get_feature_table(
        &self,
        service_url: &str,
        max_rows: Option<u32>,
    ) -> Result<String> {
        let query = self.portal.query_layer(service_url, max_rows).await?;
        Ok(table::to_csv(&query.fields, &query.features))
    }

    /// Retrieve an item's JSON definition with a synthetic header line
    ///
    /// Dispatch is a closed mapping over [`ItemKind`]: feature services
    /// resolve through their service URL, web maps / dashboards / apps
    /// through the item-data endpoint, and anything else is an explicit
    /// unsupported-type error. The JSON body is compact to minimize token
    /// cost.
    pub async fn get_item_definition(&self, item_id: &str) -> Result<String> {
        let item = self.portal.item(item_id).await?;
        let kind = ItemKind::from_type_tag(&item.item_type)
            .ok_or_else(|| ArcGisError::unsupported_item_type(&item.item_type))?;

        let definition: Value = if kind.uses_item_data() {
            self.portal.item_data(item_id).await?
        } else {
            let url = item
                .url
                .as_deref()
                .ok_or_else(|| ArcGisError::missing_service_url(item_id))?;
            serde_json::to_value(self.portal.service_definition(url).await?)?
        };

        let header = ItemHeader::new(
            item.title.as_deref().unwrap_or("Untitled"),
            &item.item_type,
            item.created.map(|c| c.to_string()).unwrap_or_default(),
        );
        Ok(format!(
            "{}\n{}",
            header.format(),
            serde_json::to_string(&definition)?
        ))
    }

    /// Compute descriptive statistics for one field of a feature layer
    ///
    /// A field name the layer does not declare is an error, never an empty
    /// statistics block. Summaries are computed fresh on every call.
    pub async fn summarize_field(&self, service_url: &str, field_name: &str) -> Result<String> {
        let query = self.portal.query_layer(service_url, None).await?;

        let field = query
            .fields
            .iter()
            .find(|f| f.name == field_name)
            .ok_or_else(|| ArcGisError::field_not_found(field_name, service_url))?;

        let summary = stats::summarize(field, &query.features);
        Ok(summary.render())
    }

    // === Content Creation ===

    /// Recreate an item from a definition produced by
    /// [`ArcGisClient::get_item_definition`]
    ///
    /// The first line must match the strict header grammar; the remainder
    /// must be a JSON definition body. Creation dispatches on the parsed
    /// kind: web maps, dashboards and apps through `addItem`, feature
    /// services through `createService`.
    pub async fn recreate_item(&self, definition: &str) -> Result<String> {
        let (header_line, body) = definition.split_once('\n').ok_or_else(|| {
            ArcGisError::malformed_header("expected a header line followed by a JSON body")
        })?;
        let header = ItemHeader::parse(header_line)?;
        let kind = ItemKind::from_type_tag(&header.type_tag)
            .ok_or_else(|| ArcGisError::unsupported_item_type(&header.type_tag))?;

        let json: Value = serde_json::from_str(body.trim())?;
        let compact = serde_json::to_string(&json)?;

        let created = match kind {
            ItemKind::FeatureService => {
                self.portal.create_service(&self.username, &compact).await?
            }
            ItemKind::WebMap | ItemKind::Dashboard | ItemKind::WebApp => {
                self.portal
                    .add_item(&self.username, &header.title, kind.type_tag(), &compact)
                    .await?
            }
        };

        let id = created.created_id().unwrap_or("unknown").to_string();
        Ok(format!(
            "Created {} '{}' ({})",
            header.type_tag, header.title, id
        ))
    }
}
