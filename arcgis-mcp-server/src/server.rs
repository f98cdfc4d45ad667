use arcgis_online::{ArcGisClient, ArcGisConfig, ArcGisError, tools};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::env;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const METHODS: &[&str] = &[
    "initialize",
    "initialized",
    "shutdown",
    "tools/list",
    "arcgis.searchLayers",
    "arcgis.searchContent",
    "arcgis.getFeatureTable",
    "arcgis.getItemDefinition",
    "arcgis.summarizeField",
    "arcgis.recreateItem",
];

pub struct ArcGisMcpServer {
    client: ArcGisClient,
}

impl ArcGisMcpServer {
    pub async fn bootstrap() -> Result<(), ServerError> {
        let server = Self::new().await?;
        server.run().await
    }

    /// Read credentials, authenticate once, and build the shared session.
    /// Missing credentials or a failed authentication abort startup before
    /// any tool is reachable.
    async fn new() -> Result<Self, ServerError> {
        dotenvy::dotenv().ok();

        let username = env::var("ARCGIS_USERNAME")
            .map_err(|_| ServerError::Config("ARCGIS_USERNAME is not set".to_string()))?;
        let password = env::var("ARCGIS_PASSWORD")
            .map_err(|_| ServerError::Config("ARCGIS_PASSWORD is not set".to_string()))?;
        let portal_url = env::var("ARCGIS_PORTAL_URL").ok();
        let user_agent = env::var("ARCGIS_USER_AGENT").ok();

        let mut config = ArcGisConfig::new();
        if let Some(url) = portal_url {
            config = config.with_portal_url(url);
        }
        if let Some(ua) = user_agent {
            config = config.with_user_agent(ua);
        }

        let client = ArcGisClient::connect(config, &username, &password).await?;
        tracing::info!("authenticated against ArcGIS Online as {}", username);

        Ok(Self { client })
    }

    async fn run(self) -> Result<(), ServerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();

        let reader = BufReader::new(stdin);
        let mut writer = BufWriter::new(stdout);

        self.send_ready(&mut writer).await?;

        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<Request>(trimmed) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!("invalid request: {err}");
                    let response =
                        Response::error(None, ServerError::InvalidRequest(err.to_string()));
                    self.write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            let response = self.handle_request(request).await;
            self.write_response(&mut writer, &response).await?;
        }

        Ok(())
    }

    async fn send_ready(&self, writer: &mut BufWriter<io::Stdout>) -> Result<(), ServerError> {
        let ready = json!({
            "jsonrpc": "2.0",
            "id": null,
            "result": {
                "server": "arcgis-mcp-server",
                "version": env!("CARGO_PKG_VERSION"),
                "methods": METHODS,
            }
        });

        let payload = serde_json::to_string(&ready).map_err(ServerError::Serialization)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        tracing::info!("ArcGIS MCP server ready");
        Ok(())
    }

    async fn write_response(
        &self,
        writer: &mut BufWriter<io::Stdout>,
        response: &Response,
    ) -> Result<(), ServerError> {
        let payload = serde_json::to_string(response).map_err(ServerError::Serialization)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn handle_request(&self, request: Request) -> Response {
        match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(request.id, result),
            Err(err) => Response::error(request.id, err),
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        if method == "tools/call" {
            let params: CallToolParams = parse_required_params(method, params)?;
            let spec = find_tool_spec(&params.name)
                .ok_or_else(|| ServerError::InvalidMethod(params.name.clone()))?;

            let value = self.invoke_method(spec.method_name, params.arguments).await?;
            let response = ToolResponse::from_value(value);
            return serde_json::to_value(response).map_err(ServerError::Serialization);
        }

        if find_tool_spec_by_method(method).is_some() {
            let value = self.invoke_method(method, params).await?;
            let response = ToolResponse::from_value(value);
            return serde_json::to_value(response).map_err(ServerError::Serialization);
        }

        self.invoke_method(method, params).await
    }

    /// Tool-level failures never reach this function's error channel: the
    /// tool layer renders them into the returned text, so a remote failure
    /// and a normal listing travel the same way. Only protocol problems
    /// (bad params, unknown method) become JSON-RPC errors.
    async fn invoke_method(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        match method {
            "initialize" => {
                let params: InitializeParams = parse_optional_params(method, params)?;
                let result = InitializeResult::new(params.client_info);
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "initialized" => Ok(Value::Null),
            "shutdown" => Ok(Value::Null),
            "tools/list" => {
                let params: ListToolsParams = parse_optional_params(method, params)?;
                let _ = params.cursor;
                let result = ListToolsResult {
                    tools: tool_descriptors(),
                    next_cursor: None,
                };
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "arcgis.searchLayers" => {
                let params: SearchLayersParams = parse_required_params(method, params)?;
                let text = tools::search_layers(&self.client, &params.keyword).await;
                Ok(Value::String(text))
            }
            "arcgis.searchContent" => {
                let params: SearchContentParams = parse_required_params(method, params)?;
                let text = tools::search_content(
                    &self.client,
                    &params.keyword,
                    params.item_type.as_ref().map(|t| t.as_str()),
                )
                .await;
                Ok(Value::String(text))
            }
            "arcgis.getFeatureTable" => {
                let params: FeatureTableParams = parse_required_params(method, params)?;
                let text =
                    tools::get_feature_table(&self.client, &params.service_url, params.max_rows)
                        .await;
                Ok(Value::String(text))
            }
            "arcgis.getItemDefinition" => {
                let params: ItemDefinitionParams = parse_required_params(method, params)?;
                let text = tools::get_item_definition(&self.client, &params.item_id).await;
                Ok(Value::String(text))
            }
            "arcgis.summarizeField" => {
                let params: SummarizeFieldParams = parse_required_params(method, params)?;
                let text = tools::summarize_field(
                    &self.client,
                    &params.service_url,
                    &params.field_name,
                )
                .await;
                Ok(Value::String(text))
            }
            "arcgis.recreateItem" => {
                let params: RecreateItemParams = parse_required_params(method, params)?;
                let text = tools::recreate_item(&self.client, &params.definition).await;
                Ok(Value::String(text))
            }
            other => Err(ServerError::InvalidMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    _jsonrpc: Option<String>,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, error: ServerError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(ResponseError::from(error)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<ServerError> for ResponseError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(message) => Self {
                code: -32600,
                message,
                data: None,
            },
            ServerError::InvalidMethod(method) => Self {
                code: -32601,
                message: format!("Unknown method: {method}"),
                data: None,
            },
            ServerError::InvalidParams(message) => Self {
                code: -32602,
                message,
                data: None,
            },
            ServerError::Json(err) => Self {
                code: -32700,
                message: err.to_string(),
                data: None,
            },
            ServerError::Io(err) => Self {
                code: -32020,
                message: err.to_string(),
                data: None,
            },
            ServerError::Config(message) => Self {
                code: -32021,
                message,
                data: None,
            },
            ServerError::ArcGis(err) => Self {
                code: -32010,
                message: err.to_string(),
                data: None,
            },
            ServerError::Serialization(err) => Self {
                code: -32603,
                message: err.to_string(),
                data: None,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown method: {0}")]
    InvalidMethod(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    ArcGis(#[from] ArcGisError),
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),
}

type ServerResult<T> = Result<T, ServerError>;

fn parse_required_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
        None => Err(ServerError::InvalidParams(format!(
            "{method}: missing parameters"
        ))),
    }
}

fn parse_optional_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned + Default,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
        None => Ok(T::default()),
    }
}

/// A single portal item type, normalized from either a JSON string or a
/// one-element array
///
/// The portal's search API interprets a list of types as logical AND across
/// types and silently returns zero matches, so multi-element arrays are
/// rejected at the parameter boundary instead of producing empty listings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemTypeFilter(String);

impl ItemTypeFilter {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ItemTypeFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::One(s) => Ok(ItemTypeFilter(s)),
            Raw::Many(mut v) if v.len() == 1 => Ok(ItemTypeFilter(v.remove(0))),
            Raw::Many(_) => Err(serde::de::Error::custom(
                "item_type must be a single type string",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchLayersParams {
    keyword: String,
}

#[derive(Debug, Deserialize)]
struct SearchContentParams {
    keyword: String,
    #[serde(default)]
    item_type: Option<ItemTypeFilter>,
}

#[derive(Debug, Deserialize)]
struct FeatureTableParams {
    service_url: String,
    #[serde(default)]
    max_rows: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ItemDefinitionParams {
    item_id: String,
}

#[derive(Debug, Deserialize)]
struct SummarizeFieldParams {
    service_url: String,
    field_name: String,
}

#[derive(Debug, Deserialize)]
struct RecreateItemParams {
    definition: String,
}

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(default, rename = "clientInfo")]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    capabilities: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "clientInfo")]
    client_info: Option<ClientInfoSummary>,
}

impl InitializeResult {
    fn new(client_info: Option<ClientInfo>) -> Self {
        let client_info = client_info.map(|info| ClientInfoSummary {
            name: info.name,
            version: info.version,
        });

        Self {
            server_info: ServerInfo {
                name: "arcgis-mcp-server",
                version: env!("CARGO_PKG_VERSION"),
            },
            capabilities: Some(json!({
                "tools": {
                    "list": true
                }
            })),
            client_info,
        }
    }
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ClientInfoSummary {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListToolsParams {
    #[serde(default, rename = "cursor")]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    tool_name: &'static str,
    method_name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ListToolsResult {
    tools: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "isError")]
    is_error: Option<bool>,
}

impl ToolResponse {
    /// Tool results are plain text (listings, CSV, statistics blocks);
    /// non-string values fall back to pretty JSON
    fn from_value(value: Value) -> Self {
        let text = match value {
            Value::String(text) => text,
            other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
        };
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

fn tool_descriptors() -> Vec<ToolDescriptor> {
    tool_specs()
        .into_iter()
        .map(|spec| ToolDescriptor {
            name: spec.tool_name,
            description: spec.description,
            input_schema: spec.input_schema,
        })
        .collect()
}

fn find_tool_spec(name: &str) -> Option<ToolSpec> {
    tool_specs().into_iter().find(|spec| spec.tool_name == name)
}

fn find_tool_spec_by_method(method: &str) -> Option<ToolSpec> {
    tool_specs()
        .into_iter()
        .find(|spec| spec.method_name == method)
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            tool_name: "arcgis_search_layers",
            method_name: "arcgis.searchLayers",
            description: "Search ArcGIS Online for feature layers by keyword; returns one line per layer with its REST endpoint URL",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "keyword": {"type": "string", "description": "Search keyword"}
                },
                "required": ["keyword"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "arcgis_search_content",
            method_name: "arcgis.searchContent",
            description: "Search the ArcGIS Online content catalog by keyword with an optional item type filter; returns one line per item with its ID and type",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "keyword": {"type": "string", "description": "Search keyword"},
                    "item_type": {
                        "type": "string",
                        "description": "A single item type to constrain the search, e.g. 'Web Map' or 'Dashboard'"
                    }
                },
                "required": ["keyword"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "arcgis_get_feature_table",
            method_name: "arcgis.getFeatureTable",
            description: "Fetch the attribute table of a hosted feature layer as CSV text, geometry excluded",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service_url": {"type": "string", "description": "REST service URL of the feature layer"},
                    "max_rows": {"type": "integer", "minimum": 1, "description": "Optional row cap, e.g. 20 for a sample"}
                },
                "required": ["service_url"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "arcgis_get_item_definition",
            method_name: "arcgis.getItemDefinition",
            description: "Retrieve an item's JSON definition with a header line describing title, type and creation time",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "item_id": {"type": "string", "description": "ArcGIS Online item ID"}
                },
                "required": ["item_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "arcgis_summarize_field",
            method_name: "arcgis.summarizeField",
            description: "Compute descriptive statistics for one field of a feature layer: counts, nulls, top values, and numeric or date statistics when applicable",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service_url": {"type": "string", "description": "REST service URL of the feature layer"},
                    "field_name": {"type": "string", "description": "Name of the field to summarize"}
                },
                "required": ["service_url", "field_name"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "arcgis_recreate_item",
            method_name: "arcgis.recreateItem",
            description: "Recreate an item from a definition produced by arcgis_get_item_definition (header line plus JSON body)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "definition": {"type": "string", "description": "Header line plus JSON definition body"}
                },
                "required": ["definition"],
                "additionalProperties": false
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_filter_accepts_a_string() {
        let params: SearchContentParams =
            serde_json::from_value(json!({"keyword": "roads", "item_type": "Feature Layer"}))
                .unwrap();
        assert_eq!(
            params.item_type.unwrap().as_str(),
            "Feature Layer"
        );
    }

    #[test]
    fn item_type_filter_normalizes_single_element_arrays() {
        let params: SearchContentParams =
            serde_json::from_value(json!({"keyword": "roads", "item_type": ["Feature Layer"]}))
                .unwrap();
        assert_eq!(
            params.item_type.unwrap().as_str(),
            "Feature Layer"
        );
    }

    #[test]
    fn item_type_filter_rejects_multi_element_arrays() {
        let result: Result<SearchContentParams, _> = serde_json::from_value(
            json!({"keyword": "roads", "item_type": ["Feature Layer", "Web Map"]}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn item_type_filter_is_optional() {
        let params: SearchContentParams =
            serde_json::from_value(json!({"keyword": "roads"})).unwrap();
        assert!(params.item_type.is_none());
    }

    #[test]
    fn every_method_has_a_tool_spec() {
        for method in METHODS.iter().filter(|m| m.starts_with("arcgis.")) {
            assert!(
                find_tool_spec_by_method(method).is_some(),
                "missing tool spec for {method}"
            );
        }
    }

    #[test]
    fn tool_lookup_by_name() {
        let spec = find_tool_spec("arcgis_summarize_field").unwrap();
        assert_eq!(spec.method_name, "arcgis.summarizeField");
        assert!(find_tool_spec("unknown_tool").is_none());
    }

    #[test]
    fn string_tool_results_are_text_content() {
        let response = ToolResponse::from_value(Value::String("OBJECTID,Name\n1,A".to_string()));
        let ToolContent::Text { ref text } = response.content[0];
        assert_eq!(text, "OBJECTID,Name\n1,A");
    }
}
