use crate::models::{
    self, CreateResponse, LayerDefinition, QueryResponse, SearchResponse, ServiceDefinition, Token,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Configuration for the portal client
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base URL of the portal (e.g., "https://www.arcgis.com")
    pub portal_url: String,
    /// User agent string for HTTP requests
    pub user_agent: Option<String>,
    /// HTTP client instance
    pub client: reqwest::Client,
    /// Authentication token appended to every request, if present
    pub token: Option<String>,
}

impl Configuration {
    /// Create a new configuration with default values
    pub fn new() -> Configuration {
        Configuration::default()
    }

    /// Root of the sharing API under this portal
    pub fn sharing_rest_url(&self) -> String {
        format!("{}/sharing/rest", self.portal_url.trim_end_matches('/'))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            portal_url: "https://www.arcgis.com".to_owned(),
            user_agent: Some("arcgis-rest/0.1".to_owned()),
            client: reqwest::Client::new(),
            token: None,
        }
    }
}

/// # Portal Client
///
/// A low-level async client for the ArcGIS Online REST API, covering the
/// pieces an MCP bridge needs: portal catalog search, item and item-data
/// retrieval, feature-layer attribute queries, and content creation.
///
/// The portal reports most failures as HTTP 200 with an `{"error": {...}}`
/// JSON envelope; every method unwraps that envelope and surfaces it as
/// [`ArcGisRestError::PortalError`].
///
/// ## Usage
///
/// ```rust,no_run
/// use arcgis_rest::{Configuration, PortalClient};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = PortalClient::new(Arc::new(Configuration::default()));
///
///     let token = client.generate_token("user", "secret").await?;
///     println!("token expires at {:?}", token.expires);
///     Ok(())
/// }
/// ```
pub struct PortalClient {
    configuration: Arc<Configuration>,
}

impl std::fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalClient")
            .field("portal_url", &self.configuration.portal_url)
            .field("authenticated", &self.configuration.token.is_some())
            .finish()
    }
}

/// Errors that can occur when talking to the ArcGIS REST API
#[derive(Debug)]
pub enum ArcGisRestError {
    /// Network, HTTP, or other request-level errors
    RequestError(Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing or deserialization errors
    ParseError(serde_json::Error),

    /// HTTP-level failures (non-2xx status)
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body, if readable
        message: String,
    },

    /// Errors reported by the portal in its JSON error envelope
    ///
    /// These are semantic errors from ArcGIS Online itself, like:
    /// - 498: Invalid token
    /// - 400: Invalid username or password / item does not exist
    /// - 403: Insufficient permissions
    PortalError {
        /// Portal error code (often mirrors an HTTP status)
        code: i64,
        /// Human-readable message from the portal
        message: String,
    },
}

impl std::fmt::Display for ArcGisRestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArcGisRestError::RequestError(e) => write!(f, "Request error: {}", e),
            ArcGisRestError::ParseError(e) => write!(f, "Parse error: {}", e),
            ArcGisRestError::HttpError { status, message } => {
                write!(f, "HTTP error ({}): {}", status, message)
            }
            ArcGisRestError::PortalError { code, message } => {
                write!(f, "ArcGIS portal error ({}): {}", code, message)
            }
        }
    }
}

impl std::error::Error for ArcGisRestError {}

impl PortalClient {
    /// Create a new portal client instance
    ///
    /// The configuration carries the portal base URL and, once authenticated,
    /// the token reused by every request. The client never refreshes the
    /// token itself; authentication is a create-once concern of the caller.
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    /// The configuration this client was built with
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    /// Request an authentication token for a named user
    ///
    /// Calls the portal's `generateToken` endpoint. A wrong username or
    /// password comes back as [`ArcGisRestError::PortalError`] with the
    /// portal's own message ("Invalid username or password.").
    pub async fn generate_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Token, ArcGisRestError> {
        let url = format!("{}/generateToken", self.configuration.sharing_rest_url());
        let referer = self.configuration.portal_url.clone();

        let form = [
            ("username", username),
            ("password", password),
            ("referer", referer.as_str()),
            ("expiration", "120"),
            ("f", "json"),
        ];

        let response = self
            .configuration
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ArcGisRestError::RequestError(Box::new(e)))?;

        Self::unwrap_json(response).await
    }

    /// Search the portal catalog by keyword
    ///
    /// `item_type` must be a SINGLE type tag (e.g., `"Feature Service"`).
    /// The portal interprets a list of types as logical AND across types and
    /// silently returns no matches, so this client never accepts one.
    pub async fn search(
        &self,
        keyword: &str,
        item_type: Option<&str>,
        num: Option<u32>,
    ) -> Result<SearchResponse, ArcGisRestError> {
        let q = match item_type {
            Some(t) => format!(r#"{} AND type:"{}""#, keyword, t),
            None => keyword.to_owned(),
        };

        let mut url = format!(
            "{}/search?q={}&f=json",
            self.configuration.sharing_rest_url(),
            urlencoding::encode(&q)
        );
        if let Some(num) = num {
            url.push_str(&format!("&num={}", num));
        }
        self.append_token(&mut url);

        self.get_json(&url).await
    }

    /// Retrieve a catalog item by its id
    pub async fn item(&self, item_id: &str) -> Result<models::PortalItem, ArcGisRestError> {
        let mut url = format!(
            "{}/content/items/{}?f=json",
            self.configuration.sharing_rest_url(),
            urlencoding::encode(item_id)
        );
        self.append_token(&mut url);

        self.get_json(&url).await
    }

    /// Retrieve the stored JSON data of an item (web maps, dashboards, apps)
    pub async fn item_data(&self, item_id: &str) -> Result<Value, ArcGisRestError> {
        let mut url = format!(
            "{}/content/items/{}/data?f=json",
            self.configuration.sharing_rest_url(),
            urlencoding::encode(item_id)
        );
        self.append_token(&mut url);

        self.get_json(&url).await
    }

    /// Retrieve the definition of a whole feature service (sub-layers, tables)
    pub async fn service_definition(
        &self,
        service_url: &str,
    ) -> Result<ServiceDefinition, ArcGisRestError> {
        let mut url = format!("{}?f=json", service_url.trim_end_matches('/'));
        self.append_token(&mut url);

        self.get_json(&url).await
    }

    /// Retrieve the definition of a single feature layer (declared fields)
    pub async fn layer_definition(
        &self,
        layer_url: &str,
    ) -> Result<LayerDefinition, ArcGisRestError> {
        let mut url = format!("{}?f=json", layer_url.trim_end_matches('/'));
        self.append_token(&mut url);

        self.get_json(&url).await
    }

    /// Query a feature layer for all attribute rows, geometry excluded
    ///
    /// `max_rows` maps to the service's `resultRecordCount` and is the only
    /// response-size bound; `None` asks for every row the service will
    /// return in one page.
    pub async fn query_layer(
        &self,
        layer_url: &str,
        max_rows: Option<u32>,
    ) -> Result<QueryResponse, ArcGisRestError> {
        let mut url = format!(
            "{}/query?where={}&outFields=*&returnGeometry=false&f=json",
            layer_url.trim_end_matches('/'),
            urlencoding::encode("1=1")
        );
        if let Some(max_rows) = max_rows {
            url.push_str(&format!("&resultRecordCount={}", max_rows));
        }
        self.append_token(&mut url);

        self.get_json(&url).await
    }

    /// Add a content item to a user's folder
    ///
    /// `text` is the item's JSON definition, stored verbatim by the portal.
    pub async fn add_item(
        &self,
        username: &str,
        title: &str,
        type_tag: &str,
        text: &str,
    ) -> Result<CreateResponse, ArcGisRestError> {
        let url = format!(
            "{}/content/users/{}/addItem",
            self.configuration.sharing_rest_url(),
            urlencoding::encode(username)
        );

        let mut form = vec![
            ("title", title),
            ("type", type_tag),
            ("text", text),
            ("f", "json"),
        ];
        let token = self.configuration.token.clone();
        if let Some(ref token) = token {
            form.push(("token", token.as_str()));
        }

        let response = self
            .configuration
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ArcGisRestError::RequestError(Box::new(e)))?;

        let created: CreateResponse = Self::unwrap_json(response).await?;
        Self::check_success(&created)?;
        Ok(created)
    }

    /// Create a new hosted feature service from a service definition
    pub async fn create_service(
        &self,
        username: &str,
        create_parameters: &str,
    ) -> Result<CreateResponse, ArcGisRestError> {
        let url = format!(
            "{}/content/users/{}/createService",
            self.configuration.sharing_rest_url(),
            urlencoding::encode(username)
        );

        let mut form = vec![
            ("createParameters", create_parameters),
            ("outputType", "featureService"),
            ("f", "json"),
        ];
        let token = self.configuration.token.clone();
        if let Some(ref token) = token {
            form.push(("token", token.as_str()));
        }

        let response = self
            .configuration
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ArcGisRestError::RequestError(Box::new(e)))?;

        let created: CreateResponse = Self::unwrap_json(response).await?;
        Self::check_success(&created)?;
        Ok(created)
    }

    fn append_token(&self, url: &mut String) {
        if let Some(ref token) = self.configuration.token {
            url.push_str(&format!("&token={}", urlencoding::encode(token)));
        }
    }

    async fn get_json<T>(&self, url: &str) -> Result<T, ArcGisRestError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.configuration.client.get(url);
        if let Some(ref ua) = self.configuration.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ArcGisRestError::RequestError(Box::new(e)))?;

        Self::unwrap_json(response).await
    }

    /// Read a response body, surfacing HTTP failures and the portal's
    /// HTTP-200 error envelope before deserializing into the target type
    async fn unwrap_json<T>(response: reqwest::Response) -> Result<T, ArcGisRestError>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ArcGisRestError::HttpError { status, message });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ArcGisRestError::RequestError(Box::new(e)))?;

        if let Ok(models::MaybeError { error: Some(err) }) =
            serde_json::from_value::<models::MaybeError>(body.clone())
        {
            return Err(ArcGisRestError::PortalError {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(body).map_err(ArcGisRestError::ParseError)
    }

    fn check_success(created: &CreateResponse) -> Result<(), ArcGisRestError> {
        if created.success == Some(false) {
            return Err(ArcGisRestError::PortalError {
                code: 400,
                message: "Portal reported failure for content creation".to_string(),
            });
        }
        Ok(())
    }
}
