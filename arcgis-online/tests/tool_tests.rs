//! Integration tests for the tool operations against a mocked portal.

use std::sync::Arc;

use arcgis_online::{ArcGisClient, ArcGisConfig, ArcGisError, tools};
use arcgis_rest::{Configuration, PortalClient};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a client whose session points at the mock portal
fn mock_client(server: &MockServer) -> ArcGisClient {
    let config = Arc::new(Configuration {
        portal_url: server.uri(),
        user_agent: Some("arcgis-online-tests/1.0".to_string()),
        client: reqwest::Client::new(),
        token: Some("test-token".to_string()),
    });
    ArcGisClient::from_portal(PortalClient::new(config), "tester")
}

#[tokio::test]
async fn connect_authenticates_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "issued-token",
            "expires": 1700000000000i64
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ArcGisConfig::new().with_portal_url(server.uri());
    let client = ArcGisClient::connect(config, "tester", "secret")
        .await
        .expect("authentication should succeed");

    assert_eq!(client.username(), "tester");
    assert!(client.portal().configuration().token.is_some());
}

#[tokio::test]
async fn connect_failure_is_fatal_auth_error() {
    let server = MockServer::start().await;

    // The portal reports bad credentials as HTTP 200 with an error envelope
    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Unable to generate token.",
                "details": ["Invalid username or password."]
            }
        })))
        .mount(&server)
        .await;

    let config = ArcGisConfig::new().with_portal_url(server.uri());
    let err = ArcGisClient::connect(config, "tester", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, ArcGisError::Auth { .. }));
    assert!(err.to_string().contains("Unable to generate token"));
}

#[tokio::test]
async fn search_layers_expands_sub_layers() {
    let server = MockServer::start().await;
    let service_url = format!("{}/rest/services/Roads/FeatureServer", server.uri());

    // The type filter must be folded into the query as a single string
    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .and(query_param("q", r#"roads AND type:"Feature Service""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "results": [{
                "id": "item1",
                "title": "Roads",
                "type": "Feature Service",
                "created": 1700000000000i64,
                "url": service_url
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/services/Roads/FeatureServer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "layers": [
                {"id": 0, "name": "Highways"},
                {"id": 1, "name": "Streets"},
                {"id": 2, "name": "Trails"}
            ],
            "tables": []
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let listing = client.search_layers("roads").await.unwrap();

    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], format!("Roads: {}/0", service_url));
    assert_eq!(lines[1], format!("Roads: {}/1", service_url));
    assert_eq!(lines[2], format!("Roads: {}/2", service_url));
}

#[tokio::test]
async fn search_layers_with_no_matches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"total": 0, "results": []})),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let listing = tools::search_layers(&client, "nothing").await;
    assert_eq!(listing, "No matching layers found.");
}

#[tokio::test]
async fn search_content_lists_items_with_types() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .and(query_param("q", r#"traffic AND type:"Web Map""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "results": [
                {"id": "aaa", "title": "Traffic Map", "type": "Web Map"},
                {"id": "bbb", "title": "Old Traffic Map", "type": "Web Map"}
            ]
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let listing = client
        .search_content("traffic", Some("Web Map"))
        .await
        .unwrap();

    assert_eq!(
        listing,
        "Traffic Map: aaa | Type: Web Map\nOld Traffic Map: bbb | Type: Web Map"
    );
}

#[tokio::test]
async fn feature_table_is_exact_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/services/Parcels/FeatureServer/0/query"))
        .and(query_param("returnGeometry", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                {"name": "Name", "type": "esriFieldTypeString"}
            ],
            "features": [
                {"attributes": {"OBJECTID": 1, "Name": "A"}},
                {"attributes": {"OBJECTID": 2, "Name": "B"}}
            ]
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let layer_url = format!("{}/rest/services/Parcels/FeatureServer/0", server.uri());
    let csv = client.get_feature_table(&layer_url, None).await.unwrap();

    assert_eq!(csv, "OBJECTID,Name\n1,A\n2,B");
}

#[tokio::test]
async fn feature_table_sampling_caps_row_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/services/Parcels/FeatureServer/0/query"))
        .and(query_param("resultRecordCount", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": [{"name": "OBJECTID", "type": "esriFieldTypeOID"}],
            "features": [{"attributes": {"OBJECTID": 1}}]
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let layer_url = format!("{}/rest/services/Parcels/FeatureServer/0", server.uri());
    let csv = client.get_feature_table(&layer_url, Some(20)).await.unwrap();

    assert_eq!(csv, "OBJECTID\n1");
}

#[tokio::test]
async fn feature_table_error_is_reported_not_raised() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/services/Gone/FeatureServer/0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Invalid URL", "details": []}
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let layer_url = format!("{}/rest/services/Gone/FeatureServer/0", server.uri());
    let text = tools::get_feature_table(&client, &layer_url, None).await;

    assert!(text.starts_with("Error fetching table:"));
    assert!(text.contains("Invalid URL"));
}

#[tokio::test]
async fn summarize_field_unknown_field_is_an_error_string() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/services/Parcels/FeatureServer/0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": [{"name": "OBJECTID", "type": "esriFieldTypeOID"}],
            "features": [{"attributes": {"OBJECTID": 1}}]
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let layer_url = format!("{}/rest/services/Parcels/FeatureServer/0", server.uri());
    let text = tools::summarize_field(&client, &layer_url, "NoSuchField").await;

    assert!(text.starts_with("Error summarizing field:"));
    assert!(text.contains("NoSuchField"));
    assert!(!text.contains("Total rows"));
}

#[tokio::test]
async fn summarize_field_numeric_statistics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/services/Parcels/FeatureServer/0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": [{"name": "Value", "type": "esriFieldTypeInteger"}],
            "features": [
                {"attributes": {"Value": 1}},
                {"attributes": {"Value": 2}},
                {"attributes": {"Value": 3}},
                {"attributes": {"Value": 4}}
            ]
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let layer_url = format!("{}/rest/services/Parcels/FeatureServer/0", server.uri());
    let text = client.summarize_field(&layer_url, "Value").await.unwrap();

    assert!(text.contains("Field: Value (Integer)"));
    assert!(text.contains("Total rows: 4"));
    assert!(text.contains("Median: 2.5"));
    assert!(text.contains("Min: 1"));
    assert!(text.contains("Max: 4"));
}

#[tokio::test]
async fn item_definition_for_web_map_uses_item_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/content/items/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "title": "X",
            "type": "Web Map",
            "created": 123
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/content/items/abc/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "operationalLayers": [],
            "version": "2.30"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let text = client.get_item_definition("abc").await.unwrap();

    let (header, body) = text.split_once('\n').unwrap();
    assert_eq!(header, "Item: X | Type: Web Map | Created: 123");
    // Compact serialization, no pretty-printing
    assert!(!body.contains('\n'));
    assert!(!body.contains(": "));
    assert!(body.contains("\"operationalLayers\""));
}

#[tokio::test]
async fn item_definition_unsupported_type_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/content/items/csv1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "csv1",
            "title": "Spreadsheet",
            "type": "CSV",
            "created": 123
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let text = tools::get_item_definition(&client, "csv1").await;

    assert!(text.starts_with("Error fetching item definition:"));
    assert!(text.contains("Unsupported item type: CSV"));
}

#[tokio::test]
async fn recreate_item_round_trips_the_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/content/users/tester/addItem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "id": "new1"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let definition = "Item: X | Type: Web Map | Created: 123\n{\"operationalLayers\":[]}";
    let status = client.recreate_item(definition).await.unwrap();

    assert_eq!(status, "Created Web Map 'X' (new1)");
}

#[tokio::test]
async fn recreate_item_dispatches_feature_services_to_create_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/content/users/tester/createService"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "itemId": "svc9"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let definition =
        "Item: Parcels | Type: Feature Service | Created: 456\n{\"name\":\"Parcels\"}";
    let status = client.recreate_item(definition).await.unwrap();

    assert_eq!(status, "Created Feature Service 'Parcels' (svc9)");
}

#[tokio::test]
async fn recreate_item_rejects_malformed_headers() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let text = tools::recreate_item(&client, "Item: X; Type: Web Map\n{}").await;
    assert!(text.starts_with("Error recreating item:"));
    assert!(text.contains("Malformed item header"));
}

#[tokio::test]
async fn recreate_item_rejects_non_json_bodies() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let text =
        tools::recreate_item(&client, "Item: X | Type: Web Map | Created: 123\nnot json").await;
    assert!(text.starts_with("Error recreating item:"));
}

#[tokio::test]
async fn portal_error_envelope_surfaces_in_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 498, "message": "Invalid token.", "details": []}
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let text = tools::search_content(&client, "anything", None).await;

    assert!(text.starts_with("Error searching content:"));
    assert!(text.contains("498"));
    assert!(text.contains("Invalid token"));
}
