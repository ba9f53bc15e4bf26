use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use tecpoint_catalog::{
    AppState,
    config::CatalogConfig,
    database::{MemoryProductStore, ProductStore},
    routes,
    services::MemoryBlobStore,
};

const BOUNDARY: &str = "tecpoint-boundary";

enum Part<'a> {
    Text(&'a str, String),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn app() -> (Router, Arc<MemoryProductStore>, Arc<MemoryBlobStore>) {
    let products = Arc::new(MemoryProductStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("https://cdn.test"));
    let state = AppState::new(products.clone(), blobs.clone(), CatalogConfig::default());
    (routes::create_router().with_state(state), products, blobs)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn cable_draft() -> String {
    json!({
        "productName": "Cable USB-C",
        "description": "Cable USB-C a USB-C",
        "sku": "CBL001",
        "upc": "123",
        "slug": "cable-usb-c",
        "detailPrice": "10.5",
        "wholesalePrice": "6",
        "categories": ["cables"],
        "brand": "Naztech"
    })
    .to_string()
}

async fn create_cable(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(multipart_request(
            "POST",
            "/productos",
            &[
                Part::Text("draft", cable_draft()),
                Part::File("images", "frente.jpg", "image/jpeg", &[0xff, 0xd8, 0xff]),
                Part::File("images", "lado.png", "image/png", &[0x89, 0x50]),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _, _) = app();

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn create_then_list_products() {
    let (app, _, blobs) = app();

    let created = create_cable(&app).await;
    assert_eq!(created["version"], 1);
    assert_eq!(created["precio"]["detalle"], 10.5);
    assert_eq!(created["imagenes"]["imagen_01"]["id"], "CBL001_01");
    assert_eq!(created["imagenes"]["imagen_02"]["id"], "CBL001_02");
    assert_eq!(created["permalink"], "https://tecpoint.ws/shop/cable-usb-c");
    assert_eq!(
        blobs.get("productos/Naztech/CBL001/CBL001_02").unwrap().content_type,
        "image/png"
    );

    let response = app
        .oneshot(Request::get("/productos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list = json_body(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["sku"], "CBL001");
}

#[tokio::test]
async fn invalid_draft_returns_error_codes() {
    let (app, products, _) = app();
    let mut draft: Value = serde_json::from_str(&cable_draft()).unwrap();
    draft["sku"] = json!("");

    let response = app
        .oneshot(multipart_request(
            "POST",
            "/productos",
            &[Part::Text("draft", draft.to_string())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert_eq!(body["errors"], json!(["missing_sku", "missing_images"]));
    assert_eq!(products.write_count(), 0);
}

#[tokio::test]
async fn patch_applies_edits_and_appends_images() {
    let (app, _, _) = app();
    let created = create_cable(&app).await;
    let id = created["id"].as_str().unwrap();

    let cambios = json!({
        "version": 1,
        "edits": [
            { "field": "stock", "value": false },
            { "field": "precio_detalle", "value": 12.5 }
        ]
    });

    let response = app
        .oneshot(multipart_request(
            "PATCH",
            &format!("/productos/{}", id),
            &[
                Part::Text("cambios", cambios.to_string()),
                Part::File("images", "nuevo.webp", "image/webp", &[1, 2, 3]),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["version"], 2);
    assert_eq!(saved["extradata"]["stock"], false);
    assert_eq!(saved["precio"]["detalle"], 12.5);
    assert_eq!(saved["precio"]["mayoreo"], 6.0);
    assert_eq!(saved["imagenes"]["imagen_03"]["id"], "CBL001_03");
}

#[tokio::test]
async fn stale_version_is_rejected() {
    let (app, products, _) = app();
    let created = create_cable(&app).await;
    let id = created["id"].as_str().unwrap();

    let cambios = json!({ "version": 7, "edits": [{ "field": "color", "value": "rojo" }] });
    let response = app
        .oneshot(multipart_request(
            "PATCH",
            &format!("/productos/{}", id),
            &[Part::Text("cambios", cambios.to_string())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(products.write_count(), 1);
}

#[tokio::test]
async fn delete_image_route_removes_slot() {
    let (app, products, blobs) = app();
    let created = create_cable(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/productos/{}/imagenes/imagen_01?version=1", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert!(saved["imagenes"].get("imagen_01").is_none());
    assert_eq!(saved["imagenes"]["imagen_02"]["id"], "CBL001_02");
    assert_eq!(blobs.deletes().len(), 1);

    let stored = products
        .find_by_id(id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.record.imagenes.len(), 1);

    let response = app
        .oneshot(
            Request::delete(format!("/productos/{}/imagenes/foto?version=2", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let (app, _, _) = app();

    let response = app
        .oneshot(
            Request::get(format!("/productos/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn section_image_upload_returns_url() {
    let (app, _, blobs) = app();

    let response = app
        .oneshot(multipart_request(
            "POST",
            "/secciones/CBL001",
            &[Part::File("file", "banner.png", "image/png", &[0x89, 0x50])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["url"],
        "https://cdn.test/secciones/CBL001/banner.png"
    );
    assert!(blobs.get("secciones/CBL001/banner.png").is_some());
}
