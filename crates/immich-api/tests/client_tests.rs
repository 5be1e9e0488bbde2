use std::collections::HashMap;

use axum::Router;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use immich_api::{ApiError, AssetKind, ClientOptions, ErrorKind, ImmichClient, ThumbnailSize};
use serde_json::json;
use tokio::net::TcpListener;

const KEY: &str = "test-key";

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(KEY)
}

async fn ping(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    axum::Json(json!({ "res": "pong" })).into_response()
}

async fn albums(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    axum::Json(json!([
        { "id": "alb-1", "albumName": "Holidays", "assetCount": 2 },
        { "id": "alb-2", "assetCount": 0 }
    ]))
    .into_response()
}

async fn album(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if id != "alb-1" {
        return (StatusCode::NOT_FOUND, "no such album").into_response();
    }
    axum::Json(json!({
        "id": "alb-1",
        "albumName": "Holidays",
        "assetCount": 2,
        "assets": [
            {
                "id": "a1",
                "originalFileName": "beach.jpg",
                "type": "IMAGE",
                "fileCreatedAt": "2024-06-01T10:00:00.000Z",
                "deviceId": "phone"
            },
            { "id": "a2", "originalFileName": "clip.mp4", "type": "VIDEO" }
        ]
    }))
    .into_response()
}

async fn assets(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.get("size").map(String::as_str) != Some("25") {
        return (StatusCode::BAD_REQUEST, "unexpected page size").into_response();
    }
    axum::Json(json!([
        { "id": "x1", "originalFileName": "one.png", "type": "IMAGE" },
        { "id": "x2", "type": "SOMETHING_NEW" }
    ]))
    .into_response()
}

async fn thumbnail(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (
        [(header::CONTENT_TYPE, "image/jpeg")],
        format!("jpeg-bytes-for-{id}"),
    )
        .into_response()
}

async fn spawn_fake_immich() -> String {
    let app = Router::new()
        .route("/api/server/ping", get(ping))
        .route("/api/albums", get(albums))
        .route("/api/albums/{id}", get(album))
        .route("/api/assets", get(assets))
        .route("/api/assets/{id}/thumbnail", get(thumbnail));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn options() -> ClientOptions {
    ClientOptions {
        page_size: 25,
        thumbnail_size: ThumbnailSize::Thumbnail,
        ..ClientOptions::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ping_succeeds_with_valid_key() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, KEY, options()).unwrap();
    assert!(client.ping().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wrong_key_is_reported_as_auth_error() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, "wrong", options()).unwrap();
    let err = client.ping().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);

    let err = client.list_assets_in_album("alb-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(StatusCode::FORBIDDEN)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn albums_are_listed_with_fallback_names() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, KEY, options()).unwrap();
    let albums = client.list_albums().await.unwrap();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0].name, "Holidays");
    assert_eq!(albums[0].asset_count, 2);
    assert_eq!(albums[1].name, "Unnamed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn album_assets_keep_server_order_and_resolve_urls() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, KEY, options()).unwrap();
    let assets = client.list_assets_in_album("alb-1").await.unwrap();

    let ids: Vec<&str> = assets.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["a1", "a2"]);
    assert_eq!(assets[0].filename, "beach.jpg");
    assert_eq!(assets[0].kind, AssetKind::Image);
    assert_eq!(assets[0].device_id.as_deref(), Some("phone"));
    assert!(assets[0].file_created_at.is_some());
    assert_eq!(assets[1].kind, AssetKind::Video);
    assert_eq!(
        assets[0].thumbnail_url,
        format!("{}/api/assets/a1/thumbnail?size=thumbnail", client.base_url())
    );
    assert_eq!(
        assets[1].original_url,
        format!("{}/api/assets/a2/original", client.base_url())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_album_surfaces_status_error() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, KEY, options()).unwrap();
    let err = client.list_assets_in_album("nope").await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, "no such album");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_assets_use_configured_page_size() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, KEY, options()).unwrap();
    let assets = client.list_all_assets().await.unwrap();
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[1].kind, AssetKind::Other);
    assert_eq!(assets[1].filename, "Unknown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn download_returns_bytes_and_content_type() {
    let base = spawn_fake_immich().await;
    let client = ImmichClient::new(&base, KEY, options()).unwrap();
    let payload = client.download(&client.thumbnail_url("a1")).await.unwrap();
    assert_eq!(payload.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(&payload.bytes[..], b"jpeg-bytes-for-a1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_server_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ImmichClient::new(&format!("http://{addr}"), KEY, options()).unwrap();
    let err = client.list_albums().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}
