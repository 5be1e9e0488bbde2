use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::entities::{EntityState, SlideshowEntities};
use crate::events::{RefreshTrigger, ServiceCall};
use crate::slideshow::{RefreshHealth, SlideshowSnapshot};

#[derive(Clone)]
struct AppState {
    entities: Arc<SlideshowEntities>,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    available: bool,
    count: usize,
    index: usize,
    current_image_id: Option<String>,
    navigation_mode: String,
    health: RefreshHealth,
    last_refreshed: Option<String>,
}

impl From<&SlideshowSnapshot> for StatusBody {
    fn from(snapshot: &SlideshowSnapshot) -> Self {
        Self {
            available: snapshot.is_available(),
            count: snapshot.count,
            index: snapshot.index,
            current_image_id: snapshot.current.as_ref().map(|asset| asset.id.clone()),
            navigation_mode: snapshot.navigation_mode.clone(),
            health: snapshot.health,
            last_refreshed: snapshot.last_refreshed.map(|at| at.to_rfc3339()),
        }
    }
}

pub fn router(entities: Arc<SlideshowEntities>) -> Router {
    let state = AppState { entities };
    Router::new()
        .route("/api/status", get(status))
        .route("/api/entities", get(list_entities))
        .route("/api/entities/{unique_id}", get(get_entity))
        .route("/api/camera/image", get(camera_image))
        .route("/api/services/{service}", post(call_service))
        .with_state(state)
}

/// Bind and serve the entity surface until `cancel` fires.
pub async fn bind(
    entities: Arc<SlideshowEntities>,
    bind_addr: SocketAddr,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
    let listener = TcpListener::bind(bind_addr).await?;
    let local = listener.local_addr()?;
    info!(%local, "entity server listening");
    let app = router(entities);
    Ok(tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await?;
        Ok(())
    }))
}

async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    let snapshot = state.entities.coordinator().snapshot();
    Json(StatusBody::from(&snapshot))
}

async fn list_entities(State(state): State<AppState>) -> Json<Vec<EntityState>> {
    Json(state.entities.states())
}

async fn get_entity(State(state): State<AppState>, Path(unique_id): Path<String>) -> Response {
    match state.entities.state(&unique_id) {
        Some(entity) => Json(entity).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown entity {unique_id}") })),
        )
            .into_response(),
    }
}

async fn camera_image(State(state): State<AppState>) -> Response {
    match state.entities.camera_image().await {
        Some(image) => {
            let content_type = image
                .payload
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "no-store".to_string()),
                ],
                image.payload.bytes,
            )
                .into_response()
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, "no image available").into_response(),
    }
}

async fn call_service(State(state): State<AppState>, Path(service): Path<String>) -> Response {
    let Some(call) = ServiceCall::from_name(&service) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown service {service}") })),
        )
            .into_response();
    };
    debug!(%call, "service call");
    let coordinator = state.entities.coordinator();
    match call {
        ServiceCall::NextImage => coordinator.advance(),
        ServiceCall::PreviousImage => coordinator.previous(),
        ServiceCall::Refresh => {
            if let Err(err) = coordinator.refresh(RefreshTrigger::Manual).await {
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": err.message, "kind": err.kind })),
                )
                    .into_response();
            }
        }
    }
    Json(StatusBody::from(&coordinator.snapshot())).into_response()
}
