#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use immich_api::{ApiError, Asset, AssetKind, MediaPayload};
use immich_slideshow::source::AssetSource;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub fn asset(id: &str) -> Asset {
    Asset {
        id: id.to_string(),
        filename: format!("{id}.jpg"),
        kind: AssetKind::Image,
        thumbnail_url: format!("http://immich.test/api/assets/{id}/thumbnail?size=preview"),
        original_url: format!("http://immich.test/api/assets/{id}/original"),
        file_created_at: None,
        file_modified_at: None,
        device_id: Some("phone".to_string()),
    }
}

pub fn assets(ids: &[&str]) -> Vec<Asset> {
    ids.iter().map(|id| asset(id)).collect()
}

pub fn auth_error() -> ApiError {
    ApiError::Auth(StatusCode::UNAUTHORIZED)
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".to_string(),
    }
}

/// Scriptable [`AssetSource`]: queued results are returned first, then the
/// steady asset list. An optional semaphore holds fetches until released.
#[derive(Default)]
pub struct FakeSource {
    queued: Mutex<VecDeque<Result<Vec<Asset>, ApiError>>>,
    steady: Mutex<Vec<Asset>>,
    gate: Option<Arc<Semaphore>>,
    fail_media: AtomicBool,
    fetches: AtomicUsize,
    media_fetches: AtomicUsize,
}

impl FakeSource {
    pub fn with_assets(ids: &[&str]) -> Self {
        Self {
            steady: Mutex::new(assets(ids)),
            ..Self::default()
        }
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_assets(&self, ids: &[&str]) {
        *self.steady.lock() = assets(ids);
    }

    pub fn push_failure(&self, err: ApiError) {
        self.queued.lock().push_back(Err(err));
    }

    pub fn fail_media(&self, fail: bool) {
        self.fail_media.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn media_fetches(&self) -> usize {
        self.media_fetches.load(Ordering::SeqCst)
    }

    /// Poll until `fetches()` reaches `n`, panicking after two seconds.
    pub async fn wait_for_fetches(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.fetches() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timeout waiting for fetch");
    }
}

#[async_trait]
impl AssetSource for FakeSource {
    async fn fetch_assets(&self) -> Result<Vec<Asset>, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(next) = self.queued.lock().pop_front() {
            return next;
        }
        Ok(self.steady.lock().clone())
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaPayload, ApiError> {
        self.media_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_media.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(MediaPayload {
            content_type: Some("image/jpeg".to_string()),
            bytes: Bytes::from(url.to_string()),
        })
    }
}
