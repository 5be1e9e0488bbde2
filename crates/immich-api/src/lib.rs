//! Minimal async client for the handful of Immich REST endpoints the
//! slideshow needs: server ping, album listing, asset listing and media
//! download.
//!
//! Every request carries the `x-api-key` header. Failures are reported as
//! [`ApiError`], which callers can collapse into an [`ErrorKind`].

mod error;
mod types;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

pub use error::{ApiError, ErrorKind};
pub use types::{AlbumSummary, Asset, AssetKind, MediaPayload, ThumbnailSize};

use types::{AlbumResponse, AssetResponse, PingResponse};

const API_KEY_HEADER: &str = "x-api-key";
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
    /// `size` query parameter used when listing every asset.
    pub page_size: u32,
    /// Rendition used for [`ImmichClient::thumbnail_url`].
    pub thumbnail_size: ThumbnailSize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            page_size: 100,
            thumbnail_size: ThumbnailSize::Preview,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImmichClient {
    base_url: String,
    http: reqwest::Client,
    options: ClientOptions,
}

impl ImmichClient {
    pub fn new(
        server_url: &str,
        api_key: &str,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let trimmed = server_url.trim();
        let parsed = Url::parse(trimmed).map_err(|err| ApiError::InvalidUrl {
            url: trimmed.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: trimmed.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key.trim()).map_err(|_| ApiError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            http,
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/server/ping`; `true` when the server answers `pong`.
    pub async fn ping(&self) -> Result<bool, ApiError> {
        let body: PingResponse = self.get_json(&["api", "server", "ping"], &[]).await?;
        Ok(body.res.eq_ignore_ascii_case("pong"))
    }

    pub async fn list_albums(&self) -> Result<Vec<AlbumSummary>, ApiError> {
        let albums: Vec<AlbumResponse> = self.get_json(&["api", "albums"], &[]).await?;
        Ok(albums
            .into_iter()
            .map(|album| AlbumSummary {
                name: album.album_name.unwrap_or_else(|| "Unnamed".to_string()),
                id: album.id,
                asset_count: album.asset_count,
            })
            .collect())
    }

    pub async fn list_assets_in_album(&self, album_id: &str) -> Result<Vec<Asset>, ApiError> {
        let album: AlbumResponse = self
            .get_json(&["api", "albums", album_id.trim()], &[])
            .await?;
        debug!(album = %album.id, assets = album.assets.len(), "album assets listed");
        Ok(album
            .assets
            .into_iter()
            .map(|raw| self.resolve(raw))
            .collect())
    }

    pub async fn list_all_assets(&self) -> Result<Vec<Asset>, ApiError> {
        let size = self.options.page_size.to_string();
        let raw: Vec<AssetResponse> = self.get_json(&["api", "assets"], &[("size", size)]).await?;
        Ok(raw.into_iter().map(|raw| self.resolve(raw)).collect())
    }

    pub fn thumbnail_url(&self, asset_id: &str) -> String {
        format!(
            "{}/api/assets/{}/thumbnail?size={}",
            self.base_url,
            asset_id,
            self.options.thumbnail_size.as_str()
        )
    }

    pub fn original_url(&self, asset_id: &str) -> String {
        format!("{}/api/assets/{}/original", self.base_url, asset_id)
    }

    /// Fetch media bytes from one of the URLs produced by this client.
    pub async fn download(&self, url: &str) -> Result<MediaPayload, ApiError> {
        debug!(%url, "immich download");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let response = check_status(response).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        Ok(MediaPayload {
            content_type,
            bytes,
        })
    }

    fn resolve(&self, raw: AssetResponse) -> Asset {
        Asset {
            thumbnail_url: self.thumbnail_url(&raw.id),
            original_url: self.original_url(&raw.id),
            filename: raw
                .original_file_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            kind: raw.kind,
            file_created_at: raw.file_created_at,
            file_modified_at: raw.file_modified_at,
            device_id: raw.device_id,
            id: raw.id,
        }
    }

    /// Base URL plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base url".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "immich request");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(ApiError::from_transport)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ApiError::Auth(status));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }
    Ok(response)
}
