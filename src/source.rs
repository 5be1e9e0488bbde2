use async_trait::async_trait;
use immich_api::{ApiError, Asset, ImmichClient, MediaPayload};

/// Where the slideshow gets its assets and image bytes from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the full, ordered asset list for this slideshow.
    async fn fetch_assets(&self) -> Result<Vec<Asset>, ApiError>;

    /// Download one of the media URLs carried by an [`Asset`].
    async fn fetch_media(&self, url: &str) -> Result<MediaPayload, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetScope {
    All,
    Album(String),
}

impl AssetScope {
    pub fn from_album_id(album_id: Option<&str>) -> Self {
        match album_id {
            Some(id) => Self::Album(id.to_string()),
            None => Self::All,
        }
    }
}

/// [`AssetSource`] backed by the Immich REST API.
#[derive(Debug, Clone)]
pub struct ImmichSource {
    client: ImmichClient,
    scope: AssetScope,
}

impl ImmichSource {
    pub fn new(client: ImmichClient, scope: AssetScope) -> Self {
        Self { client, scope }
    }

    pub fn client(&self) -> &ImmichClient {
        &self.client
    }

    pub fn scope(&self) -> &AssetScope {
        &self.scope
    }
}

#[async_trait]
impl AssetSource for ImmichSource {
    async fn fetch_assets(&self) -> Result<Vec<Asset>, ApiError> {
        match &self.scope {
            AssetScope::All => self.client.list_all_assets().await,
            AssetScope::Album(id) => self.client.list_assets_in_album(id).await,
        }
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaPayload, ApiError> {
        self.client.download(url).await
    }
}
