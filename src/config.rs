use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use immich_api::{ClientOptions, ThumbnailSize};
use serde::Deserialize;
use url::Url;

use crate::slideshow::{IndexPolicy, SlideshowOptions};
use crate::tasks::refresher::RefreshSchedule;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8710";

/// Hostnames copied from setup guides that never point at a real server.
const PLACEHOLDER_HOSTS: &[&str] = &["your.immich.server", "example.com", "immich.example.com"];

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Base URL of the Immich server, e.g. `https://photos.home.lan`.
    #[serde(alias = "url", alias = "base-url", alias = "host")]
    pub server_url: String,
    /// API key sent as `x-api-key`.
    #[serde(alias = "key", alias = "api-token", alias = "token")]
    pub api_key: String,
    /// Restrict the slideshow to one album; all assets when absent or blank.
    #[serde(default)]
    pub album_id: Option<String>,
    /// Display name used for the camera entity.
    #[serde(default = "Configuration::default_name")]
    pub name: String,
    /// Prefix for entity unique ids.
    #[serde(default = "Configuration::default_instance_id")]
    pub instance_id: String,
    /// How often the asset list is re-fetched (and, with auto-advance, how long
    /// each image stays on screen).
    #[serde(
        default = "Configuration::default_refresh_interval",
        with = "humantime_serde"
    )]
    pub refresh_interval: Duration,
    /// Per-request HTTP timeout.
    #[serde(
        default = "Configuration::default_request_timeout",
        with = "humantime_serde"
    )]
    pub request_timeout: Duration,
    /// Move to the next image after every timed refresh.
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    /// Serve the server-side thumbnail instead of the original file.
    #[serde(default = "default_true")]
    pub use_thumbnails: bool,
    #[serde(default)]
    pub thumbnail_size: ThumbnailSize,
    /// `size` parameter used when listing all assets.
    #[serde(default = "Configuration::default_asset_page_size")]
    pub asset_page_size: u32,
    /// What happens to the index when a refresh shrinks the list below it.
    #[serde(default)]
    pub index_on_shrink: IndexPolicy,
    /// Number of previously shown images kept for `previous_image`.
    #[serde(default = "Configuration::default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Address the entity/service surface listens on.
    pub bind_address: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8710))),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Configuration {
    fn default_name() -> String {
        "Immich Slideshow".to_string()
    }

    fn default_instance_id() -> String {
        "immich_slideshow".to_string()
    }

    const fn default_refresh_interval() -> Duration {
        Duration::from_secs(30)
    }

    const fn default_request_timeout() -> Duration {
        Duration::from_secs(10)
    }

    const fn default_asset_page_size() -> u32 {
        100
    }

    const fn default_history_limit() -> usize {
        10
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        self.server_url = self.server_url.trim().to_string();
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("server-url {:?} is not a valid URL", self.server_url))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "server-url must start with http:// or https://"
        );
        if let Some(host) = url.host_str() {
            ensure!(
                !PLACEHOLDER_HOSTS.contains(&host),
                "server-url still uses the placeholder host {host:?}; replace it with your Immich server"
            );
        }

        self.api_key = self.api_key.trim().to_string();
        ensure!(!self.api_key.is_empty(), "api-key must not be blank");

        self.album_id = self
            .album_id
            .take()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        ensure!(!self.name.trim().is_empty(), "name must not be blank");
        ensure!(
            !self.instance_id.trim().is_empty(),
            "instance-id must not be blank"
        );
        ensure!(
            (MIN_REFRESH_INTERVAL..=MAX_REFRESH_INTERVAL).contains(&self.refresh_interval),
            "refresh-interval must be between {} and {}",
            humantime::format_duration(MIN_REFRESH_INTERVAL),
            humantime::format_duration(MAX_REFRESH_INTERVAL)
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request-timeout must be positive"
        );
        ensure!(
            self.asset_page_size > 0,
            "asset-page-size must be greater than zero"
        );
        ensure!(
            (1..=MAX_HISTORY_LIMIT).contains(&self.history_limit),
            "history-limit must be between 1 and {MAX_HISTORY_LIMIT}"
        );
        Ok(self)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.request_timeout,
            page_size: self.asset_page_size,
            thumbnail_size: self.thumbnail_size,
        }
    }

    pub fn slideshow_options(&self) -> SlideshowOptions {
        SlideshowOptions {
            index_policy: self.index_on_shrink,
            history_limit: self.history_limit,
        }
    }

    pub fn refresh_schedule(&self) -> RefreshSchedule {
        RefreshSchedule {
            interval: self.refresh_interval,
            auto_advance: self.auto_advance,
        }
    }
}
