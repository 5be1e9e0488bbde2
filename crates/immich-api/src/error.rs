use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by [`crate::ImmichClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured server URL could not be used as a base URL.
    #[error("invalid server url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The API key contains bytes that are not valid in an HTTP header.
    #[error("api key is not a valid header value")]
    InvalidApiKey,

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    /// The server was unreachable or the request timed out.
    #[error("immich server unreachable: {0}")]
    Connection(#[source] reqwest::Error),

    /// The server rejected the API key.
    #[error("immich rejected the api key (HTTP {0})")]
    Auth(StatusCode),

    /// Any other non-success response.
    #[error("immich returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode immich response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Coarse classification used by callers that only care about the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Auth,
    Server,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Auth(_) | Self::InvalidApiKey => ErrorKind::Auth,
            Self::InvalidUrl { .. } | Self::Client(_) | Self::Status { .. } | Self::Decode(_) => {
                ErrorKind::Server
            }
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err)
        } else {
            Self::Connection(err)
        }
    }
}
