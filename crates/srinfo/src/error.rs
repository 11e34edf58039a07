use srinfo_proto::{ChannelId, ErrorKind};
use thiserror::Error;

/// A document that could not be read as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("page {page}: malformed XML at byte {position}: {message}")]
    Xml {
        page: u32,
        position: u64,
        message: String,
    },
    #[error("page {page}: invalid total page count {value:?}")]
    PageCount { page: u32, value: String },
}

/// Failure of a paginated fetch. Any of these aborts the whole fetch.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid endpoint {url}: {message}")]
    InvalidEndpoint { url: String, message: String },
    #[error("request for page {page} of {endpoint} failed: {message}")]
    Transport {
        endpoint: String,
        page: u32,
        message: String,
    },
    #[error("page {page} of {endpoint} answered HTTP {status}")]
    Status {
        endpoint: String,
        page: u32,
        status: u16,
    },
    #[error("could not read page {page} of {endpoint}: {message}")]
    Body {
        endpoint: String,
        page: u32,
        message: String,
    },
    #[error("{endpoint}: {source}")]
    Document {
        endpoint: String,
        #[source]
        source: ParseError,
    },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidEndpoint { .. }
            | ApiError::Transport { .. }
            | ApiError::Body { .. } => ErrorKind::Transport,
            ApiError::Status { .. } => ErrorKind::Status,
            ApiError::Document { .. } => ErrorKind::Parse,
        }
    }
}

/// Anything that can stop the fetch, parse and trim pipeline for a channel.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Api(e) => e.kind(),
            FetchError::Parse(_) => ErrorKind::Parse,
        }
    }
}

#[derive(Debug, Error)]
#[error("schedule for channel {channel}: {source}")]
pub struct RefreshError {
    pub channel: ChannelId,
    #[source]
    pub source: FetchError,
}

impl RefreshError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// A sweep that stopped early. Channels before `channel` were refreshed.
#[derive(Debug, Error)]
#[error("refresh stopped at channel {channel} after {refreshed} updated: {source}")]
pub struct SweepError {
    pub channel: ChannelId,
    pub refreshed: usize,
    #[source]
    pub source: FetchError,
}

impl SweepError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
