//! Error types for fetching and configuration.
//!
//! Fetch failures are split the way the refresh loop cares about them:
//! either nothing came back ([`ErrorKind::Transport`]) or something came
//! back that we could not use ([`ErrorKind::Protocol`]).  The scheduler
//! recovers from both identically; the split only matters for logs and
//! the error banner.

use thiserror::Error;

/// Which remote endpoint a request was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Status,
    Trending,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status => write!(f, "status"),
            Self::Trending => write!(f, "trending"),
        }
    }
}

/// Coarse failure class of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be sent or no response arrived (network
    /// down, DNS, timeout).
    Transport,
    /// A response arrived but had a non-2xx status or an undecodable body.
    Protocol,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {endpoint} endpoint")]
    Status { endpoint: Endpoint, status: u16 },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },

    /// Used by in-memory sources that have no underlying transport error.
    #[error("{endpoint} unavailable: {reason}")]
    Unavailable { endpoint: Endpoint, reason: String },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::Unavailable { .. } => ErrorKind::Transport,
            Self::Status { .. } | Self::Decode { .. } => ErrorKind::Protocol,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::Unavailable { endpoint, .. } => *endpoint,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_decode_are_protocol_errors() {
        let status = FetchError::Status {
            endpoint: Endpoint::Trending,
            status: 502,
        };
        assert_eq!(status.kind(), ErrorKind::Protocol);
        assert_eq!(status.endpoint(), Endpoint::Trending);

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let decode = FetchError::Decode {
            endpoint: Endpoint::Status,
            source: bad_json,
        };
        assert_eq!(decode.kind(), ErrorKind::Protocol);
        assert_eq!(decode.endpoint(), Endpoint::Status);
    }

    #[test]
    fn unavailable_counts_as_transport() {
        let err = FetchError::Unavailable {
            endpoint: Endpoint::Status,
            reason: "offline".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "status unavailable: offline");
    }

    #[test]
    fn status_error_message_names_endpoint() {
        let err = FetchError::Status {
            endpoint: Endpoint::Status,
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 404 from status endpoint"
        );
    }
}
