use crate::{transport::TransportError, BoxError, Response};

/// Error type returned by this crate.
///
/// Errors raised after a response was received carry that response so
/// callers can still inspect status, headers, and body.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Request URL or base URL could not be parsed, or a relative URL was
    /// used without a base URL.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// A default header configured on the builder is not a valid HTTP header.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    /// The pre-send hook rejected the request; nothing was sent.
    #[error("pre-send hook failed: {0}")]
    PreSendHook(#[source] BoxError),
    /// The post-receive hook rejected a response.
    #[error("post-receive hook failed: {source}")]
    PostReceiveHook {
        #[source]
        source: BoxError,
        response: Box<Response>,
    },
    /// Request body could not be encoded as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),
    /// Response body could not be read from the transport.
    #[error("failed to read response body (status {status}): {source}")]
    Io {
        #[source]
        source: BoxError,
        status: u16,
    },
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// The transport failed to complete the round-trip.
    #[error("network error: {0}")]
    Network(#[source] TransportError),
    /// Response body could not be decoded into the requested output type.
    #[error("failed to decode response: {source}")]
    Decode {
        #[source]
        source: DecodeError,
        response: Box<Response>,
    },
    /// Every attempt failed with a retryable error.
    #[error("request failed after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: usize,
        #[source]
        last: Box<RestError>,
        /// Last response received, if any attempt got one.
        response: Option<Box<Response>>,
    },
    /// The request context was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// The request deadline passed before the call completed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
    /// The default `reqwest` transport could not be constructed.
    #[error("transport setup error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl RestError {
    /// Returns the response that accompanied this error, if one was received.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::PostReceiveHook { response, .. } | Self::Decode { response, .. } => {
                Some(response.as_ref())
            }
            Self::ExhaustedRetries { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// Whether the retry loop treats this error as transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HttpStatus { .. } | Self::Network(_))
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::Io { status, .. } => Some(*status),
            Self::ExhaustedRetries { last, .. } => last.status(),
            other => other.response().map(|response| response.status.as_u16()),
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure to turn a response body into an output value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("body is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

