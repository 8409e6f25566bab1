//! Pluggable transport seam.
//!
//! [`RestClient`](crate::RestClient) never talks to the network directly: it
//! hands a fully-formed [`TransportRequest`] to a [`Transport`] and gets back
//! a [`TransportResponse`] whose body is read separately, so body read
//! failures can be told apart from round-trip failures.

use std::{fmt, future::Future, pin::Pin, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::HeaderMap, Method, StatusCode};
use url::Url;

use crate::{BoxError, ResponseMeta};

/// A request ready to go on the wire.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Time left before the caller's deadline, if there is one.
    pub timeout: Option<Duration>,
}

type BodyFuture = Pin<Box<dyn Future<Output = Result<Bytes, BoxError>> + Send>>;

/// Deferred response body.
pub struct ResponseBody(BodyFuture);

impl ResponseBody {
    /// Wraps a future that yields the full body.
    pub fn new<F>(reader: F) -> Self
    where
        F: Future<Output = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self(Box::pin(reader))
    }

    /// A body that is already in memory.
    pub fn ready(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::new(async move { Ok::<_, BoxError>(bytes) })
    }

    /// Reads the whole body into memory.
    pub async fn read(self) -> Result<Bytes, BoxError> {
        self.0.await
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseBody(..)")
    }
}

/// Status line and headers of a completed round-trip, body still unread.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub meta: ResponseMeta,
    pub body: ResponseBody,
}

impl TransportResponse {
    /// Builds a response with an in-memory body and default metadata.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            meta: ResponseMeta::default(),
            body: ResponseBody::ready(body),
        }
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }
}

/// Round-trip failure reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct TransportError {
    #[source]
    source: BoxError,
    timeout: bool,
}

impl TransportError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
            timeout: false,
        }
    }

    /// A failure caused by the per-request timeout.
    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
            timeout: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let timeout = err.is_timeout();
        Self {
            source: Box::new(err),
            timeout,
        }
    }
}

/// Sends a fully-formed HTTP request and returns the response head.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Default transport backed by [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a fresh `reqwest` connection pool.
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }

    /// Reuses an existing, pre-configured `reqwest` client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let meta = ResponseMeta {
            url: Some(response.url().clone()),
            version: response.version(),
        };
        let body = ResponseBody::new(async move {
            response.bytes().await.map_err(|err| Box::new(err) as BoxError)
        });

        Ok(TransportResponse {
            status,
            headers,
            meta,
            body,
        })
    }
}
