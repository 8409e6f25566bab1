//! `restwire` is an async JSON HTTP client convenience layer.
//!
//! A [`RestClient`] wraps a pluggable [`Transport`] (default: `reqwest`) with:
//! - base URL resolution for relative request URLs
//! - default headers merged with per-call overrides
//! - JSON request bodies and typed response decoding ([`Decode`], [`Json`])
//! - fixed-attempt retry with exponential backoff
//! - pre-send ([`PrepareRequest`]) and post-receive ([`InspectResponse`]) hooks
//!
//! Every call funnels through [`RestClient::execute`]; [`RestClient::get`],
//! [`RestClient::post`], [`RestClient::put`] and [`RestClient::delete`] only
//! fix the method.

mod builder;
mod client;
mod context;
mod decode;
mod error;
mod hooks;
mod options;
mod request;
mod response;
mod transport;

pub use builder::ClientBuilder;
pub use client::RestClient;
pub use context::RequestContext;
pub use decode::{Decode, Json, Reply};
pub use error::{DecodeError, RestError};
#[cfg(feature = "tracing")]
pub use hooks::TracingLogger;
pub use hooks::{InspectResponse, Logger, PrepareRequest};
pub use options::ClientOptions;
pub use request::Request;
pub use response::{Response, ResponseMeta};
pub use transport::{
    ReqwestTransport, ResponseBody, Transport, TransportError, TransportRequest,
    TransportResponse,
};

pub use async_trait::async_trait;
pub use bytes::Bytes;
pub use reqwest::{header, Method, StatusCode, Version};
pub use tokio_util::sync::CancellationToken;
pub use url::Url;

/// Boxed error returned by hooks and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, RestError>;
