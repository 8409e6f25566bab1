use reqwest::{header::HeaderMap, Method};
use serde_json::Value as JsonValue;
use url::Url;

use crate::RequestContext;

/// Outgoing request as seen by the pre-send hook.
///
/// The hook may rewrite any field; the client sends whatever is left once
/// the hook returns.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    /// Absolute URL after base URL resolution.
    pub url: Url,
    /// Client defaults merged with per-call overrides.
    pub headers: HeaderMap,
    /// JSON view of the encoded body, `None` for body-less calls. The
    /// encoded bytes are sent as-is unless the hook changes this value.
    pub body: Option<JsonValue>,
    pub context: RequestContext,
}
