use bytes::Bytes;
use reqwest::{header::HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::DecodeError;

/// Transport-level details of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Final URL after redirects, when the transport reports one.
    pub url: Option<Url>,
    pub version: Version,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            url: None,
            version: Version::HTTP_11,
        }
    }
}

/// Fully-read response passed to the post-receive hook and returned to callers.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub meta: ResponseMeta,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// First value of a header, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, DecodeError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }
}
