//! Output targets for a successful response body.

use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{DecodeError, Response};

/// Converts a 2xx response body into a caller-chosen value.
///
/// Implemented for `()` (body ignored), `String` (raw text), `Bytes` and
/// `Vec<u8>` (raw bytes), `serde_json::Value`, and [`Json<T>`] for any
/// deserializable `T`.
pub trait Decode: Sized {
    fn decode(body: &Bytes) -> Result<Self, DecodeError>;
}

impl Decode for () {
    fn decode(_body: &Bytes) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl Decode for String {
    fn decode(body: &Bytes) -> Result<Self, DecodeError> {
        Ok(String::from_utf8(body.to_vec())?)
    }
}

impl Decode for Bytes {
    fn decode(body: &Bytes) -> Result<Self, DecodeError> {
        Ok(body.clone())
    }
}

impl Decode for Vec<u8> {
    fn decode(body: &Bytes) -> Result<Self, DecodeError> {
        Ok(body.to_vec())
    }
}

impl Decode for JsonValue {
    fn decode(body: &Bytes) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// JSON-decoded output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> Decode for Json<T> {
    fn decode(body: &Bytes) -> Result<Self, DecodeError> {
        Ok(Json(serde_json::from_slice(body)?))
    }
}

/// A successful call: the response plus its decoded body.
#[derive(Clone, Debug)]
pub struct Reply<O> {
    pub response: Response,
    pub output: O,
}

impl<O> Reply<O> {
    pub fn into_output(self) -> O {
        self.output
    }
}

impl<T> Reply<Json<T>> {
    /// Unwraps the JSON output.
    pub fn into_json(self) -> T {
        self.output.0
    }
}
