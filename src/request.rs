//! Incoming HTTP request type.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::method::Method;

/// An incoming HTTP request with its body fully buffered.
///
/// Headers are not kept: every route speaks JSON and decides on the body
/// alone.
pub struct Request {
    method: Method,
    path: String,
    body: Bytes,
}

impl Request {
    pub(crate) fn new(method: Method, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { method, path: path.into(), body: body.into() }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    /// Deserializes the body as JSON.
    ///
    /// The `content-type` header is not checked; a body that parses is accepted.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
