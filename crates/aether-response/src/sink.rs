//! Buffered response sink.

use aether_core::AetherError;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// Errors raised while drawing a response.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("cannot set header '{0}': headers already sent")]
    HeadersSent(String),

    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error("response already completed")]
    Completed,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ResponseError> for AetherError {
    fn from(err: ResponseError) -> Self {
        AetherError::Response(err.to_string())
    }
}

/// Destination an envelope draws itself into.
pub trait DrawTarget {
    /// Whether body bytes have been written, freezing the headers.
    fn headers_sent(&self) -> bool;

    /// Set (or replace) a header. Fails once the body has started.
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError>;

    /// Append body bytes.
    fn write_body(&mut self, chunk: &[u8]) -> Result<(), ResponseError>;
}

/// State of the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    /// Headers may still change.
    Initial,
    /// Body has started.
    HeadersSent,
    /// Response has been completed.
    Completed,
}

/// Buffered draw target that builds an `http::Response`.
///
/// Mirrors a streaming connection: once the first body byte is written the
/// status and headers are frozen.
#[derive(Debug)]
pub struct ResponseSink {
    state: SinkState,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseSink {
    /// Create a new sink with status 200.
    pub fn new() -> Self {
        Self {
            state: SinkState::Initial,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Set the status code. Fails once the body has started.
    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        if self.state != SinkState::Initial {
            return Err(ResponseError::HeadersSent(":status".to_string()));
        }
        self.status = status;
        Ok(())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Mark the response as complete.
    pub fn complete(&mut self) {
        self.state = SinkState::Completed;
    }

    /// Consume the sink and build the response.
    pub fn into_response(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawTarget for ResponseSink {
    fn headers_sent(&self) -> bool {
        self.state != SinkState::Initial
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        if self.headers_sent() {
            return Err(ResponseError::HeadersSent(name.to_string()));
        }
        let header_name = HeaderName::try_from(name)
            .map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::try_from(value)
            .map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    fn write_body(&mut self, chunk: &[u8]) -> Result<(), ResponseError> {
        if self.state == SinkState::Completed {
            return Err(ResponseError::Completed);
        }
        self.state = SinkState::HeadersSent;
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}
