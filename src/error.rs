use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::http::HttpResponse;

/// Aggregates every failure mode exposed by the travel-order client.
///
/// The GET/PUT/DELETE verbs surface these directly. The POST verb folds them into
/// [`crate::ApiOutcome::Failure`] instead, see [`crate::ApiClient::post`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The server answered with a non-2xx status.
    #[error("unexpected status {status}")]
    Status {
        status: u16,
        /// Error body: parsed JSON, or plain text as a JSON string.
        body: Option<Value>,
    },
    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode response: {message}")]
    Decode { message: String },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// The request did not complete before its deadline.
    #[error("request timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    /// Surfaces cancellations triggered explicitly by the caller.
    #[error("request aborted: {message}")]
    Aborted {
        /// Message describing who/what cancelled the request.
        message: String,
    },
}

impl ClientError {
    /// Creates a [`ClientError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use travel_order_client::error::ClientError;
    ///
    /// let err = ClientError::transport("dns lookup failed");
    /// assert!(matches!(err, ClientError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a [`ClientError::Decode`] from a textual description.
    pub fn decode<T: Into<String>>(message: T) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Builds a [`ClientError::Status`] from a non-2xx response.
    ///
    /// JSON bodies are kept parsed and other UTF-8 text is kept as a JSON string.
    /// Empty or non-UTF-8 bodies leave `body` unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use travel_order_client::error::ClientError;
    /// use travel_order_client::http::HttpResponse;
    ///
    /// let response = HttpResponse {
    ///     status: 404,
    ///     headers: Default::default(),
    ///     body: br#"{"detail":"No route found"}"#.to_vec(),
    /// };
    /// match ClientError::from_response(response) {
    ///     ClientError::Status { status, body } => {
    ///         assert_eq!(status, 404);
    ///         assert_eq!(body.unwrap()["detail"], "No route found");
    ///     }
    ///     other => panic!("unexpected error: {other:?}"),
    /// }
    /// ```
    pub fn from_response(response: HttpResponse) -> Self {
        let status = response.status;
        let body = match response.into_string() {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => match serde_json::from_str(&text) {
                Ok(json) => Some(json),
                Err(_) => Some(Value::String(text)),
            },
            Err(_) => None,
        };
        Self::Status { status, body }
    }
}
