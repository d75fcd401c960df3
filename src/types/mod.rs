//! Request and response shapes of the travel-order resolver API.
//!
//! Success shapes mirror the backend's JSON bodies field for field. Failures are
//! carried by [`ApiOutcome::Failure`] so a success can never be mistaken for an
//! error payload.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Largest upload the audio endpoint accepts.
pub const MAX_AUDIO_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// JSON body shared by the sentence endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRequest {
    pub sentence: String,
}

/// Transcription returned by `/api/audio-to-text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioToTextResult {
    pub sentence: String,
}

/// Verdict returned by `/api/validate-travel-intent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateIntentResult {
    pub is_valid: bool,
    /// Human-readable explanation, e.g. `"Non-French text detected."`.
    pub reason: String,
    pub is_trip_related: bool,
    pub is_correct_language: bool,
}

/// Route returned by `/api/sncf/find-route`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindRouteResult {
    pub departure: String,
    pub destination: String,
    /// Stations from departure to destination, in travel order.
    pub route: Vec<String>,
}

/// Result of validating a sentence and, when it is a valid order, routing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOrder {
    /// The sentence was not accepted as a travel order; no route was requested.
    Rejected(ValidateIntentResult),
    Routed(FindRouteResult),
}

/// Error payload sent by the server with a non-2xx status.
///
/// The body is kept as opaque JSON; plain-text bodies become a JSON string. The
/// backend usually answers `{ "detail": "..." }`, exposed through
/// [`ErrorResponse::detail`].
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: u16,
    pub body: Value,
}

impl ErrorResponse {
    /// Returns the `detail` message when the body carries one as a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use travel_order_client::types::ErrorResponse;
    ///
    /// let err = ErrorResponse { status: 404, body: json!({ "detail": "No route found." }) };
    /// assert_eq!(err.detail(), Some("No route found."));
    ///
    /// let opaque = ErrorResponse { status: 422, body: json!({ "detail": [{ "loc": ["body"] }] }) };
    /// assert_eq!(opaque.detail(), None);
    /// ```
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

/// Tagged result of an error-capturing call such as [`crate::ApiClient::post`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    /// The call failed. `None` means no error payload was available: the
    /// response had an empty body, or no response was received at all.
    Failure(Option<ErrorResponse>),
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            ApiOutcome::Success(value) => Some(value),
            ApiOutcome::Failure(_) => None,
        }
    }

    /// Returns the error payload, if this is a failure that carried one.
    pub fn error(&self) -> Option<&ErrorResponse> {
        match self {
            ApiOutcome::Failure(error) => error.as_ref(),
            ApiOutcome::Success(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success(value) => ApiOutcome::Success(f(value)),
            ApiOutcome::Failure(error) => ApiOutcome::Failure(error),
        }
    }

    /// Switches to the propagating error policy.
    ///
    /// A failure with a payload becomes [`ClientError::Status`]; a failure
    /// without one becomes [`ClientError::Transport`].
    pub fn into_result(self) -> Result<T, ClientError> {
        match self {
            ApiOutcome::Success(value) => Ok(value),
            ApiOutcome::Failure(Some(error)) => Err(ClientError::Status {
                status: error.status,
                body: Some(error.body),
            }),
            ApiOutcome::Failure(None) => Err(ClientError::transport(
                "request failed without an error payload",
            )),
        }
    }
}

impl<T> From<Result<T, ClientError>> for ApiOutcome<T> {
    /// Switches to the capturing error policy.
    fn from(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(value) => ApiOutcome::Success(value),
            Err(ClientError::Status {
                status,
                body: Some(body),
            }) => ApiOutcome::Failure(Some(ErrorResponse { status, body })),
            Err(_) => ApiOutcome::Failure(None),
        }
    }
}

/// Audio recording to transcribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl AudioFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Reads a recording from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|err| ClientError::Validation {
            message: format!("failed to read audio file {}: {err}", path.display()),
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let content_type = guess_audio_mime(path).to_string();
        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }

    /// Checks the limits the backend enforces on uploads.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a non-audio content type or a
    /// payload above [`MAX_AUDIO_UPLOAD_BYTES`].
    pub fn check_upload_limits(&self) -> Result<(), ClientError> {
        if !self.content_type.starts_with("audio/") {
            return Err(ClientError::Validation {
                message: format!(
                    "invalid file type {}, expected an audio file",
                    self.content_type
                ),
            });
        }
        if self.data.len() > MAX_AUDIO_UPLOAD_BYTES {
            return Err(ClientError::Validation {
                message: format!(
                    "file size {} exceeds {MAX_AUDIO_UPLOAD_BYTES} bytes",
                    self.data.len()
                ),
            });
        }
        Ok(())
    }
}

fn guess_audio_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}
