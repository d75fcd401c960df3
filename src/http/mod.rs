use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ClientError;

/// Enumerates HTTP methods understood by the lightweight transport abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Transport-neutral multipart form.
///
/// Kept as plain data so in-memory transports can inspect exactly what would
/// be uploaded; [`reqwest::ReqwestTransport`] converts it on dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a file part.
    ///
    /// # Examples
    ///
    /// ```
    /// use travel_order_client::http::MultipartForm;
    ///
    /// let form = MultipartForm::new().file("file", "order.wav", "audio/wav", vec![0u8; 4]);
    /// assert_eq!(form.parts().len(), 1);
    /// assert_eq!(form.parts()[0].file_name.as_deref(), Some("order.wav"));
    /// ```
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data,
        });
        self
    }

    /// Appends a plain text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        });
        self
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<MultipartPart> {
        self.parts
    }
}

/// Request payload carried by an [`HttpRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    /// Serialized JSON document.
    Json(Vec<u8>),
    /// `multipart/form-data` payload; the boundary header is set by the transport.
    Multipart(MultipartForm),
}

impl HttpBody {
    /// Serializes `value` into a [`HttpBody::Json`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_vec(value)
            .map(HttpBody::Json)
            .map_err(|err| ClientError::Validation {
                message: format!("failed to serialize request: {err}"),
            })
    }
}

/// Minimal HTTP request representation handed to a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<HttpBody>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Builds a body-less request with an `Accept: application/json` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use travel_order_client::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::new(HttpMethod::Get, "https://example.com/api/health");
    /// assert_eq!(request.method, HttpMethod::Get);
    /// assert!(request.body.is_none());
    /// assert_eq!(request.headers.get("Accept"), Some(&"application/json".to_string()));
    /// ```
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::from([("Accept".to_string(), "application/json".to_string())]),
            body: None,
            timeout: None,
        }
    }

    /// Attaches a body; JSON bodies also get a `Content-Type` header.
    pub fn with_body(mut self, body: HttpBody) -> Self {
        if matches!(body, HttpBody::Json(_)) {
            self.headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }
        self.body = Some(body);
        self
    }

    /// Overrides the request headers after construction.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use travel_order_client::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::new(HttpMethod::Post, "https://example.com")
    ///     .with_headers(HashMap::from([("X-Trace".into(), "abc".into())]));
    /// assert_eq!(request.headers.get("X-Trace"), Some(&"abc".to_string()));
    /// assert!(request.headers.get("Accept").is_none());
    /// ```
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Minimal HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts the body into a UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// use travel_order_client::http::HttpResponse;
    ///
    /// let response = HttpResponse { status: 200, headers: Default::default(), body: b"ok".to_vec() };
    /// assert_eq!(response.into_string().unwrap(), "ok");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body cannot be interpreted as UTF-8.
    pub fn into_string(self) -> Result<String, ClientError> {
        String::from_utf8(self.body).map_err(|err| ClientError::decode(err.to_string()))
    }
}

/// Transport abstraction used to decouple the client from the concrete HTTP library.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    ///
    /// Any status code, including 4xx/5xx, is a successful exchange at this
    /// level; only failures to obtain a response are errors.
    ///
    /// # Examples
    ///
    /// ```
    /// # use async_trait::async_trait;
    /// # use travel_order_client::http::{HttpTransport, HttpRequest, HttpResponse, HttpMethod};
    /// # use travel_order_client::error::ClientError;
    /// struct MemoryTransport;
    ///
    /// #[async_trait]
    /// impl HttpTransport for MemoryTransport {
    ///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
    ///         Ok(HttpResponse { status: 200, headers: request.headers, body: b"{}".to_vec() })
    ///     }
    /// }
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let response = MemoryTransport
    ///     .send(HttpRequest::new(HttpMethod::Get, "https://example.com"))
    ///     .await
    ///     .unwrap();
    /// assert_eq!(response.status, 200);
    /// # });
    /// ```
    ///
    /// # Errors
    ///
    /// Implementations should map network failures to [`ClientError::Transport`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

pub mod reqwest;
