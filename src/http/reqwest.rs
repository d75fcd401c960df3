use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};

use crate::error::ClientError;

use super::{DynHttpTransport, HttpBody, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Default [`HttpTransport`] backed by reqwest.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a caller-configured `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with reqwest's default settings.
    pub fn default_client() -> Result<Self, ClientError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| ClientError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn build_form(parts: Vec<super::MultipartPart>) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for part in parts {
            let mut body = Part::bytes(part.data);
            if let Some(file_name) = part.file_name {
                body = body.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                body = body.mime_str(&content_type).map_err(|err| ClientError::Validation {
                    message: format!("invalid content type {content_type}: {err}"),
                })?;
            }
            form = form.part(part.name, body);
        }
        Ok(form)
    }

    fn build_request(&self, mut request: HttpRequest) -> Result<reqwest::RequestBuilder, ClientError> {
        let method = Self::method(request.method);
        let mut builder = self.client.request(method, &request.url);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ClientError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                ClientError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        match request.body.take() {
            Some(HttpBody::Json(bytes)) => builder = builder.body(bytes),
            Some(HttpBody::Multipart(form)) => {
                builder = builder.multipart(Self::build_form(form.into_parts())?);
            }
            None => {}
        }

        Ok(builder)
    }

    fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let timeout = request.timeout;
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| map_send_error(err, timeout))?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| map_send_error(err, timeout))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Reports reqwest's own deadline expiry as [`ClientError::Timeout`].
fn map_send_error(err: reqwest::Error, timeout: Option<std::time::Duration>) -> ClientError {
    match timeout {
        Some(elapsed) if err.is_timeout() => ClientError::Timeout { elapsed },
        _ => ClientError::transport(err.to_string()),
    }
}

/// Builds a thread-safe transport ready to share between clients.
pub fn default_dyn_transport() -> Result<DynHttpTransport, ClientError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
