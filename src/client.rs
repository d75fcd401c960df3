use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cancel::CancelHandle;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::reqwest::default_dyn_transport;
use crate::http::{DynHttpTransport, HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
use crate::types::ApiOutcome;

/// Base HTTP client bound to one configured origin.
///
/// GET, PUT and DELETE propagate every failure as `Err`. POST captures failures
/// into [`ApiOutcome::Failure`] instead; use [`ApiClient::try_post`] for the
/// propagating behavior, or convert any `Result` with [`ApiOutcome::from`].
#[derive(Clone)]
pub struct ApiClient {
    transport: DynHttpTransport,
    config: ClientConfig,
    cancel: Option<CancelHandle>,
}

impl ApiClient {
    pub fn new(transport: DynHttpTransport, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            cancel: None,
        }
    }

    /// Builds a reqwest-backed client configured from the environment.
    ///
    /// # Errors
    ///
    /// Fails when the environment holds an invalid value or the HTTP client cannot be created.
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(Self::new(default_dyn_transport()?, ClientConfig::from_env()?))
    }

    /// Makes every call of this client abortable through `handle`.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issues a GET and decodes the body as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(HttpMethod::Get, path, None).await
    }

    /// Issues a JSON POST, capturing any failure into the returned outcome.
    ///
    /// A non-2xx answer with a body yields `Failure(Some(..))`; a text body is
    /// carried as a JSON string. Every other failure (empty error body, network
    /// error, timeout, cancellation, undecodable success body) yields `Failure(None)`.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiOutcome<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = match HttpBody::json(body) {
            Ok(body) => self.execute(HttpMethod::Post, path, Some(body)).await,
            Err(err) => Err(err),
        };
        capture(path, result)
    }

    /// Issues a multipart POST with the same failure capture as [`ApiClient::post`].
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: MultipartForm) -> ApiOutcome<T> {
        let result = self
            .execute(HttpMethod::Post, path, Some(HttpBody::Multipart(form)))
            .await;
        capture(path, result)
    }

    /// Issues a JSON POST and propagates failures like the other verbs.
    pub async fn try_post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Post, path, Some(HttpBody::json(body)?))
            .await
    }

    /// Issues a PUT with a JSON body.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Put, path, Some(HttpBody::json(body)?))
            .await
    }

    /// Issues a PUT without a body.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(HttpMethod::Put, path, None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(HttpMethod::Delete, path, None).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<HttpBody>,
    ) -> Result<T, ClientError> {
        let mut request =
            HttpRequest::new(method, self.config.resolve_url(path)).with_timeout(self.config.timeout());
        if let Some(body) = body {
            request = request.with_body(body);
        }

        debug!(method = method.as_str(), url = %request.url, "dispatching request");
        let response = self.dispatch(request).await?;
        debug!(method = method.as_str(), path, status = response.status, "response received");

        if !response.is_success() {
            return Err(ClientError::from_response(response));
        }
        decode_body(&response.body)
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let timeout = request.timeout;
        let send = self.transport.send(request);
        let timed = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, send)
                    .await
                    .unwrap_or_else(|_| Err(ClientError::Timeout { elapsed: limit })),
                None => send.await,
            }
        };

        let Some(handle) = &self.cancel else {
            return timed.await;
        };
        if handle.is_cancelled() {
            return Err(aborted());
        }
        tokio::select! {
            biased;
            _ = handle.cancelled() => Err(aborted()),
            result = timed => result,
        }
    }
}

fn aborted() -> ClientError {
    ClientError::Aborted {
        message: "request cancelled by caller".to_string(),
    }
}

/// Decodes a success body; an empty body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let decoded = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    decoded.map_err(|err| ClientError::decode(err.to_string()))
}

fn capture<T>(path: &str, result: Result<T, ClientError>) -> ApiOutcome<T> {
    if let Err(err) = &result {
        warn!(path, error = %err, "request failed, returning captured error payload");
    }
    ApiOutcome::from(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorResponse;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::http::HttpTransport;

    /// Replies with a fixed status and body and records every request.
    struct FixedTransport {
        status: u16,
        body: Vec<u8>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FixedTransport {
        fn new(status: u16, body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_vec(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> HttpRequest {
            self.seen
                .lock()
                .expect("lock")
                .last()
                .cloned()
                .expect("a request was sent")
        }
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
            self.seen.lock().expect("lock").push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: self.body.clone(),
            })
        }
    }

    /// Fails every request before a response exists.
    struct OfflineTransport;

    #[async_trait]
    impl HttpTransport for OfflineTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ClientError> {
            Err(ClientError::transport("connection refused"))
        }
    }

    /// Answers `{}` after a short delay.
    struct DelayedTransport(Duration);

    #[async_trait]
    impl HttpTransport for DelayedTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ClientError> {
            tokio::time::sleep(self.0).await;
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: b"{}".to_vec(),
            })
        }
    }

    /// Never answers.
    struct StalledTransport;

    #[async_trait]
    impl HttpTransport for StalledTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ClientError> {
            std::future::pending().await
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sentence {
        sentence: String,
    }

    fn client(transport: Arc<dyn HttpTransport>) -> ApiClient {
        ApiClient::new(
            transport,
            ClientConfig::default().with_base_url("http://backend.test"),
        )
    }

    #[tokio::test]
    async fn get_returns_body_unchanged() {
        let body = json!({ "stations": ["Paris", "Dijon", "Lyon"], "count": 3 });
        let transport = FixedTransport::new(200, body.to_string().as_bytes());
        let api = client(transport.clone());

        let value: Value = api.get("/api/stations").await.expect("get");
        assert_eq!(value, body);

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "http://backend.test/api/stations");
        assert!(request.body.is_none());
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn get_without_base_url_uses_relative_path() {
        let transport = FixedTransport::new(200, b"{}");
        let api = ApiClient::new(transport.clone(), ClientConfig::default());

        let _: Value = api.get("api/health").await.expect("get");
        assert_eq!(transport.last_request().url, "/api/health");
    }

    #[tokio::test]
    async fn post_decodes_success_body() {
        let transport = FixedTransport::new(200, br#"{"sentence":"Je veux aller de Paris a Lyon"}"#);
        let api = client(transport.clone());

        let outcome: ApiOutcome<Sentence> = api
            .post("/api/echo", &json!({ "sentence": "Je veux aller de Paris a Lyon" }))
            .await;
        assert_eq!(
            outcome,
            ApiOutcome::Success(Sentence {
                sentence: "Je veux aller de Paris a Lyon".to_string()
            })
        );

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.body,
            Some(HttpBody::Json(
                br#"{"sentence":"Je veux aller de Paris a Lyon"}"#.to_vec()
            ))
        );
    }

    #[tokio::test]
    async fn post_captures_error_payload_instead_of_failing() {
        let transport = FixedTransport::new(400, br#"{"detail":"Unable to extract both departure and destination from the sentence."}"#);
        let api = client(transport);

        let outcome: ApiOutcome<Sentence> = api.post("/api/sncf/find-route", &json!({ "sentence": "bonjour" })).await;
        assert_eq!(
            outcome,
            ApiOutcome::Failure(Some(ErrorResponse {
                status: 400,
                body: json!({ "detail": "Unable to extract both departure and destination from the sentence." }),
            }))
        );
    }

    #[tokio::test]
    async fn post_without_error_body_yields_empty_failure() {
        let api = client(FixedTransport::new(500, b""));
        let outcome: ApiOutcome<Sentence> = api.post("/api/echo", &json!({})).await;
        assert_eq!(outcome, ApiOutcome::Failure(None));
    }

    #[tokio::test]
    async fn post_keeps_plain_text_error_body() {
        let api = client(FixedTransport::new(502, b"Bad Gateway"));
        let outcome: ApiOutcome<Sentence> = api.post("/api/echo", &json!({})).await;
        assert_eq!(
            outcome,
            ApiOutcome::Failure(Some(ErrorResponse {
                status: 502,
                body: Value::String("Bad Gateway".to_string()),
            }))
        );
    }

    #[tokio::test]
    async fn post_captures_network_errors() {
        let api = client(Arc::new(OfflineTransport));
        let outcome: ApiOutcome<Sentence> = api.post("/api/echo", &json!({})).await;
        assert_eq!(outcome, ApiOutcome::Failure(None));
    }

    #[tokio::test]
    async fn try_post_propagates_status() {
        let api = client(FixedTransport::new(404, br#"{"detail":"No route found."}"#));
        let result: Result<Sentence, _> = api.try_post("/api/sncf/find-route", &json!({})).await;
        match result {
            Err(ClientError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, Some(json!({ "detail": "No route found." })));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_put_delete_propagate_non_2xx() {
        let api = client(FixedTransport::new(503, b"Service Unavailable"));

        let get: Result<Value, _> = api.get("/api/a").await;
        let put: Result<Value, _> = api.put("/api/a", &json!({ "x": 1 })).await;
        let put_empty: Result<Value, _> = api.put_empty("/api/a").await;
        let delete: Result<Value, _> = api.delete("/api/a").await;

        for result in [get, put, put_empty, delete] {
            match result {
                Err(ClientError::Status { status, body }) => {
                    assert_eq!(status, 503);
                    assert_eq!(body, Some(Value::String("Service Unavailable".to_string())));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn get_put_delete_propagate_transport_failure() {
        let api = client(Arc::new(OfflineTransport));

        assert!(matches!(
            api.get::<Value>("/api/a").await,
            Err(ClientError::Transport { .. })
        ));
        assert!(matches!(
            api.put::<Value, _>("/api/a", &json!({})).await,
            Err(ClientError::Transport { .. })
        ));
        assert!(matches!(
            api.delete::<Value>("/api/a").await,
            Err(ClientError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn get_reports_malformed_body_as_decode_error() {
        let api = client(FixedTransport::new(200, b"<html>"));
        assert!(matches!(
            api.get::<Sentence>("/api/a").await,
            Err(ClientError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn delete_accepts_empty_success_body() {
        let transport = FixedTransport::new(204, b"");
        let api = client(transport.clone());

        api.delete::<()>("/api/orders/42").await.expect("delete");
        assert_eq!(transport.last_request().method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn put_sends_json_body_and_content_type() {
        let transport = FixedTransport::new(200, b"null");
        let api = client(transport.clone());

        let _: Option<Value> = api.put("/api/orders/42", &json!({ "seat": "12A" })).await.expect("put");

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(request.body, Some(HttpBody::Json(br#"{"seat":"12A"}"#.to_vec())));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_request_times_out() {
        let api = ApiClient::new(
            Arc::new(StalledTransport),
            ClientConfig::default().with_timeout(Duration::from_secs(2)),
        );

        match api.get::<Value>("/api/slow").await {
            Err(ClientError::Timeout { elapsed }) => assert_eq!(elapsed, Duration::from_secs(2)),
            other => panic!("unexpected result: {other:?}"),
        }

        let outcome: ApiOutcome<Value> = api.post("/api/slow", &json!({})).await;
        assert_eq!(outcome, ApiOutcome::Failure(None));
    }

    #[tokio::test]
    async fn sub_second_deadline_lets_fast_replies_through() {
        let api = ApiClient::new(
            Arc::new(DelayedTransport(Duration::from_millis(5))),
            ClientConfig::default().with_timeout(Duration::from_millis(500)),
        );

        let value: Value = api.get("/api/fast").await.expect("fast reply within deadline");
        assert_eq!(value, json!({}));
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_deadline_still_expires() {
        let api = ApiClient::new(
            Arc::new(DelayedTransport(Duration::from_secs(1))),
            ClientConfig::default().with_timeout(Duration::from_millis(500)),
        );

        match api.get::<Value>("/api/slow").await {
            Err(ClientError::Timeout { elapsed }) => assert_eq!(elapsed, Duration::from_millis(500)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_handle_aborts_before_sending() {
        let transport = FixedTransport::new(200, b"{}");
        let handle = CancelHandle::new();
        handle.cancel();
        let api = client(transport.clone()).with_cancel(handle);

        assert!(matches!(
            api.get::<Value>("/api/a").await,
            Err(ClientError::Aborted { .. })
        ));
        assert!(transport.seen.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_in_flight_request() {
        let handle = CancelHandle::new();
        let api = ApiClient::new(
            Arc::new(StalledTransport),
            ClientConfig::default().without_timeout(),
        )
        .with_cancel(handle.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        });

        assert!(matches!(
            api.delete::<Value>("/api/a").await,
            Err(ClientError::Aborted { .. })
        ));
        canceller.await.expect("join");
    }
}
