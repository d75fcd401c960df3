use tracing::debug;

use crate::client::ApiClient;
use crate::http::MultipartForm;
use crate::types::{
    ApiOutcome, AudioFile, AudioToTextResult, FindRouteResult, ResolvedOrder, SentenceRequest,
    ValidateIntentResult,
};

pub const AUDIO_TO_TEXT_PATH: &str = "/api/audio-to-text";
pub const VALIDATE_TRAVEL_INTENT_PATH: &str = "/api/validate-travel-intent";
pub const FIND_ROUTE_PATH: &str = "/api/sncf/find-route";

/// Multipart field carrying the uploaded recording.
pub const AUDIO_FIELD: &str = "file";

/// Typed operations of the travel-order resolver backend.
///
/// Every operation goes through [`ApiClient::post`], so failures come back as
/// [`ApiOutcome::Failure`] rather than `Err`.
#[derive(Clone)]
pub struct TravelOrderService {
    client: ApiClient,
}

impl TravelOrderService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Uploads a recording and returns its transcription.
    pub async fn audio_to_text(&self, file: AudioFile) -> ApiOutcome<AudioToTextResult> {
        debug!(
            file_name = %file.file_name,
            content_type = %file.content_type,
            bytes = file.data.len(),
            "uploading audio for transcription"
        );
        let form = MultipartForm::new().file(AUDIO_FIELD, file.file_name, file.content_type, file.data);
        self.client.post_form(AUDIO_TO_TEXT_PATH, form).await
    }

    /// Asks the backend whether `sentence` is a French travel request.
    pub async fn validate_travel_intent(&self, sentence: &str) -> ApiOutcome<ValidateIntentResult> {
        self.client
            .post(VALIDATE_TRAVEL_INTENT_PATH, &sentence_body(sentence))
            .await
    }

    /// Extracts departure and destination from `sentence` and finds the shortest route.
    pub async fn find_route(&self, sentence: &str) -> ApiOutcome<FindRouteResult> {
        self.client
            .post(FIND_ROUTE_PATH, &sentence_body(sentence))
            .await
    }

    /// Validates `sentence` and, only when it is accepted, finds its route.
    ///
    /// A failure of either step is returned as is.
    pub async fn resolve_order(&self, sentence: &str) -> ApiOutcome<ResolvedOrder> {
        let verdict = match self.validate_travel_intent(sentence).await {
            ApiOutcome::Success(verdict) => verdict,
            ApiOutcome::Failure(error) => return ApiOutcome::Failure(error),
        };
        if !verdict.is_valid {
            debug!(reason = %verdict.reason, "sentence rejected, skipping route search");
            return ApiOutcome::Success(ResolvedOrder::Rejected(verdict));
        }
        self.find_route(sentence).await.map(ResolvedOrder::Routed)
    }
}

fn sentence_body(sentence: &str) -> SentenceRequest {
    SentenceRequest {
        sentence: sentence.to_string(),
    }
}
