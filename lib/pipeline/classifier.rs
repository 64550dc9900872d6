use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::error_mapping::{map_reqwest_error, map_status_to_classifier_error};
use super::types::{ClassifierError, ClassifierErrorKind, SentimentLabel, SentimentResult, SentimentScores};

/// The external classifier's per-request document cap, in bytes.
pub const MAX_DOCUMENT_BYTES: usize = 5000;

/// Classifies one survey text into a normalized sentiment result.
///
/// This trait exists so the batch processor can be unit-tested against
/// deterministic scripted failures without live network access.
///
/// Implementations must not retry internally: retry policy belongs to the
/// transport's redelivery mechanism, and a second retry layer here would
/// multiply load on an already-throttling upstream.
pub trait SentimentClassifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        survey_text: &'a str,
    ) -> BoxFuture<'a, Result<SentimentResult, ClassifierError>>;
}

impl<T> SentimentClassifier for Arc<T>
where
    T: SentimentClassifier + ?Sized,
{
    fn classify<'a>(
        &'a self,
        survey_text: &'a str,
    ) -> BoxFuture<'a, Result<SentimentResult, ClassifierError>> {
        (**self).classify(survey_text)
    }
}

#[derive(Serialize, Debug)]
struct DetectSentimentRequest<'a> {
    text: &'a str,
    #[serde(rename = "languageCode")]
    language_code: &'a str,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DetectSentimentResponse {
    pub(crate) sentiment: String,
    #[serde(rename = "sentimentScore")]
    pub(crate) sentiment_score: Option<HashMap<String, f64>>,
}

/// HTTP-backed classifier used by the production runtime.
pub struct HttpSentimentClassifier {
    client: reqwest::Client,
    base_url: String,
    language_code: String,
}

impl HttpSentimentClassifier {
    /// Builds a classifier client with a bounded per-request timeout.
    pub fn new(
        base_url: String,
        language_code: String,
        request_timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| {
                ClassifierError::new(
                    ClassifierErrorKind::Other,
                    format!("failed to build classifier HTTP client: {err}"),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            language_code,
        })
    }
}

impl SentimentClassifier for HttpSentimentClassifier {
    fn classify<'a>(
        &'a self,
        survey_text: &'a str,
    ) -> BoxFuture<'a, Result<SentimentResult, ClassifierError>> {
        Box::pin(async move {
            if survey_text.len() > MAX_DOCUMENT_BYTES {
                return Err(ClassifierError::new(
                    ClassifierErrorKind::DocumentTooLarge,
                    format!(
                        "survey text is {} bytes, exceeding the classifier's {MAX_DOCUMENT_BYTES}-byte cap",
                        survey_text.len()
                    ),
                ));
            }

            let url = format!("{}/detect-sentiment", self.base_url);
            let response = self
                .client
                .post(&url)
                .json(&DetectSentimentRequest {
                    text: survey_text,
                    language_code: &self.language_code,
                })
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(map_status_to_classifier_error(status.as_u16()));
            }

            let payload = response
                .json::<DetectSentimentResponse>()
                .await
                .map_err(map_reqwest_error)?;

            normalize_response(payload)
        })
    }
}

/// Maps the classifier's native response into the fixed-shape result.
///
/// All four score keys are populated, substituting 0.0 for any label the
/// classifier omitted. A label outside the closed set is a malformed
/// response, never a fifth variant.
pub(crate) fn normalize_response(
    payload: DetectSentimentResponse,
) -> Result<SentimentResult, ClassifierError> {
    let label = SentimentLabel::from_wire(&payload.sentiment).ok_or_else(|| {
        ClassifierError::new(
            ClassifierErrorKind::MalformedResponse,
            format!("unknown sentiment label '{}'", payload.sentiment),
        )
    })?;

    let raw_scores = payload.sentiment_score.unwrap_or_default();
    let score_for = |key: &str| raw_scores.get(key).copied().unwrap_or(0.0);

    Ok(SentimentResult {
        label,
        scores: SentimentScores {
            positive: score_for("Positive"),
            negative: score_for("Negative"),
            neutral: score_for("Neutral"),
            mixed: score_for("Mixed"),
        },
    })
}
