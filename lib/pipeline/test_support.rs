use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;

use super::classifier::SentimentClassifier;
use super::types::{
    BatchProcessorConfig, ClassifierError, QueueMessage, SentimentLabel, SentimentResult,
    SentimentScores, StoreError, SurveyRecord,
};
use super::writer::ResultWriter;

pub(super) fn test_processor_config() -> BatchProcessorConfig {
    BatchProcessorConfig {
        classify_timeout: Duration::from_millis(50),
        store_timeout: Duration::from_millis(50),
        max_batch_size: 10,
    }
}

pub(super) fn positive_result() -> SentimentResult {
    SentimentResult {
        label: SentimentLabel::Positive,
        scores: SentimentScores {
            positive: 0.9,
            negative: 0.02,
            neutral: 0.05,
            mixed: 0.03,
        },
    }
}

pub(super) fn message(message_id: &str, body: impl Into<String>) -> QueueMessage {
    QueueMessage {
        message_id: message_id.to_string(),
        body: body.into(),
    }
}

pub(super) fn valid_body(survey_id: &str, customer_id: &str, survey_text: &str) -> String {
    json!({
        "id": survey_id,
        "customerId": customer_id,
        "surveyText": survey_text,
    })
    .to_string()
}

/// Scripted classifier keyed by survey text. Unscripted texts fall back to a
/// fixed default so tests only script what they assert on.
pub(super) struct MockClassifier {
    plans: Mutex<HashMap<String, VecDeque<Result<SentimentResult, ClassifierError>>>>,
    default_result: Option<SentimentResult>,
    calls: Mutex<u32>,
}

impl MockClassifier {
    pub(super) fn returning(default_result: SentimentResult) -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            default_result: Some(default_result),
            calls: Mutex::new(0),
        }
    }

    pub(super) fn with_plan(
        plan: Vec<(&str, Vec<Result<SentimentResult, ClassifierError>>)>,
    ) -> Self {
        let mut plans = HashMap::new();
        for (text, entries) in plan {
            plans.insert(text.to_string(), entries.into_iter().collect());
        }
        Self {
            plans: Mutex::new(plans),
            default_result: None,
            calls: Mutex::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        *self.calls.lock().expect("calls mutex poisoned")
    }
}

impl SentimentClassifier for MockClassifier {
    fn classify<'a>(
        &'a self,
        survey_text: &'a str,
    ) -> BoxFuture<'a, Result<SentimentResult, ClassifierError>> {
        Box::pin(async move {
            *self.calls.lock().expect("calls mutex poisoned") += 1;

            let mut plans = self.plans.lock().expect("plans mutex poisoned");
            if let Some(responses) = plans.get_mut(survey_text) {
                if let Some(next) = responses.pop_front() {
                    return next;
                }
            }

            self.default_result.ok_or_else(|| {
                ClassifierError::new(
                    super::types::ClassifierErrorKind::Other,
                    format!("no scripted classification for text '{survey_text}'"),
                )
            })
        })
    }
}

/// Classifier whose calls never resolve, for exercising the timeout bound.
#[derive(Default)]
pub(super) struct HangingClassifier;

impl SentimentClassifier for HangingClassifier {
    fn classify<'a>(
        &'a self,
        _survey_text: &'a str,
    ) -> BoxFuture<'a, Result<SentimentResult, ClassifierError>> {
        Box::pin(futures::future::pending())
    }
}

/// In-memory keyed store: upserts replace the whole record at `id`, matching
/// the durable store's last-write-wins contract.
#[derive(Default)]
pub(super) struct MockWriter {
    outcomes: Mutex<VecDeque<Result<(), StoreError>>>,
    records: Mutex<HashMap<String, SurveyRecord>>,
    calls: Mutex<u32>,
}

impl MockWriter {
    pub(super) fn with_outcomes(outcomes: Vec<Result<(), StoreError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            records: Mutex::new(HashMap::new()),
            calls: Mutex::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        *self.calls.lock().expect("calls mutex poisoned")
    }

    pub(super) fn record_count(&self) -> usize {
        self.records.lock().expect("records mutex poisoned").len()
    }

    pub(super) fn record_for(&self, survey_id: &str) -> Option<SurveyRecord> {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .get(survey_id)
            .cloned()
    }
}

impl ResultWriter for MockWriter {
    fn put_record<'a>(&'a self, record: &'a SurveyRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            *self.calls.lock().expect("calls mutex poisoned") += 1;

            let next = self
                .outcomes
                .lock()
                .expect("outcomes mutex poisoned")
                .pop_front()
                .unwrap_or(Ok(()));

            if next.is_ok() {
                self.records
                    .lock()
                    .expect("records mutex poisoned")
                    .insert(record.id.clone(), record.clone());
            }

            next
        })
    }
}
