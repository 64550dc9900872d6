use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure class recorded on outcomes for messages that never parsed into a
/// valid submission. Permanent: redelivery can never make the payload valid.
pub const FAILURE_CLASS_VALIDATION: &str = "validation";
/// Failure class for external classifier failures (possibly transient).
pub const FAILURE_CLASS_CLASSIFIER: &str = "classifier";
/// Failure class for durable store write failures (possibly transient).
pub const FAILURE_CLASS_STORE: &str = "store";

/// One raw message as delivered by the queue transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Transport-assigned identifier used for acknowledgment/redelivery.
    pub message_id: String,
    /// Raw JSON payload produced by the ingress.
    pub body: String,
}

/// A validated survey submission extracted from one queue message.
///
/// `id` is caller-supplied and doubles as the idempotency key for the
/// persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveySubmission {
    pub id: String,
    pub customer_id: String,
    pub survey_text: String,
}

/// Closed sentiment label set. The external classifier never returns anything
/// outside these four; an unknown label is treated as a malformed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Mixed => "MIXED",
        }
    }

    /// Parses the classifier's wire label. Returns `None` for anything outside
    /// the closed set so the adapter can reject it as malformed.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "POSITIVE" => Some(Self::Positive),
            "NEGATIVE" => Some(Self::Negative),
            "NEUTRAL" => Some(Self::Neutral),
            "MIXED" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// Fixed-shape confidence map. All four keys are always present; the adapter
/// substitutes 0.0 for any label the classifier omitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SentimentScores {
    #[serde(rename = "Positive")]
    pub positive: f64,
    #[serde(rename = "Negative")]
    pub negative: f64,
    #[serde(rename = "Neutral")]
    pub neutral: f64,
    #[serde(rename = "Mixed")]
    pub mixed: f64,
}

impl SentimentScores {
    pub fn for_label(&self, label: SentimentLabel) -> f64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Mixed => self.mixed,
        }
    }
}

/// Normalized classifier output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub scores: SentimentScores,
}

/// The persisted record, owned exclusively by the result writer once built.
///
/// `id` is the sole identity: writing an existing `id` replaces the prior
/// record in full (last-write-wins, no merge, no versioning).
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRecord {
    pub id: String,
    pub customer_id: String,
    pub survey_text: String,
    pub sentiment: SentimentLabel,
    pub scores: SentimentScores,
    pub created_at: DateTime<Utc>,
    /// Unix epoch seconds, exactly 12 calendar months after `created_at`.
    /// Consumed by the store's background expiry mechanism.
    pub expires_at: i64,
}

/// Malformed or incomplete input. Permanently unrecoverable by redelivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message body is empty")]
    EmptyBody,

    #[error("message body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("survey '{0}' is required")]
    MissingField(&'static str),

    #[error("survey '{0}' is required and cannot be empty")]
    EmptyField(&'static str),

    #[error("survey '{0}' must be a string")]
    NotAString(&'static str),
}

/// Normalized classifier failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierErrorKind {
    Network,
    Timeout,
    Throttled,
    UpstreamUnavailable,
    /// Document exceeds the classifier's per-request byte cap. Not transient:
    /// redelivering the same payload can never succeed.
    DocumentTooLarge,
    MalformedResponse,
    Other,
}

/// Typed classifier failure with human-readable details.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("classifier error ({kind:?}): {message}")]
pub struct ClassifierError {
    pub kind: ClassifierErrorKind,
    pub message: String,
}

impl ClassifierError {
    pub fn new(kind: ClassifierErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ClassifierErrorKind::Network
                | ClassifierErrorKind::Timeout
                | ClassifierErrorKind::Throttled
                | ClassifierErrorKind::UpstreamUnavailable
        )
    }
}

/// Normalized store-write failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Retryable,
    Fatal,
}

/// Typed store failure with human-readable details.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store error ({kind:?}): {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Retryable,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == StoreErrorKind::Retryable
    }
}

/// Per-message outcome kind within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcomeKind {
    Processed,
    Failed,
}

/// Per-message outcome reported to the transport at batch end.
///
/// Outcomes are ephemeral: they drive the acknowledgment/redelivery decision
/// and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub message_id: String,
    /// Survey ID when the message parsed far enough to extract one.
    pub survey_id: Option<String>,
    pub kind: MessageOutcomeKind,
    pub failure_class: Option<&'static str>,
    pub message: Option<String>,
}

impl MessageOutcome {
    pub fn processed(message_id: impl Into<String>, survey_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            survey_id: Some(survey_id.into()),
            kind: MessageOutcomeKind::Processed,
            failure_class: None,
            message: None,
        }
    }

    pub fn failed(
        message_id: impl Into<String>,
        survey_id: Option<String>,
        failure_class: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            survey_id,
            kind: MessageOutcomeKind::Failed,
            failure_class: Some(failure_class),
            message: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.kind == MessageOutcomeKind::Failed
    }
}

/// Aggregate result of one batch invocation, one entry per input message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub entries: Vec<MessageOutcome>,
}

impl BatchOutcome {
    pub fn processed_count(&self) -> usize {
        self.entries.len() - self.failed_count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_failed()).count()
    }

    /// Message IDs that should become eligible for redelivery. Everything not
    /// listed here is acknowledged and removed from the queue.
    pub fn failed_message_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.is_failed())
            .map(|entry| entry.message_id.as_str())
            .collect()
    }
}

/// Batch processor settings.
///
/// Both external calls are bounded by a timeout; a timeout surfaces as an
/// ordinary classifier/store failure and the message becomes eligible for
/// redelivery. There is no in-process retry of either call: retry policy is
/// delegated to the transport's redelivery mechanism so retry layers don't
/// stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProcessorConfig {
    pub classify_timeout: Duration,
    pub store_timeout: Duration,
    /// Upper bound on messages requested per batch. The external queue
    /// enforces its own cap; this only sizes receive calls.
    pub max_batch_size: usize,
}

impl Default for BatchProcessorConfig {
    fn default() -> Self {
        Self {
            classify_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(10),
            max_batch_size: 10,
        }
    }
}
