use chrono::Utc;
use tracing::{info, warn};

use super::classifier::SentimentClassifier;
use super::parser::parse_submission;
use super::types::{
    BatchOutcome, BatchProcessorConfig, ClassifierError, ClassifierErrorKind, MessageOutcome,
    QueueMessage, SentimentResult, StoreError, SurveyRecord, FAILURE_CLASS_CLASSIFIER,
    FAILURE_CLASS_STORE, FAILURE_CLASS_VALIDATION,
};
use super::writer::{build_record, ResultWriter};

/// Drives parse -> classify -> persist for each message in a delivered batch.
///
/// One processor instance handles one batch to completion at a time; the only
/// state it holds across messages are the injected classifier and writer
/// handles, which are read-only shared resources. Per-message failure is
/// isolated: a failed message is recorded and the rest of the batch always
/// proceeds, so the transport redelivers only what actually failed.
pub struct BatchProcessor<C, W>
where
    C: SentimentClassifier,
    W: ResultWriter,
{
    classifier: C,
    writer: W,
    config: BatchProcessorConfig,
}

impl<C, W> BatchProcessor<C, W>
where
    C: SentimentClassifier,
    W: ResultWriter,
{
    pub fn new(classifier: C, writer: W, config: BatchProcessorConfig) -> Self {
        Self {
            classifier,
            writer,
            config,
        }
    }

    pub fn config(&self) -> BatchProcessorConfig {
        self.config
    }

    /// Processes one delivered batch sequentially and returns one outcome per
    /// input message, in input order.
    ///
    /// Sequential processing bounds concurrent calls into the external
    /// classifier; no message's outcome depends on another's.
    pub async fn process_batch(&self, batch: &[QueueMessage]) -> BatchOutcome {
        info!(
            event = "batch_received",
            batch_size = batch.len(),
            "processing delivered batch"
        );

        let mut entries = Vec::with_capacity(batch.len());
        for message in batch {
            entries.push(self.process_message(message).await);
        }

        let outcome = BatchOutcome { entries };
        info!(
            event = "batch_complete",
            processed = outcome.processed_count(),
            failed = outcome.failed_count(),
            total = outcome.entries.len(),
            "batch processing complete"
        );

        outcome
    }

    /// Processes a single message through the full pipeline.
    ///
    /// Every failure path returns a failed outcome rather than propagating, so
    /// an error here can never abort sibling messages in the batch.
    pub async fn process_message(&self, message: &QueueMessage) -> MessageOutcome {
        let submission = match parse_submission(&message.body) {
            Ok(submission) => submission,
            Err(err) => {
                // Redelivery can never fix a malformed payload; the transport's
                // dead-letter mechanism stops the redelivery loop.
                warn!(
                    event = "message_validation_failed",
                    message_id = %message.message_id,
                    error = %err,
                    "survey message failed validation"
                );
                return MessageOutcome::failed(
                    message.message_id.clone(),
                    None,
                    FAILURE_CLASS_VALIDATION,
                    err.to_string(),
                );
            }
        };

        let sentiment = match self.classify_bounded(&submission.survey_text).await {
            Ok(sentiment) => sentiment,
            Err(err) => {
                warn!(
                    event = "message_classification_failed",
                    message_id = %message.message_id,
                    survey_id = %submission.id,
                    transient = err.is_transient(),
                    error = %err,
                    "sentiment classification failed"
                );
                return MessageOutcome::failed(
                    message.message_id.clone(),
                    Some(submission.id),
                    FAILURE_CLASS_CLASSIFIER,
                    err.to_string(),
                );
            }
        };

        info!(
            event = "survey_classified",
            survey_id = %submission.id,
            sentiment = sentiment.label.as_str(),
            confidence = sentiment.scores.for_label(sentiment.label),
            "classified survey text"
        );

        let created_at = Utc::now();
        let record = build_record(submission, sentiment, created_at);

        match self.put_record_bounded(&record).await {
            Ok(()) => {
                info!(
                    event = "survey_persisted",
                    survey_id = %record.id,
                    customer_id = %record.customer_id,
                    sentiment = record.sentiment.as_str(),
                    expires_at = record.expires_at,
                    "persisted classified survey"
                );
                MessageOutcome::processed(message.message_id.clone(), record.id)
            }
            Err(err) => {
                warn!(
                    event = "message_persist_failed",
                    message_id = %message.message_id,
                    survey_id = %record.id,
                    retryable = err.is_retryable(),
                    error = %err,
                    "store write failed"
                );
                MessageOutcome::failed(
                    message.message_id.clone(),
                    Some(record.id),
                    FAILURE_CLASS_STORE,
                    err.to_string(),
                )
            }
        }
    }

    /// Classifier call bounded by the configured timeout. A timeout is an
    /// ordinary classifier failure, not a special case: the message becomes
    /// eligible for redelivery instead of being retried in-process.
    async fn classify_bounded(
        &self,
        survey_text: &str,
    ) -> Result<SentimentResult, ClassifierError> {
        match tokio::time::timeout(
            self.config.classify_timeout,
            self.classifier.classify(survey_text),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(ClassifierError::new(
                ClassifierErrorKind::Timeout,
                format!(
                    "classifier call exceeded {}ms deadline",
                    self.config.classify_timeout.as_millis()
                ),
            )),
        }
    }

    /// Store write bounded by the configured timeout.
    async fn put_record_bounded(&self, record: &SurveyRecord) -> Result<(), StoreError> {
        match tokio::time::timeout(self.config.store_timeout, self.writer.put_record(record)).await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(StoreError::retryable(format!(
                "store write exceeded {}ms deadline",
                self.config.store_timeout.as_millis()
            ))),
        }
    }
}
