use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use sentiment_worker_lib::pipeline::types::{
    BatchProcessorConfig, ClassifierError, QueueMessage, SentimentLabel, SentimentResult,
    SentimentScores, StoreError, SurveyRecord,
};
use sentiment_worker_lib::pipeline::{PipelineService, ResultWriter, SentimentClassifier};
use sentiment_worker_lib::transport::ChannelSource;

fn positive_result() -> SentimentResult {
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

fn test_config() -> BatchProcessorConfig {
    BatchProcessorConfig {
        classify_timeout: Duration::from_millis(100),
        store_timeout: Duration::from_millis(100),
        max_batch_size: 4,
    }
}

fn queue_message(message_id: &str, body: &str) -> QueueMessage {
    QueueMessage {
        message_id: message_id.to_string(),
        body: body.to_string(),
    }
}

/// Classifier stub returning one fixed result for every text.
struct StubClassifier {
    result: SentimentResult,
}

impl SentimentClassifier for StubClassifier {
    fn classify<'a>(
        &'a self,
        _survey_text: &'a str,
    ) -> BoxFuture<'a, Result<SentimentResult, ClassifierError>> {
        Box::pin(async move { Ok(self.result) })
    }
}

/// Keyed in-memory store with optional scripted leading failures.
#[derive(Default)]
struct MemoryWriter {
    records: Mutex<HashMap<String, SurveyRecord>>,
    failures_remaining: Mutex<u32>,
}

impl MemoryWriter {
    fn failing_first(failures: u32) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failures_remaining: Mutex::new(failures),
        }
    }

    fn record_for(&self, survey_id: &str) -> Option<SurveyRecord> {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .get(survey_id)
            .cloned()
    }

    fn record_count(&self) -> usize {
        self.records.lock().expect("records mutex poisoned").len()
    }
}

impl ResultWriter for MemoryWriter {
    fn put_record<'a>(&'a self, record: &'a SurveyRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            {
                let mut failures = self
                    .failures_remaining
                    .lock()
                    .expect("failures mutex poisoned");
                if *failures > 0 {
                    *failures -= 1;
                    return Err(StoreError::retryable("simulated write throttle"));
                }
            }

            self.records
                .lock()
                .expect("records mutex poisoned")
                .insert(record.id.clone(), record.clone());
            Ok(())
        })
    }
}

#[tokio::test]
async fn run_persists_valid_messages_and_requeues_the_malformed_one() {
    let (tx, rx) = flume::unbounded();
    let (redelivery_tx, redelivery_rx) = flume::unbounded();
    let mut source = ChannelSource::new(rx, redelivery_tx);

    tx.send(queue_message(
        "m-1",
        r#"{"id": "s-1", "customerId": "c-1", "surveyText": "excellent"}"#,
    ))
    .expect("send should succeed");
    tx.send(queue_message("m-2", r#"{"customerId": "c-2"}"#))
        .expect("send should succeed");
    tx.send(queue_message(
        "m-3",
        r#"{"id": "s-3", "customerId": "c-3", "surveyText": "fine"}"#,
    ))
    .expect("send should succeed");
    drop(tx);

    let writer = Arc::new(MemoryWriter::default());
    let service = PipelineService::new(
        StubClassifier {
            result: positive_result(),
        },
        Arc::clone(&writer),
        test_config(),
    );

    let summary = service
        .run(&mut source, CancellationToken::new())
        .await
        .expect("run should complete");

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(writer.record_count(), 2);

    let record = writer.record_for("s-1").expect("s-1 should be persisted");
    assert_eq!(record.sentiment, SentimentLabel::Positive);
    assert_eq!(record.scores.positive, 0.9);
    assert_eq!(record.scores.mixed, 0.03);

    let requeued = redelivery_rx
        .try_recv()
        .expect("failed message should be requeued");
    assert_eq!(requeued.message_id, "m-2");
    assert!(
        redelivery_rx.try_recv().is_err(),
        "only the failed message should be requeued"
    );
}

#[tokio::test]
async fn redelivered_message_succeeds_once_the_store_recovers() {
    let (tx, rx) = flume::unbounded();
    // Redelivery feeds the same queue, so a transient store failure leads to
    // a second delivery of the same message.
    let mut source = ChannelSource::new(rx, tx.clone());

    tx.send(queue_message(
        "m-1",
        r#"{"id": "s-1", "customerId": "c-1", "surveyText": "eventually fine"}"#,
    ))
    .expect("send should succeed");

    let writer = Arc::new(MemoryWriter::failing_first(1));
    let service = PipelineService::new(
        StubClassifier {
            result: positive_result(),
        },
        Arc::clone(&writer),
        test_config(),
    );

    let cancel_token = CancellationToken::new();
    let run_token = cancel_token.clone();
    let run_writer = Arc::clone(&writer);
    let run_handle = tokio::spawn(async move {
        service
            .run(&mut source, run_token)
            .await
            .expect("run should complete")
    });

    // The first delivery fails at the store; the redelivered copy lands.
    for _ in 0..100 {
        if run_writer.record_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel_token.cancel();
    let summary = run_handle.await.expect("run task should not panic");

    assert_eq!(writer.record_count(), 1);
    assert!(writer.record_for("s-1").is_some());
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
}
