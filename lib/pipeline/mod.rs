mod classifier;
mod error_mapping;
mod parser;
mod processor;
pub mod retention;
pub mod types;
mod writer;

pub use classifier::{HttpSentimentClassifier, SentimentClassifier, MAX_DOCUMENT_BYTES};
pub use parser::parse_submission;
pub use processor::BatchProcessor;
pub use writer::{build_record, PgResultWriter, ResultWriter};

#[cfg(test)]
mod test_support;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::server::monitoring::{FailureClassLabels, PIPELINE_METRICS};
use crate::transport::{MessageSource, SourceError};
use types::{BatchProcessorConfig, MessageOutcomeKind};

/// Aggregate counts for one pipeline run, returned to the entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineRunSummary {
    pub batches: u64,
    pub processed: u64,
    pub failed: u64,
}

/// Owns the batch processor and drives it from a message source until the
/// source exhausts or cancellation is requested.
///
/// Batches never overlap: one delivered batch is processed to completion and
/// its outcomes reported before the next receive. Cancellation takes effect
/// between batches so in-flight messages are never half-reported.
pub struct PipelineService<C, W>
where
    C: SentimentClassifier,
    W: ResultWriter,
{
    processor: BatchProcessor<C, W>,
}

impl<C, W> PipelineService<C, W>
where
    C: SentimentClassifier,
    W: ResultWriter,
{
    pub fn new(classifier: C, writer: W, config: BatchProcessorConfig) -> Self {
        Self {
            processor: BatchProcessor::new(classifier, writer, config),
        }
    }

    pub async fn run<S>(
        &self,
        source: &mut S,
        cancel_token: CancellationToken,
    ) -> Result<PipelineRunSummary, SourceError>
    where
        S: MessageSource,
    {
        let max_batch_size = self.processor.config().max_batch_size.max(1);
        let mut summary = PipelineRunSummary::default();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!(event = "pipeline_cancelled", "shutdown requested; stopping between batches");
                    break;
                }
                received = source.receive_batch(max_batch_size) => {
                    let Some(batch) = received? else {
                        info!(event = "source_exhausted", "message source exhausted");
                        break;
                    };
                    if batch.is_empty() {
                        continue;
                    }

                    let outcome = self.processor.process_batch(&batch).await;
                    record_batch_metrics(&outcome);
                    source.report(&outcome).await?;

                    summary.batches += 1;
                    summary.processed += outcome.processed_count() as u64;
                    summary.failed += outcome.failed_count() as u64;
                }
            }
        }

        info!(
            event = "pipeline_run_summary",
            batches = summary.batches,
            processed = summary.processed,
            failed = summary.failed,
            "pipeline run summary"
        );

        Ok(summary)
    }
}

fn record_batch_metrics(outcome: &types::BatchOutcome) {
    let Some(metrics) = PIPELINE_METRICS.get() else {
        return;
    };

    metrics.batches_total.inc();
    metrics.last_batch_size.set(outcome.entries.len() as i64);

    for entry in &outcome.entries {
        match entry.kind {
            MessageOutcomeKind::Processed => {
                metrics.surveys_processed_total.inc();
            }
            MessageOutcomeKind::Failed => {
                metrics
                    .surveys_failed_total
                    .get_or_create(&FailureClassLabels {
                        failure_class: entry.failure_class.unwrap_or("unknown").to_string(),
                    })
                    .inc();
            }
        }
    }
}
