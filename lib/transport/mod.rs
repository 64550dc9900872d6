//! Queue transport adapters.
//!
//! The pipeline core is transport-agnostic: it consumes delivered batches and
//! reports per-message outcomes. How those outcomes translate into
//! acknowledgment and redelivery is each adapter's decision. An adapter whose
//! underlying transport cannot acknowledge per message must degrade to
//! failing the whole batch (full redelivery) and say so in its docs rather
//! than silently pretending the semantics are equivalent.

use std::collections::HashMap;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use crate::pipeline::types::{BatchOutcome, QueueMessage};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading message source: {0}")]
    Io(#[from] std::io::Error),

    #[error("redelivery channel closed while reporting outcomes: {0}")]
    ChannelClosed(String),
}

/// A source of delivered message batches.
///
/// `report` is the single outcome-reporting operation: everything listed as
/// failed becomes eligible for redelivery (where the adapter supports it) and
/// everything else is acknowledged and removed.
pub trait MessageSource: Send {
    /// Receives the next delivered batch of at most `max` messages.
    ///
    /// `Ok(None)` means the source is exhausted and no further batches will
    /// arrive.
    fn receive_batch(
        &mut self,
        max: usize,
    ) -> BoxFuture<'_, Result<Option<Vec<QueueMessage>>, SourceError>>;

    /// Reports the per-message outcomes of one delivered batch.
    fn report<'a>(&'a mut self, outcome: &'a BatchOutcome) -> BoxFuture<'a, Result<(), SourceError>>;
}

/// Newline-delimited JSON source reading message bodies from stdin.
///
/// Meant for local runs and drills. Blank lines are transport noise and are
/// skipped; anything else, valid or not, is delivered as a message body so
/// validation failures surface through the normal outcome path.
///
/// Degraded acknowledgment mode: stdin cannot redeliver, so failed message
/// IDs are only logged for operator replay.
pub struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
    next_seq: u64,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            next_seq: 0,
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSource for StdinSource {
    fn receive_batch(
        &mut self,
        max: usize,
    ) -> BoxFuture<'_, Result<Option<Vec<QueueMessage>>, SourceError>> {
        Box::pin(async move {
            let mut batch = Vec::new();
            while batch.len() < max.max(1) {
                match self.lines.next_line().await? {
                    Some(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        self.next_seq += 1;
                        batch.push(QueueMessage {
                            message_id: format!("stdin-{}", self.next_seq),
                            body: line,
                        });
                    }
                    None => break,
                }
            }

            if batch.is_empty() {
                return Ok(None);
            }
            Ok(Some(batch))
        })
    }

    fn report<'a>(
        &'a mut self,
        outcome: &'a BatchOutcome,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            let failed_ids = outcome.failed_message_ids();
            if !failed_ids.is_empty() {
                warn!(
                    event = "stdin_failed_messages",
                    failed_ids = ?failed_ids,
                    "stdin source cannot redeliver; failed messages require operator replay"
                );
            }
            Ok(())
        })
    }
}

/// In-process `flume`-backed source for embedding and integration tests.
///
/// Supports true partial-batch redelivery: failed messages are re-sent on the
/// redelivery channel, successes are acknowledged by dropping them.
pub struct ChannelSource {
    receiver: flume::Receiver<QueueMessage>,
    redelivery: flume::Sender<QueueMessage>,
    in_flight: HashMap<String, QueueMessage>,
}

impl ChannelSource {
    /// `redelivery` may feed the same queue as `receiver` or a side queue.
    /// When it feeds the same queue the source holds a live sender, so the
    /// channel never disconnects; stop such run loops via cancellation.
    pub fn new(receiver: flume::Receiver<QueueMessage>, redelivery: flume::Sender<QueueMessage>) -> Self {
        Self {
            receiver,
            redelivery,
            in_flight: HashMap::new(),
        }
    }
}

impl MessageSource for ChannelSource {
    fn receive_batch(
        &mut self,
        max: usize,
    ) -> BoxFuture<'_, Result<Option<Vec<QueueMessage>>, SourceError>> {
        Box::pin(async move {
            // Block for the first message, then fill opportunistically so a
            // slow producer still gets single-message batches.
            let first = match self.receiver.recv_async().await {
                Ok(message) => message,
                Err(flume::RecvError::Disconnected) => return Ok(None),
            };

            let mut batch = vec![first];
            while batch.len() < max.max(1) {
                match self.receiver.try_recv() {
                    Ok(message) => batch.push(message),
                    Err(_) => break,
                }
            }

            for message in &batch {
                self.in_flight
                    .insert(message.message_id.clone(), message.clone());
            }

            Ok(Some(batch))
        })
    }

    fn report<'a>(
        &'a mut self,
        outcome: &'a BatchOutcome,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            for entry in &outcome.entries {
                let Some(message) = self.in_flight.remove(&entry.message_id) else {
                    continue;
                };

                if entry.is_failed() {
                    info!(
                        event = "message_requeued",
                        message_id = %entry.message_id,
                        failure_class = ?entry.failure_class,
                        "re-queuing failed message for redelivery"
                    );
                    self.redelivery
                        .send(message)
                        .map_err(|err| SourceError::ChannelClosed(err.to_string()))?;
                }
            }
            Ok(())
        })
    }
}
