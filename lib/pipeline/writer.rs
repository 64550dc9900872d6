use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::insert_into;
use diesel::pg::upsert::excluded;
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::RunQueryDsl;
use futures::future::BoxFuture;

use crate::db::models::SurveyResultRow;
use crate::db::schema::survey_results;

use super::error_mapping::map_diesel_error;
use super::retention::retention_deadline;
use super::types::{SentimentResult, StoreError, SurveyRecord, SurveySubmission};

/// Builds the persisted record from a validated submission and its
/// classification, computing the retention deadline from `created_at`.
pub fn build_record(
    submission: SurveySubmission,
    sentiment: SentimentResult,
    created_at: DateTime<Utc>,
) -> SurveyRecord {
    SurveyRecord {
        expires_at: retention_deadline(created_at),
        id: submission.id,
        customer_id: submission.customer_id,
        survey_text: submission.survey_text,
        sentiment: sentiment.label,
        scores: sentiment.scores,
        created_at,
    }
}

/// Persists one classified survey record.
///
/// This is intentionally abstracted so batch-processor failure behavior can be
/// tested without a Postgres instance.
///
/// Contract: the write is an unconditional, atomic upsert keyed by `id`.
/// Writing an `id` that already exists replaces the prior record in full;
/// partial-field writes are never observable.
pub trait ResultWriter: Send + Sync {
    fn put_record<'a>(&'a self, record: &'a SurveyRecord) -> BoxFuture<'a, Result<(), StoreError>>;
}

impl<T> ResultWriter for Arc<T>
where
    T: ResultWriter + ?Sized,
{
    fn put_record<'a>(&'a self, record: &'a SurveyRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        (**self).put_record(record)
    }
}

/// Postgres-backed result writer used by the production runtime.
pub struct PgResultWriter {
    pool: Pool<diesel_async::AsyncPgConnection>,
}

impl PgResultWriter {
    pub fn new(pool: Pool<diesel_async::AsyncPgConnection>) -> Self {
        Self { pool }
    }
}

impl ResultWriter for PgResultWriter {
    fn put_record<'a>(&'a self, record: &'a SurveyRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await.map_err(|err| {
                StoreError::retryable(format!("failed to acquire DB pool connection: {err}"))
            })?;

            let row = SurveyResultRow::from(record);

            // Single-statement upsert: either the whole row lands or nothing does.
            insert_into(survey_results::dsl::survey_results)
                .values(&row)
                .on_conflict(survey_results::id)
                .do_update()
                .set((
                    survey_results::customer_id.eq(excluded(survey_results::customer_id)),
                    survey_results::survey_text.eq(excluded(survey_results::survey_text)),
                    survey_results::sentiment.eq(excluded(survey_results::sentiment)),
                    survey_results::score_positive.eq(excluded(survey_results::score_positive)),
                    survey_results::score_negative.eq(excluded(survey_results::score_negative)),
                    survey_results::score_neutral.eq(excluded(survey_results::score_neutral)),
                    survey_results::score_mixed.eq(excluded(survey_results::score_mixed)),
                    survey_results::created_at.eq(excluded(survey_results::created_at)),
                    survey_results::expires_at.eq(excluded(survey_results::expires_at)),
                ))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;

            Ok(())
        })
    }
}
