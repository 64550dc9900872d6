use chrono::SecondsFormat;
use diesel::prelude::*;

use crate::db::schema::survey_results;
use crate::pipeline::types::SurveyRecord;

/// Row shape for the `survey_results` table.
///
/// `created_at` is ISO-8601 UTC text and `expires_at` is Unix epoch seconds,
/// matching the persisted record contract. Expiry on `expires_at` is enforced
/// by a store-side scheduled job, never by the worker.
#[derive(Debug, Clone, PartialEq, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = survey_results)]
pub struct SurveyResultRow {
    pub id: String,
    pub customer_id: String,
    pub survey_text: String,
    pub sentiment: String,
    pub score_positive: f64,
    pub score_negative: f64,
    pub score_neutral: f64,
    pub score_mixed: f64,
    pub created_at: String,
    pub expires_at: i64,
}

impl From<&SurveyRecord> for SurveyResultRow {
    fn from(record: &SurveyRecord) -> Self {
        Self {
            id: record.id.clone(),
            customer_id: record.customer_id.clone(),
            survey_text: record.survey_text.clone(),
            sentiment: record.sentiment.as_str().to_string(),
            score_positive: record.scores.positive,
            score_negative: record.scores.negative,
            score_neutral: record.scores.neutral,
            score_mixed: record.scores.mixed,
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            expires_at: record.expires_at,
        }
    }
}
