use chrono::{DateTime, Months, Utc};

/// Records are kept for exactly twelve calendar months after classification.
pub const RETENTION_MONTHS: u32 = 12;

/// Returns the Unix-epoch-seconds instant exactly [`RETENTION_MONTHS`] calendar
/// months after `created_at`.
///
/// Day-of-month is preserved when the target month has that day and clamped to
/// the target month's last day otherwise, so an addition landing on Feb 29 of
/// a non-leap year clamps to Feb 28. Input and output are both UTC.
///
/// Total: `checked_add_months` only fails past chrono's representable range
/// (year ~262143), where we saturate rather than surface an error path.
pub fn retention_deadline(created_at: DateTime<Utc>) -> i64 {
    created_at
        .checked_add_months(Months::new(RETENTION_MONTHS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .timestamp()
}
