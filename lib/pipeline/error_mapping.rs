use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::types::{ClassifierError, ClassifierErrorKind, StoreError};

/// Classifies a diesel write failure into retryable vs fatal store errors.
///
/// The distinction only feeds logging and outcome context: the batch
/// processor reports both the same way and leaves retry triage to the
/// transport's redelivery counting.
pub fn map_diesel_error(error: DieselError) -> StoreError {
    match error {
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::SerializationFailure
            | DatabaseErrorKind::ClosedConnection
            | DatabaseErrorKind::UnableToSendCommand => StoreError::retryable(format!(
                "transient database error ({kind:?}): {}",
                info.message()
            )),
            _ => StoreError::fatal(format!(
                "fatal database error ({kind:?}): {}",
                info.message()
            )),
        },
        DieselError::RollbackTransaction => {
            StoreError::retryable("transaction rollback requested by database".to_string())
        }
        other => StoreError::fatal(format!("fatal diesel error: {other}")),
    }
}

/// Classifies a reqwest failure from the classifier boundary call.
pub fn map_reqwest_error(error: reqwest::Error) -> ClassifierError {
    if let Some(status) = error.status() {
        return map_status_to_classifier_error(status.as_u16());
    }

    if error.is_timeout() {
        return ClassifierError::new(
            ClassifierErrorKind::Timeout,
            format!("classifier request timed out: {error}"),
        );
    }

    if error.is_connect() || error.is_request() || error.is_body() {
        return ClassifierError::new(
            ClassifierErrorKind::Network,
            format!("network/transport error calling classifier: {error}"),
        );
    }

    if error.is_decode() {
        return ClassifierError::new(
            ClassifierErrorKind::MalformedResponse,
            format!("classifier response could not be decoded: {error}"),
        );
    }

    ClassifierError::new(ClassifierErrorKind::Other, format!("{error:#}"))
}

pub fn map_status_to_classifier_error(status: u16) -> ClassifierError {
    match status {
        429 => ClassifierError::new(
            ClassifierErrorKind::Throttled,
            "classifier throttled the request",
        ),
        400..=499 => ClassifierError::new(
            ClassifierErrorKind::Other,
            format!("classifier rejected the request with status {status}"),
        ),
        500..=599 => ClassifierError::new(
            ClassifierErrorKind::UpstreamUnavailable,
            format!("classifier returned server error {status}"),
        ),
        _ => ClassifierError::new(
            ClassifierErrorKind::MalformedResponse,
            format!("unexpected HTTP status {status} from classifier"),
        ),
    }
}
