use serde_json::Value;

use super::types::{SurveySubmission, ValidationError};

/// Extracts and validates the three required submission fields from a raw
/// queue message body.
///
/// Unknown extra fields are ignored for forward compatibility. `surveyText`
/// is stored trimmed; `id` and `customerId` are kept verbatim but must be
/// non-blank. No side effects.
pub fn parse_submission(body: &str) -> Result<SurveySubmission, ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }

    let payload: Value =
        serde_json::from_str(body).map_err(|err| ValidationError::InvalidJson(err.to_string()))?;

    let id = require_text_field(&payload, "id")?;
    let customer_id = require_text_field(&payload, "customerId")?;
    let survey_text = require_text_field(&payload, "surveyText")?.trim().to_string();

    Ok(SurveySubmission {
        id,
        customer_id,
        survey_text,
    })
}

fn require_text_field(payload: &Value, field: &'static str) -> Result<String, ValidationError> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(raw)) => {
            if raw.trim().is_empty() {
                Err(ValidationError::EmptyField(field))
            } else {
                Ok(raw.clone())
            }
        }
        Some(_) => Err(ValidationError::NotAString(field)),
    }
}
