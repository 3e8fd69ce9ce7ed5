use serde_json::{Map, Value};

use crate::domain::{IncidentPatch, NewIncident, Severity, Status};
use crate::error::AppError;

/// Fields a partial update may touch.
pub const UPDATABLE_FIELDS: [&str; 6] = ["title", "service", "severity", "status", "owner", "summary"];

pub const NO_VALID_FIELDS: &str = "No valid fields to update.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// title, service, severity and status are required.
    Create,
    /// Only fields present in the payload are checked.
    Update,
}

fn severity_message() -> String {
    let allowed: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
    format!("Severity must be one of: {}.", allowed.join(", "))
}

fn status_message() -> String {
    let allowed: Vec<&str> = Status::ALL.iter().map(|s| s.as_str()).collect();
    format!("Status must be one of: {}.", allowed.join(", "))
}

fn non_empty_text(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
}

fn text_or_null(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Null)
}

fn check_required_text(
    payload: &Map<String, Value>,
    field: &str,
    label: &str,
    mode: ValidationMode,
    errors: &mut Vec<String>,
) {
    match mode {
        ValidationMode::Create => {
            if !non_empty_text(payload.get(field)) {
                errors.push(format!(
                    "{label} is required and must be a non-empty string."
                ));
            }
        }
        ValidationMode::Update => {
            if payload.contains_key(field) && !non_empty_text(payload.get(field)) {
                errors.push(format!("{label} must be a non-empty string."));
            }
        }
    }
}

fn check_enum(
    payload: &Map<String, Value>,
    field: &str,
    mode: ValidationMode,
    is_member: impl Fn(&str) -> bool,
    message: String,
    errors: &mut Vec<String>,
) {
    let value = payload.get(field);
    if mode == ValidationMode::Update && value.is_none() {
        return;
    }
    let valid = value.and_then(Value::as_str).is_some_and(is_member);
    if !valid {
        errors.push(message);
    }
}

fn check_optional_text(
    payload: &Map<String, Value>,
    field: &str,
    label: &str,
    errors: &mut Vec<String>,
) {
    if let Some(v) = payload.get(field) {
        if !text_or_null(v) {
            errors.push(format!("{label} must be a string."));
        }
    }
}

/// Check a payload against the field rules. Every violation is reported, in field order;
/// an empty result means the payload is valid. Unknown keys are ignored.
pub fn validate_payload(payload: &Map<String, Value>, mode: ValidationMode) -> Vec<String> {
    let mut errors = Vec::new();

    check_required_text(payload, "title", "Title", mode, &mut errors);
    check_required_text(payload, "service", "Service", mode, &mut errors);
    check_enum(
        payload,
        "severity",
        mode,
        |s| Severity::parse(s).is_some(),
        severity_message(),
        &mut errors,
    );
    check_enum(
        payload,
        "status",
        mode,
        |s| Status::parse(s).is_some(),
        status_message(),
        &mut errors,
    );
    check_optional_text(payload, "owner", "Owner", &mut errors);
    check_optional_text(payload, "summary", "Summary", &mut errors);

    if mode == ValidationMode::Update
        && !UPDATABLE_FIELDS.iter().any(|f| payload.contains_key(*f))
    {
        errors.push(NO_VALID_FIELDS.to_string());
    }

    errors
}

/// Trimmed text, or `None` when absent, null, or blank.
fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_text(payload: &Map<String, Value>, field: &str) -> Option<String> {
    optional_text(payload.get(field))
}

fn invariant(field: &str) -> AppError {
    AppError::validation(vec![format!("Invalid value for {field}.")])
}

/// Validate in create mode and build the trimmed create payload.
pub fn parse_new_incident(payload: &Map<String, Value>) -> Result<NewIncident, AppError> {
    let errors = validate_payload(payload, ValidationMode::Create);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let severity = payload
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::parse)
        .ok_or_else(|| invariant("severity"))?;
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .and_then(Status::parse)
        .ok_or_else(|| invariant("status"))?;

    Ok(NewIncident {
        title: required_text(payload, "title").ok_or_else(|| invariant("title"))?,
        service: required_text(payload, "service").ok_or_else(|| invariant("service"))?,
        severity,
        status,
        owner: optional_text(payload.get("owner")),
        summary: optional_text(payload.get("summary")),
    })
}

/// Validate in update mode and build a patch holding only the supplied allow-listed fields.
pub fn parse_patch(payload: &Map<String, Value>) -> Result<IncidentPatch, AppError> {
    let errors = validate_payload(payload, ValidationMode::Update);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let mut patch = IncidentPatch::default();
    if payload.contains_key("title") {
        patch.title = Some(required_text(payload, "title").ok_or_else(|| invariant("title"))?);
    }
    if payload.contains_key("service") {
        patch.service =
            Some(required_text(payload, "service").ok_or_else(|| invariant("service"))?);
    }
    if let Some(v) = payload.get("severity") {
        patch.severity = Some(
            v.as_str()
                .and_then(Severity::parse)
                .ok_or_else(|| invariant("severity"))?,
        );
    }
    if let Some(v) = payload.get("status") {
        patch.status = Some(
            v.as_str()
                .and_then(Status::parse)
                .ok_or_else(|| invariant("status"))?,
        );
    }
    if let Some(v) = payload.get("owner") {
        patch.owner = Some(optional_text(Some(v)));
    }
    if let Some(v) = payload.get("summary") {
        patch.summary = Some(optional_text(Some(v)));
    }

    Ok(patch)
}

/// Request bodies must be JSON objects; anything else is reported like a field error.
pub fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object().ok_or_else(|| {
        AppError::validation(vec!["Request body must be a JSON object.".to_string()])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn create_reports_every_missing_field() {
        let errors = validate_payload(&obj(json!({})), ValidationMode::Create);
        assert_eq!(
            errors,
            vec![
                "Title is required and must be a non-empty string.",
                "Service is required and must be a non-empty string.",
                "Severity must be one of: SEV1, SEV2, SEV3, SEV4.",
                "Status must be one of: OPEN, MITIGATED, RESOLVED.",
            ]
        );
    }

    #[test]
    fn create_rejects_blank_and_non_string_text() {
        let errors = validate_payload(
            &obj(json!({
                "title": "   ",
                "service": 42,
                "severity": "SEV1",
                "status": "OPEN",
                "owner": ["x"],
                "summary": null
            })),
            ValidationMode::Create,
        );
        assert_eq!(
            errors,
            vec![
                "Title is required and must be a non-empty string.",
                "Service is required and must be a non-empty string.",
                "Owner must be a string.",
            ]
        );
    }

    #[test]
    fn update_checks_only_present_fields() {
        let errors = validate_payload(&obj(json!({"status": "RESOLVED"})), ValidationMode::Update);
        assert!(errors.is_empty());

        let errors = validate_payload(
            &obj(json!({"title": "", "severity": "SEV9"})),
            ValidationMode::Update,
        );
        assert_eq!(
            errors,
            vec![
                "Title must be a non-empty string.",
                "Severity must be one of: SEV1, SEV2, SEV3, SEV4.",
            ]
        );
    }

    #[test]
    fn update_with_only_unknown_fields_fails_once() {
        let errors = validate_payload(
            &obj(json!({"id": "x", "created_at": "2020-01-01 00:00:00"})),
            ValidationMode::Update,
        );
        assert_eq!(errors, vec![NO_VALID_FIELDS]);
    }

    #[test]
    fn parse_new_incident_trims_and_drops_blank_optionals() {
        let new = parse_new_incident(&obj(json!({
            "title": "  DB down ",
            "service": " Database",
            "severity": "SEV1",
            "status": "OPEN",
            "owner": "   ",
            "summary": " disk full "
        })))
        .expect("valid");

        assert_eq!(new.title, "DB down");
        assert_eq!(new.service, "Database");
        assert_eq!(new.owner, None);
        assert_eq!(new.summary.as_deref(), Some("disk full"));
    }

    #[test]
    fn parse_patch_distinguishes_absent_from_null() {
        let patch = parse_patch(&obj(json!({"owner": null, "status": "MITIGATED"}))).unwrap();
        assert_eq!(patch.owner, Some(None));
        assert_eq!(patch.summary, None);
        assert_eq!(patch.status, Some(Status::Mitigated));
        assert_eq!(patch.title, None);
    }

    #[test]
    fn non_object_body_is_a_validation_error() {
        let err = as_object(&json!([1, 2])).unwrap_err();
        assert!(err.is_validation());
    }
}
