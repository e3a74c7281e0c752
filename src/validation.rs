use crate::models::AccountRequest;
use serde_json::Value;

pub const TEACHER_REQUIRED_FIELDS: &[&str] = &["firstName", "lastName", "email"];

pub const STUDENT_REQUIRED_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "new_type",
    "gendercode",
    "new_chronicdiseases",
    "birthdate",
    "new_nationalid",
    "new_assignedinanoherschool",
    "new_previousassignedschool",
    "new_transferreason",
    "new_ageatnexteducationalyear",
    "academicYearId",
];

pub const PARENT_REQUIRED_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "email",
    "telephone1",
    "gendercode",
    "familystatuscode",
    "new_academicqualification",
    "jobtitle",
    "new_jobplace",
];

/// A value counts as provided unless it is null, an empty string, `false`
/// or numeric zero.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Names from `required` that the request does not provide, in list order.
pub fn missing_fields<'a>(request: &AccountRequest, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|name| !is_present(request.field(name)))
        .collect()
}

/// Renders a JSON identifier value as the plain string used in OData paths.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presence_follows_truthiness() {
        assert!(is_present(Some(&json!("x"))));
        assert!(is_present(Some(&json!(1))));
        assert!(is_present(Some(&json!(true))));
        assert!(is_present(Some(&json!([]))));

        assert!(!is_present(None));
        assert!(!is_present(Some(&Value::Null)));
        assert!(!is_present(Some(&json!(""))));
        assert!(!is_present(Some(&json!(false))));
        assert!(!is_present(Some(&json!(0))));
        assert!(!is_present(Some(&json!(0.0))));
    }

    #[test]
    fn test_missing_fields_keeps_declared_order() {
        let request: AccountRequest = serde_json::from_value(json!({
            "firstName": "Omar",
            "email": "",
            "gendercode": "1",
            "jobtitle": "Engineer"
        }))
        .unwrap();

        assert_eq!(
            missing_fields(&request, PARENT_REQUIRED_FIELDS),
            vec![
                "lastName",
                "email",
                "telephone1",
                "familystatuscode",
                "new_academicqualification",
                "new_jobplace"
            ]
        );
    }

    #[test]
    fn test_complete_request_has_no_missing_fields() {
        let request: AccountRequest = serde_json::from_value(json!({
            "firstName": "A",
            "lastName": "B",
            "email": "a@b.c"
        }))
        .unwrap();
        assert!(missing_fields(&request, TEACHER_REQUIRED_FIELDS).is_empty());
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_string(&json!(42)), Some("42".to_string()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!({"id": 1})), None);
    }
}
