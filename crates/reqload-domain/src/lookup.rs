use serde_json::Value;

/// Outcome of looking a top-level field up in a JSON response body.
///
/// `Absent` and a value that does not match are different answers: callers
/// that only care about equality can treat both as a non-match.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLookup {
    Found(Value),
    Absent,

    /// The body is not valid JSON. Carries the parser message.
    Malformed(String),
}

impl FieldLookup {
    pub fn matches(&self, expected: &Value) -> bool {
        matches!(self, FieldLookup::Found(actual) if actual == expected)
    }
}

/// Parse `body` as JSON and return the top-level `field`.
///
/// Non-object documents (arrays, scalars, `null`) have no fields, so any
/// lookup into them is `Absent`.
pub fn lookup_field(body: &[u8], field: &str) -> FieldLookup {
    let doc: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(err) => return FieldLookup::Malformed(err.to_string()),
    };

    match doc {
        Value::Object(mut map) => map
            .remove(field)
            .map(FieldLookup::Found)
            .unwrap_or(FieldLookup::Absent),
        _ => FieldLookup::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_string_field() {
        let got = lookup_field(br#"{"name":"Dummy","job":"leader"}"#, "name");
        assert_eq!(got, FieldLookup::Found(json!("Dummy")));
        assert!(got.matches(&json!("Dummy")));
        assert!(!got.matches(&json!("Wrong")));
    }

    #[test]
    fn missing_field_is_absent_not_mismatch() {
        let got = lookup_field(br#"{"name":"Dummy"}"#, "job");
        assert_eq!(got, FieldLookup::Absent);
        assert!(!got.matches(&json!("leader")));
    }

    #[test]
    fn non_object_documents_have_no_fields() {
        assert_eq!(lookup_field(b"[1,2,3]", "name"), FieldLookup::Absent);
        assert_eq!(lookup_field(b"null", "name"), FieldLookup::Absent);
        assert_eq!(lookup_field(b"\"Dummy\"", "name"), FieldLookup::Absent);
    }

    #[test]
    fn html_error_page_is_malformed() {
        let got = lookup_field(b"<html>502 Bad Gateway</html>", "name");
        assert!(matches!(got, FieldLookup::Malformed(_)));
        assert!(!got.matches(&json!("Dummy")));
    }

    #[test]
    fn equality_is_strict_on_json_type() {
        let got = lookup_field(br#"{"id":"2"}"#, "id");
        assert!(!got.matches(&json!(2)));
        assert!(got.matches(&json!("2")));
    }
}
