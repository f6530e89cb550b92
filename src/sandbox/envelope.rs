//! Uniform `{success, data, error}` result returned by every core operation.

use serde::Serialize;

/// Outcome of one client or bridge operation.
///
/// Fields are private so the two invariants always hold: a successful result
/// carries no error, and a failed result carries no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleResult<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> SimpleResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        self.data.as_mut()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SimpleResult<U> {
        match (self.data, self.error) {
            (Some(data), None) => SimpleResult::ok(f(data)),
            (_, Some(error)) => SimpleResult::fail(error),
            (None, None) => SimpleResult::fail("operation returned no data"),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err("operation returned no data".to_string()),
        }
    }
}

impl<T> From<Result<T, String>> for SimpleResult<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::fail(error),
        }
    }
}

/// Coarse cause of a failure, derived only from its message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Credential,
    Connectivity,
    Other,
}

/// Buckets an error message by substring. Callers key user-facing hints off
/// these cues, so the match lists stay as they are.
pub fn classify_error(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if ["auth", "unauthorized", "forbidden"]
        .iter()
        .any(|cue| lower.contains(cue))
    {
        ErrorClass::Credential
    } else if ["network", "connection"].iter().any(|cue| lower.contains(cue)) {
        ErrorClass::Connectivity
    } else {
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_has_no_error() {
        let r = SimpleResult::ok(json!({"a": 1}));
        assert!(r.is_success());
        assert!(r.error().is_none());
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"success": true, "data": {"a": 1}})
        );
    }

    #[test]
    fn failure_has_no_data() {
        let r: SimpleResult<u32> = SimpleResult::fail("boom");
        assert!(!r.is_success());
        assert!(r.data().is_none());
        assert_eq!(r.error(), Some("boom"));
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }

    #[test]
    fn map_transforms_data_only_on_success() {
        assert_eq!(SimpleResult::ok(2).map(|n| n * 2).data(), Some(&4));
        let failed: SimpleResult<i32> = SimpleResult::fail("x");
        assert_eq!(failed.map(|n| n * 2).error(), Some("x"));
    }

    #[test]
    fn classification_uses_substrings() {
        assert_eq!(classify_error("401 Unauthorized"), ErrorClass::Credential);
        assert_eq!(classify_error("Forbidden resource"), ErrorClass::Credential);
        assert_eq!(classify_error("invalid authorization header"), ErrorClass::Credential);
        assert_eq!(classify_error("network error: timed out"), ErrorClass::Connectivity);
        assert_eq!(classify_error("Connection refused"), ErrorClass::Connectivity);
        assert_eq!(classify_error("quota exceeded"), ErrorClass::Other);
    }
}
