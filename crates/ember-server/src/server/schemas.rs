//! Request and response bodies.

use serde::{Deserialize, Serialize};

pub const MIN_NEW_TOKENS: i64 = 1;
pub const MAX_NEW_TOKENS: i64 = 1024;

/// Body of `POST /generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Falls back to `generation.default_max_new_tokens` when omitted.
    #[serde(default)]
    pub max_new_tokens: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub state: String,
    pub engine: String,
}

/// One failed constraint, shaped like `{"loc": [...], "msg": ..., "type": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn body(field: &str, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: vec!["body".into(), field.into()],
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// Declarative constraints checked before a handler runs.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

impl Validate for GenerateRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.prompt.is_empty() {
            errors.push(FieldError::body(
                "prompt",
                "String should have at least 1 character",
                "string_too_short",
            ));
        }
        let max_new_tokens = self.max_new_tokens.unwrap_or(MIN_NEW_TOKENS);
        if max_new_tokens < MIN_NEW_TOKENS {
            errors.push(FieldError::body(
                "max_new_tokens",
                format!("Input should be greater than or equal to {MIN_NEW_TOKENS}"),
                "greater_than_equal",
            ));
        }
        if max_new_tokens > MAX_NEW_TOKENS {
            errors.push(FieldError::body(
                "max_new_tokens",
                format!("Input should be less than or equal to {MAX_NEW_TOKENS}"),
                "less_than_equal",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn max_new_tokens_is_optional() {
        let req = parse(r#"{"prompt": "hi"}"#);
        assert_eq!(req.max_new_tokens, None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let lowest = parse(r#"{"prompt": "a", "max_new_tokens": 1}"#);
        assert!(lowest.validate().is_ok());
        let highest = parse(r#"{"prompt": "a", "max_new_tokens": 1024}"#);
        assert!(highest.validate().is_ok());
    }

    #[test]
    fn out_of_range_tokens_rejected() {
        let low = parse(r#"{"prompt": "a", "max_new_tokens": 0}"#)
            .validate()
            .unwrap_err();
        assert_eq!(low[0].loc, vec!["body", "max_new_tokens"]);
        assert_eq!(low[0].kind, "greater_than_equal");

        let high = parse(r#"{"prompt": "a", "max_new_tokens": 1025}"#)
            .validate()
            .unwrap_err();
        assert_eq!(high[0].kind, "less_than_equal");
    }

    #[test]
    fn empty_prompt_rejected_with_every_error_reported() {
        let errors = parse(r#"{"prompt": "", "max_new_tokens": -3}"#)
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].loc, vec!["body", "prompt"]);
    }

    #[test]
    fn field_error_serializes_type_key() {
        let error = FieldError::body("prompt", "m", "string_too_short");
        let json = serde_json::to_value(error).unwrap();
        assert_eq!(json["type"], "string_too_short");
        assert_eq!(json["loc"][0], "body");
    }
}
