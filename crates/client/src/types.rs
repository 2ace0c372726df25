use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub url: String,
    pub expires: String,
}

impl GenerateRequest {
    pub fn new(url: impl Into<String>, expires: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires: expires.into(),
        }
    }
}

/// What the backend answered, reduced to the two cases the form acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateResponse {
    Success { qr_code_url: String },
    /// `message` is `None` when the body carried no `error` field at all.
    Failure { message: Option<String> },
}

impl GenerateResponse {
    pub fn from_slice(body: &[u8]) -> ApiResult<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(&value)
    }

    /// A truthy `qr_code_url` wins; every other shape is a failure.
    ///
    /// A `null` body has no fields to look at and is rejected like a body
    /// that is not JSON.
    pub fn from_value(value: &Value) -> ApiResult<Self> {
        if value.is_null() {
            return Err(ApiError::Decode(serde::de::Error::custom(
                "response body is null",
            )));
        }

        if let Some(qr) = value.get("qr_code_url").filter(|v| is_truthy(v)) {
            return Ok(GenerateResponse::Success {
                qr_code_url: coerce_to_text(qr),
            });
        }

        Ok(GenerateResponse::Failure {
            message: value.get("error").map(coerce_to_text),
        })
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            GenerateResponse::Failure { message } => message.as_deref(),
            GenerateResponse::Success { .. } => None,
        }
    }

    /// Text shown to the user for a failure, `undefined` standing in for a
    /// missing message.
    pub fn alert_text(message: Option<&str>) -> String {
        format!(
            "Error generating QR code: {}",
            message.unwrap_or("undefined")
        )
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Integers print as-is; floats follow the page's number-to-string rules:
/// whole values below 1e21 drop the fraction, `-0` prints as `0`, and very
/// large or small magnitudes use exponent form with an explicit sign.
fn number_to_text(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    if f == 0.0 {
        return "0".to_string();
    }
    let magnitude = f.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{f:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    format!("{f}")
}
