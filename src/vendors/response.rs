use serde_json::Value;

use crate::error::{Error, Result};

/// How a vendor reports a logical failure inside an HTTP 2xx body.
///
/// Success: the code field is absent, null, or `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSchema {
    pub code_field: &'static str,
    pub message_field: &'static str,
}

impl StatusSchema {
    pub const fn new(code_field: &'static str, message_field: &'static str) -> Self {
        Self {
            code_field,
            message_field,
        }
    }

    /// Map a non-zero status into `Error::Upstream`, keeping code and message verbatim.
    pub fn check(&self, body: &Value) -> Result<()> {
        let code = match body.get(self.code_field) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| Error::Decode(format!("'{}' is not an integer", self.code_field)))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::Decode(format!("'{}' is not an integer: {}", self.code_field, s)))?,
            Some(other) => {
                return Err(Error::Decode(format!(
                    "'{}' has unexpected type: {}",
                    self.code_field, other
                )))
            }
        };
        if code == 0 {
            return Ok(());
        }
        let message = body
            .get(self.message_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Err(Error::Upstream { code, message })
    }
}

pub fn parse_json(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| Error::Decode(format!("body is not valid JSON: {}", e)))
}

pub fn required_str(body: &Value, field: &str) -> Result<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::Decode(format!("field '{}' not found or not a string", field)))
}

/// Absent, null and empty strings all read as `None`.
pub fn optional_str(body: &Value, field: Option<&str>) -> Option<String> {
    field
        .and_then(|f| body.get(f))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

pub fn required_u64(body: &Value, field: &str) -> Result<u64> {
    match body.get(field) {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| Error::Decode(format!("field '{}' is not a positive integer", field))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Decode(format!("field '{}' is not a positive integer", field))),
        _ => Err(Error::Decode(format!("field '{}' not found", field))),
    }
}
