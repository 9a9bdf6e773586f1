use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::grading::GradeRange;
use crate::ipc::error::{err, grade_details};
use crate::ipc::types::{AppState, Request};
use crate::store::StoreError;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        let details = match &e {
            StoreError::Invalid(g) => Some(grade_details(g)),
            StoreError::Superseded { superseded_by, .. } => {
                Some(serde_json::json!({ "supersededBy": superseded_by }))
            }
            _ => None,
        };
        if e.code() == "store_failed" {
            tracing::warn!(error = %e, "store operation failed");
        }
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing params.{}", key)))
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("params.{} must be a number", key)))
}

/// Decodes `params.<key>` into a typed payload.
pub fn typed_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, HandlerErr> {
    let Some(raw) = req.params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing params.{}", key)));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("params.{} is invalid: {}", key, e)))
}

/// Ranges given inline as `params.ranges`, or loaded from `params.definitionId`.
pub fn ranges_from_params(state: &AppState, req: &Request) -> Result<Vec<GradeRange>, HandlerErr> {
    if req.params.get("ranges").is_some() {
        return typed_param(req, "ranges");
    }
    if req.params.get("definitionId").is_some() {
        let id = required_str(req, "definitionId")?;
        return Ok(state.store.get(id)?.ranges);
    }
    Err(HandlerErr::bad_params(
        "either params.ranges or params.definitionId is required",
    ))
}
