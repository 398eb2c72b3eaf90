//! Request and response bodies for the task API.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::tasks::{TaskId, TaskParams};

/// Body of `POST /task/add`. Every field is required; they are optional here
/// so a missing field becomes a validation message instead of a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitTaskRequest {
    pub n: Option<f64>,
    pub d: Option<f64>,
    pub n1: Option<f64>,
    #[serde(rename = "I")]
    pub interval: Option<f64>,
    #[serde(rename = "TTL")]
    pub ttl: Option<f64>,
}

impl SubmitTaskRequest {
    /// Check presence and ranges of every field, reporting all problems at once.
    pub fn validate(&self) -> Result<TaskParams, ValidationError> {
        let mut fields = Vec::new();

        let elements_number = required(&mut fields, "n", self.n, |v| {
            v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64
        });
        let delta = required(&mut fields, "d", self.d, f64::is_finite);
        let start_value = required(&mut fields, "n1", self.n1, f64::is_finite);
        let iteration_interval = required(&mut fields, "I", self.interval, non_negative);
        let ttl = required(&mut fields, "TTL", self.ttl, non_negative);

        match (elements_number, delta, start_value, iteration_interval, ttl) {
            (Some(n), Some(d), Some(n1), Some(interval), Some(ttl)) if fields.is_empty() => {
                Ok(TaskParams {
                    elements_number: n as u64,
                    delta: d,
                    start_value: n1,
                    iteration_interval: interval,
                    ttl,
                })
            }
            _ => Err(ValidationError { fields }),
        }
    }
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn required<P>(fields: &mut Vec<String>, name: &str, value: Option<f64>, valid: P) -> Option<f64>
where
    P: Fn(f64) -> bool,
{
    match value {
        None => {
            fields.push(format!("field {name} is required"));
            None
        }
        Some(v) if !valid(v) => {
            fields.push(format!("field {name} is not valid"));
            None
        }
        Some(v) => Some(v),
    }
}

/// Plain `{"detail": ...}` response, with the new id on successful submit.
#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            task_id: None,
        }
    }

    pub fn created(task_id: TaskId) -> Self {
        Self {
            detail: "new task successfully created".to_string(),
            task_id: Some(task_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> SubmitTaskRequest {
        SubmitTaskRequest {
            n: Some(5.0),
            d: Some(11.5),
            n1: Some(21.33),
            interval: Some(0.0),
            ttl: Some(120.0),
        }
    }

    #[test]
    fn valid_request_builds_params() {
        let params = full().validate().unwrap();
        assert_eq!(params.elements_number, 5);
        assert_eq!(params.delta, 11.5);
        assert_eq!(params.start_value, 21.33);
        assert_eq!(params.iteration_interval, 0.0);
        assert_eq!(params.ttl, 120.0);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let err = SubmitTaskRequest::default().validate().unwrap_err();
        assert_eq!(err.fields.len(), 5);
        assert_eq!(err.fields[0], "field n is required");
        assert_eq!(err.fields[4], "field TTL is required");
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let req = SubmitTaskRequest {
            n: Some(2.5),
            interval: Some(-1.0),
            ..full()
        };
        let err = req.validate().unwrap_err();
        assert_eq!(
            err.fields,
            vec!["field n is not valid".to_string(), "field I is not valid".to_string()]
        );

        let zero = SubmitTaskRequest { n: Some(0.0), ..full() };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn decodes_wire_names() {
        let req: SubmitTaskRequest =
            serde_json::from_str(r#"{"n": 3, "d": 2, "n1": 10, "I": 0.5, "TTL": 1}"#).unwrap();
        assert_eq!(req.interval, Some(0.5));
        assert_eq!(req.ttl, Some(1.0));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn created_response_carries_id() {
        let json = serde_json::to_value(DetailResponse::created(7)).unwrap();
        assert_eq!(json["task_id"], 7);
        let json = serde_json::to_value(DetailResponse::new("nope")).unwrap();
        assert!(json.get("task_id").is_none());
    }
}
