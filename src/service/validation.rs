//! Payload validation at the request boundary. Unknown fields and rule
//! violations are rejected before anything reaches the store.

use crate::error::AppError;
use crate::schema::{FieldFormat, FieldRule, ResourcePayload, TableName};
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create payload: every key must be a known column, every
    /// required field must be present and non-null, and all field rules hold.
    pub fn validate(table: TableName, body: &ResourcePayload) -> Result<(), AppError> {
        let schema = table.schema();
        Self::reject_unknown_fields(table, body)?;
        for col in schema.columns {
            let val = body.get(col.name);
            if col.rule.required && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", col.name)));
            }
            if let Some(v) = val {
                validate_field(col.name, v, &col.rule)?;
            }
        }
        Ok(())
    }

    /// Validate an update payload: only the fields present are checked;
    /// required-ness is not enforced for missing fields.
    pub fn validate_partial(table: TableName, body: &ResourcePayload) -> Result<(), AppError> {
        let schema = table.schema();
        Self::reject_unknown_fields(table, body)?;
        for (name, v) in body {
            if let Some(col) = schema.column(name) {
                validate_field(name, v, &col.rule)?;
            }
        }
        Ok(())
    }

    fn reject_unknown_fields(table: TableName, body: &ResourcePayload) -> Result<(), AppError> {
        let schema = table.schema();
        for key in body.keys() {
            if !schema.has_column(key) {
                return Err(AppError::Validation(format!(
                    "unknown field '{}' for {}",
                    key, table
                )));
            }
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &Value, rule: &FieldRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.len() > max {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.len() < min {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(pattern) = rule.pattern {
        let re = Regex::new(pattern)
            .map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!(
                    "{} does not match required pattern",
                    col
                )));
            }
        }
    }
    if let Some(allowed) = rule.allowed {
        if let Some(s) = v.as_str() {
            if !allowed.contains(&s) {
                return Err(AppError::Validation(format!(
                    "{} must be one of: {}",
                    col,
                    allowed.join(", ")
                )));
            }
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: FieldFormat) -> Result<(), AppError> {
    match format {
        FieldFormat::Email => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        FieldFormat::Uuid => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
                }
            }
        }
    }
    Ok(())
}
