//! Presence, emptiness and boolean validators
//!
//! Except for `NotNull`, `NotEmpty` and `NotBlank`, a null value is valid:
//! absence is the business of the presence constraints.

use super::utils::unsupported;
use graphguard_core::{ConstraintValidator, ConstraintValidatorContext, Value};

/// `NotNull`: the value must be present
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNullValidator;

impl ConstraintValidator for NotNullValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        Ok(!value.is_null())
    }
}

/// `Null`: the value must be absent
#[derive(Debug, Clone, Copy, Default)]
pub struct NullValidator;

impl ConstraintValidator for NullValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        Ok(value.is_null())
    }
}

/// `NotEmpty`: text or container with at least one element
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmptyValidator;

impl ConstraintValidator for NotEmptyValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        if value.is_null() {
            return Ok(false);
        }
        value
            .len()
            .map(|len| len > 0)
            .ok_or_else(|| unsupported("NotEmpty", value))
    }
}

/// `NotBlank`: text with at least one non-whitespace character
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBlankValidator;

impl ConstraintValidator for NotBlankValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        match value {
            Value::Null => Ok(false),
            Value::Text(s) => Ok(!s.trim().is_empty()),
            other => Err(unsupported("NotBlank", other)),
        }
    }
}

/// `AssertTrue`
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertTrueValidator;

impl ConstraintValidator for AssertTrueValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        match value {
            Value::Null => Ok(true),
            Value::Bool(b) => Ok(*b),
            other => Err(unsupported("AssertTrue", other)),
        }
    }
}

/// `AssertFalse`
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertFalseValidator;

impl ConstraintValidator for AssertFalseValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        match value {
            Value::Null => Ok(true),
            Value::Bool(b) => Ok(!*b),
            other => Err(unsupported("AssertFalse", other)),
        }
    }
}
