//! Size, bound and digit validators

use super::ConstraintValidatorFactory;
use super::utils::{optional_i64, reject_unknown, required_count, required_i64, unsupported};
use crate::descriptor::Parameters;
use graphguard_core::{BuildError, ConstraintValidator, ConstraintValidatorContext, Value};
use serde_json::json;
use std::sync::Arc;

const SIZE_MAX_DEFAULT: i64 = i32::MAX as i64;

/// `Size{min, max}`: element count of text or containers within bounds
#[derive(Debug, Clone, Copy)]
pub struct SizeValidator {
    min: usize,
    max: usize,
}

impl ConstraintValidator for SizeValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        if value.is_null() {
            return Ok(true);
        }
        let len = value.len().ok_or_else(|| unsupported("Size", value))?;
        Ok(len >= self.min && len <= self.max)
    }
}

pub(super) struct SizeFactory;

impl ConstraintValidatorFactory for SizeFactory {
    fn default_message(&self) -> &str {
        "size must be between {min} and {max}"
    }

    fn default_params(&self) -> Parameters {
        Parameters::from([
            ("min".to_string(), json!(0)),
            ("max".to_string(), json!(SIZE_MAX_DEFAULT)),
        ])
    }

    fn create(&self, kind: &str, params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        reject_unknown(kind, params, &["min", "max"])?;
        let min = optional_i64(kind, params, "min")?.unwrap_or(0);
        let max = optional_i64(kind, params, "max")?.unwrap_or(SIZE_MAX_DEFAULT);
        let min = usize::try_from(min).map_err(|_| BuildError::malformed(kind, "min", "must not be negative"))?;
        let max = usize::try_from(max).map_err(|_| BuildError::malformed(kind, "max", "must not be negative"))?;
        if min > max {
            return Err(BuildError::malformed(kind, "max", format!("must not be less than min ({min})")));
        }
        Ok(Arc::new(SizeValidator { min, max }))
    }
}

/// Compare a numeric (or numeric text) value against a bound
fn compare(kind: &str, value: &Value, bound: i64) -> anyhow::Result<Option<std::cmp::Ordering>> {
    match value {
        Value::Integer(i) => Ok(Some(i.cmp(&bound))),
        #[allow(clippy::cast_precision_loss)]
        Value::Float(f) => Ok(f.partial_cmp(&(bound as f64))),
        Value::Text(s) => Ok(s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|f| {
                #[allow(clippy::cast_precision_loss)]
                let bound = bound as f64;
                f.partial_cmp(&bound)
            })),
        other => Err(unsupported(kind, other)),
    }
}

/// `Min{value}`: number greater than or equal to the bound
#[derive(Debug, Clone, Copy)]
pub struct MinValidator {
    value: i64,
}

impl ConstraintValidator for MinValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        if value.is_null() {
            return Ok(true);
        }
        Ok(compare("Min", value, self.value)?.is_some_and(std::cmp::Ordering::is_ge))
    }
}

pub(super) struct MinFactory;

impl ConstraintValidatorFactory for MinFactory {
    fn default_message(&self) -> &str {
        "must be greater than or equal to {value}"
    }

    fn create(&self, kind: &str, params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        reject_unknown(kind, params, &["value"])?;
        Ok(Arc::new(MinValidator {
            value: required_i64(kind, params, "value")?,
        }))
    }
}

/// `Max{value}`: number less than or equal to the bound
#[derive(Debug, Clone, Copy)]
pub struct MaxValidator {
    value: i64,
}

impl ConstraintValidator for MaxValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        if value.is_null() {
            return Ok(true);
        }
        Ok(compare("Max", value, self.value)?.is_some_and(std::cmp::Ordering::is_le))
    }
}

pub(super) struct MaxFactory;

impl ConstraintValidatorFactory for MaxFactory {
    fn default_message(&self) -> &str {
        "must be less than or equal to {value}"
    }

    fn create(&self, kind: &str, params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        reject_unknown(kind, params, &["value"])?;
        Ok(Arc::new(MaxValidator {
            value: required_i64(kind, params, "value")?,
        }))
    }
}

/// `Digits{integer, fraction}`: at most that many integral and fractional
/// digits
#[derive(Debug, Clone, Copy)]
pub struct DigitsValidator {
    integer: usize,
    fraction: usize,
}

impl DigitsValidator {
    /// Integral and fractional digit counts of a decimal literal, ignoring
    /// sign, leading zeros and trailing fractional zeros
    fn digit_counts(literal: &str) -> Option<(usize, usize)> {
        let unsigned = literal.trim().trim_start_matches(['-', '+']);
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let int_digits = int_part.trim_start_matches('0').len();
        let frac_digits = frac_part.trim_end_matches('0').len();
        Some((int_digits, frac_digits))
    }
}

impl ConstraintValidator for DigitsValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        let literal = match value {
            Value::Null => return Ok(true),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => return Ok(false),
            Value::Text(s) => s.clone(),
            other => return Err(unsupported("Digits", other)),
        };
        Ok(Self::digit_counts(&literal)
            .is_some_and(|(int, frac)| int <= self.integer && frac <= self.fraction))
    }
}

pub(super) struct DigitsFactory;

impl ConstraintValidatorFactory for DigitsFactory {
    fn default_message(&self) -> &str {
        "numeric value out of bounds (<{integer} digits>.<{fraction} digits> expected)"
    }

    fn create(&self, kind: &str, params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        reject_unknown(kind, params, &["integer", "fraction"])?;
        Ok(Arc::new(DigitsValidator {
            integer: required_count(kind, params, "integer")?,
            fraction: required_count(kind, params, "fraction")?,
        }))
    }
}
