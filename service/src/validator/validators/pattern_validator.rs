//! Regular expression validators
//!
//! Patterns are compiled when metadata is built, through a
//! [`PatternInitializer`]. The caching initializer shares compiled patterns
//! process-wide, keyed by pattern and flags.

use super::ConstraintValidatorFactory;
use super::utils::{optional_str, reject_unknown, string_list, unsupported};
use crate::descriptor::Parameters;
use dashmap::DashMap;
use graphguard_core::{BuildError, ConstraintValidator, ConstraintValidatorContext, Value};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::trace;

/// Basic structural check applied by `Email` before any user pattern
static EMAIL_PATTERN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*$",
    )
});

static SHARED_PATTERNS: Lazy<Arc<CachingPatternInitializer>> =
    Lazy::new(|| Arc::new(CachingPatternInitializer::default()));

/// Regex compilation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternFlag {
    /// Match ignoring case
    CaseInsensitive,
    /// `^` and `$` match at line boundaries
    Multiline,
    /// `.` matches line terminators
    DotAll,
    /// Whitespace and `#` comments are ignored in the pattern
    Comments,
    /// Case folding is Unicode aware (always true for this engine)
    UnicodeCase,
}

impl PatternFlag {
    /// Parse a flag name such as `CASE_INSENSITIVE`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "CASE_INSENSITIVE" => Some(Self::CaseInsensitive),
            "MULTILINE" => Some(Self::Multiline),
            "DOTALL" => Some(Self::DotAll),
            "COMMENTS" => Some(Self::Comments),
            "UNICODE_CASE" => Some(Self::UnicodeCase),
            _ => None,
        }
    }
}

/// Compiles patterns for validators
pub trait PatternInitializer: Send + Sync {
    /// Compile `pattern` so that it must match the whole input
    ///
    /// # Errors
    ///
    /// Returns the regex error for invalid patterns.
    fn compile(&self, pattern: &str, flags: &[PatternFlag]) -> Result<Arc<Regex>, regex::Error>;
}

fn build_regex(pattern: &str, flags: &[PatternFlag]) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(flags.contains(&PatternFlag::CaseInsensitive))
        .multi_line(flags.contains(&PatternFlag::Multiline))
        .dot_matches_new_line(flags.contains(&PatternFlag::DotAll))
        .ignore_whitespace(flags.contains(&PatternFlag::Comments))
        .build()
}

/// Compiles every pattern afresh
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePatternInitializer;

impl PatternInitializer for SimplePatternInitializer {
    fn compile(&self, pattern: &str, flags: &[PatternFlag]) -> Result<Arc<Regex>, regex::Error> {
        build_regex(pattern, flags).map(Arc::new)
    }
}

/// Compiles each distinct (pattern, flags) pair once
#[derive(Debug, Default)]
pub struct CachingPatternInitializer {
    cache: DashMap<(String, Vec<PatternFlag>), Arc<Regex>>,
}

impl CachingPatternInitializer {
    /// The process-wide instance
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_PATTERNS)
    }

    /// Number of cached patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl PatternInitializer for CachingPatternInitializer {
    fn compile(&self, pattern: &str, flags: &[PatternFlag]) -> Result<Arc<Regex>, regex::Error> {
        let mut key_flags = flags.to_vec();
        key_flags.sort_unstable();
        key_flags.dedup();
        let key = (pattern.to_string(), key_flags);
        if let Some(hit) = self.cache.get(&key) {
            trace!(pattern, "pattern cache hit");
            return Ok(Arc::clone(hit.value()));
        }
        let regex = Arc::new(build_regex(pattern, &key.1)?);
        Ok(Arc::clone(self.cache.entry(key).or_insert(regex).value()))
    }
}

fn parse_flags(kind: &str, params: &Parameters) -> Result<Vec<PatternFlag>, BuildError> {
    string_list(kind, params, "flags")?
        .iter()
        .map(|name| {
            PatternFlag::parse(name)
                .ok_or_else(|| BuildError::malformed(kind, "flags", format!("unknown flag '{name}'")))
        })
        .collect()
}

fn compile_param(
    initializer: &dyn PatternInitializer,
    kind: &str,
    pattern: &str,
    flags: &[PatternFlag],
) -> Result<Arc<Regex>, BuildError> {
    initializer
        .compile(pattern, flags)
        .map_err(|e| BuildError::malformed(kind, "regexp", e.to_string()))
}

/// `Pattern{regexp, flags}`: text matching the whole expression
#[derive(Debug, Clone)]
pub struct PatternValidator {
    regex: Arc<Regex>,
}

impl ConstraintValidator for PatternValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        match value {
            Value::Null => Ok(true),
            Value::Text(s) => Ok(self.regex.is_match(s)),
            other => Err(unsupported("Pattern", other)),
        }
    }
}

pub(super) struct PatternFactory {
    initializer: Arc<dyn PatternInitializer>,
}

impl PatternFactory {
    pub(super) fn new(initializer: Arc<dyn PatternInitializer>) -> Self {
        Self { initializer }
    }
}

impl ConstraintValidatorFactory for PatternFactory {
    fn default_message(&self) -> &str {
        "must match \"{regexp}\""
    }

    fn create(&self, kind: &str, params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        reject_unknown(kind, params, &["regexp", "flags"])?;
        let pattern = optional_str(kind, params, "regexp")?
            .ok_or_else(|| BuildError::malformed(kind, "regexp", "is required"))?;
        let flags = parse_flags(kind, params)?;
        Ok(Arc::new(PatternValidator {
            regex: compile_param(self.initializer.as_ref(), kind, pattern, &flags)?,
        }))
    }
}

/// `Email{regexp, flags}`: a well-formed address, optionally also matching
/// an additional expression. Empty text is valid.
#[derive(Debug, Clone)]
pub struct EmailValidator {
    basic: Regex,
    extra: Option<Arc<Regex>>,
}

impl ConstraintValidator for EmailValidator {
    fn is_valid(&self, value: &Value, _context: &ConstraintValidatorContext<'_>) -> anyhow::Result<bool> {
        let text = match value {
            Value::Null => return Ok(true),
            Value::Text(s) => s,
            other => return Err(unsupported("Email", other)),
        };
        if text.is_empty() {
            return Ok(true);
        }
        Ok(self.basic.is_match(text) && self.extra.as_ref().is_none_or(|r| r.is_match(text)))
    }
}

pub(super) struct EmailFactory {
    initializer: Arc<dyn PatternInitializer>,
}

impl EmailFactory {
    pub(super) fn new(initializer: Arc<dyn PatternInitializer>) -> Self {
        Self { initializer }
    }
}

impl ConstraintValidatorFactory for EmailFactory {
    fn default_message(&self) -> &str {
        "must be a well-formed email address"
    }

    fn create(&self, kind: &str, params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        reject_unknown(kind, params, &["regexp", "flags"])?;
        let basic = EMAIL_PATTERN
            .as_ref()
            .map_err(|e| BuildError::malformed(kind, "regexp", format!("built-in pattern: {e}")))?
            .clone();
        let flags = parse_flags(kind, params)?;
        let extra = optional_str(kind, params, "regexp")?
            .map(|pattern| compile_param(self.initializer.as_ref(), kind, pattern, &flags))
            .transpose()?;
        Ok(Arc::new(EmailValidator { basic, extra }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONTEXT: ConstraintValidatorContext<'static> = ConstraintValidatorContext {
        path: "",
        leaf_object: None,
    };

    fn params(value: serde_json::Value) -> Parameters {
        serde_json::from_value(value).unwrap_or_default()
    }

    #[test]
    fn test_pattern_matches_whole_input() -> anyhow::Result<()> {
        let factory = PatternFactory::new(Arc::new(SimplePatternInitializer));
        let validator = factory.create("Pattern", &params(json!({"regexp": "[a-z]+"})))?;
        assert!(validator.is_valid(&Value::from("abc"), &CONTEXT)?);
        assert!(!validator.is_valid(&Value::from("abc1"), &CONTEXT)?);
        assert!(validator.is_valid(&Value::Null, &CONTEXT)?);
        Ok(())
    }

    #[test]
    fn test_pattern_flags() -> anyhow::Result<()> {
        let factory = PatternFactory::new(Arc::new(SimplePatternInitializer));
        let validator = factory.create(
            "Pattern",
            &params(json!({"regexp": "[a-z]+", "flags": ["CASE_INSENSITIVE"]})),
        )?;
        assert!(validator.is_valid(&Value::from("ABC"), &CONTEXT)?);
        let bad = factory.create("Pattern", &params(json!({"regexp": "a", "flags": ["LITERALLY"]})));
        assert!(bad.is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_regexp_is_build_error() {
        let factory = PatternFactory::new(Arc::new(SimplePatternInitializer));
        let result = factory.create("Pattern", &params(json!({"regexp": "(unclosed"})));
        assert!(matches!(result, Err(BuildError::MalformedParameter { .. })));
        assert!(factory.create("Pattern", &Parameters::new()).is_err());
    }

    #[test]
    fn test_caching_initializer_reuses_compiled_patterns() -> anyhow::Result<()> {
        let cache = CachingPatternInitializer::default();
        let a = cache.compile("x+", &[PatternFlag::Multiline, PatternFlag::DotAll])?;
        let b = cache.compile("x+", &[PatternFlag::DotAll, PatternFlag::Multiline])?;
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.compile("x+", &[])?;
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
        Ok(())
    }

    #[test]
    fn test_email() -> anyhow::Result<()> {
        let factory = EmailFactory::new(Arc::new(SimplePatternInitializer));
        let email = factory.create("Email", &Parameters::new())?;
        assert!(email.is_valid(&Value::from("ada@example.org"), &CONTEXT)?);
        assert!(email.is_valid(&Value::from(""), &CONTEXT)?);
        assert!(!email.is_valid(&Value::from("not an address"), &CONTEXT)?);

        let restricted = factory.create("Email", &params(json!({"regexp": ".*@example\\.org"})))?;
        assert!(!restricted.is_valid(&Value::from("ada@example.com"), &CONTEXT)?);
        Ok(())
    }
}
