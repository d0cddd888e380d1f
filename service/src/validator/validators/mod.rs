//! Leaf validators for the built-in constraint kinds
//!
//! Each constraint kind is served by a [`ConstraintValidatorFactory`] that
//! checks the declaration's parameters and initializes a validator once per
//! declaration. The [`ValidatorRegistry`] maps kinds to factories.

use crate::descriptor::Parameters;
use graphguard_core::config::MetadataConfig;
use graphguard_core::{BuildError, ConstraintValidator};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod constraint_validators;
pub mod pattern_validator;
pub mod range_validator;
pub mod utils;

pub use constraint_validators::{
    AssertFalseValidator, AssertTrueValidator, NotBlankValidator, NotEmptyValidator,
    NotNullValidator, NullValidator,
};
pub use pattern_validator::{
    CachingPatternInitializer, EmailValidator, PatternFlag, PatternInitializer, PatternValidator,
    SimplePatternInitializer,
};
pub use range_validator::{DigitsValidator, MaxValidator, MinValidator, SizeValidator};

/// Creates validators for one constraint kind
pub trait ConstraintValidatorFactory: Send + Sync {
    /// Message template used when a declaration sets none
    fn default_message(&self) -> &str;

    /// Values for parameters a declaration leaves out
    fn default_params(&self) -> Parameters {
        Parameters::new()
    }

    /// Check `params` and initialize a validator
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedParameter`] for parameters of the wrong
    /// type, arity or value.
    fn create(
        &self,
        kind: &str,
        params: &Parameters,
    ) -> Result<Arc<dyn ConstraintValidator>, BuildError>;
}

/// Factory for validators that take no parameters
struct ParameterlessFactory {
    message: String,
    validator: Arc<dyn ConstraintValidator>,
}

impl ConstraintValidatorFactory for ParameterlessFactory {
    fn default_message(&self) -> &str {
        &self.message
    }

    fn create(
        &self,
        kind: &str,
        params: &Parameters,
    ) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        utils::reject_unknown(kind, params, &[])?;
        Ok(Arc::clone(&self.validator))
    }
}

/// Registry of constraint validator factories by kind
#[derive(Clone)]
pub struct ValidatorRegistry {
    factories: HashMap<String, Arc<dyn ConstraintValidatorFactory>>,
}

impl ValidatorRegistry {
    /// Create a registry without any kinds
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in kind
    #[must_use]
    pub fn with_builtins(config: &MetadataConfig) -> Self {
        let mut registry = Self::empty();

        registry.register_validator("NotNull", "must not be null", NotNullValidator);
        registry.register_validator("Null", "must be null", NullValidator);
        registry.register_validator("NotEmpty", "must not be empty", NotEmptyValidator);
        registry.register_validator("NotBlank", "must not be blank", NotBlankValidator);
        registry.register_validator("AssertTrue", "must be true", AssertTrueValidator);
        registry.register_validator("AssertFalse", "must be false", AssertFalseValidator);

        registry.register("Size", range_validator::SizeFactory);
        registry.register("Min", range_validator::MinFactory);
        registry.register("Max", range_validator::MaxFactory);
        registry.register("Digits", range_validator::DigitsFactory);

        let initializer: Arc<dyn PatternInitializer> = if config.cache_patterns {
            CachingPatternInitializer::shared()
        } else {
            Arc::new(SimplePatternInitializer)
        };
        registry.register(
            "Pattern",
            pattern_validator::PatternFactory::new(Arc::clone(&initializer)),
        );
        registry.register("Email", pattern_validator::EmailFactory::new(initializer));

        registry
    }

    /// Register (or replace) the factory for a kind
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        factory: impl ConstraintValidatorFactory + 'static,
    ) {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Register a validator taking no parameters
    pub fn register_validator(
        &mut self,
        kind: impl Into<String>,
        message: impl Into<String>,
        validator: impl ConstraintValidator + 'static,
    ) {
        self.register(
            kind,
            ParameterlessFactory {
                message: message.into(),
                validator: Arc::new(validator),
            },
        );
    }

    /// Factory for a kind
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ConstraintValidatorFactory>> {
        self.factories.get(kind)
    }

    /// Whether a kind has a factory
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins(&MetadataConfig::default())
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphguard_core::Value;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = ValidatorRegistry::default();
        for kind in [
            "NotNull", "Null", "NotEmpty", "NotBlank", "AssertTrue", "AssertFalse", "Size", "Min",
            "Max", "Digits", "Pattern", "Email",
        ] {
            assert!(registry.contains(kind), "{kind} missing");
        }
        assert!(!registry.contains("Future"));
    }

    #[test]
    fn test_parameterless_kinds_reject_parameters() {
        let registry = ValidatorRegistry::default();
        let factory = registry.get("NotNull").map(Arc::clone);
        let mut params = Parameters::new();
        params.insert("value".into(), json!(1));
        let result = factory.map(|f| f.create("NotNull", &params).is_err());
        assert_eq!(result, Some(true));
    }

    #[test]
    fn test_custom_validator_registration() -> anyhow::Result<()> {
        let mut registry = ValidatorRegistry::empty();
        registry.register_validator("Even", "must be even", |v: &Value| -> anyhow::Result<bool> {
            Ok(matches!(v, Value::Integer(i) if i % 2 == 0))
        });
        let factory = registry
            .get("Even")
            .ok_or_else(|| anyhow::anyhow!("not registered"))?;
        assert_eq!(factory.default_message(), "must be even");
        let validator = factory.create("Even", &Parameters::new())?;
        let context = graphguard_core::ConstraintValidatorContext {
            path: "n",
            leaf_object: None,
        };
        assert!(validator.is_valid(&Value::Integer(4), &context)?);
        assert!(!validator.is_valid(&Value::Integer(3), &context)?);
        Ok(())
    }
}
