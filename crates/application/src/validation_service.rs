use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use seva_core::{AppResult, ReferenceNumber};
use seva_domain::{FieldDef, FieldValue, FormValues};

use crate::form_ports::{DuplicateChecker, FileValidator};

mod remote_rules;
mod rules;
mod transforms;

pub use remote_rules::{DuplicateAccountNumber, ValidateFile};
pub use rules::{
    IsAgeGreaterThan, IsDateWithinRange, IsEmailValid, NotEmpty, OnlyAlphabets, OnlyDigits,
    SpecificLength,
};
pub use transforms::apply_transformations;

const UNEXPECTED_ERROR_MESSAGE: &str = "Validation failed due to an unexpected error.";

/// Result of validating one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Every rule passed.
    Valid,
    /// The first failing rule's message.
    Invalid(String),
}

impl ValidationOutcome {
    /// Builds an invalid outcome.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Returns whether the value passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid(message) => Some(message.as_str()),
        }
    }
}

/// Everything a rule may consult besides the field and its value.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    values: &'a FormValues,
    reference_number: &'a ReferenceNumber,
    today: NaiveDate,
}

impl<'a> ValidationContext<'a> {
    /// Creates a context dated today in UTC.
    #[must_use]
    pub fn new(values: &'a FormValues, reference_number: &'a ReferenceNumber) -> Self {
        Self {
            values,
            reference_number,
            today: Utc::now().date_naive(),
        }
    }

    /// Overrides the date relative rules compare against.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Returns the whole form's current values.
    #[must_use]
    pub fn values(&self) -> &'a FormValues {
        self.values
    }

    /// Returns the application's reference number.
    #[must_use]
    pub fn reference_number(&self) -> &'a ReferenceNumber {
        self.reference_number
    }

    /// Returns the comparison date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

/// One named validation rule.
///
/// An `Err` is reported to the user as an unexpected failure; rules backed by
/// the network translate their own transport errors into field messages.
#[async_trait]
pub trait ValidationRule: Send + Sync {
    /// Checks a value; `None` means the key has never been filled.
    async fn check(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome>;
}

/// Registry of rules addressed by the ids schemas reference.
#[derive(Clone)]
pub struct ValidationEngine {
    rules: HashMap<String, Arc<dyn ValidationRule>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Creates an engine holding the local rules only.
    #[must_use]
    pub fn new() -> Self {
        let mut engine = Self {
            rules: HashMap::new(),
        };
        engine.register("notEmpty", Arc::new(NotEmpty));
        engine.register("onlyAlphabets", Arc::new(OnlyAlphabets::new()));
        engine.register("onlyDigits", Arc::new(OnlyDigits::new()));
        engine.register("specificLength", Arc::new(SpecificLength));
        engine.register("isAgeGreaterThan", Arc::new(IsAgeGreaterThan));
        engine.register("isEmailValid", Arc::new(IsEmailValid::new()));
        engine.register("isDateWithinRange", Arc::new(IsDateWithinRange));
        engine
    }

    /// Creates an engine holding the local and backend-backed rules.
    #[must_use]
    pub fn with_remote_rules(
        duplicate_checker: Arc<dyn DuplicateChecker>,
        file_validator: Arc<dyn FileValidator>,
    ) -> Self {
        let mut engine = Self::new();
        engine.register(
            "duplicateAccountNumber",
            Arc::new(DuplicateAccountNumber::new(duplicate_checker)),
        );
        engine.register("validateFile", Arc::new(ValidateFile::new(file_validator)));
        engine
    }

    /// Registers or replaces a rule.
    pub fn register(&mut self, rule_id: impl Into<String>, rule: Arc<dyn ValidationRule>) {
        self.rules.insert(rule_id.into(), rule);
    }

    /// Returns whether a rule id is known.
    #[must_use]
    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }

    /// Runs the field's rules in declared order and stops at the first failure.
    ///
    /// Unknown rule ids are skipped.
    pub async fn run_validations(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        context: &ValidationContext<'_>,
    ) -> ValidationOutcome {
        for rule_id in field.validation_functions() {
            let Some(rule) = self.rules.get(rule_id) else {
                tracing::debug!(field = field.name(), rule = %rule_id, "skipping unknown rule");
                continue;
            };

            match rule.check(field, value, context).await {
                Ok(ValidationOutcome::Valid) => {}
                Ok(outcome) => return outcome,
                Err(error) => {
                    tracing::warn!(
                        field = field.name(),
                        rule = %rule_id,
                        error = %error,
                        "validation rule failed unexpectedly"
                    );
                    return ValidationOutcome::invalid(UNEXPECTED_ERROR_MESSAGE);
                }
            }
        }

        ValidationOutcome::Valid
    }
}

fn text_of(value: Option<&FieldValue>) -> &str {
    value.map(FieldValue::as_text).unwrap_or_default()
}
