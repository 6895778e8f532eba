use std::sync::Arc;

use async_trait::async_trait;
use seva_core::AppResult;
use seva_domain::{FieldDef, FieldValue};

use super::{ValidationContext, ValidationOutcome, ValidationRule, text_of};
use crate::form_ports::{DuplicateChecker, FileCategory, FileValidator};

/// Rejects bank account numbers already used by another application.
#[derive(Clone)]
pub struct DuplicateAccountNumber {
    checker: Arc<dyn DuplicateChecker>,
}

impl DuplicateAccountNumber {
    /// Creates the rule over a backend checker.
    #[must_use]
    pub fn new(checker: Arc<dyn DuplicateChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl ValidationRule for DuplicateAccountNumber {
    async fn check(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        match self
            .checker
            .is_duplicate_account(text_of(value), context.reference_number())
            .await
        {
            Ok(true) => Ok(ValidationOutcome::invalid(
                "Application with this account number already exists.",
            )),
            Ok(false) => Ok(ValidationOutcome::Valid),
            Err(error) => {
                tracing::warn!(
                    field = field.name(),
                    error = %error,
                    "duplicate account check failed"
                );
                Ok(ValidationOutcome::invalid(
                    "Validation failed due to a server error.",
                ))
            }
        }
    }
}

/// Sends freshly picked files to the backend for inspection.
///
/// The category follows the field's `accept` list; fields accepting neither
/// images nor PDFs, and values that are not freshly picked files, pass.
#[derive(Clone)]
pub struct ValidateFile {
    validator: Arc<dyn FileValidator>,
}

impl ValidateFile {
    /// Creates the rule over a backend validator.
    #[must_use]
    pub fn new(validator: Arc<dyn FileValidator>) -> Self {
        Self { validator }
    }
}

fn file_category(field: &FieldDef) -> Option<FileCategory> {
    let accept = field.accept()?;
    if accept.contains(".jpg") {
        Some(FileCategory::Image)
    } else if accept.contains(".pdf") {
        Some(FileCategory::Pdf)
    } else {
        None
    }
}

#[async_trait]
impl ValidationRule for ValidateFile {
    async fn check(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        _context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        let Some(category) = file_category(field) else {
            return Ok(ValidationOutcome::Valid);
        };
        let Some(FieldValue::File(file)) = value else {
            return Ok(ValidationOutcome::Valid);
        };

        match self.validator.validate_file(file, category).await {
            Ok(check) if check.is_valid => Ok(ValidationOutcome::Valid),
            Ok(check) => Ok(ValidationOutcome::invalid(
                check
                    .error_message
                    .unwrap_or_else(|| "File was rejected.".to_owned()),
            )),
            Err(error) => {
                tracing::warn!(field = field.name(), error = %error, "file validation failed");
                Ok(ValidationOutcome::invalid(
                    "File validation failed due to a server error.",
                ))
            }
        }
    }
}
