use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use regex::Regex;
use seva_core::{AppError, AppResult};
use seva_domain::{FieldDef, FieldValue, LengthLimit, PLEASE_SELECT};

use super::{ValidationContext, ValidationOutcome, ValidationRule, text_of};

fn is_match(pattern: Option<&Regex>, value: &str) -> AppResult<bool> {
    pattern
        .map(|pattern| pattern.is_match(value))
        .ok_or_else(|| AppError::Internal("validation pattern failed to compile".to_owned()))
}

/// Rejects empty values and the "Please Select" placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmpty;

#[async_trait]
impl ValidationRule for NotEmpty {
    async fn check(
        &self,
        _field: &FieldDef,
        value: Option<&FieldValue>,
        _context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        let text = text_of(value);
        if text.is_empty() || text == PLEASE_SELECT {
            return Ok(ValidationOutcome::invalid("This field is required."));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Accepts letters, spaces, dots and apostrophes.
#[derive(Debug, Clone)]
pub struct OnlyAlphabets {
    pattern: Option<Regex>,
}

impl OnlyAlphabets {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^[A-Za-z .']+$").ok(),
        }
    }
}

impl Default for OnlyAlphabets {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValidationRule for OnlyAlphabets {
    async fn check(
        &self,
        _field: &FieldDef,
        value: Option<&FieldValue>,
        _context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        if !is_match(self.pattern.as_ref(), text_of(value))? {
            return Ok(ValidationOutcome::invalid(
                "Please use letters (a-z, A-Z) and special characters (. and ') only.",
            ));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Accepts ASCII digits only.
#[derive(Debug, Clone)]
pub struct OnlyDigits {
    pattern: Option<Regex>,
}

impl OnlyDigits {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^[0-9]+$").ok(),
        }
    }
}

impl Default for OnlyDigits {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValidationRule for OnlyDigits {
    async fn check(
        &self,
        _field: &FieldDef,
        value: Option<&FieldValue>,
        _context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        if !is_match(self.pattern.as_ref(), text_of(value))? {
            return Ok(ValidationOutcome::invalid("Please enter only digits."));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Requires exactly `maxLength` characters.
///
/// A field without a fixed `maxLength` cannot be checked and passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificLength;

#[async_trait]
impl ValidationRule for SpecificLength {
    async fn check(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        _context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        let Some(length) = field.max_length().and_then(LengthLimit::fixed) else {
            tracing::debug!(field = field.name(), "specificLength without a fixed maxLength");
            return Ok(ValidationOutcome::Valid);
        };

        let actual = i64::try_from(text_of(value).chars().count()).unwrap_or(i64::MAX);
        if actual != length {
            return Ok(ValidationOutcome::invalid(format!(
                "This must be exactly {length} characters long."
            )));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Requires a birth date at least `maxLength` years in the past.
///
/// The minimum age may depend on another field, e.g. a pension type.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAgeGreaterThan;

#[async_trait]
impl ValidationRule for IsAgeGreaterThan {
    async fn check(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        let minimum_age = match field.max_length() {
            Some(LengthLimit::Fixed(age)) => *age,
            Some(LengthLimit::Dependent {
                dependent_on,
                by_value,
            }) => {
                let Some(selected) = context
                    .values()
                    .text(dependent_on)
                    .filter(|selected| !selected.is_empty())
                else {
                    return Ok(ValidationOutcome::invalid(format!(
                        "Dependent field ({dependent_on}) value is missing."
                    )));
                };
                let Some(age) = by_value.get(selected) else {
                    return Ok(ValidationOutcome::invalid(format!(
                        "No maximum length defined for option ({selected})."
                    )));
                };
                *age
            }
            None => return Ok(ValidationOutcome::Valid),
        };

        let Some(birth_date) = parse_date(text_of(value)) else {
            return Ok(ValidationOutcome::Valid);
        };
        let latest_birth_date = shift_months(context.today(), minimum_age.saturating_mul(-12))
            .ok_or_else(|| AppError::Internal(format!("age limit {minimum_age} out of range")))?;

        if birth_date >= latest_birth_date {
            return Ok(ValidationOutcome::invalid(format!(
                "Age should be greater than or equal to {minimum_age}."
            )));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Accepts a conventional `local@domain.tld` address.
#[derive(Debug, Clone)]
pub struct IsEmailValid {
    pattern: Option<Regex>,
}

impl IsEmailValid {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok(),
        }
    }
}

impl Default for IsEmailValid {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValidationRule for IsEmailValid {
    async fn check(
        &self,
        _field: &FieldDef,
        value: Option<&FieldValue>,
        _context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        if !is_match(self.pattern.as_ref(), text_of(value))? {
            return Ok(ValidationOutcome::invalid("Invalid Email Address."));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Requires a date between `minLength` and `maxLength` months from today.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsDateWithinRange;

#[async_trait]
impl ValidationRule for IsDateWithinRange {
    async fn check(
        &self,
        field: &FieldDef,
        value: Option<&FieldValue>,
        context: &ValidationContext<'_>,
    ) -> AppResult<ValidationOutcome> {
        let (Some(min_months), Some(max_months)) = (
            field.min_length(),
            field.max_length().and_then(LengthLimit::fixed),
        ) else {
            return Ok(ValidationOutcome::Valid);
        };
        let Some(date) = parse_date(text_of(value)) else {
            return Ok(ValidationOutcome::Valid);
        };

        let earliest = shift_months(context.today(), min_months);
        let latest = shift_months(context.today(), max_months);
        let (Some(earliest), Some(latest)) = (earliest, latest) else {
            return Err(AppError::Internal(format!(
                "month range {min_months}..{max_months} out of range"
            )));
        };

        if date < earliest || date > latest {
            return Ok(ValidationOutcome::invalid(format!(
                "The date should be between {min_months} to {max_months} months from current date."
            )));
        }
        Ok(ValidationOutcome::Valid)
    }
}

/// Parses the leading `YYYY-MM-DD` of a date or timestamp.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}
