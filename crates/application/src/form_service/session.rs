use std::collections::BTreeMap;

use seva_core::{AppError, AppResult, ReferenceNumber, ServiceId};
use seva_domain::{
    FILE_SUFFIX, FieldDef, FieldValue, FormMode, FormSchema, FormValues, SELECT_SUFFIX, Section,
};

use crate::validation_service::{
    ValidationContext, ValidationEngine, ValidationOutcome, apply_transformations,
};

/// State of one application being filled.
///
/// A session is owned by its caller and mutated only through
/// [`crate::FormService`] or the validation ticket protocol.
#[derive(Debug, Clone)]
pub struct FormSession {
    service_id: ServiceId,
    mode: FormMode,
    reference_number: ReferenceNumber,
    schema: FormSchema,
    values: FormValues,
    loaded: FormValues,
    errors: BTreeMap<String, String>,
    return_fields: Option<Vec<String>>,
    current_step: usize,
    generations: BTreeMap<String, u64>,
    submitted: bool,
}

impl FormSession {
    pub(crate) fn new(
        service_id: ServiceId,
        mode: FormMode,
        reference_number: ReferenceNumber,
        schema: FormSchema,
        values: FormValues,
        return_fields: Option<Vec<String>>,
    ) -> Self {
        Self {
            service_id,
            mode,
            reference_number,
            schema,
            loaded: values.clone(),
            values,
            errors: BTreeMap::new(),
            return_fields,
            current_step: 0,
            generations: BTreeMap::new(),
            submitted: false,
        }
    }

    /// Returns the service being applied for.
    #[must_use]
    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    /// Returns how the session was opened.
    #[must_use]
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Returns the application's reference number; unassigned before the first save.
    #[must_use]
    pub fn reference_number(&self) -> &ReferenceNumber {
        &self.reference_number
    }

    /// Returns the live schema, including fetched dependent options.
    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Returns the current values.
    #[must_use]
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    /// Returns the per-field error messages of the last validation.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Returns the error message of one key.
    #[must_use]
    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    /// Returns the returned fields of an application under correction.
    #[must_use]
    pub fn return_fields(&self) -> Option<&[String]> {
        self.return_fields.as_deref()
    }

    /// Returns the zero-based current step.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.schema.len()
    }

    /// Returns whether the current step is the last one.
    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.current_step + 1 >= self.schema.len()
    }

    /// Returns the section shown at the current step.
    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.schema
            .section(self.current_step)
            .map(|section| &**section)
    }

    /// Returns whether the application was submitted.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Returns whether a key is locked because it was not returned for correction.
    #[must_use]
    pub fn is_field_disabled(&self, key: &str) -> bool {
        match (self.mode, self.return_fields.as_deref()) {
            (FormMode::Edit, Some(return_fields)) => {
                let base_name = enclosure_base_name(key);
                !return_fields
                    .iter()
                    .any(|returned| returned == key || Some(returned.as_str()) == base_name)
            }
            _ => false,
        }
    }

    /// Returns whether a key differs from the value it was loaded with.
    #[must_use]
    pub fn is_modified(&self, key: &str) -> bool {
        self.values.get(key) != self.loaded.get(key)
    }

    /// Finds the field a key is bound to, preferring the current step's section.
    #[must_use]
    pub fn field_for_key(&self, key: &str) -> Option<&FieldDef> {
        let lookup = |name: &str| {
            self.current_section()
                .and_then(|section| section.find_field(name))
                .or_else(|| self.schema.find_field(name))
        };
        lookup(key).or_else(|| {
            enclosure_base_name(key)
                .and_then(lookup)
                .filter(|field| field.is_enclosure())
        })
    }

    /// Snapshots what is needed to validate one key outside the session.
    ///
    /// Returns `None` when no field is bound to the key.
    #[must_use]
    pub fn begin_validation(&self, key: &str) -> Option<ValidationTicket> {
        let field = self.field_for_key(key)?.clone();
        Some(ValidationTicket {
            key: key.to_owned(),
            generation: self.generation(key),
            field,
            value: self.values.get(key).cloned(),
            values: self.values.clone(),
            reference_number: self.reference_number.clone(),
        })
    }

    /// Records a validation outcome unless the key changed since the ticket
    /// was issued. Returns whether the outcome was applied.
    pub fn apply_validation(
        &mut self,
        ticket: &ValidationTicket,
        outcome: ValidationOutcome,
    ) -> bool {
        if self.generation(&ticket.key) != ticket.generation {
            tracing::warn!(field = %ticket.key, "discarding stale validation result");
            return false;
        }
        match outcome {
            ValidationOutcome::Valid => {
                self.errors.remove(&ticket.key);
            }
            ValidationOutcome::Invalid(message) => {
                self.errors.insert(ticket.key.clone(), message);
            }
        }
        true
    }

    pub(crate) fn ensure_open(&self) -> AppResult<()> {
        if self.submitted {
            return Err(AppError::Conflict(format!(
                "application for service '{}' was already submitted",
                self.service_id
            )));
        }
        Ok(())
    }

    /// Stores a value after applying the field's transformations.
    pub(crate) fn assign(&mut self, key: &str, value: FieldValue) {
        let value = match (value, self.field_for_key(key)) {
            (FieldValue::Text(text), Some(field)) => {
                FieldValue::Text(apply_transformations(field, &text))
            }
            (value, _) => value,
        };
        self.values.insert(key, value);
        *self.generations.entry(key.to_owned()).or_default() += 1;
        self.errors.remove(key);
    }

    /// Gives never-filled keys their default without marking them modified.
    pub(crate) fn register_default(&mut self, key: &str, default: FieldValue) {
        if self.values.contains(key) {
            return;
        }
        self.values.insert(key, default.clone());
        if !self.loaded.contains(key) {
            self.loaded.insert(key, default);
        }
    }

    pub(crate) fn schema_mut(&mut self) -> &mut FormSchema {
        &mut self.schema
    }

    pub(crate) fn set_step(&mut self, step: usize) {
        self.current_step = step;
    }

    pub(crate) fn set_reference_number(&mut self, reference_number: ReferenceNumber) {
        self.reference_number = reference_number;
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    fn generation(&self, key: &str) -> u64 {
        self.generations.get(key).copied().unwrap_or_default()
    }
}

fn enclosure_base_name(key: &str) -> Option<&str> {
    key.strip_suffix(SELECT_SUFFIX)
        .or_else(|| key.strip_suffix(FILE_SUFFIX))
}

/// Snapshot of one pending field validation.
///
/// Tickets are issued by [`FormSession::begin_validation`]; a ticket whose key
/// was edited in the meantime is rejected by [`FormSession::apply_validation`].
#[derive(Debug, Clone)]
pub struct ValidationTicket {
    key: String,
    generation: u64,
    field: FieldDef,
    value: Option<FieldValue>,
    values: FormValues,
    reference_number: ReferenceNumber,
}

impl ValidationTicket {
    /// Returns the key being validated.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Runs the field's rules against the snapshot.
    pub async fn run(&self, engine: &ValidationEngine) -> ValidationOutcome {
        let context = ValidationContext::new(&self.values, &self.reference_number);
        engine
            .run_validations(&self.field, self.value.as_ref(), &context)
            .await
    }
}
