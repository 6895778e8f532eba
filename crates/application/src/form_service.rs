use std::collections::BTreeMap;
use std::sync::Arc;

use seva_core::{AppError, AppResult, ReferenceNumber, ServiceId};
use seva_domain::{
    FieldDef, FieldKind, FieldValue, FormMode, FormSchema, FormValues, PLEASE_SELECT, SelectOption,
    expand_for_editing, flatten, is_district_field, step_keys, tehsil_field_for,
};

use crate::form_ports::{
    BankDirectory, DependentOptionSource, FormContentSource, SubmissionReceipt, SubmissionSink,
};
use crate::validation_service::{ValidationEngine, ValidationOutcome};

mod address;
mod navigation;
mod session;
mod submission;

pub use session::{FormSession, ValidationTicket};

/// Alert shown when a returned application is advanced without correcting
/// every returned field of the step.
pub const UNMODIFIED_FIELDS_MESSAGE: &str =
    "Please modify all correction fields before proceeding.";

/// Input for opening a form session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSessionInput {
    /// Service being applied for.
    pub service_id: ServiceId,
    /// How the application is opened.
    pub mode: FormMode,
    /// Reference of the saved application; required unless the mode is `New`.
    pub reference_number: Option<ReferenceNumber>,
}

/// Result of trying to leave the current step forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step passed and the session moved to `step`.
    Advanced {
        /// New zero-based step.
        step: usize,
    },
    /// Some fields failed validation; the step is unchanged.
    Invalid {
        /// Error message per key.
        errors: BTreeMap<String, String>,
    },
    /// Returned fields were left as loaded; the step is unchanged.
    Unmodified {
        /// Keys still holding their loaded value.
        fields: Vec<String>,
    },
}

/// Result of a final submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend accepted the application.
    Submitted(SubmissionReceipt),
    /// The last step failed validation; nothing was sent.
    Invalid {
        /// Error message per key.
        errors: BTreeMap<String, String>,
    },
}

/// Application service driving multi-step form sessions.
#[derive(Clone)]
pub struct FormService {
    content_source: Arc<dyn FormContentSource>,
    option_source: Arc<dyn DependentOptionSource>,
    bank_directory: Arc<dyn BankDirectory>,
    submission_sink: Arc<dyn SubmissionSink>,
    validation_engine: ValidationEngine,
}

impl FormService {
    /// Creates a form service from its ports.
    #[must_use]
    pub fn new(
        content_source: Arc<dyn FormContentSource>,
        option_source: Arc<dyn DependentOptionSource>,
        bank_directory: Arc<dyn BankDirectory>,
        submission_sink: Arc<dyn SubmissionSink>,
        validation_engine: ValidationEngine,
    ) -> Self {
        Self {
            content_source,
            option_source,
            bank_directory,
            submission_sink,
            validation_engine,
        }
    }

    /// Fetches the schema and seeds a new session at step 0.
    ///
    /// Incomplete and returned applications are seeded from their stored
    /// details; tehsil options are fetched for every district already holding
    /// a value.
    pub async fn open_session(&self, input: OpenSessionInput) -> AppResult<FormSession> {
        let content = self
            .content_source
            .service_content(&input.service_id)
            .await?;
        if !content.status {
            return Err(AppError::Schema(format!(
                "service '{}' has no form configured",
                input.service_id
            )));
        }
        let schema = FormSchema::parse(&content.form_element)?;
        if schema.is_empty() {
            return Err(AppError::Schema("no form configuration available".to_owned()));
        }

        let reference_number = input.reference_number.unwrap_or_default();
        let (values, return_fields) = if input.mode.loads_prior_submission() {
            if !reference_number.is_assigned() {
                return Err(AppError::Validation(format!(
                    "a reference number is required to open a form in '{}' mode",
                    input.mode.as_str()
                )));
            }
            let prior = self.content_source.form_details(&reference_number).await?;
            let return_fields =
                (input.mode == FormMode::Edit).then_some(prior.return_fields);
            (expand_for_editing(&flatten(&prior.form_details)), return_fields)
        } else {
            (FormValues::new(), None)
        };

        let mut session = FormSession::new(
            input.service_id,
            input.mode,
            reference_number,
            schema,
            values,
            return_fields,
        );
        apply_select_defaults(&mut session);

        let mut seeded_districts = Vec::new();
        for (section_index, section) in session.schema().sections().iter().enumerate() {
            for step_key in step_keys(section, session.values()) {
                let seeded = session
                    .values()
                    .text(&step_key.key)
                    .is_some_and(|value| !value.is_empty());
                if seeded && is_district_field(&step_key.key) {
                    seeded_districts.push((section_index, step_key.key));
                }
            }
        }
        for (section_index, district_key) in seeded_districts {
            self.refresh_tehsils(&mut session, section_index, &district_key)
                .await;
        }

        tracing::info!(
            service_id = %session.service_id(),
            mode = session.mode().as_str(),
            steps = session.step_count(),
            "opened form session"
        );
        Ok(session)
    }

    /// Assigns a user-entered value.
    ///
    /// Changing a district refreshes the sibling tehsil options of the same
    /// section.
    pub async fn set_value(
        &self,
        session: &mut FormSession,
        key: &str,
        value: FieldValue,
    ) -> AppResult<()> {
        session.ensure_open()?;
        if session.field_for_key(key).is_none() {
            return Err(AppError::NotFound(format!("form has no field '{key}'")));
        }
        if session.is_field_disabled(key) {
            return Err(AppError::Validation(format!(
                "field '{key}' is not open for correction"
            )));
        }

        session.assign(key, value);
        tracing::debug!(field = key, "field value assigned");

        if is_district_field(key)
            && let Some(section_index) = section_index_for(session, key)
        {
            self.refresh_tehsils(session, section_index, key).await;
        }
        Ok(())
    }

    /// Validates one key and records the outcome on the session.
    pub async fn validate_field(
        &self,
        session: &mut FormSession,
        key: &str,
    ) -> AppResult<ValidationOutcome> {
        let Some(ticket) = session.begin_validation(key) else {
            return Err(AppError::NotFound(format!("form has no field '{key}'")));
        };
        let outcome = ticket.run(&self.validation_engine).await;
        session.apply_validation(&ticket, outcome.clone());
        Ok(outcome)
    }

    /// Returns the validation engine shared by every session.
    #[must_use]
    pub fn validation_engine(&self) -> &ValidationEngine {
        &self.validation_engine
    }

    /// Replaces the tehsil options next to a district field.
    ///
    /// Failures are logged and leave the current options in place.
    async fn refresh_tehsils(
        &self,
        session: &mut FormSession,
        section_index: usize,
        district_key: &str,
    ) -> bool {
        let Some(district_id) = session
            .values()
            .text(district_key)
            .filter(|value| !value.is_empty() && *value != PLEASE_SELECT)
            .map(str::to_owned)
        else {
            return false;
        };

        let tehsils = match self.option_source.tehsils_for_district(&district_id).await {
            Ok(tehsils) => tehsils,
            Err(error) => {
                tracing::warn!(
                    district = %district_id,
                    error = %error,
                    "failed to fetch tehsils"
                );
                return false;
            }
        };

        let tehsil_field = tehsil_field_for(district_key);
        let options = std::iter::once(SelectOption::please_select())
            .chain(tehsils)
            .collect();
        let replaced = session
            .schema_mut()
            .replace_field_options(section_index, &tehsil_field, options);
        if !replaced {
            tracing::debug!(
                section = section_index,
                field = %tehsil_field,
                "no tehsil field next to district"
            );
        }
        replaced
    }
}

/// Returns the section holding a key, preferring the current step.
fn section_index_for(session: &FormSession, key: &str) -> Option<usize> {
    let in_current_step = session
        .current_section()
        .is_some_and(|section| section.find_field(key).is_some());
    if in_current_step {
        return Some(session.current_step());
    }
    session.schema().section_index_of(key)
}

/// Gives every select without a value its first option.
fn apply_select_defaults(session: &mut FormSession) {
    fn collect<'a>(
        fields: impl Iterator<Item = &'a FieldDef>,
        defaults: &mut Vec<(String, String)>,
    ) {
        for field in fields {
            if field.kind() == &FieldKind::Select
                && let Some(first) = field.options().first()
            {
                defaults.push((field.name().to_owned(), first.value().to_owned()));
            }
            if let Some(nested) = field.additional_fields() {
                collect(nested.all(), defaults);
            }
        }
    }

    let mut defaults = Vec::new();
    for section in session.schema().sections() {
        collect(section.fields().iter(), &mut defaults);
    }
    for (key, value) in defaults {
        session.register_default(&key, FieldValue::text(value));
    }
}

/// Default of a key that was never filled.
fn empty_value(field: &FieldDef, key: &str) -> FieldValue {
    if field.kind() == &FieldKind::Select
        && field.name() == key
        && let Some(first) = field.options().first()
    {
        return FieldValue::text(first.value());
    }
    FieldValue::text("")
}

#[cfg(test)]
mod tests;
