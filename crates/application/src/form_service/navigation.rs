use std::collections::BTreeMap;

use seva_core::{AppError, AppResult};
use seva_domain::{FormMode, step_keys};

use super::{FormService, FormSession, StepOutcome, empty_value};
use crate::validation_service::ValidationOutcome;

impl FormService {
    /// Validates the current step and advances when every enabled key passes.
    ///
    /// Only the current step's active keys are checked. When correcting a
    /// returned application, every enabled key must also differ from its
    /// loaded value.
    pub async fn next(&self, session: &mut FormSession) -> AppResult<StepOutcome> {
        session.ensure_open()?;
        if session.is_last_step() {
            return Err(AppError::Conflict(
                "the last step is completed by submitting".to_owned(),
            ));
        }

        let keys = enabled_step_keys(session);
        if session.mode() == FormMode::Edit {
            let unmodified = keys
                .iter()
                .filter(|key| !session.is_modified(key))
                .cloned()
                .collect::<Vec<_>>();
            if !unmodified.is_empty() {
                tracing::debug!(fields = ?unmodified, "returned fields left unmodified");
                return Ok(StepOutcome::Unmodified { fields: unmodified });
            }
        }

        let errors = self.validate_keys(session, &keys).await;
        if !errors.is_empty() {
            return Ok(StepOutcome::Invalid { errors });
        }

        let step = session.current_step() + 1;
        session.set_step(step);
        tracing::debug!(step, "advanced to next step");
        Ok(StepOutcome::Advanced { step })
    }

    /// Moves one step back without validating; stays at the first step.
    pub fn prev(&self, session: &mut FormSession) -> AppResult<usize> {
        session.ensure_open()?;
        let step = session.current_step().saturating_sub(1);
        session.set_step(step);
        Ok(step)
    }

    /// Validates the current step's enabled keys without moving.
    pub async fn validate_step(
        &self,
        session: &mut FormSession,
    ) -> AppResult<BTreeMap<String, String>> {
        session.ensure_open()?;
        let keys = enabled_step_keys(session);
        Ok(self.validate_keys(session, &keys).await)
    }

    /// Validates keys one after another, recording every outcome.
    async fn validate_keys(
        &self,
        session: &mut FormSession,
        keys: &[String],
    ) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        for key in keys {
            let Some(ticket) = session.begin_validation(key) else {
                continue;
            };
            let outcome = ticket.run(&self.validation_engine).await;
            if let ValidationOutcome::Invalid(message) = &outcome {
                errors.insert(key.clone(), message.clone());
            }
            session.apply_validation(&ticket, outcome);
        }
        errors
    }
}

/// Registers defaults for the current step's never-filled keys and returns
/// the keys open for editing.
fn enabled_step_keys(session: &mut FormSession) -> Vec<String> {
    let defaults = session
        .current_section()
        .map(|section| {
            step_keys(section, session.values())
                .into_iter()
                .filter(|step_key| !session.values().contains(&step_key.key))
                .map(|step_key| {
                    let default = empty_value(step_key.field, &step_key.key);
                    (step_key.key, default)
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    for (key, default) in defaults {
        session.register_default(&key, default);
    }

    session
        .current_section()
        .map(|section| {
            step_keys(section, session.values())
                .into_iter()
                .map(|step_key| step_key.key)
                .filter(|key| !session.is_field_disabled(key))
                .collect()
        })
        .unwrap_or_default()
}
