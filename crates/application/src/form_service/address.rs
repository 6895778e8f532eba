use seva_core::{AppError, AppResult};
use seva_domain::{FieldValue, PLEASE_SELECT, file_key, plan_address_copy};

use super::{FormService, FormSession};
use crate::form_ports::{FilePicker, PickKind, PickOutcome};

const BANK_NAME_FIELD: &str = "BankName";
const BRANCH_NAME_FIELD: &str = "BranchName";
const IFSC_CODE_FIELD: &str = "IfscCode";

impl FormService {
    /// Copies every present-address value into its permanent counterpart.
    ///
    /// A copied district refreshes the tehsil options of the permanent
    /// section only. Returns the number of copied values.
    pub async fn copy_present_address(&self, session: &mut FormSession) -> AppResult<usize> {
        session.ensure_open()?;
        let copies = plan_address_copy(session.schema(), session.values());
        for copy in &copies {
            let Some(value) = session.values().get(&copy.source).cloned() else {
                continue;
            };
            session.assign(&copy.target, value);
            if copy.target_is_district {
                self.refresh_tehsils(session, copy.target_section, &copy.target)
                    .await;
            }
        }
        tracing::debug!(copied = copies.len(), "copied present address");
        Ok(copies.len())
    }

    /// Fills `IfscCode` from the selected bank and branch.
    ///
    /// Does nothing until both are chosen or when the form has no IFSC field;
    /// an unknown branch or a failed lookup clears the code.
    pub async fn lookup_ifsc(&self, session: &mut FormSession) -> AppResult<Option<String>> {
        session.ensure_open()?;
        if session.field_for_key(IFSC_CODE_FIELD).is_none() {
            return Ok(None);
        }
        let bank_name = session.values().text(BANK_NAME_FIELD).unwrap_or_default();
        let branch_name = session
            .values()
            .text(BRANCH_NAME_FIELD)
            .unwrap_or_default()
            .trim();
        if bank_name.is_empty() || bank_name == PLEASE_SELECT || branch_name.is_empty() {
            return Ok(None);
        }
        let (bank_name, branch_name) = (bank_name.to_owned(), branch_name.to_owned());

        let code = match self
            .bank_directory
            .ifsc_code(&bank_name, &branch_name)
            .await
        {
            Ok(code) => code,
            Err(error) => {
                tracing::warn!(bank = %bank_name, error = %error, "ifsc lookup failed");
                None
            }
        };

        match &code {
            Some(code) => {
                session.assign(IFSC_CODE_FIELD, FieldValue::text(code.clone()));
                self.validate_field(session, IFSC_CODE_FIELD).await?;
            }
            None => session.assign(IFSC_CODE_FIELD, FieldValue::text("")),
        }
        Ok(code)
    }

    /// Asks the picker for a file and assigns it to a file or enclosure field.
    ///
    /// Returns `false` when the user cancelled; the field is then unchanged.
    pub async fn attach_file(
        &self,
        session: &mut FormSession,
        key: &str,
        picker: &dyn FilePicker,
    ) -> AppResult<bool> {
        session.ensure_open()?;
        let Some(field) = session.field_for_key(key) else {
            return Err(AppError::NotFound(format!("form has no field '{key}'")));
        };

        let (target, kind) = if field.is_enclosure() {
            (file_key(field.name()), PickKind::Document)
        } else if field.is_file_bearing() {
            (field.name().to_owned(), PickKind::Image)
        } else {
            return Err(AppError::Validation(format!(
                "field '{key}' does not accept files"
            )));
        };
        if session.is_field_disabled(&target) {
            return Err(AppError::Validation(format!(
                "field '{target}' is not open for correction"
            )));
        }

        match picker.pick(kind).await? {
            PickOutcome::Picked(file) => {
                tracing::debug!(field = %target, file = file.name(), "file attached");
                session.assign(&target, FieldValue::File(file));
                Ok(true)
            }
            PickOutcome::Cancelled => Ok(false),
        }
    }
}
