use seva_core::{AppError, AppResult};
use seva_domain::{SubmissionStatus, build_submission};

use super::{FormService, FormSession, SubmitOutcome};
use crate::form_ports::{SubmissionReceipt, SubmissionRequest};

impl FormService {
    /// Saves a draft without validating anything.
    ///
    /// The reference number returned by the backend is kept on the session
    /// so later saves update the same application.
    pub async fn save(&self, session: &mut FormSession) -> AppResult<SubmissionReceipt> {
        session.ensure_open()?;
        let receipt = self.send(session, SubmissionStatus::Incomplete).await?;
        if receipt.reference_number.is_assigned() {
            session.set_reference_number(receipt.reference_number.clone());
        }
        tracing::info!(
            service_id = %session.service_id(),
            reference_number = %session.reference_number(),
            "saved draft application"
        );
        Ok(receipt)
    }

    /// Validates the last step and submits the application.
    ///
    /// A failed submission leaves the session untouched so it can be retried;
    /// a successful one ends the session.
    pub async fn submit(&self, session: &mut FormSession) -> AppResult<SubmitOutcome> {
        session.ensure_open()?;
        if !session.is_last_step() {
            return Err(AppError::Conflict(format!(
                "submit is only available on the last step, current step is {}",
                session.current_step()
            )));
        }

        let errors = self.validate_step(session).await?;
        if !errors.is_empty() {
            return Ok(SubmitOutcome::Invalid { errors });
        }

        let receipt = self.send(session, SubmissionStatus::Initiated).await?;
        if receipt.reference_number.is_assigned() {
            session.set_reference_number(receipt.reference_number.clone());
        }
        session.mark_submitted();
        tracing::info!(
            service_id = %session.service_id(),
            reference_number = %session.reference_number(),
            "submitted application"
        );
        Ok(SubmitOutcome::Submitted(receipt))
    }

    async fn send(
        &self,
        session: &FormSession,
        status: SubmissionStatus,
    ) -> AppResult<SubmissionReceipt> {
        let built = build_submission(session.schema(), session.values());
        let request = SubmissionRequest {
            service_id: session.service_id().clone(),
            payload: built.payload,
            status,
            reference_number: session.reference_number().clone(),
            return_fields: session.return_fields().map(<[String]>::to_vec),
            files: built.files,
        };

        self.submission_sink
            .submit(&request)
            .await
            .inspect_err(|error| {
                tracing::warn!(
                    service_id = %request.service_id,
                    status = status.as_str(),
                    error = %error,
                    "submission failed"
                );
            })
    }
}
