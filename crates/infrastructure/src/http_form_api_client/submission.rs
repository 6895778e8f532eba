use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use seva_application::{SubmissionReceipt, SubmissionRequest, SubmissionSink};
use seva_core::{AppError, AppResult, ReferenceNumber};
use seva_domain::{SubmissionKind, SubmissionStatus};

use super::{HttpFormApiClient, file_part};

const INSERT_PATH: &str = "/User/InsertFormDetails";
const UPDATE_PATH: &str = "/User/UpdateApplicationDetails";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionResponse {
    status: bool,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    reference_number: Option<String>,
}

#[async_trait]
impl SubmissionSink for HttpFormApiClient {
    async fn submit(&self, request: &SubmissionRequest) -> AppResult<SubmissionReceipt> {
        let path = if request.return_fields.is_some() {
            UPDATE_PATH
        } else {
            INSERT_PATH
        };
        let form_details = serde_json::to_string(&request.payload).map_err(|error| {
            AppError::Internal(format!("failed to serialize form details: {error}"))
        })?;

        let mut form = reqwest::multipart::Form::new()
            .text("serviceId", request.service_id.as_str().to_owned())
            .text("formDetails", form_details);
        for upload in &request.files {
            let part = file_part(
                upload.file.uri(),
                upload.file.upload_name(&upload.field_name),
                upload.file.mime_type(),
            )
            .await?;
            form = form.part(upload.field_name.clone(), part);
        }
        form = form
            .text("status", request.status.as_str())
            .text("referenceNumber", request.reference_number.as_str().to_owned());
        if let Some(return_fields) = &request.return_fields {
            form = form.text("returnFields", return_fields.join(","));
        }

        let builder = self.post(path).await?.multipart(form);
        let response: SubmissionResponse = self.send_json(path, builder).await?;
        if !response.status {
            return Err(AppError::Submission(
                "Form submission failed. Please try again.".to_owned(),
            ));
        }

        let kind = match response.kind.as_deref() {
            Some(kind) => SubmissionKind::from_str(kind)?,
            None => default_kind(request),
        };
        let reference_number = response
            .reference_number
            .map(ReferenceNumber::new)
            .unwrap_or_else(|| request.reference_number.clone());
        tracing::debug!(
            endpoint = path,
            files = request.files.len(),
            reference_number = %reference_number,
            "submission accepted"
        );

        Ok(SubmissionReceipt {
            kind,
            reference_number,
        })
    }
}

fn default_kind(request: &SubmissionRequest) -> SubmissionKind {
    if request.return_fields.is_some() {
        SubmissionKind::Edit
    } else if request.status == SubmissionStatus::Initiated {
        SubmissionKind::Submit
    } else {
        SubmissionKind::Save
    }
}
