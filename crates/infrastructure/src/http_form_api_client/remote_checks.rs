use async_trait::async_trait;
use serde::Deserialize;
use seva_application::{DuplicateChecker, FileCategory, FileCheck, FileValidator};
use seva_core::{AppResult, ReferenceNumber};
use seva_domain::FileRef;

use super::{HttpFormApiClient, file_part};

const DUPLICATE_ACCOUNT_PATH: &str = "/Base/IsDuplicateAccNo";
const VALIDATE_FILE_PATH: &str = "/Base/Validate";
const DEFAULT_FILE_NAME: &str = "image.jpg";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
struct DuplicateAccountResponse {
    status: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileCheckResponse {
    is_valid: bool,
    #[serde(default)]
    error_message: Option<String>,
}

#[async_trait]
impl DuplicateChecker for HttpFormApiClient {
    async fn is_duplicate_account(
        &self,
        account_number: &str,
        reference_number: &ReferenceNumber,
    ) -> AppResult<bool> {
        let request = self.get(DUPLICATE_ACCOUNT_PATH).await?.query(&[
            ("accNo", account_number),
            ("applicationId", reference_number.as_str()),
        ]);
        let response: DuplicateAccountResponse =
            self.send_json(DUPLICATE_ACCOUNT_PATH, request).await?;
        Ok(response.status)
    }
}

#[async_trait]
impl FileValidator for HttpFormApiClient {
    async fn validate_file(&self, file: &FileRef, category: FileCategory) -> AppResult<FileCheck> {
        let file_name = if file.name().trim().is_empty() {
            DEFAULT_FILE_NAME.to_owned()
        } else {
            file.name().to_owned()
        };
        let mime_type = if file.mime_type().trim().is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            file.mime_type()
        };

        let form = reqwest::multipart::Form::new()
            .text("fileType", category.as_str())
            .part("file", file_part(file.uri(), file_name, mime_type).await?);
        let request = self.post(VALIDATE_FILE_PATH).await?.multipart(form);
        let response: FileCheckResponse = self.send_json(VALIDATE_FILE_PATH, request).await?;

        Ok(FileCheck {
            is_valid: response.is_valid,
            error_message: response.error_message,
        })
    }
}
