use async_trait::async_trait;
use seva_core::{AppResult, ReferenceNumber, ServiceId, SessionIdentity};
use seva_domain::{
    FileRef, PendingUpload, SelectOption, SubmissionKind, SubmissionPayload, SubmissionStatus,
};

/// Raw service content as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContent {
    /// Whether the backend has a form configured for the service.
    pub status: bool,
    /// Serialized form schema.
    pub form_element: String,
}

/// Prior submission used to seed an incomplete or returned application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorSubmission {
    /// Stored nested details.
    pub form_details: SubmissionPayload,
    /// Field keys an officer returned for correction.
    pub return_fields: Vec<String>,
}

/// Source of form schemas and stored applications.
#[async_trait]
pub trait FormContentSource: Send + Sync {
    /// Fetches the form definition of a service.
    async fn service_content(&self, service_id: &ServiceId) -> AppResult<ServiceContent>;

    /// Fetches a previously saved or returned application.
    async fn form_details(&self, reference_number: &ReferenceNumber)
    -> AppResult<PriorSubmission>;
}

/// Source of option lists that depend on another field.
#[async_trait]
pub trait DependentOptionSource: Send + Sync {
    /// Lists the tehsils of a district, without the leading sentinel.
    async fn tehsils_for_district(&self, district_id: &str) -> AppResult<Vec<SelectOption>>;
}

/// Bank branch directory.
#[async_trait]
pub trait BankDirectory: Send + Sync {
    /// Returns the IFSC code of a branch, or `None` when the branch is unknown.
    async fn ifsc_code(&self, bank_name: &str, branch_name: &str) -> AppResult<Option<String>>;
}

/// Backend check for duplicate bank accounts.
#[async_trait]
pub trait DuplicateChecker: Send + Sync {
    /// Returns whether another application already uses the account number.
    async fn is_duplicate_account(
        &self,
        account_number: &str,
        reference_number: &ReferenceNumber,
    ) -> AppResult<bool>;
}

/// File category checked by the backend validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// Photographs and scanned images.
    Image,
    /// PDF documents.
    Pdf,
}

impl FileCategory {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
        }
    }
}

/// Result of a backend file check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    /// Whether the file was accepted.
    pub is_valid: bool,
    /// Rejection reason supplied by the backend.
    pub error_message: Option<String>,
}

/// Backend validator for picked files.
#[async_trait]
pub trait FileValidator: Send + Sync {
    /// Uploads the file for inspection.
    async fn validate_file(&self, file: &FileRef, category: FileCategory) -> AppResult<FileCheck>;
}

/// Multipart submission handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// Service being applied for.
    pub service_id: ServiceId,
    /// Nested JSON metadata.
    pub payload: SubmissionPayload,
    /// Draft or final.
    pub status: SubmissionStatus,
    /// Reference of an existing application, unassigned for a first save.
    pub reference_number: ReferenceNumber,
    /// Returned fields, present only when correcting a returned application.
    pub return_fields: Option<Vec<String>>,
    /// Freshly picked files sent as their own parts.
    pub files: Vec<PendingUpload>,
}

/// Receipt of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// What the backend recorded.
    pub kind: SubmissionKind,
    /// Reference assigned to the application.
    pub reference_number: ReferenceNumber,
}

/// Destination of drafts and final submissions.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Sends a submission; a refusal by the backend is `AppError::Submission`.
    async fn submit(&self, request: &SubmissionRequest) -> AppResult<SubmissionReceipt>;
}

/// Kind of file a picker is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    /// Camera or gallery image.
    Image,
    /// Image or PDF document.
    Document,
}

/// Outcome of a pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The user chose a file.
    Picked(FileRef),
    /// The user dismissed the picker.
    Cancelled,
}

/// Device file picker.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Asks for one file.
    async fn pick(&self, kind: PickKind) -> AppResult<PickOutcome>;
}

/// Persistent store for the signed-in identity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored identity.
    async fn load(&self) -> AppResult<Option<SessionIdentity>>;

    /// Replaces the stored identity.
    async fn save(&self, identity: &SessionIdentity) -> AppResult<()>;

    /// Forgets the stored identity.
    async fn clear(&self) -> AppResult<()>;
}
