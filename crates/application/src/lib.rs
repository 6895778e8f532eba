//! Application services and ports.

#![forbid(unsafe_code)]

mod form_ports;
mod form_service;
mod validation_service;

pub use form_ports::{
    BankDirectory, DependentOptionSource, DuplicateChecker, FileCategory, FileCheck, FilePicker,
    FileValidator, FormContentSource, PickKind, PickOutcome, PriorSubmission, ServiceContent,
    SessionStore, SubmissionReceipt, SubmissionRequest, SubmissionSink,
};
pub use form_service::{
    FormService, FormSession, OpenSessionInput, StepOutcome, SubmitOutcome,
    UNMODIFIED_FIELDS_MESSAGE, ValidationTicket,
};
pub use validation_service::{
    DuplicateAccountNumber, IsAgeGreaterThan, IsDateWithinRange, IsEmailValid, NotEmpty,
    OnlyAlphabets, OnlyDigits, SpecificLength, ValidateFile, ValidationContext, ValidationEngine,
    ValidationOutcome, ValidationRule, apply_transformations,
};
