//! Form schema model and the pure parts of the dynamic form engine.

#![forbid(unsafe_code)]

mod flatten;
mod payload;
mod resolver;
mod schema;
mod submission;
mod values;

pub use flatten::{expand_for_editing, flatten};
pub use payload::{SubmissionPayload, SubmittedContent, SubmittedField};
pub use resolver::{
    AddressCopy, StepKey, active_children, is_district_field, is_field_active, options_for,
    options_with_current, permanent_counterpart, plan_address_copy, step_keys, tehsil_field_for,
};
pub use schema::{
    AdditionalFields, DependentOptions, EnclosureDependency, FieldDef, FieldKind, FormSchema,
    LengthLimit, PLEASE_SELECT, Section, SelectOption, derive_name, format_key,
};
pub use submission::{
    BuiltSubmission, FormMode, PendingUpload, SubmissionKind, SubmissionStatus, build_submission,
};
pub use values::{
    EnclosureValue, FILE_SUFFIX, FieldValue, FileRef, FileSlot, FormValues, SELECT_SUFFIX,
    file_key, select_key,
};
