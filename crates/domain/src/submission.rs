use std::str::FromStr;

use seva_core::AppError;
use serde::{Deserialize, Serialize};

use crate::payload::{SubmissionPayload, SubmittedContent, SubmittedField};
use crate::resolver::{active_children, is_field_active};
use crate::schema::{AdditionalFields, FieldDef, FormSchema};
use crate::values::{EnclosureValue, FileRef, FileSlot, FormValues};

/// How a form session was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    /// Fresh application.
    New,
    /// Continuing a saved draft.
    Incomplete,
    /// Correcting fields returned by an officer.
    Edit,
}

impl FormMode {
    /// Returns stable value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Incomplete => "incomplete",
            Self::Edit => "edit",
        }
    }

    /// Returns whether the session is seeded from a prior submission.
    #[must_use]
    pub fn loads_prior_submission(&self) -> bool {
        matches!(self, Self::Incomplete | Self::Edit)
    }
}

impl FromStr for FormMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(Self::New),
            "incomplete" => Ok(Self::Incomplete),
            "edit" => Ok(Self::Edit),
            _ => Err(AppError::Validation(format!("unknown form mode '{value}'"))),
        }
    }
}

/// Submission status sent with the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Final submission.
    Initiated,
    /// Draft save.
    Incomplete,
}

impl SubmissionStatus {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::Incomplete => "Incomplete",
        }
    }
}

/// Kind of receipt returned by the submission sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionKind {
    /// Application submitted.
    Submit,
    /// Returned application corrected.
    Edit,
    /// Draft saved.
    Save,
}

impl FromStr for SubmissionKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Submit" => Ok(Self::Submit),
            "Edit" => Ok(Self::Edit),
            "Save" => Ok(Self::Save),
            _ => Err(AppError::Validation(format!(
                "unknown submission type '{value}'"
            ))),
        }
    }
}

/// Freshly picked file that travels as its own multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    /// Field key used as the part name.
    pub field_name: String,
    /// Picked file.
    pub file: FileRef,
}

/// Payload metadata plus the files to upload beside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltSubmission {
    /// Nested JSON metadata.
    pub payload: SubmissionPayload,
    /// Files not uploaded yet.
    pub files: Vec<PendingUpload>,
}

/// Rebuilds the nested payload from flat values.
///
/// Inactive dependent enclosures and inactive branches are left out entirely.
/// Already uploaded files stay as URLs in the metadata; picked files are
/// embedded and also collected for upload.
#[must_use]
pub fn build_submission(schema: &FormSchema, values: &FormValues) -> BuiltSubmission {
    let mut built = BuiltSubmission::default();
    for section in schema.sections() {
        let fields = section
            .fields()
            .iter()
            .filter_map(|field| build_field(field, values, &mut built.files))
            .collect();
        built.payload.push_section(section.name(), fields);
    }
    built
}

fn build_field(
    field: &FieldDef,
    values: &FormValues,
    files: &mut Vec<PendingUpload>,
) -> Option<SubmittedField> {
    if !is_field_active(field, values) {
        return None;
    }

    let content = if field.is_enclosure() {
        let selected = values.enclosure_selected(field.name()).unwrap_or_default();
        let file = values.enclosure_file(field.name());
        collect_upload(field.name(), file.as_ref(), files);
        SubmittedContent::Enclosure(EnclosureValue::new(selected, file))
    } else if field.is_file_bearing() {
        let file = values.get(field.name()).and_then(|value| value.file_slot());
        collect_upload(field.name(), file.as_ref(), files);
        SubmittedContent::File(file)
    } else {
        SubmittedContent::Value(values.text(field.name()).unwrap_or_default().to_owned())
    };

    let additional_fields = match field.additional_fields() {
        Some(AdditionalFields::Conditional(branches))
            if !branches.contains_key(values.text(field.name()).unwrap_or_default()) =>
        {
            None
        }
        Some(_) => Some(
            active_children(field, values)
                .iter()
                .filter_map(|nested| build_field(nested, values, files))
                .collect(),
        ),
        None => None,
    };

    Some(SubmittedField::new(
        field.label(),
        field.name(),
        Some(content),
        additional_fields,
    ))
}

fn collect_upload(field_name: &str, file: Option<&FileSlot>, files: &mut Vec<PendingUpload>) {
    if let Some(picked) = file.and_then(FileSlot::picked) {
        files.push(PendingUpload {
            field_name: field_name.to_owned(),
            file: picked.clone(),
        });
    }
}
