use crate::payload::{SubmissionPayload, SubmittedContent, SubmittedField};
use crate::values::{FieldValue, FormValues, file_key, select_key};

/// Converts a nested submission into flat editable values.
///
/// Every branch of nested fields is flattened, not only the active one; the
/// active branch is re-resolved when the values are validated or rebuilt.
/// Entries without content produce no key.
#[must_use]
pub fn flatten(payload: &SubmissionPayload) -> FormValues {
    let mut values = FormValues::new();
    for (_, fields) in payload.sections() {
        flatten_fields(fields, &mut values);
    }
    values
}

fn flatten_fields(fields: &[SubmittedField], values: &mut FormValues) {
    for field in fields {
        match field.content() {
            Some(SubmittedContent::Value(value)) => {
                values.insert(field.name(), FieldValue::text(value.clone()));
            }
            Some(SubmittedContent::File(Some(slot))) => {
                values.insert(field.name(), FieldValue::from(slot.clone()));
            }
            Some(SubmittedContent::Enclosure(enclosure)) => {
                values.insert(field.name(), FieldValue::Enclosure(enclosure.clone()));
            }
            Some(SubmittedContent::File(None)) | None => {}
        }

        if let Some(nested) = field.additional_fields() {
            flatten_fields(nested, values);
        }
    }
}

/// Adds the `_select` and `_file` editor keys for every enclosure value.
///
/// The composite key is kept; editors bind to the suffixed keys.
#[must_use]
pub fn expand_for_editing(values: &FormValues) -> FormValues {
    let mut expanded = values.clone();
    for (key, value) in values.iter() {
        let Some(enclosure) = value.as_enclosure() else {
            continue;
        };
        expanded.insert(select_key(key), FieldValue::text(enclosure.selected()));
        let file = enclosure
            .file()
            .cloned()
            .map(FieldValue::from)
            .unwrap_or_else(|| FieldValue::text(""));
        expanded.insert(file_key(key), file);
    }
    expanded
}
