use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::schema::derive_name;
use crate::values::{EnclosureValue, FileSlot};

/// Submitted content of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedContent {
    /// `value` entry.
    Value(String),
    /// `File` entry of a file-bearing field; `None` is sent as an empty string.
    File(Option<FileSlot>),
    /// `Enclosure` plus `File` entries.
    Enclosure(EnclosureValue),
}

/// One submitted field, mirroring the schema field it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedField {
    label: String,
    name: String,
    content: Option<SubmittedContent>,
    additional_fields: Option<Vec<SubmittedField>>,
}

impl SubmittedField {
    /// Creates a submitted field.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        name: impl Into<String>,
        content: Option<SubmittedContent>,
        additional_fields: Option<Vec<SubmittedField>>,
    ) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            content,
            additional_fields,
        }
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the field key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the submitted content; `None` when the stored entry had none.
    #[must_use]
    pub fn content(&self) -> Option<&SubmittedContent> {
        self.content.as_ref()
    }

    /// Returns nested submitted fields.
    #[must_use]
    pub fn additional_fields(&self) -> Option<&[SubmittedField]> {
        self.additional_fields.as_deref()
    }
}

impl Serialize for SubmittedField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry("name", &self.name)?;
        match &self.content {
            Some(SubmittedContent::Value(value)) => map.serialize_entry("value", value)?,
            Some(SubmittedContent::File(file)) => {
                map.serialize_entry("File", &FileEntry(file.as_ref()))?;
            }
            Some(SubmittedContent::Enclosure(enclosure)) => {
                map.serialize_entry("Enclosure", enclosure.selected())?;
                map.serialize_entry("File", &FileEntry(enclosure.file()))?;
            }
            None => {}
        }
        if let Some(additional_fields) = &self.additional_fields {
            map.serialize_entry("additionalFields", additional_fields)?;
        }
        map.end()
    }
}

struct FileEntry<'a>(Option<&'a FileSlot>);

impl Serialize for FileEntry<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Some(slot) => slot.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }
}

/// Nested application details keyed by section name, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionPayload(IndexMap<String, Vec<SubmittedField>>);

impl SubmissionPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section's fields.
    pub fn push_section(&mut self, section_name: impl Into<String>, fields: Vec<SubmittedField>) {
        self.0.insert(section_name.into(), fields);
    }

    /// Returns the fields of one section.
    #[must_use]
    pub fn section(&self, section_name: &str) -> Option<&[SubmittedField]> {
        self.0.get(section_name).map(Vec::as_slice)
    }

    /// Iterates sections in order.
    pub fn sections(&self) -> impl Iterator<Item = (&String, &Vec<SubmittedField>)> {
        self.0.iter()
    }

    /// Finds a submitted field by key in any section or nesting level.
    #[must_use]
    pub fn find(&self, field_name: &str) -> Option<&SubmittedField> {
        fn search<'a>(fields: &'a [SubmittedField], name: &str) -> Option<&'a SubmittedField> {
            fields.iter().find_map(|field| {
                if field.name == name {
                    return Some(field);
                }
                field
                    .additional_fields
                    .as_deref()
                    .and_then(|nested| search(nested, name))
            })
        }

        self.0.values().find_map(|fields| search(fields, field_name))
    }
}

impl<'de> Deserialize<'de> for SubmissionPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let sections = raw
            .into_iter()
            .map(|(section_name, fields)| {
                let fields = fields
                    .as_array()
                    .map(|fields| stored_fields(fields.iter(), None))
                    .unwrap_or_default();
                (section_name, fields)
            })
            .collect();
        Ok(Self(sections))
    }
}

fn stored_fields<'a>(
    fields: impl Iterator<Item = &'a Value>,
    parent_name: Option<&str>,
) -> Vec<SubmittedField> {
    fields
        .filter_map(Value::as_object)
        .filter_map(|object| {
            let name = text_of(object.get("name"))
                .filter(|name| !name.is_empty())
                .or_else(|| {
                    let id = text_of(object.get("id"))?;
                    parent_name.map(|parent_name| derive_name(parent_name, id.as_str()))
                })?;
            let label = text_of(object.get("label")).unwrap_or_default();
            let content = stored_content(object);
            let additional_fields = object.get("additionalFields").and_then(|nested| {
                match nested {
                    Value::Array(items) => Some(stored_fields(items.iter(), Some(name.as_str()))),
                    Value::Object(branches) => Some(stored_fields(
                        branches
                            .values()
                            .filter_map(Value::as_array)
                            .flatten(),
                        Some(name.as_str()),
                    )),
                    _ => None,
                }
            });
            Some(SubmittedField::new(label, name, content, additional_fields))
        })
        .collect()
}

fn stored_content(object: &serde_json::Map<String, Value>) -> Option<SubmittedContent> {
    let file = object.get("File").and_then(stored_file);
    if object.contains_key("Enclosure") {
        let selected = text_of(object.get("Enclosure")).unwrap_or_default();
        return Some(SubmittedContent::Enclosure(EnclosureValue::new(selected, file)));
    }
    if file.is_some() {
        return Some(SubmittedContent::File(file));
    }
    if let Some(value) = text_of(object.get("value")) {
        return Some(SubmittedContent::Value(value));
    }
    object
        .contains_key("File")
        .then_some(SubmittedContent::File(None))
}

fn stored_file(value: &Value) -> Option<FileSlot> {
    match value {
        Value::String(url) if url.is_empty() => None,
        Value::Null => None,
        other => serde_json::from_value::<FileSlot>(other.clone()).ok(),
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
