use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Suffix of the editor key holding an enclosure's document type.
pub const SELECT_SUFFIX: &str = "_select";

/// Suffix of the editor key holding an enclosure's file.
pub const FILE_SUFFIX: &str = "_file";

/// Returns the editor key bound to an enclosure's selector.
#[must_use]
pub fn select_key(field_name: &str) -> String {
    format!("{field_name}{SELECT_SUFFIX}")
}

/// Returns the editor key bound to an enclosure's file slot.
#[must_use]
pub fn file_key(field_name: &str) -> String {
    format!("{field_name}{FILE_SUFFIX}")
}

/// File freshly returned by the device picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    uri: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    mime_type: String,
}

impl FileRef {
    /// Creates a picked file reference.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Returns the local URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    /// Returns the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        self.mime_type.as_str()
    }

    /// Returns the file name to upload under, falling back to
    /// `<field>.<subtype>` when the picker gave none.
    #[must_use]
    pub fn upload_name(&self, field_name: &str) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        let extension = self
            .mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or("bin");
        format!("{field_name}.{extension}")
    }
}

/// Content of a file slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSlot {
    /// Previously uploaded file, referenced by URL.
    Uploaded(String),
    /// Freshly picked file that still has to be uploaded.
    Picked(FileRef),
}

impl FileSlot {
    /// Returns the picked file, if it still needs uploading.
    #[must_use]
    pub fn picked(&self) -> Option<&FileRef> {
        match self {
            Self::Picked(file) => Some(file),
            Self::Uploaded(_) => None,
        }
    }

    fn into_value(self) -> FieldValue {
        match self {
            Self::Uploaded(url) => FieldValue::Text(url),
            Self::Picked(file) => FieldValue::File(file),
        }
    }
}

/// Selected document type plus its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosureValue {
    selected: String,
    #[serde(default, deserialize_with = "blank_file_slot")]
    file: Option<FileSlot>,
}

impl EnclosureValue {
    /// Creates an enclosure value.
    #[must_use]
    pub fn new(selected: impl Into<String>, file: Option<FileSlot>) -> Self {
        Self {
            selected: selected.into(),
            file,
        }
    }

    /// Returns the selected document type.
    #[must_use]
    pub fn selected(&self) -> &str {
        self.selected.as_str()
    }

    /// Returns the attached file.
    #[must_use]
    pub fn file(&self) -> Option<&FileSlot> {
        self.file.as_ref()
    }
}

fn blank_file_slot<'de, D>(deserializer: D) -> Result<Option<FileSlot>, D::Error>
where
    D: Deserializer<'de>,
{
    let slot = Option::<FileSlot>::deserialize(deserializer)?;
    Ok(slot.filter(|slot| !matches!(slot, FileSlot::Uploaded(url) if url.is_empty())))
}

/// Value held under one flat key.
///
/// A plain string stands for text, dates, selections and already uploaded
/// file URLs alike; the schema decides how it is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain string value.
    Text(String),
    /// Freshly picked file.
    File(FileRef),
    /// Composite enclosure value.
    Enclosure(EnclosureValue),
}

impl FieldValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the string a text-based rule inspects.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text.as_str(),
            Self::File(file) => file.uri(),
            Self::Enclosure(enclosure) => enclosure.selected(),
        }
    }

    /// Returns the value as a file slot: uploaded URL or picked file.
    #[must_use]
    pub fn file_slot(&self) -> Option<FileSlot> {
        match self {
            Self::Text(url) if !url.is_empty() => Some(FileSlot::Uploaded(url.clone())),
            Self::Text(_) => None,
            Self::File(file) => Some(FileSlot::Picked(file.clone())),
            Self::Enclosure(enclosure) => enclosure.file().cloned(),
        }
    }

    /// Returns the enclosure composite, if this is one.
    #[must_use]
    pub fn as_enclosure(&self) -> Option<&EnclosureValue> {
        match self {
            Self::Enclosure(enclosure) => Some(enclosure),
            _ => None,
        }
    }
}

impl From<FileSlot> for FieldValue {
    fn from(slot: FileSlot) -> Self {
        slot.into_value()
    }
}

/// Flat mapping from fully-qualified field key to value.
///
/// A missing key means "not yet filled", which is distinct from an explicitly
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, FieldValue>);

impl FormValues {
    /// Creates an empty value map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Returns the text stored under a key.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(FieldValue::as_text)
    }

    /// Returns whether a key holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Stores a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(key.into(), value)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    /// Iterates keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Returns the number of filled keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no key is filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the document type of an enclosure, preferring the editor key.
    #[must_use]
    pub fn enclosure_selected(&self, field_name: &str) -> Option<&str> {
        self.text(&select_key(field_name)).or_else(|| {
            self.get(field_name)
                .and_then(FieldValue::as_enclosure)
                .map(EnclosureValue::selected)
        })
    }

    /// Returns the file of an enclosure, preferring the editor key.
    #[must_use]
    pub fn enclosure_file(&self, field_name: &str) -> Option<FileSlot> {
        match self.get(&file_key(field_name)) {
            Some(value) => value.file_slot(),
            None => self
                .get(field_name)
                .and_then(FieldValue::as_enclosure)
                .and_then(|enclosure| enclosure.file().cloned()),
        }
    }
}

impl FromIterator<(String, FieldValue)> for FormValues {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EnclosureValue, FieldValue, FileRef, FileSlot, FormValues, file_key, select_key};

    #[test]
    fn decodes_each_value_shape() {
        let values = serde_json::from_value::<FormValues>(json!({
            "Name": "Ravi",
            "ApplicantImage": { "uri": "file:///tmp/a.jpg", "name": "a.jpg", "type": "image/jpeg" },
            "IdProof": { "selected": "Aadhaar", "file": "" }
        }));

        let Ok(values) = values else {
            panic!("values should decode");
        };
        assert_eq!(values.get("Name"), Some(&FieldValue::text("Ravi")));
        assert_eq!(
            values.get("ApplicantImage"),
            Some(&FieldValue::File(FileRef::new("file:///tmp/a.jpg", "a.jpg", "image/jpeg")))
        );
        assert_eq!(
            values.get("IdProof"),
            Some(&FieldValue::Enclosure(EnclosureValue::new("Aadhaar", None)))
        );
    }

    #[test]
    fn editor_keys_take_precedence_over_the_composite() {
        let mut values = FormValues::new();
        values.insert(
            "IdProof",
            FieldValue::Enclosure(EnclosureValue::new(
                "Aadhaar",
                Some(FileSlot::Uploaded("https://files/a.pdf".to_owned())),
            )),
        );
        assert_eq!(values.enclosure_selected("IdProof"), Some("Aadhaar"));

        values.insert(select_key("IdProof"), FieldValue::text("Voter Card"));
        values.insert(file_key("IdProof"), FieldValue::text(""));
        assert_eq!(values.enclosure_selected("IdProof"), Some("Voter Card"));
        assert_eq!(values.enclosure_file("IdProof"), None);
    }

    #[test]
    fn upload_name_falls_back_to_field_and_subtype() {
        let file = FileRef::new("file:///tmp/x", "", "application/pdf");
        assert_eq!(file.upload_name("IdProof"), "IdProof.pdf");
    }
}
