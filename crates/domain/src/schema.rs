mod parse;

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

use seva_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Sentinel option value that stands for "nothing selected".
pub const PLEASE_SELECT: &str = "Please Select";

/// Derives the key of a nested field that has no explicit name.
#[must_use]
pub fn derive_name(parent_name: &str, nested_id: &str) -> String {
    format!("{parent_name}_{nested_id}")
}

/// Inserts a space before every inner capital letter, e.g. `PresentDistrict`
/// becomes `Present District`.
#[must_use]
pub fn format_key(key: &str) -> String {
    let mut formatted = String::with_capacity(key.len() + 4);
    for (index, character) in key.chars().enumerate() {
        if index > 0 && character.is_ascii_uppercase() {
            formatted.push(' ');
        }
        formatted.push(character);
    }
    formatted
}

/// Supported field kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text input.
    Text,
    /// Email text input.
    Email,
    /// ISO date (`YYYY-MM-DD`).
    Date,
    /// Single choice from an option list.
    Select,
    /// Standalone file or image attachment.
    File,
    /// Document type selector with a companion file slot.
    Enclosure,
    /// Kind this client does not render; kept so submissions stay complete.
    Unsupported(String),
}

impl FieldKind {
    /// Returns the stable schema value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Date => "date",
            Self::Select => "select",
            Self::File => "file",
            Self::Enclosure => "enclosure",
            Self::Unsupported(kind) => kind.as_str(),
        }
    }
}

impl FromStr for FieldKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "text" => Self::Text,
            "email" => Self::Email,
            "date" => Self::Date,
            "select" => Self::Select,
            "file" => Self::File,
            "enclosure" => Self::Enclosure,
            other => Self::Unsupported(other.to_owned()),
        })
    }
}

/// One selectable `{value, label}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    value: String,
    label: String,
}

impl SelectOption {
    /// Creates an option.
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Creates the leading "Please Select" sentinel option.
    #[must_use]
    pub fn please_select() -> Self {
        Self::new(PLEASE_SELECT, PLEASE_SELECT)
    }

    /// Returns the submitted value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }
}

/// Options of a select that depend on another field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentOptions {
    dependent_on: String,
    by_parent_value: BTreeMap<String, Vec<SelectOption>>,
}

impl DependentOptions {
    /// Creates a dependent option mapping.
    #[must_use]
    pub fn new(
        dependent_on: impl Into<String>,
        by_parent_value: BTreeMap<String, Vec<SelectOption>>,
    ) -> Self {
        Self {
            dependent_on: dependent_on.into(),
            by_parent_value,
        }
    }

    /// Returns the parent field name.
    #[must_use]
    pub fn dependent_on(&self) -> &str {
        self.dependent_on.as_str()
    }

    /// Returns the options for one parent value.
    #[must_use]
    pub fn options_for(&self, parent_value: &str) -> &[SelectOption] {
        self.by_parent_value
            .get(parent_value)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Activation rule of a dependent enclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosureDependency {
    field: String,
    values: BTreeSet<String>,
}

impl EnclosureDependency {
    /// Creates an activation rule.
    #[must_use]
    pub fn new(field: impl Into<String>, values: BTreeSet<String>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }

    /// Returns the controlling field name.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns whether the controlling value activates the enclosure.
    #[must_use]
    pub fn is_satisfied_by(&self, value: Option<&str>) -> bool {
        value
            .filter(|value| !value.is_empty())
            .is_some_and(|value| self.values.contains(value))
    }
}

/// Maximum length or minimum age setting of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthLimit {
    /// A single limit.
    Fixed(i64),
    /// A limit chosen by another field's current value.
    Dependent {
        /// Controlling field name.
        dependent_on: String,
        /// Limit per controlling value.
        by_value: BTreeMap<String, i64>,
    },
}

impl LengthLimit {
    /// Returns the fixed limit, if this is not a dependent limit.
    #[must_use]
    pub fn fixed(&self) -> Option<i64> {
        match self {
            Self::Fixed(limit) => Some(*limit),
            Self::Dependent { .. } => None,
        }
    }
}

/// Nested fields hanging off a parent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdditionalFields {
    /// Always active, whatever the parent value.
    Unconditional(Vec<FieldDef>),
    /// Active branch chosen by the parent's current value.
    Conditional(BTreeMap<String, Vec<FieldDef>>),
}

impl AdditionalFields {
    /// Returns the fields active for the parent's current value.
    #[must_use]
    pub fn active_for(&self, parent_value: Option<&str>) -> &[FieldDef] {
        match self {
            Self::Unconditional(fields) => fields,
            Self::Conditional(branches) => parent_value
                .and_then(|value| branches.get(value))
                .map(Vec::as_slice)
                .unwrap_or_default(),
        }
    }

    /// Iterates every nested field of every branch.
    pub fn all(&self) -> Box<dyn Iterator<Item = &FieldDef> + '_> {
        match self {
            Self::Unconditional(fields) => Box::new(fields.iter()),
            Self::Conditional(branches) => Box::new(branches.values().flatten()),
        }
    }

    fn all_mut(&mut self) -> Box<dyn Iterator<Item = &mut FieldDef> + '_> {
        match self {
            Self::Unconditional(fields) => Box::new(fields.iter_mut()),
            Self::Conditional(branches) => Box::new(branches.values_mut().flatten()),
        }
    }
}

/// Schema description of one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    name: String,
    label: String,
    kind: FieldKind,
    validation_functions: Vec<String>,
    transformation_functions: Vec<String>,
    options: Vec<SelectOption>,
    dependent_options: Option<DependentOptions>,
    enclosure_dependency: Option<EnclosureDependency>,
    additional_fields: Option<AdditionalFields>,
    max_length: Option<LengthLimit>,
    min_length: Option<i64>,
    accept: Option<String>,
}

impl FieldDef {
    /// Creates a field with no options, rules or nested fields.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            validation_functions: Vec::new(),
            transformation_functions: Vec::new(),
            options: Vec::new(),
            dependent_options: None,
            enclosure_dependency: None,
            additional_fields: None,
            max_length: None,
            min_length: None,
            accept: None,
        }
    }

    /// Sets the ordered validation rule ids.
    #[must_use]
    pub fn with_validations<I, S>(mut self, rule_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation_functions = rule_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the ordered transformation ids.
    #[must_use]
    pub fn with_transformations<I, S>(mut self, transform_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transformation_functions = transform_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the static option list.
    #[must_use]
    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    /// Sets the dependent option mapping.
    #[must_use]
    pub fn with_dependent_options(mut self, dependent_options: DependentOptions) -> Self {
        self.dependent_options = Some(dependent_options);
        self
    }

    /// Sets the dependent enclosure rule.
    #[must_use]
    pub fn with_enclosure_dependency(mut self, dependency: EnclosureDependency) -> Self {
        self.enclosure_dependency = Some(dependency);
        self
    }

    /// Sets nested fields.
    #[must_use]
    pub fn with_additional_fields(mut self, additional_fields: AdditionalFields) -> Self {
        self.additional_fields = Some(additional_fields);
        self
    }

    /// Sets the maximum length (or minimum age) limit.
    #[must_use]
    pub fn with_max_length(mut self, limit: LengthLimit) -> Self {
        self.max_length = Some(limit);
        self
    }

    /// Sets the minimum length (or month offset) limit.
    #[must_use]
    pub fn with_min_length(mut self, limit: i64) -> Self {
        self.min_length = Some(limit);
        self
    }

    /// Sets the accepted file extensions.
    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Returns the fully-qualified field key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the field kind.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Returns validation rule ids in declared order.
    #[must_use]
    pub fn validation_functions(&self) -> &[String] {
        &self.validation_functions
    }

    /// Returns transformation ids in declared order.
    #[must_use]
    pub fn transformation_functions(&self) -> &[String] {
        &self.transformation_functions
    }

    /// Returns the static option list.
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Returns the dependent option mapping.
    #[must_use]
    pub fn dependent_options(&self) -> Option<&DependentOptions> {
        self.dependent_options.as_ref()
    }

    /// Returns the dependent enclosure rule.
    #[must_use]
    pub fn enclosure_dependency(&self) -> Option<&EnclosureDependency> {
        self.enclosure_dependency.as_ref()
    }

    /// Returns nested fields.
    #[must_use]
    pub fn additional_fields(&self) -> Option<&AdditionalFields> {
        self.additional_fields.as_ref()
    }

    /// Returns the maximum length limit.
    #[must_use]
    pub fn max_length(&self) -> Option<&LengthLimit> {
        self.max_length.as_ref()
    }

    /// Returns the minimum length limit.
    #[must_use]
    pub fn min_length(&self) -> Option<i64> {
        self.min_length
    }

    /// Returns the accepted file extensions.
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// Returns whether the value is a document selector plus file slot.
    #[must_use]
    pub fn is_enclosure(&self) -> bool {
        self.kind == FieldKind::Enclosure
    }

    /// Returns whether the submitted entry carries a `File` instead of a `value`.
    #[must_use]
    pub fn is_file_bearing(&self) -> bool {
        self.kind == FieldKind::File || self.name == "ApplicantImage"
    }

    fn find(&self, name: &str) -> Option<&FieldDef> {
        if self.name == name {
            return Some(self);
        }
        self.additional_fields
            .as_ref()
            .and_then(|nested| nested.all().find_map(|field| field.find(name)))
    }

    fn replace_options(&mut self, name: &str, options: &[SelectOption]) -> bool {
        if self.name == name {
            self.options = options.to_vec();
            return true;
        }
        let Some(nested) = self.additional_fields.as_mut() else {
            return false;
        };
        let mut replaced = false;
        for field in nested.all_mut() {
            replaced |= field.replace_options(name, options);
        }
        replaced
    }
}

/// One step of a multi-step form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    id: String,
    name: String,
    fields: Vec<FieldDef>,
}

impl Section {
    /// Creates a section.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields,
        }
    }

    /// Returns the stable section id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the section name used as the payload key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns top-level fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Finds a field by key anywhere in this section, nested fields included.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find_map(|field| field.find(name))
    }

    fn replace_field_options(&mut self, name: &str, options: &[SelectOption]) -> bool {
        let mut replaced = false;
        for field in &mut self.fields {
            replaced |= field.replace_options(name, options);
        }
        replaced
    }
}

/// Ordered sections of a form.
///
/// Sections are shared snapshots: replacing a field's options clones only the
/// affected section, so snapshots handed out earlier keep their options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    sections: Vec<Arc<Section>>,
}

impl FormSchema {
    /// Creates a schema from sections.
    #[must_use]
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections: sections.into_iter().map(Arc::new).collect(),
        }
    }

    /// Parses a raw JSON form definition.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let value = serde_json::from_str::<serde_json::Value>(raw).map_err(|error| {
            AppError::Schema(format!("form definition is not valid JSON: {error}"))
        })?;
        Self::from_value(&value)
    }

    /// Builds a schema from an already decoded JSON form definition.
    pub fn from_value(value: &serde_json::Value) -> AppResult<Self> {
        parse::parse_sections(value).map(Self::new)
    }

    /// Returns section snapshots in step order.
    #[must_use]
    pub fn sections(&self) -> &[Arc<Section>] {
        &self.sections
    }

    /// Returns the section snapshot for one step.
    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Arc<Section>> {
        self.sections.get(index)
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns whether the schema has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Finds the first section index holding a field key.
    #[must_use]
    pub fn section_index_of(&self, field_name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.find_field(field_name).is_some())
    }

    /// Finds a field by key in any section.
    #[must_use]
    pub fn find_field(&self, field_name: &str) -> Option<&FieldDef> {
        self.sections
            .iter()
            .find_map(|section| section.find_field(field_name))
    }

    /// Replaces the options of one field inside one section.
    ///
    /// Returns `false` when the section or field does not exist. Other
    /// sections are never touched, even when they hold a field with the same
    /// name.
    pub fn replace_field_options(
        &mut self,
        section_index: usize,
        field_name: &str,
        options: Vec<SelectOption>,
    ) -> bool {
        let Some(section) = self.sections.get(section_index) else {
            return false;
        };
        if section.find_field(field_name).is_none() {
            return false;
        }

        let mut updated = Section::clone(section);
        let replaced = updated.replace_field_options(field_name, &options);
        self.sections[section_index] = Arc::new(updated);
        replaced
    }
}
