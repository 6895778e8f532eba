//! Conditional field resolution over the current values.

use crate::schema::{FieldDef, FormSchema, Section, SelectOption};
use crate::values::{FormValues, file_key, select_key};

const DISTRICT_FIELD_NAMES: [&str; 3] = ["district", "presentdistrict", "permanentdistrict"];

/// Editor key of an active field, as produced by [`step_keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepKey<'a> {
    /// Flat key the editor binds to.
    pub key: String,
    /// Schema field the key belongs to.
    pub field: &'a FieldDef,
}

/// Returns whether a field takes part in rendering, validation and submission.
///
/// Only dependent enclosures can be inactive on their own.
#[must_use]
pub fn is_field_active(field: &FieldDef, values: &FormValues) -> bool {
    match field.enclosure_dependency() {
        Some(dependency) => dependency.is_satisfied_by(values.text(dependency.field())),
        None => true,
    }
}

/// Returns the nested fields active for the field's current value.
#[must_use]
pub fn active_children<'a>(field: &'a FieldDef, values: &FormValues) -> &'a [FieldDef] {
    field
        .additional_fields()
        .map(|nested| nested.active_for(values.text(field.name())))
        .unwrap_or_default()
}

/// Returns the option list a select currently offers.
#[must_use]
pub fn options_for(field: &FieldDef, values: &FormValues) -> Vec<SelectOption> {
    match field.dependent_options() {
        Some(dependent) => values
            .text(dependent.dependent_on())
            .map(|parent_value| dependent.options_for(parent_value).to_vec())
            .unwrap_or_default(),
        None => field.options().to_vec(),
    }
}

/// Returns [`options_for`] plus the current value when it is not offered, so
/// values saved against an older option list stay displayable.
#[must_use]
pub fn options_with_current(field: &FieldDef, values: &FormValues) -> Vec<SelectOption> {
    let mut options = options_for(field, values);
    let current = if field.is_enclosure() {
        values.enclosure_selected(field.name())
    } else {
        values.text(field.name())
    };
    if let Some(current) = current.filter(|current| !current.is_empty())
        && !options.iter().any(|option| option.value() == current)
    {
        options.push(SelectOption::new(current, current));
    }
    options
}

/// Returns the editor keys of every active field in a section, in schema
/// order, descending into active nested fields.
#[must_use]
pub fn step_keys<'a>(section: &'a Section, values: &FormValues) -> Vec<StepKey<'a>> {
    let mut keys = Vec::new();
    collect_keys(section.fields(), values, &mut keys);
    keys
}

fn collect_keys<'a>(fields: &'a [FieldDef], values: &FormValues, keys: &mut Vec<StepKey<'a>>) {
    for field in fields {
        if !is_field_active(field, values) {
            continue;
        }
        if field.is_enclosure() {
            keys.push(StepKey {
                key: select_key(field.name()),
                field,
            });
            keys.push(StepKey {
                key: file_key(field.name()),
                field,
            });
        } else {
            keys.push(StepKey {
                key: field.name().to_owned(),
                field,
            });
        }
        collect_keys(active_children(field, values), values, keys);
    }
}

/// Returns whether a field name denotes a district selector.
#[must_use]
pub fn is_district_field(field_name: &str) -> bool {
    let normalized = field_name
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    DISTRICT_FIELD_NAMES.contains(&normalized.as_str())
}

/// Returns the tehsil field fed by a district field.
#[must_use]
pub fn tehsil_field_for(district_field_name: &str) -> String {
    district_field_name.replacen("District", "Tehsil", 1)
}

/// Returns the permanent-address counterpart of a present-address key.
#[must_use]
pub fn permanent_counterpart(field_name: &str) -> Option<String> {
    field_name
        .contains("Present")
        .then(|| field_name.replacen("Present", "Permanent", 1))
}

/// One value copied by the "same as present address" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCopy {
    /// Present-address key read from.
    pub source: String,
    /// Permanent-address key written to.
    pub target: String,
    /// Section index holding the target field.
    pub target_section: usize,
    /// Whether the target is a district selector.
    pub target_is_district: bool,
}

/// Plans the present → permanent address copy for every present-address key
/// holding a value whose permanent counterpart exists in the schema.
#[must_use]
pub fn plan_address_copy(schema: &FormSchema, values: &FormValues) -> Vec<AddressCopy> {
    let mut copies = Vec::new();
    for section in schema.sections() {
        for step_key in step_keys(section, values) {
            let Some(target) = permanent_counterpart(&step_key.key) else {
                continue;
            };
            if !values.contains(&step_key.key) {
                continue;
            }
            let target_field = permanent_counterpart(step_key.field.name());
            let Some(target_section) = target_field
                .as_deref()
                .and_then(|name| schema.section_index_of(name))
            else {
                continue;
            };
            copies.push(AddressCopy {
                target_is_district: is_district_field(&target),
                source: step_key.key,
                target,
                target_section,
            });
        }
    }
    copies
}
