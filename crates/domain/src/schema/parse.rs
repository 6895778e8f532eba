use std::collections::{BTreeMap, BTreeSet};

use seva_core::{AppError, AppResult};
use serde_json::{Map, Value};

use super::{
    AdditionalFields, DependentOptions, EnclosureDependency, FieldDef, FieldKind, LengthLimit,
    Section, SelectOption, derive_name,
};

pub(super) fn parse_sections(value: &Value) -> AppResult<Vec<Section>> {
    let sections = value.as_array().ok_or_else(|| {
        AppError::Schema("form definition must be an array of sections".to_owned())
    })?;

    sections
        .iter()
        .enumerate()
        .map(|(index, section)| parse_section(index, section))
        .collect()
}

fn parse_section(index: usize, value: &Value) -> AppResult<Section> {
    let object = value
        .as_object()
        .ok_or_else(|| AppError::Schema(format!("section #{index} must be an object")))?;

    let name = object
        .get("section")
        .and_then(scalar_text)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::Schema(format!("section #{index} is missing 'section'")))?;

    let fields = object
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Schema(format!("section '{name}' is missing 'fields'")))?;

    let id = object
        .get("id")
        .and_then(scalar_text)
        .unwrap_or_else(|| index.to_string());

    let fields = fields
        .iter()
        .map(|field| parse_field(field, None))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Section::new(id, name, fields))
}

fn parse_field(value: &Value, parent_name: Option<&str>) -> AppResult<FieldDef> {
    let object = value
        .as_object()
        .ok_or_else(|| AppError::Schema("field definitions must be objects".to_owned()))?;

    let name = field_name(object, parent_name)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::parse::<FieldKind>)
        .transpose()?
        .unwrap_or(FieldKind::Text);
    let label = object
        .get("label")
        .and_then(scalar_text)
        .unwrap_or_else(|| name.clone());

    let mut field = FieldDef::new(name, label, kind)
        .with_validations(string_list(object.get("validationFunctions")))
        .with_transformations(string_list(object.get("transformationFunctions")))
        .with_options(option_list(object.get("options")));

    if let Some(dependent_options) = dependent_options(object) {
        field = field.with_dependent_options(dependent_options);
    }
    if let Some(dependency) = enclosure_dependency(object) {
        field = field.with_enclosure_dependency(dependency);
    }
    if let Some(limit) = object.get("maxLength").and_then(length_limit) {
        field = field.with_max_length(limit);
    }
    if let Some(limit) = object.get("minLength").and_then(integer) {
        field = field.with_min_length(limit);
    }
    if let Some(accept) = object.get("accept").and_then(accept_list) {
        field = field.with_accept(accept);
    }
    if let Some(nested) = object.get("additionalFields")
        && let Some(additional_fields) = additional_fields(nested, field.name())?
    {
        field = field.with_additional_fields(additional_fields);
    }

    Ok(field)
}

fn field_name(object: &Map<String, Value>, parent_name: Option<&str>) -> AppResult<String> {
    if let Some(name) = object
        .get("name")
        .and_then(scalar_text)
        .filter(|name| !name.trim().is_empty())
    {
        return Ok(name);
    }

    match (parent_name, object.get("id").and_then(scalar_text)) {
        (Some(parent_name), Some(id)) => Ok(derive_name(parent_name, id.as_str())),
        (Some(parent_name), None) => Err(AppError::Schema(format!(
            "nested field under '{parent_name}' has neither 'name' nor 'id'"
        ))),
        (None, _) => Err(AppError::Schema("field is missing 'name'".to_owned())),
    }
}

fn additional_fields(value: &Value, parent_name: &str) -> AppResult<Option<AdditionalFields>> {
    match value {
        Value::Array(fields) => fields
            .iter()
            .map(|field| parse_field(field, Some(parent_name)))
            .collect::<AppResult<Vec<_>>>()
            .map(|fields| Some(AdditionalFields::Unconditional(fields))),
        Value::Object(branches) => {
            let mut parsed = BTreeMap::new();
            for (branch_value, fields) in branches {
                let fields = fields
                    .as_array()
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|field| parse_field(field, Some(parent_name)))
                            .collect::<AppResult<Vec<_>>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                parsed.insert(branch_value.clone(), fields);
            }
            Ok(Some(AdditionalFields::Conditional(parsed)))
        }
        _ => Ok(None),
    }
}

fn dependent_options(object: &Map<String, Value>) -> Option<DependentOptions> {
    if object.get("optionsType").and_then(Value::as_str) != Some("dependent") {
        return None;
    }
    let dependent_on = object.get("dependentOn").and_then(scalar_text)?;
    let by_parent_value = object
        .get("dependentOptions")
        .and_then(Value::as_object)
        .map(|branches| {
            branches
                .iter()
                .map(|(parent_value, options)| (parent_value.clone(), option_list(Some(options))))
                .collect()
        })
        .unwrap_or_default();

    Some(DependentOptions::new(dependent_on, by_parent_value))
}

fn enclosure_dependency(object: &Map<String, Value>) -> Option<EnclosureDependency> {
    if object.get("isDependentEnclosure").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    let field = object
        .get("dependentField")
        .and_then(scalar_text)
        .unwrap_or_default();
    let values = string_list(object.get("dependentValues"))
        .into_iter()
        .collect::<BTreeSet<_>>();

    Some(EnclosureDependency::new(field, values))
}

fn length_limit(value: &Value) -> Option<LengthLimit> {
    if let Some(limit) = integer(value) {
        return Some(LengthLimit::Fixed(limit));
    }

    let object = value.as_object()?;
    let dependent_on = object.get("dependentOn").and_then(scalar_text)?;
    let by_value = object
        .iter()
        .filter(|(key, _)| key.as_str() != "dependentOn")
        .filter_map(|(key, limit)| integer(limit).map(|limit| (key.clone(), limit)))
        .collect();

    Some(LengthLimit::Dependent {
        dependent_on,
        by_value,
    })
}

fn option_list(value: Option<&Value>) -> Vec<SelectOption> {
    value
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| match option {
                    Value::Object(option) => {
                        let value = option.get("value").and_then(scalar_text)?;
                        let label = option
                            .get("label")
                            .and_then(scalar_text)
                            .unwrap_or_else(|| value.clone());
                        Some(SelectOption::new(value, label))
                    }
                    other => {
                        scalar_text(other).map(|value| SelectOption::new(value.clone(), value))
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default()
}

fn accept_list(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let joined = items.iter().filter_map(scalar_text).collect::<Vec<_>>();
            (!joined.is_empty()).then(|| joined.join(","))
        }
        other => scalar_text(other),
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|number| number as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
