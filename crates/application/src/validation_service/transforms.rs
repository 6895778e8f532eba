use seva_domain::FieldDef;

/// Applies the field's transformations in declared order.
///
/// Unknown ids are ignored. Every known transformation is idempotent, so
/// re-assigning an already transformed value leaves it unchanged.
#[must_use]
pub fn apply_transformations(field: &FieldDef, value: &str) -> String {
    field
        .transformation_functions()
        .iter()
        .fold(value.to_owned(), |current, transform_id| {
            match transform_id.as_str() {
                "CapitalizeAlphabets" | "CaptilizeAlphabet" => current.to_uppercase(),
                _ => current,
            }
        })
}
