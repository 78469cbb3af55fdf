//! Field-level input checks shared by the listing and message operations.

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the domain
/// with something on both sides of it.
pub fn is_valid_email(input: &str) -> bool {
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let len = domain.len();
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < len)
}

pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Returns the non-blank value of an optional field.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Names of required fields that are absent or blank, in the order given.
pub fn missing_fields<'a>(fields: &[(&'a str, &Option<String>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| *name)
        .collect()
}
