use crate::RegistryError;

/// Longest accepted name, version or filename, in characters.
pub const MAX_FIELD_CHARS: usize = 256;

/// Reject empty, overlong or control-character-bearing input fields.
pub(crate) fn validate_field(field: &'static str, value: &str) -> Result<(), RegistryError> {
    let reason = if value.trim().is_empty() {
        "must not be empty"
    } else if value.chars().count() > MAX_FIELD_CHARS {
        "must be at most 256 characters"
    } else if value.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(RegistryError::Validation { field, reason })
}
