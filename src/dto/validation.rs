//! Validation helpers for DTOs.

use validator::ValidationError;

/// Shortest accepted presentation or section name, in characters.
pub const NAME_MIN_CHARS: usize = 5;
/// Longest accepted presentation or section name, in characters.
pub const NAME_MAX_CHARS: usize = 50;
/// Shortest duration a section may be given.
pub const SECTION_MIN_DURATION_MS: u64 = 1_000;

/// Validates a presentation or section name: not blank and between 5 and 50 characters.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Opening") // Ok
/// validate_display_name("     ")   // Err - blank
/// validate_display_name("Intro")   // Ok - exactly 5 characters
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_empty");
        err.message = Some("name can not be empty".into());
        return Err(err);
    }

    let length = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!(
                "name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters (got {length})"
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}
