//! Input validation shared by the API request types.
//!
//! Request bodies derive [`validator::Validate`]; [`validate_input`] turns the
//! collected field errors into a single [`CoreError::Validation`].

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;

/// Largest quantity accepted on a single item or accessory line.
pub const MAX_QUANTITY: i32 = 1_000_000;

/// Run `validator` rules and flatten failures into one message.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(flatten_errors(&errors)))
}

/// `field: message; other_field: message`, sorted by field name.
pub fn flatten_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect(errors, "", &mut parts);
    parts.sort();
    parts.join("; ")
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

/// Require a non-blank string.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub fn validate_quantity(quantity: i32) -> Result<(), CoreError> {
    if quantity <= 0 || quantity > MAX_QUANTITY {
        return Err(CoreError::Validation(format!(
            "quantity must be between 1 and {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct NewThing {
        #[validate(length(min = 1, max = 10, message = "must be 1-10 characters"))]
        name: String,
        #[validate(range(min = 1))]
        quantity: i32,
    }

    #[test]
    fn valid_input_passes() {
        let input = NewThing {
            name: "Tote".into(),
            quantity: 3,
        };
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn errors_are_flattened_and_sorted() {
        let input = NewThing {
            name: String::new(),
            quantity: 0,
        };
        let err = validate_input(&input).unwrap_err();
        assert_matches!(&err, CoreError::Validation(msg)
            if msg == "name: must be 1-10 characters; quantity: range");
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_QUANTITY + 1).is_err());
    }

    #[test]
    fn blank_strings_rejected() {
        assert!(require_non_blank("name", " ").is_err());
        assert!(require_non_blank("name", "x").is_ok());
    }
}
