//! Request validation utilities for consistent validation across handlers
//!
//! Request types implement [`RequestValidation`]; the macros below return an
//! [`ApiError::validation`](crate::error::ApiError::validation) from the
//! enclosing function on the first failed check.

use crate::error::ApiError;

/// Trait for validating request payloads
pub trait RequestValidation {
    /// Returns `Ok(())` if validation passes, or a validation error naming
    /// the first failed check.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Macro for validating fields with custom predicates
///
/// ```rust,ignore
/// crate::validate_field!(self.password, self.password.len() >= 8, "Password must be at least 8 characters");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Macro for validating required fields (non-blank strings)
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Optional string fields: when present they must not be blank.
#[macro_export]
macro_rules! validate_optional {
    ($field:expr, $message:expr) => {
        if let Some(value) = $field.as_deref() {
            $crate::validate_field!(value, !value.trim().is_empty(), $message);
        }
    };
}

/// Macro for validating string length in characters
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Macro for validating email format (basic check)
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(
            $field,
            $field.contains('@') && $field.contains('.') && !$field.contains(char::is_whitespace),
            $message
        );
    };
}

/// Language codes: 2-3 lowercase letters with an optional region (`pt-BR`).
pub fn is_language_code(code: &str) -> bool {
    let mut parts = code.splitn(2, '-');
    let base_ok = parts
        .next()
        .is_some_and(|b| (2..=3).contains(&b.len()) && b.chars().all(|c| c.is_ascii_lowercase()));
    let region_ok = parts
        .next()
        .map_or(true, |r| (2..=4).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric()));
    base_ok && region_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    struct TestRequest {
        name: String,
        email: String,
        nickname: Option<String>,
    }

    impl RequestValidation for TestRequest {
        fn validate(&self) -> Result<(), ApiError> {
            crate::validate_required!(self.name, "Name is required");
            crate::validate_length!(self.name, 2, 100, "Name must be between 2 and 100 characters");
            crate::validate_email!(self.email, "Invalid email format");
            crate::validate_optional!(self.nickname, "Nickname must not be blank");
            Ok(())
        }
    }

    fn request() -> TestRequest {
        TestRequest {
            name: "Dana Reyes".to_string(),
            email: "dana@example.com".to_string(),
            nickname: None,
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validation_empty_name() {
        let req = TestRequest { name: "  ".to_string(), ..request() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_email() {
        let req = TestRequest { email: "dana at example".to_string(), ..request() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validation_blank_optional() {
        let req = TestRequest { nickname: Some(" ".to_string()), ..request() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_language_codes() {
        assert!(is_language_code("en"));
        assert!(is_language_code("pt-BR"));
        assert!(is_language_code("yue"));
        assert!(!is_language_code("EN"));
        assert!(!is_language_code("english"));
        assert!(!is_language_code(""));
    }
}
