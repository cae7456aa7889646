//! Typed path segments.

use super::errors::{RequestError, ValidationError};

/// Parse a path segment bound to `name` as a signed integer
pub fn int_param(name: &str, raw: &str) -> Result<i64, RequestError> {
    raw.parse::<i64>()
        .map_err(|_| ValidationError::not_an_integer("path", name).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_param() {
        assert_eq!(int_param("birth_year", "1990").unwrap(), 1990);
        assert_eq!(int_param("birth_year", "-44").unwrap(), -44);
        assert_eq!(int_param("birth_year", "+7").unwrap(), 7);
    }

    #[test]
    fn test_int_param_rejects_garbage() {
        for raw in ["abc", "", "19.5", "1e3", "99999999999999999999"] {
            let err = int_param("birth_year", raw).unwrap_err();
            let RequestError::Validation(errors) = err else {
                panic!("expected validation error for {raw:?}");
            };
            assert_eq!(errors.errors()[0].msg, "value is not a valid integer");
        }
    }
}
