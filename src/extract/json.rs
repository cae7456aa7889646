//! JSON request bodies.

use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_path_to_error::Segment;

use super::errors::{Loc, RequestError, ValidationError};
use super::BodyKind;

/// Deserialize a buffered JSON body into `T`
///
/// An empty body is a missing body; a body sent with a non-JSON content type
/// is rejected without being parsed.
pub fn json_body<T: DeserializeOwned>(kind: &BodyKind, bytes: &[u8]) -> Result<T, RequestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::new(
            vec!["body".into()],
            "field required",
            "value_error.missing",
        )
        .into());
    }
    if !matches!(kind, BodyKind::Json | BodyKind::Unspecified) {
        return Err(ValidationError::new(
            vec!["body".into()],
            "value is not a valid dict",
            "type_error.dict",
        )
        .into());
    }

    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(into_validation)?;
    deserializer
        .end()
        .map_err(|e| decode_error(&e))?;
    Ok(value)
}

fn decode_error(err: &serde_json::Error) -> ValidationError {
    ValidationError::new(
        vec!["body".into(), err.column().saturating_sub(1).into()],
        strip_position(&err.to_string()),
        "value_error.jsondecode",
    )
}

fn into_validation(err: serde_path_to_error::Error<serde_json::Error>) -> RequestError {
    let inner = err.inner();
    if inner.is_syntax() || inner.is_eof() {
        return decode_error(inner).into();
    }

    let mut loc: Vec<Loc> = vec!["body".into()];
    for segment in err.path().iter() {
        match segment {
            Segment::Seq { index } => loc.push(Loc::Index(*index)),
            Segment::Map { key } => loc.push(Loc::Key(key.clone())),
            Segment::Enum { variant } => loc.push(Loc::Key(variant.clone())),
            Segment::Unknown => {}
        }
    }

    let message = strip_position(&inner.to_string());
    if let Some(field) = missing_field(&message) {
        loc.push(Loc::Key(field.to_string()));
        return ValidationError::new(loc, "field required", "value_error.missing").into();
    }

    let kind = if message == INTEGER_MSG {
        "type_error.integer"
    } else if message == STR_MSG || message.contains("expected a string") {
        "type_error.str"
    } else if message == NONE_MSG {
        "type_error.none.not_allowed"
    } else {
        "type_error"
    };
    ValidationError::new(loc, message, kind).into()
}

/// serde reports a missing struct field as "missing field `name`"
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
}

/// Drop serde_json's " at line L column C" suffix
fn strip_position(message: &str) -> String {
    match message.rsplit_once(" at line ") {
        Some((head, _)) => head.to_string(),
        None => message.to_string(),
    }
}

const INTEGER_MSG: &str = "value is not a valid integer";
const STR_MSG: &str = "str type expected";
const NONE_MSG: &str = "none is not an allowed value";

/// Lenient integer
///
/// Integers, booleans (`true` is 1), finite floats truncated toward zero and
/// decimal strings such as `" 30 "` are accepted. `null`, `"30.0"`, arrays and
/// objects are not.
pub fn lax_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    struct LaxInt;

    impl<'de> Visitor<'de> for LaxInt {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(INTEGER_MSG))
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            let truncated = v.trunc();
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(truncated as i64)
            } else {
                Err(E::custom(INTEGER_MSG))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim().parse().map_err(|_| E::custom(INTEGER_MSG))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<i64, E> {
            Ok(i64::from(v))
        }

        fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
            Err(E::custom(NONE_MSG))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, _: A) -> Result<i64, A::Error> {
            Err(de::Error::custom(INTEGER_MSG))
        }

        fn visit_map<A: MapAccess<'de>>(self, _: A) -> Result<i64, A::Error> {
            Err(de::Error::custom(INTEGER_MSG))
        }
    }

    deserializer.deserialize_any(LaxInt)
}

/// A string that also accepts numbers and booleans, rendered the way Python's
/// `str()` would (`5`, `30.0`, `True`)
struct LaxString(String);

impl<'de> Deserialize<'de> for LaxString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LaxStr;

        impl<'de> Visitor<'de> for LaxStr {
            type Value = LaxString;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LaxString, E> {
                Ok(LaxString(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<LaxString, E> {
                Ok(LaxString(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LaxString, E> {
                Ok(LaxString(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LaxString, E> {
                Ok(LaxString(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<LaxString, E> {
                Ok(LaxString(float_repr(v)))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<LaxString, E> {
                Ok(LaxString(if v { "True" } else { "False" }.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<LaxString, E> {
                Err(E::custom(NONE_MSG))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, _: A) -> Result<LaxString, A::Error> {
                Err(de::Error::custom(STR_MSG))
            }

            fn visit_map<A: MapAccess<'de>>(self, _: A) -> Result<LaxString, A::Error> {
                Err(de::Error::custom(STR_MSG))
            }
        }

        deserializer.deserialize_any(LaxStr)
    }
}

/// Lenient string, see [`LaxString`]
pub fn lax_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    LaxString::deserialize(deserializer).map(|s| s.0)
}

/// Lenient optional string; `null` is `None`
pub fn lax_opt_str<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<LaxString>::deserialize(deserializer).map(|s| s.map(|s| s.0))
}

/// Python-style float repr: `30.0`, `0.5`, `1e+16`, `1e-05`
fn float_repr(v: f64) -> String {
    let magnitude = v.abs();
    if v == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return if v.fract() == 0.0 {
            format!("{v:.1}")
        } else {
            format!("{v}")
        };
    }
    if !v.is_finite() {
        return if v.is_nan() { "nan" } else if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let sci = format!("{v:e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or_default();
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => sci,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "lax_int")]
        n: i64,
        label: String,
    }

    #[derive(Debug, Deserialize)]
    struct Labels {
        #[serde(deserialize_with = "lax_str")]
        label: String,
        #[serde(default, deserialize_with = "lax_opt_str")]
        note: Option<String>,
    }

    fn first_error(err: RequestError) -> ValidationError {
        match err {
            RequestError::Validation(errors) => errors.errors()[0].clone(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_lax_int_variants() {
        for (n, expected) in [
            ("30", 30),
            ("30.0", 30),
            ("\" 30 \"", 30),
            ("30.9", 30),
            ("-2.7", -2),
            ("true", 1),
            ("false", 0),
        ] {
            let body = format!(r#"{{"n":{n},"label":"x"}}"#);
            let s: Sample = json_body(&BodyKind::Json, body.as_bytes()).unwrap();
            assert_eq!(s.n, expected, "n = {n}");
            assert_eq!(s.label, "x");
        }
    }

    #[test]
    fn test_lax_int_rejects() {
        for n in [r#""x""#, r#""30.0""#, "1e300", "[1]", r#"{"a":1}"#] {
            let body = format!(r#"{{"n":{n},"label":"x"}}"#);
            let err = first_error(json_body::<Sample>(&BodyKind::Json, body.as_bytes()).unwrap_err());
            assert_eq!(err.loc, vec![Loc::from("body"), Loc::from("n")], "n = {n}");
            assert_eq!(err.kind, "type_error.integer", "n = {n}");
        }
    }

    #[test]
    fn test_null_is_not_allowed() {
        let err = first_error(json_body::<Sample>(&BodyKind::Json, br#"{"n":null,"label":"x"}"#).unwrap_err());
        assert_eq!(err.loc, vec![Loc::from("body"), Loc::from("n")]);
        assert_eq!(err.kind, "type_error.none.not_allowed");
    }

    #[test]
    fn test_lax_str_variants() {
        for (label, expected) in [
            (r#""Ann""#, "Ann"),
            ("5", "5"),
            ("-12", "-12"),
            ("30.0", "30.0"),
            ("0.25", "0.25"),
            ("1e20", "1e+20"),
            ("true", "True"),
        ] {
            let body = format!(r#"{{"label":{label}}}"#);
            let parsed: Labels = json_body(&BodyKind::Json, body.as_bytes()).unwrap();
            assert_eq!(parsed.label, expected, "label = {label}");
            assert_eq!(parsed.note, None);
        }
    }

    #[test]
    fn test_lax_opt_str() {
        let parsed: Labels =
            json_body(&BodyKind::Json, br#"{"label":"a","note":7}"#).unwrap();
        assert_eq!(parsed.note.as_deref(), Some("7"));
        let parsed: Labels =
            json_body(&BodyKind::Json, br#"{"label":"a","note":null}"#).unwrap();
        assert_eq!(parsed.note, None);
    }

    #[test]
    fn test_missing_field_location() {
        let err = first_error(json_body::<Sample>(&BodyKind::Json, br#"{"n":1}"#).unwrap_err());
        assert_eq!(err.loc, vec![Loc::from("body"), Loc::from("label")]);
        assert_eq!(err.msg, "field required");
    }

    #[test]
    fn test_wrong_string_type() {
        let err = first_error(json_body::<Sample>(&BodyKind::Json, br#"{"n":1,"label":5}"#).unwrap_err());
        assert_eq!(err.loc, vec![Loc::from("body"), Loc::from("label")]);
        assert_eq!(err.kind, "type_error.str");

        let err = first_error(json_body::<Labels>(&BodyKind::Json, br#"{"label":["a"]}"#).unwrap_err());
        assert_eq!(err.loc, vec![Loc::from("body"), Loc::from("label")]);
        assert_eq!(err.msg, "str type expected");
        assert_eq!(err.kind, "type_error.str");
    }

    #[test]
    fn test_malformed_json() {
        let err = first_error(json_body::<Sample>(&BodyKind::Json, br#"{"n":1,"#).unwrap_err());
        assert_eq!(err.kind, "value_error.jsondecode");
        assert_eq!(err.loc[0], Loc::from("body"));
    }

    #[test]
    fn test_trailing_garbage() {
        let err = first_error(
            json_body::<Sample>(&BodyKind::Json, br#"{"n":1,"label":"a"} x"#).unwrap_err(),
        );
        assert_eq!(err.kind, "value_error.jsondecode");
    }

    #[test]
    fn test_empty_body_is_missing() {
        let err = first_error(json_body::<Sample>(&BodyKind::Json, b"  ").unwrap_err());
        assert_eq!(err.loc, vec![Loc::from("body")]);
        assert_eq!(err.kind, "value_error.missing");
    }

    #[test]
    fn test_non_json_content_type() {
        let kind = BodyKind::Other("text/plain".to_string());
        let err = first_error(json_body::<Sample>(&kind, br#"{"n":1,"label":"a"}"#).unwrap_err());
        assert_eq!(err.kind, "type_error.dict");
    }
}
