//! Errors that can happen while decoding a request or storing its payload.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::http;
use crate::logger;

/// One segment of the location of an invalid input, e.g. `["body", "age"]`
/// or `["body", 0]` for an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Loc {
    Key(String),
    Index(usize),
}

impl From<&str> for Loc {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for Loc {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A single input validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub loc: Vec<Loc>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationError {
    pub fn new(loc: Vec<Loc>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// A required field was not supplied
    pub fn missing(source: &str, field: &str) -> Self {
        Self::new(
            vec![source.into(), field.into()],
            "field required",
            "value_error.missing",
        )
    }

    /// A field could not be read as an integer
    pub fn not_an_integer(source: &str, field: &str) -> Self {
        Self::new(
            vec![source.into(), field.into()],
            "value is not a valid integer",
            "type_error.integer",
        )
    }
}

/// All validation failures found for a request.
#[derive(Debug, Default, thiserror::Error)]
#[error("{} validation error(s)", .errors.len())]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// The error returned by extractors and the upload sink.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Validation(ValidationErrors),
    #[error("request body exceeds the configured size limit")]
    PayloadTooLarge,
    #[error("failed to read request body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for RequestError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.into())
    }
}

impl From<ValidationErrors> for RequestError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Serialize)]
struct ValidationBody<'a> {
    detail: &'a [ValidationError],
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert a [`RequestError`] into an HTTP response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        match self {
            Self::Validation(errors) => http::json_response(
                status,
                &ValidationBody {
                    detail: errors.errors(),
                },
            ),
            Self::PayloadTooLarge => http::build_413_response(),
            Self::Body(e) => {
                logger::log_warning(&format!("Failed to read request body: {e}"));
                http::build_detail_response(status, "There was an error parsing the body")
            }
            Self::Io(e) => {
                logger::log_error(&format!("Request failed with I/O error: {e}"));
                http::build_500_response()
            }
        }
    }
}
