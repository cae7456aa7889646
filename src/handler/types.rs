//! Request inputs and response payloads of the API routes.

use serde::{Deserialize, Serialize};

use crate::extract::{lax_int, lax_opt_str, lax_str, FieldSet, RequestError, ValidationErrors};

/// Year every age is computed against
pub const REFERENCE_YEAR: i64 = 2022;

/// A person as sent in the JSON body of `POST /add_user`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Person {
    #[serde(deserialize_with = "lax_int")]
    pub age: i64,
    #[serde(deserialize_with = "lax_str")]
    pub name: String,
    #[serde(default, deserialize_with = "lax_opt_str")]
    pub gender: Option<String>,
}

/// Query parameters of `POST /add_user_qp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub qp_name: String,
    pub qp_age: i64,
}

impl UserQuery {
    pub fn from_fields(fields: &FieldSet) -> Result<Self, RequestError> {
        let mut errors = ValidationErrors::default();
        let qp_name = fields.required_str("qp_name", &mut errors);
        let qp_age = fields.required_int("qp_age", &mut errors);
        match (qp_name, qp_age) {
            (Some(qp_name), Some(qp_age)) => Ok(Self { qp_name, qp_age }),
            _ => Err(errors.into()),
        }
    }
}

/// Form fields of `POST /login/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn from_fields(fields: &FieldSet) -> Result<Self, RequestError> {
        let mut errors = ValidationErrors::default();
        let username = fields.required_str("username", &mut errors);
        let password = fields.required_str("password", &mut errors);
        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(errors.into()),
        }
    }
}

/// `{"Message": ...}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    #[serde(rename = "Message")]
    pub message: String,
}

/// `{"Age": ...}`
#[derive(Debug, Serialize)]
pub struct AgeResponse {
    /// Widened so every 64-bit birth year yields an exact result
    #[serde(rename = "Age")]
    pub age: i128,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
}
