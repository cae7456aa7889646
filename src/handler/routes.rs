//! Route handlers
//!
//! Every handler receives already-decoded input and produces a JSON body;
//! none of them keeps state between requests.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};

use super::types::{
    AgeResponse, LoginForm, LoginResponse, MessageResponse, Person, UploadResponse, UserQuery,
    REFERENCE_YEAR,
};
use crate::extract::{self, BodyKind, BoxError, RequestError};
use crate::http::json_response;
use crate::storage::FileSink;

/// Multipart part carrying the uploaded file
pub const UPLOAD_FIELD: &str = "uploaded_file";

const LOGIN_MESSAGE: &str = "Succesfully Logged in";

/// `GET /`
pub fn hello() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: "Hello from API".to_string(),
        },
    )
}

/// `GET /get_age/{birth_year}`
pub fn get_age(birth_year: i64) -> Response<Full<Bytes>> {
    let age = i128::from(REFERENCE_YEAR) - i128::from(birth_year);
    json_response(StatusCode::OK, &AgeResponse { age })
}

/// `POST /add_user_qp`
pub fn add_user_query(query: &UserQuery) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: format!(
                "User Added with name {} and age {}",
                query.qp_name, query.qp_age
            ),
        },
    )
}

/// `POST /add_user`
pub fn add_user(person: &Person) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: format!(
                "User Added with name {} and age {} and Gender {}",
                person.name,
                person.age,
                person.gender.as_deref().unwrap_or("None")
            ),
        },
    )
}

/// `POST /login/`
///
/// Any username/password pair is accepted.
pub fn login(form: LoginForm) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &LoginResponse {
            username: form.username,
            message: LOGIN_MESSAGE,
        },
    )
}

/// `POST /upload_file`
pub async fn upload_file<B>(
    kind: &BodyKind,
    body: B,
    sink: &FileSink,
    max_body_size: u64,
) -> Result<Response<Full<Bytes>>, RequestError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let BodyKind::Multipart { boundary } = kind else {
        return Err(extract::ValidationError::missing("body", UPLOAD_FIELD).into());
    };

    let mut multipart = extract::multipart_reader(body, boundary, max_body_size);
    let field = extract::file_field(&mut multipart, UPLOAD_FIELD).await?;
    let filename = field.file_name().unwrap_or_default().to_string();

    sink.save(&filename, field).await?;

    Ok(json_response(StatusCode::OK, &UploadResponse { filename }))
}
