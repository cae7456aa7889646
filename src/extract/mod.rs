//! Request decoding
//!
//! Turns the raw parts of a request (path segment, query string, body) into
//! typed values, reporting every problem as a [`RequestError`].

pub mod errors;
mod fields;
mod form;
mod json;
mod multipart;
mod path;

pub use errors::{RequestError, ValidationError, ValidationErrors};
pub use fields::FieldSet;
pub use form::form_fields;
pub use json::{json_body, lax_int, lax_opt_str, lax_str};
pub use multipart::{file_field, multipart_reader};
pub use path::int_param;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE};

/// Boxed error accepted from any request body implementation
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How the request body is encoded, judged from `Content-Type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// No `Content-Type` header at all
    Unspecified,
    Json,
    UrlEncoded,
    Multipart { boundary: String },
    Other(String),
}

impl BodyKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(CONTENT_TYPE) else {
            return Self::Unspecified;
        };
        let Ok(content_type) = value.to_str() else {
            return Self::Other(String::from_utf8_lossy(value.as_bytes()).into_owned());
        };
        let Ok(mime) = content_type.parse::<mime::Mime>() else {
            return Self::Other(content_type.to_string());
        };

        let is_application = mime.type_() == mime::APPLICATION;
        if is_application && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON)) {
            return Self::Json;
        }
        if is_application && mime.subtype() == mime::WWW_FORM_URLENCODED {
            return Self::UrlEncoded;
        }
        if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA {
            if let Ok(boundary) = multer::parse_boundary(content_type) {
                return Self::Multipart { boundary };
            }
        }
        Self::Other(content_type.to_string())
    }
}

/// Buffer the whole body, failing once it grows past `max_body_size`
pub async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, RequestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RequestError::PayloadTooLarge),
        Err(e) => Err(RequestError::Body(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    fn headers(content_type: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, content_type.parse().unwrap());
        h
    }

    #[test]
    fn test_body_kind() {
        assert_eq!(BodyKind::from_headers(&HeaderMap::new()), BodyKind::Unspecified);
        assert_eq!(BodyKind::from_headers(&headers("application/json")), BodyKind::Json);
        assert_eq!(
            BodyKind::from_headers(&headers("application/json; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::from_headers(&headers("application/problem+json")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::from_headers(&headers("application/x-www-form-urlencoded")),
            BodyKind::UrlEncoded
        );
        assert_eq!(
            BodyKind::from_headers(&headers("multipart/form-data; boundary=XyZ")),
            BodyKind::Multipart {
                boundary: "XyZ".to_string()
            }
        );
        assert_eq!(
            BodyKind::from_headers(&headers("text/plain")),
            BodyKind::Other("text/plain".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let bytes = read_body(Full::new(Bytes::from("hello")), 5).await.unwrap();
        assert_eq!(bytes, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_read_body_over_limit() {
        let err = read_body(Full::new(Bytes::from("hello!")), 5).await.unwrap_err();
        assert!(matches!(err, RequestError::PayloadTooLarge));
    }
}
