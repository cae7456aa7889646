//! `multipart/form-data` bodies.

use hyper::body::{Body, Bytes};
use http_body_util::BodyExt;
use multer::{Constraints, Field, Multipart, SizeLimit};

use super::errors::{RequestError, ValidationError};
use super::BoxError;

/// Start reading a multipart body, capped at `max_body_size` bytes
pub fn multipart_reader<B>(body: B, boundary: &str, max_body_size: u64) -> Multipart<'static>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(max_body_size));
    Multipart::with_constraints(body.into_data_stream(), boundary, constraints)
}

impl From<multer::Error> for RequestError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
                Self::PayloadTooLarge
            }
            multer::Error::StreamReadFailed(source) => Self::Body(source),
            other => Self::Body(Box::new(other)),
        }
    }
}

/// Advance to the part called `name`, which must carry a filename
///
/// Parts before it are skipped.
pub async fn file_field(
    multipart: &mut Multipart<'static>,
    name: &str,
) -> Result<Field<'static>, RequestError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        if field.file_name().is_none() {
            return Err(ValidationError::new(
                vec!["body".into(), name.into()],
                "Expected UploadFile, received: <class 'str'>",
                "value_error",
            )
            .into());
        }
        return Ok(field);
    }
    Err(ValidationError::missing("body", name).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::errors::Loc;
    use http_body_util::Full;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn body(parts: &[(&str, Option<&str>, &str)]) -> Full<Bytes> {
        let mut out = String::new();
        for (name, filename, content) in parts {
            out.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )),
                None => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            out.push_str(content);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        Full::new(Bytes::from(out))
    }

    #[tokio::test]
    async fn test_finds_file_part_after_text_parts() {
        let body = body(&[("note", None, "hi"), ("uploaded_file", Some("a.txt"), "payload")]);
        let mut mp = multipart_reader(body, BOUNDARY, 1024);
        let field = file_field(&mut mp, "uploaded_file").await.unwrap();
        assert_eq!(field.file_name(), Some("a.txt"));
        assert_eq!(field.text().await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let body = body(&[("other", Some("b.txt"), "x")]);
        let mut mp = multipart_reader(body, BOUNDARY, 1024);
        let Err(RequestError::Validation(errors)) = file_field(&mut mp, "uploaded_file").await else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.errors()[0].loc,
            vec![Loc::from("body"), Loc::from("uploaded_file")]
        );
    }

    #[tokio::test]
    async fn test_part_without_filename() {
        let body = body(&[("uploaded_file", None, "just text")]);
        let mut mp = multipart_reader(body, BOUNDARY, 1024);
        let Err(RequestError::Validation(errors)) = file_field(&mut mp, "uploaded_file").await else {
            panic!("expected validation error");
        };
        assert!(errors.errors()[0].msg.starts_with("Expected UploadFile"));
    }

    #[tokio::test]
    async fn test_stream_limit() {
        let body = body(&[("uploaded_file", Some("big.bin"), &"z".repeat(4096))]);
        let mut mp = multipart_reader(body, BOUNDARY, 256);
        let result = async {
            let mut field = file_field(&mut mp, "uploaded_file").await?;
            while field.chunk().await?.is_some() {}
            Ok::<_, RequestError>(())
        }
        .await;
        assert!(matches!(result, Err(RequestError::PayloadTooLarge)));
    }
}
