//! Form bodies, URL-encoded or multipart.

use hyper::body::{Body, Bytes};

use super::errors::RequestError;
use super::fields::FieldSet;
use super::multipart::multipart_reader;
use super::{read_body, BodyKind, BoxError};

/// Collect the text fields of a form body
///
/// Bodies in any other encoding yield an empty set, so every required field
/// is then reported as missing. File parts of a multipart form are skipped.
pub async fn form_fields<B>(
    kind: &BodyKind,
    body: B,
    max_body_size: u64,
) -> Result<FieldSet, RequestError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    match kind {
        BodyKind::UrlEncoded => {
            let bytes = read_body(body, max_body_size).await?;
            Ok(FieldSet::from_urlencoded("body", true, &bytes))
        }
        BodyKind::Multipart { boundary } => {
            let mut fields = FieldSet::new("body", true);
            let mut multipart = multipart_reader(body, boundary, max_body_size);
            while let Some(field) = multipart.next_field().await? {
                if field.file_name().is_some() {
                    continue;
                }
                let Some(name) = field.name().map(ToString::to_string) else {
                    continue;
                };
                fields.push(name, field.text().await?);
            }
            Ok(fields)
        }
        BodyKind::Json | BodyKind::Unspecified | BodyKind::Other(_) => {
            Ok(FieldSet::new("body", true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_urlencoded_form() {
        let body = Full::new(Bytes::from("username=ada&password=s3cret%21"));
        let fields = form_fields(&BodyKind::UrlEncoded, body, 1024).await.unwrap();
        assert_eq!(fields.get("username"), Some("ada"));
        assert_eq!(fields.get("password"), Some("s3cret!"));
    }

    #[tokio::test]
    async fn test_multipart_form() {
        let raw = "--B\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nada\r\n\
                   --B\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n\r\nPNG\r\n\
                   --B\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\npw\r\n--B--\r\n";
        let kind = BodyKind::Multipart {
            boundary: "B".to_string(),
        };
        let fields = form_fields(&kind, Full::new(Bytes::from(raw)), 1024).await.unwrap();
        assert_eq!(fields.get("username"), Some("ada"));
        assert_eq!(fields.get("password"), Some("pw"));
        assert_eq!(fields.get("avatar"), None);
    }

    #[tokio::test]
    async fn test_json_body_has_no_form_fields() {
        let body = Full::new(Bytes::from(r#"{"username":"ada"}"#));
        let fields = form_fields(&BodyKind::Json, body, 1024).await.unwrap();
        assert_eq!(fields.get("username"), None);
    }
}
