//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for route matching,
//! method validation, input decoding and CORS decoration.

use crate::config::AppState;
use crate::extract::{self, BodyKind, BoxError, FieldSet, RequestError};
use crate::handler::routes;
use crate::handler::types::{LoginForm, Person, UserQuery};
use crate::http::{self, cors};
use crate::logger::{self, AccessLogEntry};
use crate::storage::FileSink;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Version};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const GET_ONLY: &[Method] = &[Method::GET, Method::HEAD];
const POST_ONLY: &[Method] = &[Method::POST];

/// A registered route, borrowing its path parameter from the decoded path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Hello,
    GetAge(&'a str),
    AddUserQuery,
    AddUser,
    Login,
    UploadFile,
}

impl<'a> Route<'a> {
    fn resolve(path: &'a str) -> Option<Self> {
        match path {
            "/" => Some(Self::Hello),
            "/add_user_qp" => Some(Self::AddUserQuery),
            "/add_user" => Some(Self::AddUser),
            "/login/" => Some(Self::Login),
            "/upload_file" => Some(Self::UploadFile),
            _ => path
                .strip_prefix("/get_age/")
                .filter(|segment| !segment.is_empty() && !segment.contains('/'))
                .map(Self::GetAge),
        }
    }

    const fn methods(self) -> &'static [Method] {
        match self {
            Self::Hello | Self::GetAge(_) => GET_ONLY,
            Self::AddUserQuery | Self::AddUser | Self::Login | Self::UploadFile => POST_ONLY,
        }
    }

    const fn allow_header(self) -> &'static str {
        match self {
            Self::Hello | Self::GetAge(_) => "GET, HEAD",
            Self::AddUserQuery | Self::AddUser | Self::Login | Self::UploadFile => "POST",
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    // 1. Log headers if enabled
    logger::log_headers_count(parts.headers.len(), state.config.logging.show_headers);

    // 2. Preflight requests never reach a route
    let cors_req = cors::CorsRequest::from_headers(&parts.headers);
    let mut response = if cors_req.is_preflight(&parts.method) {
        cors::preflight_response(&cors_req, &state.config.cors)
    } else {
        let mut resp = dispatch(&parts, body, &state).await;
        cors::apply_simple_headers(&mut resp, &cors_req, &state.config.cors);
        resp
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    // 3. HEAD keeps the headers of the GET response only
    if parts.method == Method::HEAD {
        response = strip_body(response);
    }

    if state.access_log_enabled() {
        log_access(&parts, &response, peer_addr, started, &state);
    }

    Ok(response)
}

/// Route request and run the matching handler
async fn dispatch<B>(parts: &Parts, body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let path = decode_path(parts.uri.path());
    let Some(route) = Route::resolve(&path) else {
        return redirect_slashes(parts).unwrap_or_else(http::build_404_response);
    };

    if !route.methods().contains(&parts.method) {
        logger::log_warning(&format!("Method not allowed: {} {path}", parts.method));
        return http::build_405_response(route.allow_header());
    }

    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&parts.headers, max_body_size) {
        return resp;
    }

    let kind = BodyKind::from_headers(&parts.headers);
    let result = match route {
        Route::Hello => Ok(routes::hello()),
        Route::GetAge(raw) => extract::int_param("birth_year", raw).map(routes::get_age),
        Route::AddUserQuery => {
            let query = parts.uri.query().unwrap_or_default();
            let fields = FieldSet::from_urlencoded("query", false, query.as_bytes());
            UserQuery::from_fields(&fields).map(|q| routes::add_user_query(&q))
        }
        Route::AddUser => match extract::read_body(body, max_body_size).await {
            Ok(bytes) => extract::json_body::<Person>(&kind, &bytes).map(|p| routes::add_user(&p)),
            Err(e) => Err(e),
        },
        Route::Login => extract::form_fields(&kind, body, max_body_size)
            .await
            .and_then(|fields| LoginForm::from_fields(&fields))
            .map(routes::login),
        Route::UploadFile => {
            let sink = FileSink::new(&state.config.upload.dir);
            routes::upload_file(&kind, body, &sink, max_body_size).await
        }
    };

    result.unwrap_or_else(RequestError::into_response)
}

/// Percent-decode the request path; invalid UTF-8 becomes U+FFFD
fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// Redirect `/x/` to `/x` (and back) when only the other form is registered
///
/// The `Location` keeps the path exactly as the client encoded it.
fn redirect_slashes(parts: &Parts) -> Option<Response<Full<Bytes>>> {
    let path = parts.uri.path();
    if path == "/" {
        return None;
    }
    let alternate = match path.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => format!("{path}/"),
    };
    Route::resolve(&decode_path(&alternate))?;

    let location = match parts.uri.query() {
        Some(q) => format!("{alternate}?{q}"),
        None => alternate,
    };
    Some(http::build_redirect_response_with_code(
        &location,
        StatusCode::TEMPORARY_REDIRECT,
    ))
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn body_len(response: &Response<Full<Bytes>>) -> u64 {
    response.body().size_hint().exact().unwrap_or_default()
}

fn strip_body(response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let length = body_len(&response);
    let (mut head, _) = response.into_parts();
    head.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    Response::from_parts(head, Full::new(Bytes::new()))
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = match parts.version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = usize::try_from(body_len(response)).unwrap_or(usize::MAX);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}
