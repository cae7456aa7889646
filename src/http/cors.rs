//! Cross-origin resource sharing
//!
//! Answers preflight requests and decorates every other response that carries
//! an `Origin` header, according to [`CorsConfig`].

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS as ALLOW_CREDENTIALS,
    ACCESS_CONTROL_ALLOW_HEADERS as ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS as ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN as ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE as MAX_AGE,
};
use hyper::{Method, Response, StatusCode};

use super::response::build_text_response;
use crate::config::CorsConfig;

/// Methods advertised when every method is allowed
const ALL_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";

/// Request headers that are always acceptable in a preflight
const SAFELISTED_HEADERS: [&str; 4] = ["accept", "accept-language", "content-language", "content-type"];

/// The CORS-relevant parts of a request, captured before its body is consumed
#[derive(Debug, Default, Clone)]
pub struct CorsRequest {
    pub origin: Option<String>,
    pub has_cookie: bool,
    pub request_method: Option<String>,
    pub request_headers: Option<String>,
}

impl CorsRequest {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            origin: get("origin"),
            has_cookie: headers.contains_key(hyper::header::COOKIE),
            request_method: get("access-control-request-method"),
            request_headers: get("access-control-request-headers"),
        }
    }

    pub fn is_preflight(&self, method: &Method) -> bool {
        *method == Method::OPTIONS && self.origin.is_some() && self.request_method.is_some()
    }
}

fn is_allowed_origin(cfg: &CorsConfig, origin: &str) -> bool {
    cfg.allows_all_origins() || cfg.allow_origins.iter().any(|o| o == origin)
}

fn is_allowed_method(cfg: &CorsConfig, method: &str) -> bool {
    if cfg.allows_all_methods() {
        return ALL_METHODS.split(", ").any(|m| m == method);
    }
    cfg.allow_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
}

fn is_allowed_header(cfg: &CorsConfig, header: &str) -> bool {
    SAFELISTED_HEADERS.contains(&header)
        || cfg.allow_headers.iter().any(|h| h.eq_ignore_ascii_case(header))
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(name, v);
    }
}

fn append_vary_origin(headers: &mut HeaderMap) {
    headers.append(hyper::header::VARY, HeaderValue::from_static("Origin"));
}

/// Build the response to a preflight request
pub fn preflight_response(req: &CorsRequest, cfg: &CorsConfig) -> Response<Full<Bytes>> {
    let origin = req.origin.as_deref().unwrap_or_default();
    let requested_method = req.request_method.as_deref().unwrap_or_default();
    let explicit_origin = !cfg.allows_all_origins() || cfg.allow_credentials;

    let mut headers = HeaderMap::new();
    let mut failures = Vec::new();

    if is_allowed_origin(cfg, origin) {
        if explicit_origin {
            insert(&mut headers, ALLOW_ORIGIN, origin);
        } else {
            insert(&mut headers, ALLOW_ORIGIN, "*");
        }
    } else {
        failures.push("origin");
    }
    if explicit_origin {
        append_vary_origin(&mut headers);
    }

    if !is_allowed_method(cfg, requested_method) {
        failures.push("method");
    }
    if cfg.allows_all_methods() {
        insert(&mut headers, ALLOW_METHODS, ALL_METHODS);
    } else {
        insert(&mut headers, ALLOW_METHODS, &cfg.allow_methods.join(", "));
    }

    if cfg.allows_all_headers() {
        if let Some(requested) = &req.request_headers {
            insert(&mut headers, ALLOW_HEADERS, requested);
        }
    } else {
        let mut allowed: Vec<String> = SAFELISTED_HEADERS
            .iter()
            .map(ToString::to_string)
            .chain(cfg.allow_headers.iter().map(|h| h.to_ascii_lowercase()))
            .collect();
        allowed.sort();
        allowed.dedup();
        insert(&mut headers, ALLOW_HEADERS, &allowed.join(", "));

        if let Some(requested) = &req.request_headers {
            let all_allowed = requested
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .all(|h| is_allowed_header(cfg, &h));
            if !all_allowed {
                failures.push("headers");
            }
        }
    }

    insert(&mut headers, MAX_AGE, &cfg.max_age.to_string());
    if cfg.allow_credentials {
        insert(&mut headers, ALLOW_CREDENTIALS, "true");
    }

    let mut resp = if failures.is_empty() {
        build_text_response(StatusCode::OK, "OK")
    } else {
        build_text_response(
            StatusCode::BAD_REQUEST,
            format!("Disallowed CORS {}", failures.join(", ")),
        )
    };
    resp.headers_mut().extend(headers);
    resp
}

/// Add CORS headers to a regular (non-preflight) response
pub fn apply_simple_headers<B>(resp: &mut Response<B>, req: &CorsRequest, cfg: &CorsConfig) {
    let Some(origin) = req.origin.as_deref() else {
        return;
    };
    let headers = resp.headers_mut();

    if cfg.allows_all_origins() {
        if req.has_cookie {
            // Credentialed requests may not be answered with a wildcard
            insert(headers, ALLOW_ORIGIN, origin);
            append_vary_origin(headers);
        } else {
            insert(headers, ALLOW_ORIGIN, "*");
        }
    } else if is_allowed_origin(cfg, origin) {
        insert(headers, ALLOW_ORIGIN, origin);
        append_vary_origin(headers);
    }

    if cfg.allow_credentials {
        insert(headers, ALLOW_CREDENTIALS, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive() -> CorsConfig {
        CorsConfig {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
            allow_credentials: true,
            max_age: 600,
        }
    }

    fn restricted() -> CorsConfig {
        CorsConfig {
            allow_origins: vec!["https://app.example".to_string()],
            allow_methods: vec!["GET".to_string(), "POST".to_string()],
            allow_headers: vec!["X-Token".to_string()],
            allow_credentials: false,
            max_age: 60,
        }
    }

    fn preflight(origin: &str, method: &str, headers: Option<&str>) -> CorsRequest {
        CorsRequest {
            origin: Some(origin.to_string()),
            has_cookie: false,
            request_method: Some(method.to_string()),
            request_headers: headers.map(ToString::to_string),
        }
    }

    #[test]
    fn test_preflight_detection() {
        let req = preflight("https://a.example", "POST", None);
        assert!(req.is_preflight(&Method::OPTIONS));
        assert!(!req.is_preflight(&Method::POST));
        assert!(!CorsRequest::default().is_preflight(&Method::OPTIONS));
    }

    #[test]
    fn test_permissive_preflight_echoes_origin_and_headers() {
        let req = preflight("https://a.example", "POST", Some("X-Custom, Content-Type"));
        let resp = preflight_response(&req, &permissive());
        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h["access-control-allow-origin"], "https://a.example");
        assert_eq!(h["access-control-allow-methods"], ALL_METHODS);
        assert_eq!(h["access-control-allow-headers"], "X-Custom, Content-Type");
        assert_eq!(h["access-control-allow-credentials"], "true");
        assert_eq!(h["access-control-max-age"], "600");
        assert_eq!(h["vary"], "Origin");
    }

    #[test]
    fn test_restricted_preflight_failures() {
        let req = preflight("https://evil.example", "DELETE", Some("X-Other"));
        let resp = preflight_response(&req, &restricted());
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!resp.headers().contains_key("access-control-allow-origin"));
    }

    #[test]
    fn test_restricted_preflight_allowed() {
        let req = preflight("https://app.example", "POST", Some("x-token, content-type"));
        let resp = preflight_response(&req, &restricted());
        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h["access-control-allow-origin"], "https://app.example");
        assert_eq!(h["access-control-allow-methods"], "GET, POST");
        assert_eq!(
            h["access-control-allow-headers"],
            "accept, accept-language, content-language, content-type, x-token"
        );
        assert!(!h.contains_key("access-control-allow-credentials"));
    }

    #[test]
    fn test_simple_headers_wildcard() {
        let req = CorsRequest {
            origin: Some("https://a.example".to_string()),
            ..CorsRequest::default()
        };
        let mut resp = Response::new(());
        apply_simple_headers(&mut resp, &req, &permissive());
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(resp.headers()["access-control-allow-credentials"], "true");
    }

    #[test]
    fn test_simple_headers_with_cookie_echo_origin() {
        let req = CorsRequest {
            origin: Some("https://a.example".to_string()),
            has_cookie: true,
            ..CorsRequest::default()
        };
        let mut resp = Response::new(());
        apply_simple_headers(&mut resp, &req, &permissive());
        assert_eq!(resp.headers()["access-control-allow-origin"], "https://a.example");
        assert_eq!(resp.headers()["vary"], "Origin");
    }

    #[test]
    fn test_no_origin_untouched() {
        let mut resp = Response::new(());
        apply_simple_headers(&mut resp, &CorsRequest::default(), &permissive());
        assert!(resp.headers().is_empty());
    }
}
