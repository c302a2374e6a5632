use may_minihttp::Request;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Request data extracted from the raw HTTP request.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Headers with lower-cased names
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// Decoded JSON or form body
    pub body: Option<Value>,
    /// Set when the body was present but could not be decoded
    pub body_error: Option<String>,
}

impl ParsedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim();
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Query parameters of `path` (everything after `?`), URL-decoded.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Decode a body by content type.
///
/// `application/json` bodies are parsed as JSON and
/// `application/x-www-form-urlencoded` bodies become an object of strings.
/// Other content types carry no arguments.
pub fn parse_body(content_type: &str, raw: &[u8]) -> Result<Option<Value>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/json" => serde_json::from_slice(raw)
            .map(Some)
            .map_err(|e| format!("invalid JSON body: {e}")),
        "application/x-www-form-urlencoded" => {
            let form: Map<String, Value> = url::form_urlencoded::parse(raw)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            Ok(Some(Value::Object(form)))
        }
        _ => Ok(None),
    }
}

pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);

    let mut raw_body = Vec::new();
    let (body, body_error) = match req.body().read_to_end(&mut raw_body) {
        Ok(_) => {
            let content_type = headers.get("content-type").map_or("", String::as_str);
            match parse_body(content_type, &raw_body) {
                Ok(body) => (body, None),
                Err(e) => (None, Some(e)),
            }
        }
        Err(e) => (None, Some(format!("unreadable body: {e}"))),
    };

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        cookie_names = ?cookies.keys().collect::<Vec<_>>(),
        query_count = query_params.len(),
        body_bytes = raw_body.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
        body_error,
    }
}
