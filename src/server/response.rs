use crate::dispatcher::SetCookie;
use may_minihttp::Response;
use serde_json::Value;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "OK",
    }
}

/// Write a JSON response and its `Set-Cookie` headers.
pub fn write_json(res: &mut Response, status: u16, body: &Value, cookies: &[SetCookie]) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    for cookie in cookies {
        // may_minihttp only takes 'static header lines, so each line is leaked.
        // Cookies are only set for freshly issued tokens (login, or the single
        // renewal a token gets), never once per request.
        let line = format!("Set-Cookie: {}", cookie.header_value()).into_boxed_str();
        res.header(Box::leak(line));
    }
    res.body_vec(body.to_string().into_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(501), "Not Implemented");
    }
}
