use super::request::{parse_request, ParsedRequest};
use super::response::write_json;
use crate::args::RequestArgs;
use crate::dispatcher::{DispatchRequest, Dispatcher};
use crate::error::{error_envelope, GENERIC_ERROR_CODE};
use crate::ids::RequestId;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Path prefixes handed to the dispatcher.
pub const DISPATCH_PREFIXES: [&str; 2] = ["/api/", "/view/"];

/// HTTP front of the dispatcher.
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Build the dispatcher request for a parsed HTTP request.
    #[must_use]
    pub fn dispatch_request(parsed: &ParsedRequest) -> DispatchRequest {
        let method = Method::from_bytes(parsed.method.as_bytes()).unwrap_or(Method::GET);
        DispatchRequest {
            request_id: RequestId::from_header_or_new(parsed.header("x-request-id")),
            method,
            path: parsed.path.clone(),
            args: RequestArgs::merge(&parsed.cookies, &parsed.query_params, parsed.body.as_ref()),
        }
    }
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    write_json(res, 200, &json!({ "status": "ok" }), &[]);
    Ok(())
}

fn is_dispatch_path(path: &str) -> bool {
    DISPATCH_PREFIXES.iter().any(|p| path.starts_with(p))
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);

        if parsed.method == "GET" && parsed.path == "/health" {
            return health_endpoint(res);
        }

        if !is_dispatch_path(&parsed.path) {
            debug!(method = %parsed.method, path = %parsed.path, "No route");
            write_json(res, 404, &error_envelope(GENERIC_ERROR_CODE, "Not Found"), &[]);
            return Ok(());
        }

        if let Some(reason) = &parsed.body_error {
            warn!(path = %parsed.path, reason = %reason, "Rejected request body");
            write_json(res, 400, &error_envelope(GENERIC_ERROR_CODE, reason), &[]);
            return Ok(());
        }

        let request = Self::dispatch_request(&parsed);
        let response = self.dispatcher.dispatch(&request);
        write_json(res, response.status, &response.body, &response.cookies);
        Ok(())
    }
}
