//! HTTP transport: `/health`, and every `/api/*` or `/view/*` request handed
//! to the [`Dispatcher`](crate::dispatcher::Dispatcher).

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_body, parse_cookies, parse_query_params, parse_request, ParsedRequest};
pub use response::write_json;
pub use service::{health_endpoint, AppService, DISPATCH_PREFIXES};
