#![allow(dead_code)]

use objrouter::apis::{MemoryLedger, SharedLedger};
use objrouter::app::build_dispatcher;
use objrouter::args::RequestArgs;
use objrouter::config::AppConfig;
use objrouter::dispatcher::{DispatchRequest, DispatchResponse, Dispatcher};
use objrouter::store::{MemoryStore, SharedStore};
use serde_json::Value;
use std::sync::Arc;

pub mod test_server {
    use objrouter::dispatcher::Dispatcher;
    use objrouter::server::{AppService, HttpServer, ServerHandle};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::{Arc, Once};
    use std::time::Duration;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Server that stops when dropped.
    pub struct TestServer {
        pub addr: SocketAddr,
        handle: Option<ServerHandle>,
    }

    impl TestServer {
        pub fn start(dispatcher: Dispatcher) -> Self {
            setup_may_runtime();
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let handle = HttpServer(AppService::new(Arc::new(dispatcher)))
                .start(addr)
                .unwrap();
            handle.wait_ready().unwrap();
            Self {
                addr,
                handle: Some(handle),
            }
        }

        pub fn send(&self, raw: &str) -> HttpReply {
            parse_response(&send_request(&self.addr, raw))
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();

        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&tmp[..n]);
                    if response_complete(&buf) {
                        break;
                    }
                }
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn response_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        head.lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .is_some_and(|len| body.len() >= len)
    }

    pub struct HttpReply {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: serde_json::Value,
    }

    impl HttpReply {
        /// Values of every `Set-Cookie` header.
        pub fn set_cookies(&self) -> Vec<&str> {
            self.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
                .map(|(_, v)| v.as_str())
                .collect()
        }
    }

    pub fn parse_response(resp: &str) -> HttpReply {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| {
                let (k, v) = l.split_once(':')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect();
        HttpReply {
            status,
            headers,
            body: serde_json::from_str(body).unwrap_or_default(),
        }
    }
}

/// Dispatcher over a fresh in-memory store with the built-in APIs.
pub fn memory_dispatcher(config: &AppConfig) -> (Dispatcher, SharedStore) {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let ledger: SharedLedger = Arc::new(MemoryLedger::new());
    let dispatcher = build_dispatcher(config, Arc::clone(&store), ledger).unwrap();
    (dispatcher, store)
}

/// Config with test tokens enabled.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.security.secret = "integration-secret".into();
    config.apis.issue_test_tokens = 1000;
    config
}

/// Call `path` with `(name, value)` arguments, as if sent in a query string.
pub fn call(d: &Dispatcher, path: &str, args: &[(&str, &str)]) -> DispatchResponse {
    let mut request_args = RequestArgs::new();
    for (k, v) in args {
        request_args.insert(*k, Value::String((*v).to_string()));
    }
    d.dispatch(&DispatchRequest::new(http::Method::GET, path, request_args))
}

/// `call` with a security token attached.
pub fn call_as(d: &Dispatcher, token: &str, path: &str, args: &[(&str, &str)]) -> DispatchResponse {
    let mut all: Vec<(&str, &str)> = args.to_vec();
    all.push(("st", token));
    call(d, path, &all)
}

/// Create `username` and log in, returning the session token.
pub fn signup(d: &Dispatcher, username: &str, password: &str) -> String {
    let created = call(
        d,
        "/api/name/Users/CreateUser",
        &[("username", username), ("password", password)],
    );
    assert_eq!(created.status, 200, "{:?}", created.body);
    let login = call(
        d,
        &format!("/api/name/Users/{username}/LoginPassword"),
        &[("password", password)],
    );
    assert_eq!(login.status, 200, "{:?}", login.body);
    login.body.as_str().unwrap().to_string()
}
