use crate::args::RequestArgs;
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::object::DomainObject;
use crate::registry::{ActionArgs, ActionContext, ActionRegistry};
use crate::router::{parse_path, ObjectAddress, UrlType};
use crate::security::{SecurityContext, SecurityTokenManager, UserRef, ROLE_PROPERTY};
use crate::store::SharedStore;
use http::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Default name of the security token argument and cookie.
pub const DEFAULT_TOKEN_COOKIE: &str = "st";

/// Suffix appended to the object type to find its view table.
pub const VIEW_SUFFIX: &str = "View";

/// A cookie the response must set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Render as a `Set-Cookie` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{}={}; Path=/; HttpOnly", self.name, self.value)
    }
}

/// One request as the dispatcher sees it: a path and merged arguments.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// URL path, e.g. `/api/name/Users/alice/GetRole`
    pub path: String,
    pub args: RequestArgs,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>, args: RequestArgs) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            args,
        }
    }
}

/// Outcome of a dispatch: the HTTP status, the JSON body and cookies to set.
///
/// On failure `body` is the error envelope `{Type:"Error", Code, Message}`.
/// Cookies (a renewed token, a login token) are attached either way.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: Value,
    pub cookies: Vec<SetCookie>,
}

impl DispatchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Resolves request paths to objects and runs their actions.
#[derive(Clone)]
pub struct Dispatcher {
    store: SharedStore,
    registry: Arc<ActionRegistry>,
    tokens: Arc<SecurityTokenManager>,
    token_cookie: String,
}

impl Dispatcher {
    pub fn new(
        store: SharedStore,
        registry: Arc<ActionRegistry>,
        tokens: Arc<SecurityTokenManager>,
    ) -> Self {
        info!(actions = registry.len(), "Dispatcher created");
        Self {
            store,
            registry,
            tokens,
            token_cookie: DEFAULT_TOKEN_COOKIE.to_string(),
        }
    }

    /// Override the name of the token argument/cookie.
    #[must_use]
    pub fn with_token_cookie(mut self, name: impl Into<String>) -> Self {
        self.token_cookie = name.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn tokens(&self) -> &SecurityTokenManager {
        &self.tokens
    }

    #[must_use]
    pub fn token_cookie(&self) -> &str {
        &self.token_cookie
    }

    /// Run one request to completion. Never fails: errors become envelopes.
    pub fn dispatch(&self, req: &DispatchRequest) -> DispatchResponse {
        let span = info_span!(
            "dispatch",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
        );
        let _guard = span.enter();
        let start = Instant::now();
        let mut cookies = Vec::new();

        match self.execute(req, &mut cookies) {
            Ok(body) => {
                info!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    cookies = cookies.len(),
                    "Request dispatched"
                );
                DispatchResponse {
                    status: 200,
                    body,
                    cookies,
                }
            }
            Err(err) => {
                warn!(
                    code = err.code(),
                    kind = err.kind(),
                    error = %err,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Dispatch failed"
                );
                DispatchResponse {
                    status: err.status(),
                    body: err.envelope(),
                    cookies,
                }
            }
        }
    }

    fn execute(
        &self,
        req: &DispatchRequest,
        cookies: &mut Vec<SetCookie>,
    ) -> Result<Value, DispatchError> {
        let address = parse_path(&req.path)?;
        if let UrlType::Other(other) = &address.url_type {
            return Err(DispatchError::InvalidArgument(format!(
                "unsupported url type '{other}'"
            )));
        }

        let mut security = self.authenticate(&req.args, cookies)?;

        let mut object = DomainObject::create(&address.collection_path, &self.store)?;
        object.ensure_loaded()?;

        match address.url_type {
            UrlType::View => self.render_view(&address, object, &mut security, &req.args, cookies),
            _ => self.invoke_api(&address, object, &mut security, &req.args, cookies),
        }
    }

    /// Read the token argument. Absent (or empty) means anonymous; present but
    /// invalid fails the request. The role is re-read from the user record, so
    /// a demotion takes effect on the next request. A token close to expiry is
    /// re-issued once, with the current role, and attached as a cookie.
    fn authenticate(
        &self,
        args: &RequestArgs,
        cookies: &mut Vec<SetCookie>,
    ) -> Result<SecurityContext, DispatchError> {
        let token = match args.get(&self.token_cookie) {
            None | Some(Value::Null) => return Ok(SecurityContext::anonymous()),
            Some(Value::String(s)) if s.is_empty() => return Ok(SecurityContext::anonymous()),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(DispatchError::InvalidCredential(
                    "security token".to_string(),
                ))
            }
        };

        let parsed = self.tokens.parse(token)?;
        let (user, backed) = match &parsed.user {
            Some(claimed) => {
                let (user, backed) = self.current_identity(claimed)?;
                (Some(user), backed)
            }
            None => (None, true),
        };
        // Identities without a record (service tokens) are never renewed.
        if backed && self.tokens.claim_renewal(&parsed) {
            let renewed = self.tokens.issue(user.as_ref())?;
            debug!(expires_at = parsed.expires_at, "Security token renewed");
            cookies.push(SetCookie::new(self.token_cookie.clone(), renewed));
        }
        Ok(SecurityContext { user })
    }

    /// Resolve the claimed identity against its record. The flag is `false`
    /// when no record backs the identity, in which case the claim is kept.
    pub(super) fn current_identity(
        &self,
        claimed: &UserRef,
    ) -> Result<(UserRef, bool), DispatchError> {
        let mut object = match DomainObject::create(&claimed.path, &self.store) {
            Ok(object) => object,
            Err(DispatchError::InvalidArgument(_) | DispatchError::ObjectNotFound(_)) => {
                return Ok((claimed.clone(), false))
            }
            Err(e) => return Err(e),
        };
        let Some(record) = object.as_persisted_mut() else {
            return Ok((claimed.clone(), false));
        };
        match record.load() {
            Ok(()) => {}
            Err(DispatchError::ObjectNotFound(_)) => return Ok((claimed.clone(), false)),
            Err(e) => return Err(e),
        }
        let role = record
            .get_property(ROLE_PROPERTY)
            .and_then(Value::as_str)
            .map(str::to_string);
        if role != claimed.role {
            info!(
                user = %claimed.path,
                claimed = ?claimed.role,
                current = ?role,
                "Token role differs from the user record"
            );
        }
        Ok((
            UserRef {
                path: claimed.path.clone(),
                role,
            },
            true,
        ))
    }

    fn invoke_api(
        &self,
        address: &ObjectAddress,
        mut object: DomainObject,
        security: &mut SecurityContext,
        args: &RequestArgs,
        cookies: &mut Vec<SetCookie>,
    ) -> Result<Value, DispatchError> {
        if address.is_describe() {
            return Ok(object.descriptor().to_value());
        }
        let owner = object.type_name().to_string();
        self.run_action(&owner, &address.action, &mut object, security, args, cookies)?
            .ok_or_else(|| {
                DispatchError::NotSupported(format!("{owner}.{}", address.action))
            })
    }

    fn render_view(
        &self,
        address: &ObjectAddress,
        mut object: DomainObject,
        security: &mut SecurityContext,
        args: &RequestArgs,
        cookies: &mut Vec<SetCookie>,
    ) -> Result<Value, DispatchError> {
        let owner = format!("{}{VIEW_SUFFIX}", object.type_name());
        match self.run_action(&owner, &address.action, &mut object, security, args, cookies)? {
            Some(value) => Ok(value),
            None if address.is_describe() => Ok(json!({
                "Path": object.path(),
                "Type": object.type_name(),
                "Model": {},
            })),
            None => Err(DispatchError::NotSupported(format!(
                "{owner}.{}",
                address.action
            ))),
        }
    }

    /// Look up, bind and invoke `owner.action`. `Ok(None)` when no such action
    /// is registered.
    fn run_action(
        &self,
        owner: &str,
        action: &str,
        object: &mut DomainObject,
        security: &mut SecurityContext,
        args: &RequestArgs,
        cookies: &mut Vec<SetCookie>,
    ) -> Result<Option<Value>, DispatchError> {
        let Some(entry) = self.registry.lookup(owner, action) else {
            return Ok(None);
        };
        let bound = match entry.params() {
            Some(names) => ActionArgs::from_bound(names.to_vec(), args.bind_all(names)),
            None => ActionArgs::empty(),
        };
        debug!(owner, action, args = bound.len(), "Invoking action");

        let mut ctx = ActionContext {
            object,
            security,
            tokens: &self.tokens,
            store: &self.store,
            cookies,
            token_cookie: &self.token_cookie,
        };
        let result = entry.invoke(&mut ctx, bound)?;
        Ok(Some(result.into_value()))
    }
}
