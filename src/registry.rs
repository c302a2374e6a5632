//! Action registry: which actions each object type exposes, their declared
//! parameter order, and the handler that runs them.
//!
//! Tables are keyed by owner type name (`User`, `CollectionUsers`,
//! `SystemInfo`, or `<Type>View` for view tables) and then by action name.
//! The registry is filled once at startup and read-only afterwards.
//!
//! ```rust
//! use objrouter::registry::{ActionRegistry, ActionResult};
//! use serde_json::json;
//!
//! let mut registry = ActionRegistry::new();
//! registry
//!     .register("SystemInfo", "Echo", &["message"], |_ctx, args| {
//!         Ok(ActionResult::from(args.value(0).cloned().unwrap_or(json!(null))))
//!     })
//!     .unwrap();
//! assert_eq!(registry.parameters("SystemInfo", "Echo").unwrap(), ["message"]);
//! ```

use crate::args::BoundArg;
use crate::dispatcher::SetCookie;
use crate::error::DispatchError;
use crate::object::{CollectionObject, DomainObject, ObjectRef, PersistedObject};
use crate::router::validate_action_name;
use crate::security::{SecurityContext, SecurityTokenManager};
use crate::store::SharedStore;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Handler signature shared by every registered action.
pub type ActionFn =
    dyn Fn(&mut ActionContext<'_>, ActionArgs) -> Result<ActionResult, DispatchError> + Send + Sync;

/// Everything an action may touch while it runs.
pub struct ActionContext<'a> {
    /// The resolved (and, for records, loaded) object
    pub object: &'a mut DomainObject,
    pub security: &'a mut SecurityContext,
    pub tokens: &'a SecurityTokenManager,
    pub store: &'a SharedStore,
    pub(crate) cookies: &'a mut Vec<SetCookie>,
    pub(crate) token_cookie: &'a str,
}

impl ActionContext<'_> {
    /// The object as a persisted record, or `NotSupported`.
    pub fn persisted(&mut self) -> Result<&mut PersistedObject, DispatchError> {
        let path = self.object.path().to_string();
        self.object
            .as_persisted_mut()
            .ok_or(DispatchError::NotSupported(path))
    }

    /// The object as a collection, or `NotSupported`.
    pub fn collection(&self) -> Result<&CollectionObject, DispatchError> {
        self.object
            .as_collection()
            .ok_or_else(|| DispatchError::NotSupported(self.object.path().to_string()))
    }

    /// Attach a cookie to the response.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.push(SetCookie::new(name, value));
    }

    /// Attach a security token to the response under the configured cookie name.
    pub fn set_token_cookie(&mut self, token: impl Into<String>) {
        let name = self.token_cookie.to_string();
        self.set_cookie(name, token);
    }
}

/// Positional arguments bound from the request in declaration order.
///
/// Missing request arguments bind as `Null` and read back as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArgs {
    names: Vec<String>,
    values: Vec<Value>,
    /// Request text of each argument that arrived as a string
    raw: Vec<Option<String>>,
}

impl ActionArgs {
    #[must_use]
    pub fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            names,
            values,
            raw: Vec::new(),
        }
    }

    /// Arguments bound from a request, keeping each one's request text.
    #[must_use]
    pub fn from_bound(names: Vec<String>, bound: Vec<BoundArg>) -> Self {
        let (values, raw) = bound.into_iter().map(|b| (b.value, b.raw)).unzip();
        Self { names, values, raw }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}"))
    }

    /// Argument at `index`, treating `Null` as absent.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    /// Argument as text. An argument sent as a string comes back exactly as
    /// sent, whatever it coerced to; numbers and booleans from a JSON body use
    /// their JSON text.
    pub fn text(&self, index: usize) -> Result<String, DispatchError> {
        if let Some(Some(raw)) = self.raw.get(index) {
            return Ok(raw.clone());
        }
        match self.value(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            _ => Err(DispatchError::InvalidArgument(self.name(index))),
        }
    }

    /// Integer argument, or `default` when absent.
    pub fn i64_or(&self, index: usize, default: i64) -> Result<i64, DispatchError> {
        match self.value(index) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| DispatchError::InvalidArgument(self.name(index))),
        }
    }

    /// Object argument, or an empty map when absent.
    pub fn object_or_empty(&self, index: usize) -> Result<Map<String, Value>, DispatchError> {
        match self.value(index) {
            None => Ok(Map::new()),
            Some(Value::Object(m)) => Ok(m.clone()),
            Some(_) => Err(DispatchError::InvalidArgument(self.name(index))),
        }
    }
}

/// Raw result of an action before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Value(Value),
    /// A domain object; normalized to its `{Type, Path}` descriptor
    Object(ObjectRef),
}

impl ActionResult {
    /// Result with no payload.
    #[must_use]
    pub fn none() -> Self {
        ActionResult::Value(Value::Null)
    }

    /// Normalize into the success envelope value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            ActionResult::Value(v) => v,
            ActionResult::Object(r) => r.to_value(),
        }
    }
}

impl From<Value> for ActionResult {
    fn from(v: Value) -> Self {
        ActionResult::Value(v)
    }
}

impl From<ObjectRef> for ActionResult {
    fn from(r: ObjectRef) -> Self {
        ActionResult::Object(r)
    }
}

impl From<&DomainObject> for ActionResult {
    fn from(o: &DomainObject) -> Self {
        ActionResult::Object(o.descriptor())
    }
}

/// A registered action.
#[derive(Clone)]
pub struct ActionEntry {
    params: Option<Arc<[String]>>,
    handler: Arc<ActionFn>,
}

impl ActionEntry {
    /// Declared parameter order; `None` means "invoke with no arguments".
    #[must_use]
    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    pub fn invoke(
        &self,
        ctx: &mut ActionContext<'_>,
        args: ActionArgs,
    ) -> Result<ActionResult, DispatchError> {
        (self.handler)(ctx, args)
    }
}

/// Per-type action tables.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    tables: HashMap<String, HashMap<String, ActionEntry>>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action with a declared parameter order.
    ///
    /// Re-registering an existing action replaces it.
    pub fn register<F>(
        &mut self,
        owner: &str,
        action: &str,
        params: &[&str],
        handler: F,
    ) -> Result<(), DispatchError>
    where
        F: Fn(&mut ActionContext<'_>, ActionArgs) -> Result<ActionResult, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        let params: Vec<String> = params.iter().map(|p| (*p).to_string()).collect();
        self.insert(owner, action, Some(params.into()), Arc::new(handler))
    }

    /// Register an action without a parameter declaration. It is always
    /// invoked with zero arguments.
    pub fn register_bare<F>(&mut self, owner: &str, action: &str, handler: F) -> Result<(), DispatchError>
    where
        F: Fn(&mut ActionContext<'_>, ActionArgs) -> Result<ActionResult, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(owner, action, None, Arc::new(handler))
    }

    /// Register the model handler of a view table (`<Type>View`). It answers
    /// view requests that name no action.
    pub fn register_view_model<F>(&mut self, view_owner: &str, handler: F)
    where
        F: Fn(&mut ActionContext<'_>, ActionArgs) -> Result<ActionResult, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        self.tables.entry(view_owner.to_string()).or_default().insert(
            String::new(),
            ActionEntry {
                params: None,
                handler: Arc::new(handler),
            },
        );
    }

    fn insert(
        &mut self,
        owner: &str,
        action: &str,
        params: Option<Arc<[String]>>,
        handler: Arc<ActionFn>,
    ) -> Result<(), DispatchError> {
        if action.is_empty() {
            return Err(DispatchError::InvalidArgument(format!(
                "{owner}: action name is empty"
            )));
        }
        validate_action_name(action)?;
        debug!(owner, action, declared = params.is_some(), "Action registered");
        self.tables
            .entry(owner.to_string())
            .or_default()
            .insert(action.to_string(), ActionEntry { params, handler });
        Ok(())
    }

    /// Find the action `action` on type `owner`.
    #[must_use]
    pub fn lookup(&self, owner: &str, action: &str) -> Option<&ActionEntry> {
        self.tables.get(owner)?.get(action)
    }

    /// Declared parameter order of `(owner, action)`, if any.
    #[must_use]
    pub fn parameters(&self, owner: &str, action: &str) -> Option<&[String]> {
        self.lookup(owner, action)?.params()
    }

    /// Public action names of `owner`, sorted.
    #[must_use]
    pub fn actions(&self, owner: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .get(owner)
            .map(|t| t.keys().map(String::as_str).filter(|n| !n.is_empty()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Total number of registered actions, view models included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
