//! # Dispatcher Module
//!
//! Turns a request path plus merged arguments into one action invocation.
//!
//! ## Request Flow
//!
//! 1. Parse the path into url type, object address and action name
//! 2. Read the security token argument (`st` by default), take the role from
//!    the user record, and renew the token once when close to expiry
//! 3. Build the addressed object and load its record
//! 4. Describe requests (no action) return `{Type, Path}`
//! 5. Otherwise look the action up on the object's type, bind arguments in
//!    declared order and invoke it
//! 6. Normalize the result: objects become `{Type, Path}`, values pass through
//!
//! View requests (`/view/...`) run the same flow against the `<Type>View`
//! table. A view request without an action renders the registered model, or
//! `{Path, Type, Model: {}}` when none is registered.
//!
//! ## Error Handling
//!
//! Every failure is a [`DispatchError`](crate::error::DispatchError) and is
//! rendered as `{Type: "Error", Code, Message}` with a status picked per error
//! kind. Cookies collected before the failure are still returned.
//!
//! ```rust
//! use objrouter::args::RequestArgs;
//! use objrouter::dispatcher::{DispatchRequest, Dispatcher};
//! use objrouter::registry::ActionRegistry;
//! use objrouter::security::SecurityTokenManager;
//! use objrouter::store::MemoryStore;
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ActionRegistry::new()),
//!     Arc::new(SecurityTokenManager::new("secret")),
//! );
//! let req = DispatchRequest::new(http::Method::GET, "/api/name/Users/", RequestArgs::new());
//! let resp = dispatcher.dispatch(&req);
//! assert_eq!(resp.body["Type"], "CollectionUsers");
//! ```

mod core;

pub use core::{
    DispatchRequest, DispatchResponse, Dispatcher, SetCookie, DEFAULT_TOKEN_COOKIE, VIEW_SUFFIX,
};
