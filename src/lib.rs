//! # objrouter
//!
//! **objrouter** is a coroutine-powered object dispatch runtime. Every request
//! path names a domain object and one of its actions:
//!
//! ```text
//! /api/name/Users/alice/ChangePassword?oldPassword=...&newPassword=...
//!  │    │    │     │     └─ action
//!  │    │    └─────┴─ object segments  → name://Users/alice
//!  │    └─ scheme
//!  └─ url type (api | view)
//! ```
//!
//! The router resolves the address to an object (a system singleton, a
//! collection, or a persisted record in a document store), loads it, binds the
//! request arguments to the action's declared parameters and returns the
//! result as JSON. Failures come back as `{Type: "Error", Code, Message}`.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path parsing and the public-action naming policy
//! - **[`args`]** - Argument merging (cookies < query < body) and coercion
//! - **[`security`]** - Security tokens and the per-request security context
//! - **[`object`]** - System objects, collections and persisted records
//! - **[`store`]** - The document store contract with in-memory and SQLite backends
//! - **[`registry`]** - Per-type action tables and parameter declarations
//! - **[`dispatcher`]** - The request flow from path to result envelope
//! - **[`apis`]** - Built-in `SystemInfo`, `CollectionUsers` and `User` actions
//! - **[`server`]** - HTTP transport on `may_minihttp`
//! - **[`config`]**, **[`logging`]**, **[`runtime_config`]** - Startup configuration
//!
//! ## Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::AppService
//!     participant Disp as dispatcher::Dispatcher
//!     participant Sec as security::SecurityTokenManager
//!     participant Obj as object::DomainObject
//!     participant Store as store::DocumentStore
//!     participant Reg as registry::ActionRegistry
//!
//!     Client->>Server: GET /api/name/Users/alice/GetRole?st=...
//!     Server->>Disp: DispatchRequest (path + merged args)
//!     Disp->>Disp: router::parse_path
//!     Disp->>Sec: parse(st), renew if close to expiry
//!     Disp->>Obj: DomainObject::create("name://Users/alice")
//!     Obj->>Store: find col_Users {Path}
//!     Disp->>Reg: lookup("User", "GetRole")
//!     Reg-->>Disp: ActionEntry (declared params + handler)
//!     Disp->>Disp: bind args, invoke, normalize
//!     Disp-->>Server: DispatchResponse (status, body, cookies)
//!     Server-->>Client: JSON + Set-Cookie
//! ```
//!
//! ## Embedding
//!
//! ```rust
//! use objrouter::apis::MemoryLedger;
//! use objrouter::app::build_dispatcher;
//! use objrouter::args::RequestArgs;
//! use objrouter::config::AppConfig;
//! use objrouter::dispatcher::DispatchRequest;
//! use objrouter::store::MemoryStore;
//! use std::sync::Arc;
//!
//! let dispatcher = build_dispatcher(
//!     &AppConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryLedger::new()),
//! )
//! .unwrap();
//!
//! let mut args = RequestArgs::new();
//! args.insert("username", "alice".into());
//! args.insert("password", "hunter2".into());
//! let created = dispatcher.dispatch(&DispatchRequest::new(
//!     http::Method::POST,
//!     "/api/name/Users/CreateUser",
//!     args,
//! ));
//! assert_eq!(created.body["Path"], "name://Users/alice");
//! ```
//!
//! ## Runtime
//!
//! Requests run on `may` coroutines. Store calls and token checks are plain
//! function calls that may yield; there is no `async` in the crate. Set the
//! coroutine stack size with `OBJR_STACK_SIZE` (see [`runtime_config`]).

pub mod apis;
pub mod app;
pub mod args;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod object;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod store;

pub use error::DispatchError;
pub use ids::RequestId;
