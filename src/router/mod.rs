//! # Router Module
//!
//! The router turns a request path into an [`ObjectAddress`]: which surface was
//! addressed (`api` or `view`), which object, and which action on it.
//!
//! ## Path Shape
//!
//! ```text
//! /api/name/Users/u1/GetUserName
//!  │   │    └──┬───┘ └────┬────┘
//!  │   │       │          └── action (last segment, may be empty)
//!  │   │       └── interior segments
//!  │   └── scheme
//!  └── url type
//! ```
//!
//! The object address is rebuilt as `scheme + "://" + segments.join("/")`, so the
//! example above resolves to `name://Users/u1`.
//!
//! ## Action Naming Policy
//!
//! Only public actions are reachable: names starting with `__` or with a
//! lower-case character are rejected before any object is resolved. An empty
//! action (a trailing `/`) asks for the object's identity.
//!
//! ## Example
//!
//! ```rust
//! use objrouter::router::{parse_path, UrlType};
//!
//! let address = parse_path("/api/name/Users/u1/GetUserName").unwrap();
//! assert_eq!(address.url_type, UrlType::Api);
//! assert_eq!(address.collection_path, "name://Users/u1");
//! assert_eq!(address.action, "GetUserName");
//! ```

mod core;

pub use core::{
    parse_path, validate_action_name, ObjectAddress, UrlType, MIN_PATH_COMPONENTS,
    PRIVATE_ACTION_PREFIX, SEPARATOR,
};
