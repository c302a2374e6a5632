//! # Object Module
//!
//! Domain objects addressed by URI. Three variants exist, chosen by the shape of
//! the address:
//!
//! | Address                  | Variant              | Type name             |
//! |--------------------------|----------------------|-----------------------|
//! | `system://Info`          | [`SystemObject`]     | `SystemInfo`          |
//! | `name://Users`           | [`CollectionObject`] | `CollectionUsers`     |
//! | `name://Users/alice`     | [`PersistedObject`]  | record `Type` (`User`)|
//!
//! Any other scheme is rejected with `InvalidArgument`.
//!
//! Objects are owned by the request that created them; nothing is cached
//! between requests. Persisted objects start unloaded and read their record
//! on [`DomainObject::load`].

use crate::error::DispatchError;
use crate::store::SharedStore;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

mod collection;
mod persisted;
mod system;

pub use collection::{CollectionObject, PersistedRecord, DEFAULT_PAGE_LIMIT};
pub use persisted::PersistedObject;
pub use system::SystemObject;

/// Scheme prefix of system objects.
pub const SYSTEM_SCHEME: &str = "system://";
/// Scheme prefix of collections and persisted records.
pub const NAME_SCHEME: &str = "name://";
/// Prefix of the store collection backing a named collection.
pub const COLLECTION_PREFIX: &str = "col_";

/// Property map of a persisted record.
pub type Properties = Map<String, Value>;

/// Identity descriptor `{Type, Path}` returned for objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Path")]
    pub path: String,
}

impl ObjectRef {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("Type".into(), Value::String(self.type_name.clone()));
        map.insert("Path".into(), Value::String(self.path.clone()));
        Value::Object(map)
    }
}

/// A resolved domain object.
#[derive(Debug, Clone)]
pub enum DomainObject {
    System(SystemObject),
    Collection(CollectionObject),
    Persisted(PersistedObject),
}

impl DomainObject {
    /// Pick and build the variant matching `path`.
    ///
    /// Persisted objects come back unloaded.
    pub fn create(path: &str, store: &SharedStore) -> Result<Self, DispatchError> {
        if let Some(rest) = path.strip_prefix(SYSTEM_SCHEME) {
            if rest.contains('/') {
                return Err(DispatchError::InvalidArgument(format!("path: '{path}'")));
            }
            Ok(DomainObject::System(SystemObject::new(path)?))
        } else if let Some(rest) = path.strip_prefix(NAME_SCHEME) {
            if rest.contains('/') {
                Ok(DomainObject::Persisted(PersistedObject::new(
                    path,
                    Arc::clone(store),
                )?))
            } else {
                Ok(DomainObject::Collection(CollectionObject::new(
                    path,
                    Arc::clone(store),
                )?))
            }
        } else {
            Err(DispatchError::InvalidArgument(format!(
                "path: unsupported scheme in '{path}'"
            )))
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            DomainObject::System(o) => o.path(),
            DomainObject::Collection(o) => o.path(),
            DomainObject::Persisted(o) => o.path(),
        }
    }

    /// Concrete type name; empty for a persisted object that is not loaded yet.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            DomainObject::System(o) => o.type_name(),
            DomainObject::Collection(o) => o.type_name(),
            DomainObject::Persisted(o) => o.type_name().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> ObjectRef {
        ObjectRef {
            type_name: self.type_name().to_string(),
            path: self.path().to_string(),
        }
    }

    /// Load the backing record. A no-op for system and collection objects.
    pub fn load(&mut self) -> Result<(), DispatchError> {
        match self {
            DomainObject::Persisted(o) => o.load(),
            _ => Ok(()),
        }
    }

    /// Load only if this is a persisted object that has not been loaded yet.
    pub fn ensure_loaded(&mut self) -> Result<(), DispatchError> {
        match self {
            DomainObject::Persisted(o) if !o.is_loaded() => o.load(),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn as_persisted(&self) -> Option<&PersistedObject> {
        match self {
            DomainObject::Persisted(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_persisted_mut(&mut self) -> Option<&mut PersistedObject> {
        match self {
            DomainObject::Persisted(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_collection(&self) -> Option<&CollectionObject> {
        match self {
            DomainObject::Collection(o) => Some(o),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_factory_picks_variant() {
        let s = store();
        let sys = DomainObject::create("system://Info", &s).unwrap();
        assert!(matches!(sys, DomainObject::System(_)));
        assert_eq!(sys.type_name(), "SystemInfo");

        let col = DomainObject::create("name://Users", &s).unwrap();
        assert_eq!(col.type_name(), "CollectionUsers");
        assert_eq!(col.as_collection().map(|c| c.collection()), Some("col_Users"));

        let rec = DomainObject::create("name://Users/alice", &s).unwrap();
        let persisted = rec.as_persisted().unwrap();
        assert!(!persisted.is_loaded());
        assert_eq!(persisted.collection().name(), "Users");
        assert_eq!(rec.type_name(), "");
    }

    #[test]
    fn test_factory_rejects_bad_addresses() {
        let s = store();
        for path in [
            "http://Users",
            "system://Info/extra",
            "name://Users/",
            "name:///alice",
            "Users/alice",
        ] {
            assert!(
                matches!(
                    DomainObject::create(path, &s),
                    Err(DispatchError::InvalidArgument(_))
                ),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_descriptor_serializes_type_and_path() {
        let obj = DomainObject::create("system://Info", &store()).unwrap();
        assert_eq!(
            serde_json::to_value(obj.descriptor()).unwrap(),
            serde_json::json!({"Type": "SystemInfo", "Path": "system://Info"})
        );
        assert_eq!(obj.descriptor().to_value()["Type"], "SystemInfo");
    }

    #[test]
    fn test_load_missing_record_is_not_found() {
        let mut obj = DomainObject::create("name://Hosts/abc123", &store()).unwrap();
        assert!(matches!(obj.load(), Err(DispatchError::ObjectNotFound(_))));
    }
}
