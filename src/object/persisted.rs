use super::{CollectionObject, Properties, NAME_SCHEME};
use crate::error::DispatchError;
use crate::store::SharedStore;
use serde_json::Value;
use tracing::debug;

/// One record of a collection, addressed as `name://<Collection>/<...>`.
///
/// Properties are empty until [`load`](Self::load) is called. Every mutation
/// flushes the *whole* property map back to the store, so two writers racing
/// on the same record each write a full snapshot and the last flush wins.
#[derive(Debug, Clone)]
pub struct PersistedObject {
    path: String,
    collection: CollectionObject,
    type_name: Option<String>,
    properties: Properties,
    loaded: bool,
}

impl PersistedObject {
    /// Build an unloaded object. The address must name a collection and a
    /// non-empty record key.
    pub fn new(path: &str, store: SharedStore) -> Result<Self, DispatchError> {
        let invalid = || DispatchError::InvalidArgument(format!("path: '{path}'"));
        let rest = path.strip_prefix(NAME_SCHEME).ok_or_else(invalid)?;
        let delim = rest.find('/').ok_or_else(invalid)?;
        if delim == 0 || delim == rest.len() - 1 {
            return Err(invalid());
        }
        Ok(Self {
            path: path.to_string(),
            collection: CollectionObject::from_name(&rest[..delim], store),
            type_name: None,
            properties: Properties::new(),
            loaded: false,
        })
    }

    /// Fetch the record from the owning collection.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` when no record exists at this path or the record has
    /// no `Type`.
    pub fn load(&mut self) -> Result<(), DispatchError> {
        let record = self.collection.get_child(&self.path)?;
        let type_name = record
            .type_name
            .ok_or_else(|| DispatchError::ObjectNotFound(self.path.clone()))?;
        debug!(path = %self.path, type_name = %type_name, "Object loaded");
        self.type_name = Some(type_name);
        self.properties = record.properties.unwrap_or_default();
        self.loaded = true;
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Record type; `None` until loaded.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// The collection this record belongs to.
    #[must_use]
    pub fn collection(&self) -> &CollectionObject {
        &self.collection
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    #[must_use]
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Set one property and flush.
    pub fn set_property(&mut self, key: &str, value: Value) -> Result<(), DispatchError> {
        self.properties.insert(key.to_string(), value);
        self.flush()
    }

    /// Merge `props` into the property map and flush once.
    pub fn set_properties(&mut self, props: Properties) -> Result<(), DispatchError> {
        for (key, value) in props {
            self.properties.insert(key, value);
        }
        self.flush()
    }

    /// Write the complete property map back as one upsert.
    pub fn flush(&self) -> Result<(), DispatchError> {
        let type_name = self.type_name.as_deref().ok_or_else(|| {
            DispatchError::InvalidOperation(format!("{} is not loaded", self.path))
        })?;
        self.collection
            .update_child(type_name, &self.path, self.properties.clone())
    }
}
