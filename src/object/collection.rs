use super::{Properties, COLLECTION_PREFIX, NAME_SCHEME};
use crate::error::DispatchError;
use crate::store::{filter_eq, Document, Filter, SharedStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Page size used when a caller passes no (or a non-positive) limit.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Storage shape of one persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Type", default)]
    pub type_name: Option<String>,
    #[serde(rename = "Properties", default)]
    pub properties: Option<Properties>,
}

impl PersistedRecord {
    fn from_document(doc: Document) -> Result<Self, DispatchError> {
        serde_json::from_value(Value::Object(doc))
            .map_err(|e| DispatchError::Db(e.into()))
    }
}

/// Addressable set of records sharing a collection name (`name://<Name>`).
///
/// Records of the collection live in store collection `col_<Name>` and have
/// paths inside the `name://<Name>/` namespace.
#[derive(Clone)]
pub struct CollectionObject {
    name: String,
    collection: String,
    type_name: String,
    path: String,
    store: SharedStore,
}

impl std::fmt::Debug for CollectionObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionObject")
            .field("path", &self.path)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl CollectionObject {
    /// Build a collection object from its address (`name://<Name>`).
    pub fn new(path: &str, store: SharedStore) -> Result<Self, DispatchError> {
        let name = path
            .strip_prefix(NAME_SCHEME)
            .filter(|rest| !rest.contains('/'))
            .ok_or_else(|| DispatchError::InvalidArgument(format!("path: '{path}'")))?;
        Ok(Self::from_name(name, store))
    }

    /// Build a collection object from a bare collection name.
    pub fn from_name(name: &str, store: SharedStore) -> Self {
        Self {
            name: name.to_string(),
            collection: format!("{COLLECTION_PREFIX}{name}"),
            type_name: format!("Collection{name}"),
            path: format!("{NAME_SCHEME}{name}"),
            store,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store collection key (`col_<Name>`).
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Matching records, paged. Negative offsets become 0; non-positive limits
    /// become [`DEFAULT_PAGE_LIMIT`]. Order is the store's natural order.
    pub fn get_children(
        &self,
        filter: &Filter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PersistedRecord>, DispatchError> {
        let offset = usize::try_from(offset).unwrap_or(0);
        let limit = match usize::try_from(limit) {
            Ok(n) if n > 0 => n,
            _ => DEFAULT_PAGE_LIMIT,
        };
        let docs = self.store.find(&self.collection, filter, offset, limit)?;
        debug!(
            collection = %self.collection,
            offset,
            limit,
            found = docs.len(),
            "Children fetched"
        );
        docs.into_iter().map(PersistedRecord::from_document).collect()
    }

    pub fn get_child_count(&self, filter: &Filter) -> Result<u64, DispatchError> {
        Ok(self.store.count(&self.collection, filter)?)
    }

    pub fn has_child(&self, path: &str) -> Result<bool, DispatchError> {
        Ok(self.get_child_count(&filter_eq("Path", path))? > 0)
    }

    /// The record at `path`, or `ObjectNotFound`.
    pub fn get_child(&self, path: &str) -> Result<PersistedRecord, DispatchError> {
        self.get_children(&filter_eq("Path", path), 0, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| DispatchError::ObjectNotFound(path.to_string()))
    }

    /// Create a record. Fails with `AlreadyExist` when `path` is taken; of two
    /// concurrent adds for the same path exactly one succeeds.
    pub fn add_child(
        &self,
        type_name: &str,
        path: &str,
        properties: Properties,
    ) -> Result<(), DispatchError> {
        self.check_namespace(path)?;
        let doc = record_document(type_name, path, properties)?;
        if !self
            .store
            .insert_if_absent(&self.collection, &filter_eq("Path", path), &doc)?
        {
            return Err(DispatchError::AlreadyExist(path.to_string()));
        }
        info!(collection = %self.collection, path, type_name, "Child added");
        Ok(())
    }

    /// Create or replace a record without an existence check.
    pub fn update_child(
        &self,
        type_name: &str,
        path: &str,
        properties: Properties,
    ) -> Result<(), DispatchError> {
        self.check_namespace(path)?;
        self.write_child(type_name, path, properties)?;
        debug!(collection = %self.collection, path, type_name, "Child updated");
        Ok(())
    }

    /// Remove the record at `path`; removing a missing record is not an error.
    pub fn delete_child(&self, path: &str) -> Result<u64, DispatchError> {
        let removed = self.store.remove(&self.collection, &filter_eq("Path", path))?;
        info!(collection = %self.collection, path, removed, "Child deleted");
        Ok(removed)
    }

    fn check_namespace(&self, path: &str) -> Result<(), DispatchError> {
        let inside = path
            .strip_prefix(self.path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty());
        if inside {
            Ok(())
        } else {
            Err(DispatchError::InvalidArgument(format!(
                "path: '{path}' is outside {}",
                self.path
            )))
        }
    }

    fn write_child(
        &self,
        type_name: &str,
        path: &str,
        properties: Properties,
    ) -> Result<(), DispatchError> {
        let doc = record_document(type_name, path, properties)?;
        self.store
            .upsert(&self.collection, &filter_eq("Path", path), &doc)?;
        Ok(())
    }
}

fn record_document(
    type_name: &str,
    path: &str,
    properties: Properties,
) -> Result<Document, DispatchError> {
    let record = PersistedRecord {
        path: path.to_string(),
        type_name: Some(type_name.to_string()),
        properties: Some(properties),
    };
    match serde_json::to_value(&record).map_err(|e| DispatchError::Db(e.into()))? {
        Value::Object(doc) => Ok(doc),
        _ => Ok(Document::new()),
    }
}
