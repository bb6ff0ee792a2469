//! Data resources, constraints and stores supplied by the caller.
//!
//! The orchestration core only reads `DataResource::name`,
//! `DataResource::store`, `Constraint::resources` and `StoreConfig::name`.
//! Everything else is carried through for the backends.

use crate::error::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One or many locations of a resource inside its store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourcePath {
    Single(String),
    Many(Vec<String>),
}

impl ResourcePath {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            ResourcePath::Single(path) => vec![path.as_str()],
            ResourcePath::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        ResourcePath::Single(path.to_string())
    }
}

impl From<String> for ResourcePath {
    fn from(path: String) -> Self {
        ResourcePath::Single(path)
    }
}

impl From<Vec<String>> for ResourcePath {
    fn from(paths: Vec<String>) -> Self {
        ResourcePath::Many(paths)
    }
}

/// A named dataset living in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResource {
    pub name: String,
    pub path: ResourcePath,
    pub store: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional declared schema, opaque to the core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl DataResource {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<ResourcePath>,
        store: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            store: store.into(),
            title: None,
            description: None,
            schema: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

fn default_weight() -> u32 {
    5
}

/// A backend-specific check over one or more resources.
///
/// Fields the core does not know about (query, check, expect, ...) are kept
/// in `fields` and read by the backend named in `library`.
///
/// # Examples
///
/// ```rust
/// use term_judge::core::Constraint;
///
/// let constraint = Constraint::new("non_empty", "datafusion", ["orders"])
///     .with_field("query", "SELECT * FROM orders")
///     .with_field("check", "rows")
///     .with_field("expect", "non-empty");
///
/// assert!(constraint.targets("orders"));
/// assert!(!constraint.targets("customers"));
/// assert_eq!(constraint.field_str("check"), Some("rows"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub resources: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Backend library the constraint is written for
    #[serde(rename = "type")]
    pub library: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Constraint {
    pub fn new<I, S>(name: impl Into<String>, library: impl Into<String>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            resources: resources.into_iter().map(Into::into).collect(),
            weight: default_weight(),
            library: library.into(),
            fields: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns true when the constraint names `resource`.
    pub fn targets(&self, resource: &str) -> bool {
        self.resources.iter().any(|name| name == resource)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// A storage backend resources can live in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub store_type: String,
    pub uri: String,
    #[serde(default, rename = "isDefault")]
    pub is_default: bool,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl StoreConfig {
    pub fn new(
        name: impl Into<String>,
        store_type: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: None,
            store_type: store_type.into(),
            uri: uri.into(),
            is_default: false,
            config: Map::new(),
        }
    }

    /// A store on the local filesystem rooted at `root`.
    pub fn local(name: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self::new(name, "local", root.as_ref().to_string_lossy().into_owned())
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Root directory of a local store.
    pub fn local_root(&self) -> Result<PathBuf> {
        if let Some(path) = self.uri.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if self.store_type == "local" && !self.uri.contains("://") {
            return Ok(PathBuf::from(&self.uri));
        }
        Err(JudgeError::NotSupported(format!(
            "Store '{}' of type '{}' ({}) is not a local store",
            self.name, self.store_type, self.uri
        )))
    }

    /// Resolves a resource path against the store root.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf> {
        let candidate = Path::new(path.strip_prefix("file://").unwrap_or(path));
        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }
        Ok(self.local_root()?.join(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constraint_deserialize_keeps_backend_fields() {
        let constraint: Constraint = serde_json::from_value(json!({
            "name": "positive_amount",
            "title": "Amounts are positive",
            "resources": ["orders"],
            "type": "datafusion",
            "query": "SELECT min(amount) FROM orders",
            "check": "value",
            "expect": "minimum",
            "value": 0
        }))
        .unwrap();

        assert_eq!(constraint.library, "datafusion");
        assert_eq!(constraint.weight, 5);
        assert_eq!(constraint.field_str("expect"), Some("minimum"));
        assert_eq!(constraint.field("value"), Some(&json!(0)));
        assert!(!constraint.fields.contains_key("name"));
    }

    #[test]
    fn test_resource_path_one_or_many() {
        let single: DataResource = serde_json::from_value(json!({
            "name": "a", "path": "a.csv", "store": "local"
        }))
        .unwrap();
        assert_eq!(single.path.paths(), vec!["a.csv"]);

        let many: DataResource = serde_json::from_value(json!({
            "name": "b", "path": ["b1.csv", "b2.csv"], "store": "local"
        }))
        .unwrap();
        assert_eq!(many.path.paths(), vec!["b1.csv", "b2.csv"]);
    }

    #[test]
    fn test_store_resolves_relative_paths() {
        let store = StoreConfig::local("local", "/data");
        assert_eq!(
            store.resolve_path("orders.csv").unwrap(),
            PathBuf::from("/data/orders.csv")
        );
        assert_eq!(
            store.resolve_path("/tmp/orders.csv").unwrap(),
            PathBuf::from("/tmp/orders.csv")
        );
    }

    #[test]
    fn test_remote_store_is_not_local() {
        let store = StoreConfig::new("bucket", "s3", "s3://bucket/prefix");
        assert!(matches!(
            store.local_root(),
            Err(JudgeError::NotSupported(_))
        ));

        let file_uri = StoreConfig::new("files", "local", "file:///srv/data");
        assert_eq!(file_uri.local_root().unwrap(), PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_store_config_camel_case_default_flag() {
        let store: StoreConfig = serde_json::from_value(json!({
            "name": "local", "type": "local", "uri": "./data", "isDefault": true
        }))
        .unwrap();
        assert!(store.is_default);
        assert!(store.config.is_empty());
    }
}
