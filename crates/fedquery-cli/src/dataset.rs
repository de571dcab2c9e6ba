//! JSON datasets loaded into in-memory providers.
//!
//! A dataset file holds the federation schema, the root rows and one row
//! list per relation provider:
//!
//! ```json
//! {
//!   "schema": {
//!     "root": { "entity": "User", "primary_key": "id" },
//!     "relations": [
//!       { "property": "posts", "cardinality": "many", "primary_key": "id",
//!         "foreign_key": "author_id", "provider": "posts" }
//!     ]
//!   },
//!   "roots": [{ "id": 1, "name": "ada" }],
//!   "collections": { "posts": [{ "id": 10, "author_id": 1 }] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use fedquery_core::{Federation, FederationConfig, FederationSchema, MemoryProvider, RelationRegistry};
use fedquery_proto::Entity;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CliError;

/// A schema together with the rows of every collection it references.
#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    /// Root and relation declarations.
    pub schema: FederationSchema,
    /// Root collection rows.
    #[serde(default)]
    pub roots: Vec<Entity>,
    /// Relation rows keyed by provider name.
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Entity>>,
}

impl Dataset {
    /// Read a dataset from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let contents = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| CliError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the rows into memory providers and build a federation.
    ///
    /// A provider named by a relation but absent from `collections` is
    /// served as an empty collection.
    pub fn into_federation(self, config: FederationConfig) -> Result<Federation, CliError> {
        let Dataset {
            schema,
            roots,
            mut collections,
        } = self;

        let registry = RelationRegistry::new();
        for relation in &schema.relations {
            if !collections.contains_key(&relation.provider) {
                warn!(
                    relation = %relation.property,
                    provider = %relation.provider,
                    "no rows for provider, serving an empty collection"
                );
                collections.insert(relation.provider.clone(), Vec::new());
            }
        }
        for (name, rows) in collections {
            debug!(provider = %name, rows = rows.len(), "loaded collection");
            registry.register(name.clone(), Arc::new(MemoryProvider::new(name, rows)));
        }

        debug!(entity = %schema.root.entity, rows = roots.len(), "loaded root collection");
        let root = Arc::new(MemoryProvider::new(schema.root.entity.clone(), roots));
        Ok(Federation::new(schema, root, &registry, config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATASET: &str = r#"{
        "schema": {
            "root": { "entity": "User", "primary_key": "id" },
            "relations": [
                { "property": "posts", "cardinality": "many", "primary_key": "id",
                  "foreign_key": "author_id", "provider": "posts" },
                { "property": "team", "cardinality": "one", "owner": true,
                  "primary_key": "id", "foreign_key": "team_id", "provider": "teams" }
            ]
        },
        "roots": [
            { "id": 1, "team_id": null },
            { "id": 2, "team_id": 5 }
        ],
        "collections": {
            "posts": [{ "id": 10, "author_id": 2 }]
        }
    }"#;

    fn write_dataset(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_dataset() {
        let file = write_dataset(DATASET);
        let dataset = Dataset::from_path(file.path()).unwrap();

        assert_eq!(dataset.schema.relations.len(), 2);
        assert!(dataset.schema.relations[1].owner);
        assert_eq!(dataset.roots.len(), 2);
        assert_eq!(dataset.collections["posts"].len(), 1);
    }

    #[tokio::test]
    async fn test_dataset_federation_serves_requests() {
        let file = write_dataset(DATASET);
        let federation = Dataset::from_path(file.path())
            .unwrap()
            .into_federation(FederationConfig::default())
            .unwrap();

        let response = federation
            .get_many(&fedquery_proto::Request::new())
            .await
            .unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(
            response.data[1].get("posts").unwrap().as_array().unwrap().len(),
            1
        );
        // teams had no rows
        assert_eq!(response.data[1].get("team"), Some(&serde_json::Value::Null));
    }

    #[tokio::test]
    async fn test_demo_dataset() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let federation = Dataset::from_path(&demos.join("blog.json"))
            .unwrap()
            .into_federation(FederationConfig::default())
            .unwrap();
        let request: fedquery_proto::Request = serde_json::from_str(
            &fs::read_to_string(demos.join("top_spenders.json")).unwrap(),
        )
        .unwrap();

        let response = federation.get_many(&request).await.unwrap();
        let ids: Vec<_> = response.iter().map(|u| u.value("id").as_i64()).collect();
        assert_eq!(ids, vec![Some(2), Some(1)]);
        assert_eq!(response.total, 3);
        assert!(response.data.iter().all(|u| !u.contains("posts")));
    }

    #[test]
    fn test_parse_error_names_file() {
        let file = write_dataset("{ not json");
        let err = Dataset::from_path(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
