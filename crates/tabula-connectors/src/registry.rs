//! The table registry: one explicit object owning every registered table's
//! schema, capability profile, endpoint and client.
//!
//! Built once at connection setup and passed by reference into query
//! execution; nothing registers itself as a side effect.

use std::collections::BTreeMap;
use std::sync::Arc;

use tabula_core::{QueryError, TableSchema};
use tracing::info;

use crate::capability::CapabilityProfile;
use crate::fetch::EndpointSpec;
use crate::http::HttpClient;

/// Everything the engine needs to serve queries against one logical table.
#[derive(Clone)]
pub struct TableDef {
    pub name: String,
    pub schema: TableSchema,
    pub profile: CapabilityProfile,
    pub endpoint: EndpointSpec,
    pub client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TableDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDef")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Registry of logical tables, keyed by table name.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: BTreeMap<String, TableDef>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Register a table, replacing any previous registration of the same
    /// name.
    pub fn register(&mut self, table: TableDef) {
        info!(
            "registered table '{}' ({} columns, pushdown: {})",
            table.name,
            table.schema.len(),
            table.profile.has_native_columns()
        );
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Result<&TableDef, QueryError> {
        self.tables.get(name).ok_or_else(|| QueryError::UnknownTable {
            table: name.to_string(),
        })
    }

    pub fn schema(&self, name: &str) -> Result<&TableSchema, QueryError> {
        self.table(name).map(|t| &t.schema)
    }

    pub fn profile(&self, name: &str) -> Result<&CapabilityProfile, QueryError> {
        self.table(name).map(|t| &t.profile)
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::UnknownColumnPolicy;
    use crate::fetch::{PageSpec, PayloadPlacement, RecordsLocation};
    use crate::http::{HttpMethod, HttpResponse};
    use async_trait::async_trait;
    use tabula_core::{Column, ColumnType};

    struct NullClient;

    #[async_trait]
    impl HttpClient for NullClient {
        async fn request(
            &self,
            _method: HttpMethod,
            _path: &str,
            _params: &[(String, String)],
            _json_body: Option<&serde_json::Value>,
            _timeout: Option<std::time::Duration>,
        ) -> Result<HttpResponse, QueryError> {
            Ok(HttpResponse {
                status: 200,
                body: "[]".to_string(),
            })
        }
    }

    fn table(name: &str) -> TableDef {
        TableDef {
            name: name.to_string(),
            schema: TableSchema::new(vec![Column::new("id", ColumnType::String)]),
            profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
            endpoint: EndpointSpec {
                method: HttpMethod::Get,
                path: format!("/{}", name),
                placement: PayloadPlacement::QueryParams,
                base_params: vec![],
                page: PageSpec::single_shot(None, 100),
                records: RecordsLocation::at_root(),
            },
            client: Arc::new(NullClient),
        }
    }

    #[test]
    fn test_lookup() {
        let mut registry = TableRegistry::new();
        registry.register(table("clusters"));
        registry.register(table("tasks"));
        assert!(registry.table("clusters").is_ok());
        assert!(registry.schema("tasks").is_ok());
        let err = registry.table("nope").unwrap_err();
        assert!(matches!(err, QueryError::UnknownTable { ref table } if table == "nope"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = TableRegistry::new();
        registry.register(table("tasks"));
        registry.register(table("clusters"));
        assert_eq!(registry.table_names(), vec!["clusters", "tasks"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = TableRegistry::new();
        registry.register(table("tasks"));
        let mut replacement = table("tasks");
        replacement.schema = TableSchema::new(vec![
            Column::new("id", ColumnType::String),
            Column::new("status", ColumnType::String),
        ]);
        registry.register(replacement);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.schema("tasks").unwrap().len(), 2);
    }
}
