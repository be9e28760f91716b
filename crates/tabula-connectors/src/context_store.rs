//! The `contexts` table over the key-value context service.
//!
//! The service lists contexts with offset pagination (`maxResultCount` /
//! `skipCount`) and reports the total under `result.totalCount`. It has no
//! filter syntax of its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use tabula_core::{Column, ColumnType, TableSchema};

use crate::capability::{CapabilityProfile, UnknownColumnPolicy};
use crate::config::{ContextStoreConfig, FetchTuning};
use crate::fetch::{EndpointSpec, PageSpec, PayloadPlacement, RecordsLocation};
use crate::http::{HttpClient, HttpMethod, ReqwestClient};
use crate::registry::{TableDef, TableRegistry};

pub fn contexts_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("id", ColumnType::String),
        Column::new("name", ColumnType::String),
        Column::new("description", ColumnType::String),
        Column::new("type", ColumnType::String),
        Column::new("value", ColumnType::String),
        Column::new("createdAt", ColumnType::Datetime),
        Column::new("updatedAt", ColumnType::Datetime),
        Column::new("createdBy", ColumnType::String),
        Column::new("updatedBy", ColumnType::String),
        Column::new("organizationUnitId", ColumnType::String),
        Column::new("isDeleted", ColumnType::Bool),
    ])
}

/// Build the authenticated client for the context service.
pub fn build_client(config: &ContextStoreConfig) -> Result<Arc<dyn HttpClient>, tabula_core::QueryError> {
    let mut headers = BTreeMap::new();
    headers.insert("X-Tenant".to_string(), config.tenant.clone());
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    Ok(Arc::new(ReqwestClient::new(&config.url, headers)?))
}

/// Register the `contexts` table.
pub fn register_tables(
    registry: &mut TableRegistry,
    config: &ContextStoreConfig,
    client: Arc<dyn HttpClient>,
    tuning: &FetchTuning,
) {
    let base_params = config
        .organization_unit
        .as_ref()
        .map(|unit| vec![("organizationUnitId".to_string(), unit.clone())])
        .unwrap_or_default();

    registry.register(TableDef {
        name: "contexts".to_string(),
        schema: contexts_schema(),
        profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
        endpoint: EndpointSpec {
            method: HttpMethod::Get,
            path: "api/services/app/Context/GetContexts".to_string(),
            placement: PayloadPlacement::QueryParams,
            base_params,
            page: PageSpec::offset_based("maxResultCount", "skipCount", tuning.page_size, tuning.max_pages),
            records: RecordsLocation::at("/result/items").with_total("/result/totalCount"),
        },
        client,
    });
}
