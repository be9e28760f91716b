//! Tables over the generic entity store.
//!
//! Each registered entity becomes one table. The store accepts a POST body
//! with `start`/`limit` and a `filterGroup` of field comparisons, so every
//! declared column is natively filterable. The record array comes back
//! double-encoded as a JSON string under `jsonValue`.

use std::sync::Arc;

use tabula_core::{Column, Comparison, Connective, TableSchema};

use crate::capability::{CapabilityProfile, UnknownColumnPolicy};
use crate::config::{EntityStoreConfig, FetchTuning};
use crate::fetch::{EndpointSpec, PageSpec, PayloadPlacement, RecordsLocation};
use crate::http::{HttpClient, HttpMethod, ReqwestClient};
use crate::registry::{TableDef, TableRegistry};

/// Connective codes of the store's filter grammar.
fn logical_operator(connective: Connective) -> u8 {
    match connective {
        Connective::And => 0,
        Connective::Or => 1,
    }
}

/// Build the store's `filterGroup` payload.
///
/// Values travel as strings regardless of their column type; the store
/// coerces on its side.
pub fn entity_search_payload(comparisons: &[Comparison], connective: Connective) -> serde_json::Value {
    let query_filters: Vec<serde_json::Value> = comparisons
        .iter()
        .map(|c| {
            serde_json::json!({
                "fieldName": c.column,
                "operator": c.op.symbol(),
                "typeName": "text",
                "value": c.value.to_string(),
            })
        })
        .collect();
    serde_json::json!({
        "filterGroup": {
            "logicalOperator": logical_operator(connective),
            "queryFilters": query_filters,
        }
    })
}

/// Build the authenticated client for the entity store.
pub fn build_client(config: &EntityStoreConfig) -> Result<Arc<dyn HttpClient>, tabula_core::QueryError> {
    Ok(Arc::new(ReqwestClient::with_token(
        &config.service_root(),
        &config.token,
    )?))
}

/// Register one entity as a table. Every declared column is natively
/// filterable with the full operator set; columns outside the declared
/// schema are rejected at translation time.
pub fn register_entity(
    registry: &mut TableRegistry,
    client: Arc<dyn HttpClient>,
    tuning: &FetchTuning,
    entity_name: &str,
    columns: Vec<Column>,
) {
    let schema = TableSchema::new(columns);
    let native_columns: Vec<String> = schema.columns().iter().map(|c| c.name.clone()).collect();

    registry.register(TableDef {
        name: entity_name.to_string(),
        schema,
        profile: CapabilityProfile::all_ops(
            native_columns,
            UnknownColumnPolicy::Reject,
            entity_search_payload,
        ),
        endpoint: EndpointSpec {
            method: HttpMethod::Post,
            path: format!("api/EntityService/{}/query_expansion", entity_name),
            placement: PayloadPlacement::JsonBody,
            base_params: vec![],
            page: PageSpec::offset_based("limit", "start", tuning.page_size, tuning.max_pages),
            records: RecordsLocation::at("/jsonValue").json_encoded(),
        },
        client,
    });
}
