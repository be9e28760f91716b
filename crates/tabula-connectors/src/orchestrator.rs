//! Tables over the cluster orchestration API.
//!
//! Three read-only tables scoped to one configured cluster: `clusters`,
//! `services` and `tasks`. The API has no native filter syntax, so every
//! predicate is evaluated locally on the fetched records.

use std::collections::BTreeMap;
use std::sync::Arc;

use tabula_core::{Column, ColumnType, TableSchema};

use crate::capability::{CapabilityProfile, UnknownColumnPolicy};
use crate::config::{FetchTuning, OrchestratorConfig};
use crate::fetch::{EndpointSpec, PageSpec, PayloadPlacement, RecordsLocation};
use crate::http::{HttpClient, HttpMethod, ReqwestClient};
use crate::registry::{TableDef, TableRegistry};

pub fn clusters_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("clusterArn", ColumnType::String),
        Column::new("clusterName", ColumnType::String),
        Column::new("status", ColumnType::String),
        Column::new("activeServicesCount", ColumnType::Number),
        Column::new("runningTasksCount", ColumnType::Number),
        Column::new("pendingTasksCount", ColumnType::Number),
        Column::new("registeredContainerInstancesCount", ColumnType::Number),
    ])
}

pub fn services_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("serviceArn", ColumnType::String),
        Column::new("serviceName", ColumnType::String),
        Column::new("status", ColumnType::String),
        Column::new("desiredCount", ColumnType::Number),
        Column::new("runningCount", ColumnType::Number),
        Column::new("pendingCount", ColumnType::Number),
        Column::new("launchType", ColumnType::String),
        Column::new("taskDefinition", ColumnType::String),
    ])
}

pub fn tasks_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("taskArn", ColumnType::String),
        Column::new("taskDefinition", ColumnType::String),
        Column::new("status", ColumnType::String),
        Column::new("lastStatus", ColumnType::String),
        Column::new("desiredStatus", ColumnType::String),
        Column::new("launchType", ColumnType::String),
        Column::new("cpu", ColumnType::String),
        Column::new("memory", ColumnType::String),
        Column::new("startedAt", ColumnType::Datetime),
        Column::new("stoppedAt", ColumnType::Datetime),
    ])
}

/// Build the authenticated client for the orchestration API.
pub fn build_client(config: &OrchestratorConfig) -> Result<Arc<dyn HttpClient>, tabula_core::QueryError> {
    let mut headers = BTreeMap::new();
    headers.insert("X-Access-Key".to_string(), config.access_key.clone());
    headers.insert("X-Secret-Key".to_string(), config.secret_key.clone());
    headers.insert("X-Region".to_string(), config.region.clone());
    Ok(Arc::new(ReqwestClient::new(&config.url, headers)?))
}

fn endpoint(path: &str, records: &str, cluster_scoped: Option<&str>, tuning: &FetchTuning) -> EndpointSpec {
    let base_params = cluster_scoped
        .map(|cluster| vec![("cluster".to_string(), cluster.to_string())])
        .unwrap_or_default();
    EndpointSpec {
        method: HttpMethod::Get,
        path: path.to_string(),
        placement: PayloadPlacement::QueryParams,
        base_params,
        page: PageSpec::single_shot(Some("maxResults"), tuning.page_size),
        records: RecordsLocation::at(records),
    }
}

/// Register the orchestrator tables, scoped to the configured cluster.
pub fn register_tables(
    registry: &mut TableRegistry,
    config: &OrchestratorConfig,
    client: Arc<dyn HttpClient>,
    tuning: &FetchTuning,
) {
    registry.register(TableDef {
        name: "clusters".to_string(),
        schema: clusters_schema(),
        profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
        endpoint: endpoint("v1/clusters", "/clusters", None, tuning),
        client: Arc::clone(&client),
    });
    registry.register(TableDef {
        name: "services".to_string(),
        schema: services_schema(),
        profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
        endpoint: endpoint("v1/services", "/services", Some(&config.cluster), tuning),
        client: Arc::clone(&client),
    });
    registry.register(TableDef {
        name: "tasks".to_string(),
        schema: tasks_schema(),
        profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
        endpoint: endpoint("v1/tasks", "/tasks", Some(&config.cluster), tuning),
        client,
    });
}
