//! Tables over third-party connectors reached through the gateway.
//!
//! A gateway connection points at one connector instance; the connector
//! kind decides which tables exist. The gateway forwards requests
//! unfiltered, so predicates are always evaluated locally.

use std::str::FromStr;
use std::sync::Arc;

use tabula_core::{Column, ColumnType, TableSchema};

use crate::capability::{CapabilityProfile, UnknownColumnPolicy};
use crate::config::{FetchTuning, GatewayConfig};
use crate::fetch::{EndpointSpec, PageSpec, PayloadPlacement, RecordsLocation};
use crate::http::{HttpClient, HttpMethod, ReqwestClient};
use crate::registry::{TableDef, TableRegistry};

/// Supported third-party connector kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    /// Payments provider: `products` and `customers`.
    Payments,
    /// CRM provider: `lead_collection`.
    Crm,
}

impl FromStr for ConnectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payments" => Ok(ConnectorKind::Payments),
            "crm" => Ok(ConnectorKind::Crm),
            other => Err(format!("unknown connector type '{}'", other)),
        }
    }
}

pub fn products_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("id", ColumnType::String),
        Column::new("name", ColumnType::String),
        Column::new("description", ColumnType::String),
        Column::new("active", ColumnType::Bool),
        Column::new("created", ColumnType::Number),
    ])
}

pub fn customers_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("id", ColumnType::String),
        Column::new("email", ColumnType::String),
        Column::new("name", ColumnType::String),
        Column::new("description", ColumnType::String),
        Column::new("delinquent", ColumnType::Bool),
        Column::new("created", ColumnType::Number),
    ])
}

pub fn lead_collection_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("ObjectID", ColumnType::String),
        Column::new("Name", ColumnType::String),
        Column::new("Company", ColumnType::String),
        Column::new("Status", ColumnType::String),
        Column::new("Email", ColumnType::String),
        Column::new("CreationDateTime", ColumnType::Datetime),
    ])
}

/// Build the authenticated client for the gateway.
pub fn build_client(config: &GatewayConfig) -> Result<Arc<dyn HttpClient>, tabula_core::QueryError> {
    Ok(Arc::new(ReqwestClient::with_token(
        &config.service_root(),
        &config.token,
    )?))
}

fn instance_endpoint(
    config: &GatewayConfig,
    table: &str,
    records: RecordsLocation,
    with_limit: bool,
    tuning: &FetchTuning,
) -> EndpointSpec {
    EndpointSpec {
        method: HttpMethod::Get,
        path: format!("elements_/v3/element/instances/{}/{}", config.connection_id, table),
        placement: PayloadPlacement::QueryParams,
        base_params: vec![("debug".to_string(), "true".to_string())],
        page: PageSpec::single_shot(with_limit.then_some("limit"), tuning.page_size),
        records,
    }
}

/// Register the tables of the configured connector kind.
pub fn register_tables(
    registry: &mut TableRegistry,
    config: &GatewayConfig,
    client: Arc<dyn HttpClient>,
    tuning: &FetchTuning,
) {
    match config.connector_type {
        ConnectorKind::Payments => {
            registry.register(TableDef {
                name: "products".to_string(),
                schema: products_schema(),
                profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
                endpoint: instance_endpoint(config, "products", RecordsLocation::at("/data"), true, tuning),
                client: Arc::clone(&client),
            });
            registry.register(TableDef {
                name: "customers".to_string(),
                schema: customers_schema(),
                profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
                endpoint: instance_endpoint(config, "customers", RecordsLocation::at("/data"), true, tuning),
                client,
            });
        }
        ConnectorKind::Crm => {
            // The CRM connector answers with a bare record array.
            registry.register(TableDef {
                name: "lead_collection".to_string(),
                schema: lead_collection_schema(),
                profile: CapabilityProfile::no_pushdown(UnknownColumnPolicy::Residual),
                endpoint: instance_endpoint(
                    config,
                    "LeadCollection",
                    RecordsLocation::at_root(),
                    false,
                    tuning,
                ),
                client,
            });
        }
    }
}
