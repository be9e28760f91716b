//! Connection setup: build the table registry from environment
//! configuration.
//!
//! The registry is constructed once here and passed by reference into
//! query execution; its lifetime is the connection's scope. Nothing
//! registers itself as a side effect of connecting.

use anyhow::Result;
use std::sync::Arc;

use tabula_core::Column;

use crate::config::{
    ContextStoreConfig, EntityStoreConfig, FetchTuning, GatewayConfig, OrchestratorConfig,
};
use crate::registry::TableRegistry;
use crate::{context_store, entity, gateway, orchestrator};

/// Build a registry with every service the environment configures.
///
/// A service counts as configured when its lead variable is set
/// (`ORCHESTRATOR_URL`, `CONTEXT_STORE_URL`, `GATEWAY_API_BASE`,
/// `ENTITY_STORE_API_BASE`); a partially configured service is an error,
/// not a silent skip. Entity-store tables need per-entity schemas, so the
/// caller passes the entities to expose; the list is ignored when the
/// entity store is not configured.
pub fn registry_from_env(entities: &[(String, Vec<Column>)]) -> Result<TableRegistry> {
    let tuning = FetchTuning::from_env()?;
    let mut registry = TableRegistry::new();

    if std::env::var("ORCHESTRATOR_URL").is_ok() {
        let config = OrchestratorConfig::from_env()?;
        let client = orchestrator::build_client(&config)?;
        orchestrator::register_tables(&mut registry, &config, client, &tuning);
    }
    if std::env::var("CONTEXT_STORE_URL").is_ok() {
        let config = ContextStoreConfig::from_env()?;
        let client = context_store::build_client(&config)?;
        context_store::register_tables(&mut registry, &config, client, &tuning);
    }
    if std::env::var("ENTITY_STORE_API_BASE").is_ok() {
        let config = EntityStoreConfig::from_env()?;
        let client = entity::build_client(&config)?;
        for (name, columns) in entities {
            entity::register_entity(
                &mut registry,
                Arc::clone(&client),
                &tuning,
                name,
                columns.clone(),
            );
        }
    }
    if std::env::var("GATEWAY_API_BASE").is_ok() {
        let config = GatewayConfig::from_env()?;
        let client = gateway::build_client(&config)?;
        gateway::register_tables(&mut registry, &config, client, &tuning);
    }

    Ok(registry)
}
