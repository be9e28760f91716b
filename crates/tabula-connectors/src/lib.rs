//! Tabula Connectors - remote services as relational tables
//!
//! This crate turns API-backed services into queryable tables:
//! - Cluster orchestration API (`clusters`, `services`, `tasks`)
//! - Key-value context store (`contexts`)
//! - Generic entity store (one table per registered entity)
//! - Third-party connectors reached through a gateway
//!
//! The [`engine::QueryEngine`] runs the pipeline behind `execute_select`:
//! flatten the WHERE predicate, push the natively-supported part down to
//! the service, fetch with pagination, and evaluate the residue locally.

pub mod assemble;
pub mod capability;
pub mod command;
pub mod config;
pub mod connect;
pub mod context_store;
pub mod engine;
pub mod entity;
pub mod fetch;
pub mod gateway;
pub mod http;
pub mod orchestrator;
pub mod registry;
pub mod translate;

pub use assemble::{assemble, PageWindow};
pub use capability::{CapabilityProfile, PayloadBuilder, UnknownColumnPolicy};
pub use command::NativeCommand;
pub use config::{
    ContextStoreConfig, EntityStoreConfig, FetchTuning, GatewayConfig, OrchestratorConfig,
};
pub use connect::registry_from_env;
pub use engine::QueryEngine;
pub use fetch::{
    fetch, EndpointSpec, FetchContext, PageSpec, PayloadPlacement, RawRecord, RecordsLocation,
};
pub use gateway::ConnectorKind;
pub use http::{HttpClient, HttpMethod, HttpResponse, ReqwestClient};
pub use registry::{TableDef, TableRegistry};
pub use translate::{translate, TranslationResult};
