//! Connection configuration from environment variables.
//!
//! One struct per backing service. Required variables that are absent are
//! reported together, by name, in a single error.

use anyhow::{bail, Context, Result};

use crate::gateway::ConnectorKind;

fn require(name: &str, missing: &mut Vec<String>) -> String {
    match std::env::var(name) {
        Ok(value) => value,
        Err(_) => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

fn check(missing: Vec<String>) -> Result<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        bail!("missing required connection parameters: {}", missing.join(", "))
    }
}

/// Page sizing shared by every fetcher.
#[derive(Debug, Clone)]
pub struct FetchTuning {
    pub page_size: usize,
    pub max_pages: u32,
}

impl FetchTuning {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            page_size: std::env::var("FETCH_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid FETCH_PAGE_SIZE")?,
            max_pages: std::env::var("FETCH_MAX_PAGES")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("Invalid FETCH_MAX_PAGES")?,
        })
    }
}

impl Default for FetchTuning {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 50,
        }
    }
}

/// Cluster orchestration API credentials and scope.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub cluster: String,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let config = Self {
            url: require("ORCHESTRATOR_URL", &mut missing),
            access_key: require("ORCHESTRATOR_ACCESS_KEY", &mut missing),
            secret_key: require("ORCHESTRATOR_SECRET_KEY", &mut missing),
            region: require("ORCHESTRATOR_REGION", &mut missing),
            cluster: require("ORCHESTRATOR_CLUSTER", &mut missing),
        };
        check(missing)?;
        Ok(config)
    }
}

/// Key-value context store connection parameters.
#[derive(Debug, Clone)]
pub struct ContextStoreConfig {
    pub url: String,
    pub tenant: String,
    pub username: String,
    pub password: String,
    pub organization_unit: Option<String>,
}

impl ContextStoreConfig {
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let config = Self {
            url: require("CONTEXT_STORE_URL", &mut missing),
            tenant: require("CONTEXT_STORE_TENANT", &mut missing),
            username: require("CONTEXT_STORE_USERNAME", &mut missing),
            password: require("CONTEXT_STORE_PASSWORD", &mut missing),
            organization_unit: std::env::var("CONTEXT_STORE_ORG_UNIT").ok(),
        };
        check(missing)?;
        Ok(config)
    }
}

/// Entity store connection parameters.
#[derive(Debug, Clone)]
pub struct EntityStoreConfig {
    pub api_base: String,
    pub token: String,
    pub organization: String,
    pub tenant: String,
}

impl EntityStoreConfig {
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let config = Self {
            api_base: require("ENTITY_STORE_API_BASE", &mut missing),
            token: require("ENTITY_STORE_TOKEN", &mut missing),
            organization: require("ENTITY_STORE_ORGANIZATION", &mut missing),
            tenant: require("ENTITY_STORE_TENANT", &mut missing),
        };
        check(missing)?;
        Ok(config)
    }

    /// Root URL the per-entity endpoint paths are resolved against.
    pub fn service_root(&self) -> String {
        format!("{}/{}/{}", self.api_base, self.organization, self.tenant)
    }
}

/// Gateway connection parameters for third-party connectors.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_base: String,
    pub token: String,
    pub organization: String,
    pub tenant: String,
    pub connection_id: String,
    pub connector_type: ConnectorKind,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let api_base = require("GATEWAY_API_BASE", &mut missing);
        let token = require("GATEWAY_TOKEN", &mut missing);
        let organization = require("GATEWAY_ORGANIZATION", &mut missing);
        let tenant = require("GATEWAY_TENANT", &mut missing);
        let connection_id = require("GATEWAY_CONNECTION_ID", &mut missing);
        let kind_raw = require("GATEWAY_CONNECTOR_TYPE", &mut missing);
        check(missing)?;
        let connector_type = match kind_raw.parse::<ConnectorKind>() {
            Ok(kind) => kind,
            Err(reason) => bail!("Invalid GATEWAY_CONNECTOR_TYPE: {}", reason),
        };
        Ok(Self {
            api_base,
            token,
            organization,
            tenant,
            connection_id,
            connector_type,
        })
    }

    pub fn service_root(&self) -> String {
        format!("{}/{}/{}", self.api_base, self.organization, self.tenant)
    }
}

/// Serializes env-mutating tests across the crate.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
