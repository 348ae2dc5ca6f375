//! Configuration types for Conclave.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use conclave_council::DispositionOutcome;
use conclave_filter::DEFAULT_FILTER_VERSION;
use conclave_router::RoutingTable;
use serde::{Deserialize, Serialize};

use crate::error::ConclaveError;
use crate::Result;

/// Configuration for the Conclave facade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConclaveConfig {
    /// Consensus Engine configuration.
    pub consensus: ConsensusConfig,

    /// Coercion Filter configuration.
    pub filter: FilterConfig,

    /// Disposition Router configuration.
    pub router: RouterConfig,

    /// Governance ledger configuration.
    pub ledger: LedgerConfig,
}

impl ConclaveConfig {
    /// Parses a JSON configuration document. Missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConclaveError::Config` if the document is not valid JSON or
    /// does not match the configuration shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConclaveError::Config(format!("invalid configuration: {}", e)))
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// - `ConclaveError::Io` if the file cannot be read
    /// - `ConclaveError::Config` if it cannot be parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConclaveError::Config` naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.consensus.permitted_outcomes.is_empty() {
            return Err(ConclaveError::Config(
                "consensus.permitted_outcomes must not be empty".to_string(),
            ));
        }
        if self.filter.filter_version.trim().is_empty() {
            return Err(ConclaveError::Config("filter.filter_version must not be empty".to_string()));
        }
        if self.filter.processing_budget_ms == 0 {
            return Err(ConclaveError::Config(
                "filter.processing_budget_ms must be greater than zero".to_string(),
            ));
        }

        let unrouted: Vec<String> = self
            .consensus
            .permitted_outcomes
            .iter()
            .filter(|o| self.router.routing.route(**o).is_none())
            .map(ToString::to_string)
            .collect();
        if !unrouted.is_empty() {
            return Err(ConclaveError::Config(format!(
                "permitted outcomes without a pipeline: {}",
                unrouted.join(", ")
            )));
        }
        Ok(())
    }
}

/// Consensus Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Outcomes an archon may vote for.
    pub permitted_outcomes: BTreeSet<DispositionOutcome>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            permitted_outcomes: DispositionOutcome::ALL.into_iter().collect(),
        }
    }
}

/// Coercion Filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Version string stamped on every result and token.
    pub filter_version: String,

    /// Elapsed-time budget per call, in milliseconds.
    pub processing_budget_ms: u64,
}

impl FilterConfig {
    pub fn processing_budget(&self) -> Duration {
        Duration::from_millis(self.processing_budget_ms)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_version: DEFAULT_FILTER_VERSION.to_string(),
            processing_budget_ms: 200,
        }
    }
}

/// Disposition Router configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Outcome → pipeline table.
    pub routing: RoutingTable,
}

/// Governance ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to a sled database. `None` keeps the ledger in memory.
    pub db_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_router::PipelineType;

    #[test]
    fn test_default_config() {
        let config = ConclaveConfig::default();
        assert_eq!(config.consensus.permitted_outcomes.len(), 3);
        assert_eq!(config.filter.processing_budget(), Duration::from_millis(200));
        assert!(config.ledger.db_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = ConclaveConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = ConclaveConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.filter.filter_version, config.filter.filter_version);
        assert_eq!(parsed.router.routing, config.router.routing);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let parsed = ConclaveConfig::from_json_str(
            r#"{ "filter": { "processing_budget_ms": 50 }, "router": { "routing": { "ACKNOWLEDGE": "REFERRAL" } } }"#,
        )
        .unwrap();
        assert_eq!(parsed.filter.processing_budget_ms, 50);
        assert_eq!(parsed.filter.filter_version, DEFAULT_FILTER_VERSION);
        assert_eq!(
            parsed.router.routing.route(DispositionOutcome::Acknowledge),
            Some(PipelineType::Referral)
        );
        assert_eq!(parsed.router.routing.route(DispositionOutcome::Refer), None);
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = ConclaveConfig::default();
        config.filter.processing_budget_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("processing_budget_ms"));
    }

    #[test]
    fn test_validate_rejects_empty_version_and_outcomes() {
        let mut config = ConclaveConfig::default();
        config.filter.filter_version = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = ConclaveConfig::default();
        config.consensus.permitted_outcomes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrouted_outcome() {
        let mut config = ConclaveConfig::default();
        config.router.routing = RoutingTable::empty()
            .with_route(DispositionOutcome::Acknowledge, PipelineType::Acknowledgment)
            .with_route(DispositionOutcome::Refer, PipelineType::Referral);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ESCALATE"));

        config.consensus.permitted_outcomes.remove(&DispositionOutcome::Escalate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = ConclaveConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConclaveError::Config(_)));
    }
}
