//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::report::AggregatePolicy;

/// Configuration for the report orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// What happens when two work items point at the same ticket and sub-request.
    #[serde(default)]
    pub aggregate_policy: AggregatePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.aggregate_policy, AggregatePolicy::LastWriteWins);
    }

    #[test]
    fn test_deserialize_empty() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config.aggregate_policy, AggregatePolicy::LastWriteWins);
    }

    #[test]
    fn test_deserialize_accumulate() {
        let toml = r#"
            aggregate_policy = "accumulate"
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.aggregate_policy, AggregatePolicy::Accumulate);
    }
}
