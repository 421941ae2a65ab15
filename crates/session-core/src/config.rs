//! Configuration for the session registry

use serde::Deserialize;

use crate::error::{RegistryError, Result};

/// Sizing of the registry's concurrent maps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity reserved up front in each map
    pub initial_capacity: usize,
    /// Number of lock shards per map; `None` lets the map choose
    pub shard_amount: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            shard_amount: None,
        }
    }
}

impl RegistryConfig {
    /// Parse a TOML document, e.g. the `[sessions]` table of a node config
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| RegistryError::Config(format!("Invalid registry config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    /// Check the shard amount is a power of two greater than one
    pub fn validate(&self) -> Result<()> {
        if let Some(shards) = self.shard_amount {
            if shards <= 1 || !shards.is_power_of_two() {
                return Err(RegistryError::Config(format!(
                    "shard_amount must be a power of two greater than 1, got {}",
                    shards
                )));
            }
        }
        Ok(())
    }
}
