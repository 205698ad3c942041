use crate::core::{Result, TxError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Persistence unit configuration
///
/// Names the persistence unit and carries an opaque set of provider
/// properties. The unit-of-work manager never interprets the properties; they
/// are handed to the provider exactly as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Persistence unit name
    pub unit_name: String,

    /// Provider-specific options
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl PersistenceConfig {
    /// Create a configuration for the given persistence unit
    pub fn new(unit_name: &str) -> Self {
        Self {
            unit_name: unit_name.to_string(),
            properties: BTreeMap::new(),
        }
    }

    /// Set a provider property
    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Look up a provider property
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Parse from JSON
    ///
    /// # Examples
    ///
    /// ```
    /// use txscope::PersistenceConfig;
    ///
    /// let config = PersistenceConfig::from_json(
    ///     r#"{ "unit_name": "orders", "properties": { "pool.size": 4 } }"#
    /// ).unwrap();
    ///
    /// assert_eq!(config.unit_name, "orders");
    /// assert_eq!(config.get("pool.size").and_then(|v| v.as_u64()), Some(4));
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.unit_name.trim().is_empty() {
            return Err(TxError::ConfigError(
                "Persistence unit name cannot be empty".to_string(),
            ));
        }

        if self.properties.keys().any(|key| key.is_empty()) {
            return Err(TxError::ConfigError(
                "Property names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
