//! Companion configuration: gateway plus storage.

use serde::{Deserialize, Serialize};

use compass_agent::{AiGateway, GatewayConfig};
use compass_store::{FileBackend, StoreConfig};

use crate::companion::Companion;
use crate::error::CompanionError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub gateway: GatewayConfig,
    pub store: StoreConfig,
}

impl CompanionConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Defaults with the gateway read from the environment.
    pub fn from_env() -> Self {
        Self {
            gateway: GatewayConfig::from_env(),
            store: StoreConfig::default(),
        }
    }

    /// Build the gateway and open the file-backed store.
    pub fn open(&self) -> Result<Companion<FileBackend>, CompanionError> {
        if !self.gateway.has_api_key() {
            return Err(CompanionError::Config(
                "no API key configured for the gateway".to_string(),
            ));
        }
        let gateway = AiGateway::from_config(self.gateway.clone())?;
        let store = self.store.open()?;
        tracing::info!(
            data_dir = %self.store.data_dir.display(),
            backend = gateway.backend_id(),
            "Companion opened"
        );
        Ok(Companion::new(store, gateway))
    }
}
