//! Deployment manifest handed to UI and oracle processes

use serde::{Deserialize, Serialize};
use std::path::Path;
use surety_common::{AccountId, Result, SuretyError};
use tracing::info;

/// Where to reach a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    /// Network endpoint
    pub url: String,
    /// Ledger identity
    pub data_address: AccountId,
    /// App identity
    pub app_address: AccountId,
}

impl DeploymentManifest {
    pub fn new(url: impl Into<String>, data_address: AccountId, app_address: AccountId) -> Self {
        Self {
            url: url.into(),
            data_address,
            app_address,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SuretyError::Config(format!("manifest encoding failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SuretyError::Config(format!("manifest decoding failed: {}", e)))
    }

    /// Write the manifest as pretty JSON
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            SuretyError::Unavailable(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Deployment manifest written");
        Ok(())
    }
}
