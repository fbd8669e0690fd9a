pub mod migration;
pub mod monitoring;
pub mod monitoring_config;
pub mod placement;
pub mod selection;
pub mod stress;
pub mod telemetry;
pub mod vm_details;

use crate::core::domain::error::ValidationError;
use serde::de::DeserializeOwned;

/// A backend response body: parsed with serde, then checked against the
/// domain constraints serde cannot express.
pub trait Payload: DeserializeOwned + Send + 'static {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Payload for serde_json::Value {}
