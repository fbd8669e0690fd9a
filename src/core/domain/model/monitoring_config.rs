//! Start-monitoring configuration and the settings form that edits it.

use crate::core::domain::{error::ValidationError, value_object::WeightVector};
use serde::{Deserialize, Serialize};

pub const TIME_UNIT_OPTIONS: [&str; 2] = ["1", "5"];
pub const MIN_STEPS: u32 = 3;
pub const MAX_STEPS: u32 = 50;
pub const FORECAST_MODEL_TYPES: [&str; 1] = ["lstm"];
pub const DIRECT_ESTIMATION_MODELS: [&str; 1] = ["ssl"];
pub const INDIRECT_ESTIMATION_MODELS: [&str; 2] = ["xgboost", "mul_reg"];

/// How VM energy is estimated by the migration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMethod {
    Direct,
    #[default]
    Indirect,
}

impl EstimationMethod {
    /// Model types the backend accepts for this method.
    pub fn model_types(self) -> &'static [&'static str] {
        match self {
            EstimationMethod::Direct => &DIRECT_ESTIMATION_MODELS,
            EstimationMethod::Indirect => &INDIRECT_ESTIMATION_MODELS,
        }
    }
}

/// How migration advice is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum MigrationMethod {
    #[default]
    #[serde(rename = "migration_advices_la")]
    Mathematical,
    #[serde(rename = "migration_advices_llm")]
    Ai,
}

/// Whether migrations run automatically or wait for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Auto,
    Semiauto,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MigrationSettings {
    pub script_time_unit: String,
    pub estimation_method: EstimationMethod,
    pub model_type: String,
    pub migration_method: MigrationMethod,
    pub operation_mode: OperationMode,
    #[serde(default)]
    pub block_list: Vec<String>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            script_time_unit: "5".to_string(),
            estimation_method: EstimationMethod::Indirect,
            model_type: "mul_reg".to_string(),
            migration_method: MigrationMethod::Mathematical,
            operation_mode: OperationMode::Auto,
            block_list: Vec::new(),
        }
    }
}

/// Settings shared by the environmental and preventive forecasters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ForecastSettings {
    pub number_of_steps: String,
    pub script_time_unit: String,
    pub model_type: String,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            number_of_steps: MIN_STEPS.to_string(),
            script_time_unit: "1".to_string(),
            model_type: "lstm".to_string(),
        }
    }
}

/// Body of the start-monitoring request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct MonitoringConfig {
    pub migration: MigrationSettings,
    pub environmental: ForecastSettings,
    pub preventive: ForecastSettings,
}

impl MonitoringConfig {
    /// Checks every setting against the values the backend accepts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_time_unit("migration.script_time_unit", &self.migration.script_time_unit)?;
        let models = self.migration.estimation_method.model_types();
        if !models.contains(&self.migration.model_type.as_str()) {
            return Err(ValidationError::field(
                "migration.model_type",
                format!(
                    "'{}' is not one of: {}",
                    self.migration.model_type,
                    models.join(", ")
                ),
            ));
        }
        validate_forecast("environmental", &self.environmental)?;
        validate_forecast("preventive", &self.preventive)
    }
}

fn validate_time_unit(field: &str, value: &str) -> Result<(), ValidationError> {
    if TIME_UNIT_OPTIONS.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::field(
            field,
            format!("'{}' is not one of: {}", value, TIME_UNIT_OPTIONS.join(", ")),
        ))
    }
}

fn validate_forecast(section: &str, settings: &ForecastSettings) -> Result<(), ValidationError> {
    validate_time_unit(&format!("{}.script_time_unit", section), &settings.script_time_unit)?;
    match settings.number_of_steps.parse::<u32>() {
        Ok(steps) if (MIN_STEPS..=MAX_STEPS).contains(&steps) => {}
        _ => {
            return Err(ValidationError::field(
                format!("{}.number_of_steps", section),
                format!("must be between {} and {}", MIN_STEPS, MAX_STEPS),
            ));
        }
    }
    if !FORECAST_MODEL_TYPES.contains(&settings.model_type.as_str()) {
        return Err(ValidationError::field(
            format!("{}.model_type", section),
            format!("'{}' is not a supported model", settings.model_type),
        ));
    }
    Ok(())
}

/// A settings field the operator can change from a select box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    EnvTimeUnit,
    EnvSteps,
    EnvModelType,
    PrevTimeUnit,
    PrevSteps,
    PrevModelType,
    MigrationTime,
    MigrationModel,
    MigrationMethod,
    EstimationMethod,
}

/// Editable monitoring settings; every field goes through [`apply`](Self::apply).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonitoringSettingsForm {
    config: MonitoringConfig,
}

impl MonitoringSettingsForm {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) {
        self.config.migration.operation_mode = mode;
    }

    /// Sets `field` from the raw select value.
    ///
    /// # Errors
    /// Returns a field error for values that enum-typed fields cannot take.
    /// Free-text fields are stored as given and checked by
    /// [`MonitoringConfig::validate`].
    pub fn apply(&mut self, field: SettingField, value: &str) -> Result<(), ValidationError> {
        let value = value.to_string();
        let cfg = &mut self.config;
        match field {
            SettingField::EnvTimeUnit => cfg.environmental.script_time_unit = value,
            SettingField::EnvSteps => cfg.environmental.number_of_steps = value,
            SettingField::EnvModelType => cfg.environmental.model_type = value,
            SettingField::PrevTimeUnit => cfg.preventive.script_time_unit = value,
            SettingField::PrevSteps => cfg.preventive.number_of_steps = value,
            SettingField::PrevModelType => cfg.preventive.model_type = value,
            SettingField::MigrationTime => cfg.migration.script_time_unit = value,
            SettingField::MigrationModel => cfg.migration.model_type = value,
            SettingField::MigrationMethod => {
                cfg.migration.migration_method = match value.as_str() {
                    "mathematical" => MigrationMethod::Mathematical,
                    "AI" | "ai" => MigrationMethod::Ai,
                    other => {
                        return Err(ValidationError::field(
                            "migration.migration_method",
                            format!("'{}' is not one of: mathematical, AI", other),
                        ));
                    }
                }
            }
            SettingField::EstimationMethod => {
                cfg.migration.estimation_method = match value.as_str() {
                    "direct" => EstimationMethod::Direct,
                    "indirect" => EstimationMethod::Indirect,
                    other => {
                        return Err(ValidationError::field(
                            "migration.estimation_method",
                            format!("'{}' is not one of: direct, indirect", other),
                        ));
                    }
                };
                // keep the model consistent with the chosen method
                let models = cfg.migration.estimation_method.model_types();
                if !models.contains(&cfg.migration.model_type.as_str()) {
                    cfg.migration.model_type = models[0].to_string();
                }
            }
        }
        Ok(())
    }

    /// Produces the request body, with `block_list` taken from the saved
    /// optimization selection.
    pub fn build(&self, block_list: &[String]) -> MonitoringConfig {
        let mut config = self.config.clone();
        config.migration.block_list = block_list.to_vec();
        config
    }
}

/// Last-used weights and settings, persisted for reload continuity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct MonitoringPreferences {
    #[serde(default)]
    pub weights: WeightVector,
    #[serde(default)]
    pub config: MonitoringConfig,
}
