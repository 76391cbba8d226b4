//! TOML-based run configuration: battery presets, overrides, and strategy
//! parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::BatteryParams;
use crate::strategy::{OracleParams, ScheduleParams, StrategySpec};

/// Top-level run configuration.
///
/// `battery_file` names a preset holding a `[battery]` table; inline
/// `[battery]` values override the preset field by field. Load from TOML
/// with [`RunConfig::from_toml_file`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Optional battery preset, merged under the inline overrides.
    #[serde(default)]
    pub battery_file: Option<String>,
    /// Inline battery values; set fields win over the preset.
    #[serde(default)]
    pub battery: BatteryOverrides,
    pub strategy: StrategyConfig,
}

/// Battery fields as an overlay.
///
/// Every field is optional so that an explicitly set zero (for example
/// `degradation_cost_per_mwh = 0`) still overrides a preset's nonzero
/// value; only absent fields fall through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub energy_capacity_mwh: Option<f64>,
    #[serde(default)]
    pub power_capacity_mw: Option<f64>,
    #[serde(default)]
    pub charge_efficiency: Option<f64>,
    #[serde(default)]
    pub discharge_efficiency: Option<f64>,
    #[serde(default)]
    pub min_soc: Option<f64>,
    #[serde(default)]
    pub max_soc: Option<f64>,
    #[serde(default)]
    pub initial_soc: Option<f64>,
    #[serde(default)]
    pub degradation_cost_per_mwh: Option<f64>,
}

impl BatteryOverrides {
    /// Overlays `self` onto `base`: set fields win, absent fields inherit.
    pub fn over(&self, base: &Self) -> Self {
        Self {
            name: self.name.clone().or_else(|| base.name.clone()),
            energy_capacity_mwh: self.energy_capacity_mwh.or(base.energy_capacity_mwh),
            power_capacity_mw: self.power_capacity_mw.or(base.power_capacity_mw),
            charge_efficiency: self.charge_efficiency.or(base.charge_efficiency),
            discharge_efficiency: self.discharge_efficiency.or(base.discharge_efficiency),
            min_soc: self.min_soc.or(base.min_soc),
            max_soc: self.max_soc.or(base.max_soc),
            initial_soc: self.initial_soc.or(base.initial_soc),
            degradation_cost_per_mwh: self
                .degradation_cost_per_mwh
                .or(base.degradation_cost_per_mwh),
        }
    }

    /// Resolves the overlay into validated parameters plus the initial SOC.
    ///
    /// Capacity and efficiency fields are required; `min_soc`/`max_soc`
    /// default to 0/1, degradation to 0, and `initial_soc` to `min_soc`
    /// so a backtest starts with no free inventory.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` for missing required fields and
    /// `CoreError::InvalidBattery` for out-of-range values.
    pub fn resolve(&self) -> Result<(BatteryParams, f64), CoreError> {
        let required = |field: &str, value: Option<f64>| {
            value.ok_or_else(|| CoreError::config(format!("battery.{field}"), "is required"))
        };

        let params = BatteryParams {
            energy_capacity_mwh: required("energy_capacity_mwh", self.energy_capacity_mwh)?,
            power_capacity_mw: required("power_capacity_mw", self.power_capacity_mw)?,
            charge_efficiency: required("charge_efficiency", self.charge_efficiency)?,
            discharge_efficiency: required("discharge_efficiency", self.discharge_efficiency)?,
            min_soc: self.min_soc.unwrap_or(0.0),
            max_soc: self.max_soc.unwrap_or(1.0),
            degradation_cost_per_mwh: self.degradation_cost_per_mwh.unwrap_or(0.0),
        };
        params.validate()?;

        let initial_soc = self.initial_soc.unwrap_or(params.min_soc);
        if initial_soc < params.min_soc || initial_soc > params.max_soc {
            return Err(CoreError::InvalidBattery(
                "initial SOC must be within [min_soc, max_soc]".to_string(),
            ));
        }
        Ok((params, initial_soc))
    }
}

/// Strategy selection by name plus its parameter table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// `"schedule"` or `"oracle"`.
    pub name: String,
    #[serde(default)]
    pub params: StrategyParamTable,
}

/// Union of all strategy parameters; interpreted per strategy name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyParamTable {
    pub charge_start: Option<String>,
    pub charge_end: Option<String>,
    pub discharge_start: Option<String>,
    pub discharge_end: Option<String>,
    pub charge_power_mw: Option<f64>,
    pub discharge_power_mw: Option<f64>,
    pub soc_steps: Option<usize>,
    pub power_steps: Option<usize>,
}

impl StrategyConfig {
    /// Converts the name + table into a typed spec, applying the
    /// boundary defaults: schedule charges 10:00 until the discharge start
    /// and discharges 17:00 to 23:59; oracle uses a 200 x 10 grid.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownStrategy` for an unrecognized name.
    pub fn to_spec(&self) -> Result<StrategySpec, CoreError> {
        match self.name.as_str() {
            "schedule" => {
                let p = &self.params;
                Ok(StrategySpec::Schedule(ScheduleParams {
                    charge_start: p
                        .charge_start
                        .clone()
                        .unwrap_or_else(|| "10:00".to_string()),
                    charge_end: p.charge_end.clone(),
                    discharge_start: p
                        .discharge_start
                        .clone()
                        .unwrap_or_else(|| "17:00".to_string()),
                    discharge_end: Some(
                        p.discharge_end
                            .clone()
                            .unwrap_or_else(|| "23:59".to_string()),
                    ),
                    charge_power_mw: p.charge_power_mw,
                    discharge_power_mw: p.discharge_power_mw,
                }))
            }
            "oracle" => Ok(StrategySpec::Oracle(OracleParams {
                soc_steps: self.params.soc_steps.unwrap_or(200),
                power_steps: self.params.power_steps.unwrap_or(10),
            })),
            other => Err(CoreError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Wrapper shape of a battery preset file: a single `[battery]` table.
#[derive(Debug, Clone, Deserialize)]
struct BatteryFile {
    battery: BatteryOverrides,
}

/// Loads a battery preset file.
///
/// # Errors
///
/// Returns a `CoreError::Config` if the file cannot be read or parsed.
pub fn load_battery_file(path: &Path) -> Result<BatteryOverrides, CoreError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        CoreError::config(
            "battery_file",
            format!("cannot read \"{}\": {e}", path.display()),
        )
    })?;
    let parsed: BatteryFile = toml::from_str(&raw)
        .map_err(|e| CoreError::config("battery_file", e.to_string()))?;
    Ok(parsed.battery)
}

impl RunConfig {
    /// Parses a run config from a TOML file and resolves its battery preset.
    ///
    /// A relative `battery_file` is resolved against the config file's
    /// directory first, falling back to the path as given.
    ///
    /// # Errors
    ///
    /// Returns a `CoreError::Config` if either file cannot be read or the
    /// TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            CoreError::config(
                "config",
                format!("cannot read \"{}\": {e}", path.display()),
            )
        })?;
        let mut config = Self::from_toml_str(&raw)?;

        if let Some(ref battery_file) = config.battery_file {
            let mut preset_path = Path::new(battery_file).to_path_buf();
            if preset_path.is_relative() {
                if let Some(dir) = path.parent() {
                    let candidate = dir.join(&preset_path);
                    if candidate.exists() {
                        preset_path = candidate;
                    }
                }
            }
            let preset = load_battery_file(&preset_path)?;
            config.battery = config.battery.over(&preset);
        }
        Ok(config)
    }

    /// Parses a run config from a TOML string without preset resolution.
    ///
    /// # Errors
    ///
    /// Returns a `CoreError::Config` if the TOML is invalid or contains
    /// unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        toml::from_str(s).map_err(|e| CoreError::config("toml", e.to_string()))
    }
}
