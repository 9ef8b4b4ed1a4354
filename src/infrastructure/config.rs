use crate::domain::balancing::BalancingPolicy;
use crate::domain::estimator::EstimatorParams;
use crate::domain::protection::ProtectionThresholds;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BmsConfig {
    #[serde(default)]
    pub battery: BatterySettings,
    #[serde(default)]
    pub protection: ProtectionSettings,
    #[serde(default)]
    pub balancing: BalancingSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BatterySettings {
    pub num_cells: usize,
    pub capacity_ah: f64,
    pub initial_soc: f64,
    pub charge_efficiency: f64,
    pub reference_temperature: f64,
    pub temperature_coefficient: f64,
    pub cycle_life: f64,
    pub max_degradation: f64,
    pub health_floor: f64,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            num_cells: 4,
            capacity_ah: 6.0,
            initial_soc: 100.0,
            charge_efficiency: 0.97,
            reference_temperature: 25.0,
            temperature_coefficient: 0.6,
            cycle_life: 2000.0,
            max_degradation: 20.0,
            health_floor: 50.0,
        }
    }
}

impl BatterySettings {
    pub fn estimator_params(&self) -> EstimatorParams {
        EstimatorParams {
            capacity_ah: self.capacity_ah,
            initial_soc: self.initial_soc,
            charge_efficiency: self.charge_efficiency,
            reference_temperature: self.reference_temperature,
            temperature_coefficient: self.temperature_coefficient,
            cycle_life: self.cycle_life,
            max_degradation: self.max_degradation,
            health_floor: self.health_floor,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProtectionSettings {
    pub soc_warning: f64,
    pub soc_alarm: f64,
    pub under_voltage_warning: f64,
    pub under_voltage_alarm: f64,
    pub over_current_warning: f64,
    pub over_current_alarm: f64,
    pub over_temperature_warning: f64,
    pub over_temperature_alarm: f64,
    pub short_circuit_current: f64,
    pub imbalance_delta: f64,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        let t = ProtectionThresholds::default();
        Self {
            soc_warning: t.soc_warning,
            soc_alarm: t.soc_alarm,
            under_voltage_warning: t.under_voltage_warning,
            under_voltage_alarm: t.under_voltage_alarm,
            over_current_warning: t.over_current_warning,
            over_current_alarm: t.over_current_alarm,
            over_temperature_warning: t.over_temperature_warning,
            over_temperature_alarm: t.over_temperature_alarm,
            short_circuit_current: t.short_circuit_current,
            imbalance_delta: t.imbalance_delta,
        }
    }
}

impl ProtectionSettings {
    pub fn thresholds(&self) -> ProtectionThresholds {
        ProtectionThresholds {
            soc_warning: self.soc_warning,
            soc_alarm: self.soc_alarm,
            under_voltage_warning: self.under_voltage_warning,
            under_voltage_alarm: self.under_voltage_alarm,
            over_current_warning: self.over_current_warning,
            over_current_alarm: self.over_current_alarm,
            over_temperature_warning: self.over_temperature_warning,
            over_temperature_alarm: self.over_temperature_alarm,
            short_circuit_current: self.short_circuit_current,
            imbalance_delta: self.imbalance_delta,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BalancingSettings {
    pub activation_delta: f64,
    pub cell_flag_delta: f64,
}

impl Default for BalancingSettings {
    fn default() -> Self {
        let p = BalancingPolicy::default();
        Self {
            activation_delta: p.activation_delta,
            cell_flag_delta: p.cell_flag_delta,
        }
    }
}

impl BalancingSettings {
    pub fn policy(&self) -> BalancingPolicy {
        BalancingPolicy {
            activation_delta: self.activation_delta,
            cell_flag_delta: self.cell_flag_delta,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingSettings {
    pub interval_ms: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

pub fn load_bms_config() -> anyhow::Result<BmsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/bms").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
