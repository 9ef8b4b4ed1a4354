// BMS snapshot - the immutable per-cycle export artifact
use super::balancing::BalancingStatus;
use super::measurement::Measurement;
use super::protection::{Alert, ProtectionLevels};
use chrono::{DateTime, Utc};

/// Current magnitude below which the pack counts as idle, in amps.
const IDLE_CURRENT_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingStatus {
    Charging,
    Discharging,
    Idle,
}

impl ChargingStatus {
    pub fn from_current(current: f64) -> Self {
        if current > IDLE_CURRENT_BAND {
            ChargingStatus::Charging
        } else if current < -IDLE_CURRENT_BAND {
            ChargingStatus::Discharging
        } else {
            ChargingStatus::Idle
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargingStatus::Charging => "charging",
            ChargingStatus::Discharging => "discharging",
            ChargingStatus::Idle => "idle",
        }
    }
}

/// Everything a presentation collaborator may read about one cycle.
/// Published whole; the next cycle replaces it rather than mutating it.
#[derive(Debug, Clone)]
pub struct BmsSnapshot {
    pub measurement: Measurement,
    pub captured_at: DateTime<Utc>,
    pub soc: f64,
    pub soh: f64,
    pub remaining_capacity_ah: f64,
    pub cycle_count: u32,
    pub expected_ocv: f64,
    pub charging: ChargingStatus,
    pub balancing: BalancingStatus,
    pub protection: ProtectionLevels,
    pub alerts: Vec<Alert>,
}
