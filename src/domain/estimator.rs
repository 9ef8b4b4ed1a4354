// Charge estimator - coulomb counting with OCV recalibration
use super::ocv::OcvTable;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Minimum electrical rest before an OCV reading reflects true charge state.
pub const MIN_CALIBRATION_REST: Duration = Duration::from_secs(1800);

/// Updates further apart than this are treated as a clock anomaly and skipped.
const MAX_UPDATE_GAP_HOURS: f64 = 1.0;

/// Weighting of the coulomb-counted SOC against a single OCV sample.
const COULOMB_WEIGHT: f64 = 0.7;
const OCV_WEIGHT: f64 = 0.3;

/// Calibration was refused because the pack had not rested long enough.
/// Recoverable: retry once the pack has been quiescent for the full window.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("pack rested {rested_secs:.0}s, OCV calibration needs {required_secs:.0}s at rest")]
pub struct CalibrationRefused {
    pub rested_secs: f64,
    pub required_secs: f64,
}

#[derive(Debug, Clone)]
pub struct EstimatorParams {
    pub capacity_ah: f64,
    pub initial_soc: f64,
    pub charge_efficiency: f64,
    pub reference_temperature: f64,
    /// Capacity derating per degree away from reference, in %/°C.
    pub temperature_coefficient: f64,
    pub cycle_life: f64,
    pub max_degradation: f64,
    pub health_floor: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
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

/// Tracks pack state of charge by integrating current over time.
///
/// Implausible inputs saturate instead of erroring, so the estimator keeps
/// running unattended for the life of the process. The accumulated-charge
/// clamp silently discards charge at the boundaries; integration drift
/// collects there.
#[derive(Debug)]
pub struct ChargeEstimator {
    params: EstimatorParams,
    ocv: OcvTable,
    accumulated_ah: f64,
    charge_in_ah: f64,
    charge_out_ah: f64,
    last_update: Instant,
}

impl ChargeEstimator {
    pub fn new(params: EstimatorParams, ocv: OcvTable, now: Instant) -> Self {
        let accumulated_ah = (params.initial_soc / 100.0) * params.capacity_ah;
        Self {
            params,
            ocv,
            accumulated_ah,
            charge_in_ah: 0.0,
            charge_out_ah: 0.0,
            last_update: now,
        }
    }

    /// Integrate one (current, temperature) sample. Never fails; a zero or
    /// implausibly large elapsed interval advances the clock and changes
    /// nothing else.
    pub fn update(&mut self, current: f64, temperature: f64, now: Instant) {
        let elapsed_hours = now.duration_since(self.last_update).as_secs_f64() / 3600.0;
        self.last_update = now;

        if elapsed_hours == 0.0 || elapsed_hours > MAX_UPDATE_GAP_HOURS {
            return;
        }

        // Hotter or colder than reference, the pack loses more effective
        // capacity per amp drawn. Applied to discharge only.
        let temp_diff = temperature - self.params.reference_temperature;
        let temp_factor =
            (1.0 + self.params.temperature_coefficient * temp_diff / 100.0).clamp(0.8, 1.2);

        if current > 0.0 {
            self.accumulated_ah += current * elapsed_hours * self.params.charge_efficiency;
            self.charge_in_ah += current * elapsed_hours;
        } else if current < 0.0 {
            self.accumulated_ah -= current.abs() * elapsed_hours * temp_factor;
            self.charge_out_ah += current.abs() * elapsed_hours;
        }

        self.accumulated_ah = self.accumulated_ah.clamp(0.0, self.params.capacity_ah);
    }

    /// Blend the coulomb-counted SOC with an open-circuit voltage reading.
    ///
    /// Valid only after the pack has been quiescent for the full rest
    /// window; under load the cell voltage sags below its resting value and
    /// would drag the estimate down. Refusal leaves state untouched.
    pub fn calibrate(
        &mut self,
        avg_cell_voltage: f64,
        rest_duration: Duration,
    ) -> Result<(), CalibrationRefused> {
        if rest_duration < MIN_CALIBRATION_REST {
            return Err(CalibrationRefused {
                rested_secs: rest_duration.as_secs_f64(),
                required_secs: MIN_CALIBRATION_REST.as_secs_f64(),
            });
        }

        let coulomb_soc = self.soc();
        let ocv_soc = self.ocv.soc_from_voltage(avg_cell_voltage);
        let calibrated = COULOMB_WEIGHT * coulomb_soc + OCV_WEIGHT * ocv_soc;
        self.accumulated_ah = (calibrated / 100.0) * self.params.capacity_ah;

        tracing::info!(
            coulomb_soc,
            ocv_soc,
            calibrated,
            voltage = avg_cell_voltage,
            "SOC recalibrated from open-circuit voltage"
        );
        Ok(())
    }

    pub fn soc(&self) -> f64 {
        (self.accumulated_ah / self.params.capacity_ah) * 100.0
    }

    /// Linear degradation over equivalent full cycles, floored so the
    /// estimate never claims a dead pack.
    pub fn soh(&self) -> f64 {
        let degradation =
            (self.cycle_count() as f64 / self.params.cycle_life) * self.params.max_degradation;
        (100.0 - degradation).clamp(self.params.health_floor, 100.0)
    }

    pub fn remaining_capacity(&self) -> f64 {
        self.accumulated_ah
    }

    /// Equivalent full cycles from integrated throughput: one cycle per
    /// full capacity charged and discharged.
    pub fn cycle_count(&self) -> u32 {
        ((self.charge_in_ah + self.charge_out_ah) / (2.0 * self.params.capacity_ah)).floor() as u32
    }

    /// Resting voltage the pack should settle to at the current SOC.
    pub fn expected_voltage(&self) -> f64 {
        self.ocv.voltage_from_soc(self.soc())
    }
}
