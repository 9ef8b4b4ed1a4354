// Simulated pack sensors - charge/discharge cycling without hardware
use crate::application::measurement_source::MeasurementSource;
use crate::domain::measurement::Measurement;
use async_trait::async_trait;
use std::time::Instant;

/// One full simulated cycle: charge, discharge, rest.
const CYCLE_SECS: f64 = 120.0;
const PHASE_SECS: f64 = 40.0;

const CHARGE_CURRENT: f64 = 1.5;
const DISCHARGE_CURRENT: f64 = -1.2;

/// Small fixed per-cell deviations so the pack never reads perfectly even.
const CELL_OFFSETS: [f64; 4] = [0.01, 0.005, -0.005, -0.01];

/// Drop-in measurement source that plays a 120-second charge/discharge/idle
/// loop: cell voltage ramps 3.0 → 3.4 V while charging, back down while
/// discharging, and settles near 3.2 V at rest. Temperature drifts around
/// 25 °C and rises under load.
pub struct SimulatedSensors {
    num_cells: usize,
    started: Instant,
}

impl SimulatedSensors {
    pub fn new(num_cells: usize) -> Self {
        Self {
            num_cells,
            started: Instant::now(),
        }
    }

    fn sample_at(&self, now: Instant) -> Measurement {
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let cycle_time = elapsed % CYCLE_SECS;

        let (current, base_voltage, load_heat) = if cycle_time < PHASE_SECS {
            let progress = cycle_time / PHASE_SECS;
            (CHARGE_CURRENT, 3.0 + progress * 0.4, 2.0)
        } else if cycle_time < 2.0 * PHASE_SECS {
            let progress = (cycle_time - PHASE_SECS) / PHASE_SECS;
            (DISCHARGE_CURRENT, 3.4 - progress * 0.4, 3.0)
        } else {
            (0.0, 3.20, 0.0)
        };

        let cell_voltages = (0..self.num_cells)
            .map(|i| base_voltage + CELL_OFFSETS[i % CELL_OFFSETS.len()])
            .collect();

        let temperature =
            (25.0 + (elapsed * 0.01).sin() * 5.0 + load_heat).clamp(10.0, 50.0);

        Measurement::new(cell_voltages, current, temperature, now)
    }
}

#[async_trait]
impl MeasurementSource for SimulatedSensors {
    async fn sample(&self) -> anyhow::Result<Measurement> {
        Ok(self.sample_at(Instant::now()))
    }
}
