// Source trait for per-cycle pack measurements
use crate::domain::measurement::Measurement;
use async_trait::async_trait;

/// Supplies one measurement per cycle. Implementations wrap real acquisition
/// hardware or a simulation; the monitoring cycle does not care which.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Read the current cell voltages, pack current and temperature.
    async fn sample(&self) -> anyhow::Result<Measurement>;
}
