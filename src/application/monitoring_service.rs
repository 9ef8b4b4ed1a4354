// Monitoring service - drives the measure/estimate/classify cycle
use crate::application::measurement_source::MeasurementSource;
use crate::domain::balancing::BalancingPolicy;
use crate::domain::estimator::{ChargeEstimator, MIN_CALIBRATION_REST};
use crate::domain::measurement::Measurement;
use crate::domain::protection::{classify, ProtectionThresholds};
use crate::domain::snapshot::{BmsSnapshot, ChargingStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Owns the charge estimator and runs one full cycle per measurement:
/// integrate the sample, evaluate balancing, classify protection and publish
/// a fresh snapshot. The estimator state lives here and nowhere else; the
/// rest of the process only ever sees published snapshots.
pub struct MonitoringService {
    source: Arc<dyn MeasurementSource>,
    estimator: ChargeEstimator,
    thresholds: ProtectionThresholds,
    balancing: BalancingPolicy,
    /// Start of the current quiescent stretch, if any.
    rest_since: Option<Instant>,
    snapshot_tx: watch::Sender<Option<BmsSnapshot>>,
    cycle_counter: u64,
}

impl MonitoringService {
    pub fn new(
        source: Arc<dyn MeasurementSource>,
        estimator: ChargeEstimator,
        thresholds: ProtectionThresholds,
        balancing: BalancingPolicy,
    ) -> (Self, watch::Receiver<Option<BmsSnapshot>>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let service = Self {
            source,
            estimator,
            thresholds,
            balancing,
            rest_since: None,
            snapshot_tx,
            cycle_counter: 0,
        };
        (service, snapshot_rx)
    }

    /// Run forever at a fixed cadence. A failed sensor read skips the cycle;
    /// nothing in here terminates the loop.
    pub async fn run(mut self, period: Duration) {
        tracing::info!(period_ms = period.as_millis() as u64, "starting monitoring cycle");
        let mut ticker = tokio::time::interval(period);

        loop {
            ticker.tick().await;
            match self.source.sample().await {
                Ok(measurement) => {
                    let snapshot = self.run_cycle(measurement);
                    if self.cycle_counter % 10 == 0 {
                        debug!(
                            cycle = self.cycle_counter,
                            soc = snapshot.soc,
                            soh = snapshot.soh,
                            charging = snapshot.charging.as_str(),
                            alerts = snapshot.alerts.len(),
                            "cycle complete"
                        );
                    }
                    self.snapshot_tx.send_replace(Some(snapshot));
                }
                Err(e) => {
                    warn!(error = %e, "measurement read failed, skipping cycle");
                }
            }
        }
    }

    /// One synchronous cycle. Update and calibration share this single call
    /// path, so they can never race each other over the estimator.
    fn run_cycle(&mut self, measurement: Measurement) -> BmsSnapshot {
        self.cycle_counter += 1;

        self.estimator
            .update(measurement.current, measurement.temperature, measurement.timestamp);

        self.track_rest(&measurement);

        let charging = ChargingStatus::from_current(measurement.current);
        let balancing = self.balancing.evaluate(
            &measurement.cell_voltages,
            charging == ChargingStatus::Charging,
        );
        let (protection, alerts) =
            classify(&measurement, self.estimator.soc(), &balancing, &self.thresholds);

        BmsSnapshot {
            captured_at: Utc::now(),
            soc: self.estimator.soc(),
            soh: self.estimator.soh(),
            remaining_capacity_ah: self.estimator.remaining_capacity(),
            cycle_count: self.estimator.cycle_count(),
            expected_ocv: self.estimator.expected_voltage(),
            charging,
            balancing,
            protection,
            alerts,
            measurement,
        }
    }

    /// Track electrical quiescence and recalibrate from OCV once the pack
    /// has rested through the full window. The timer restarts after each
    /// calibration so a long idle stretch recalibrates at most once per
    /// window, and any current flow resets it.
    fn track_rest(&mut self, measurement: &Measurement) {
        if ChargingStatus::from_current(measurement.current) != ChargingStatus::Idle {
            self.rest_since = None;
            return;
        }

        let rest_since = *self.rest_since.get_or_insert(measurement.timestamp);
        let rested = measurement.timestamp.duration_since(rest_since);
        if rested < MIN_CALIBRATION_REST {
            return;
        }

        match self.estimator.calibrate(measurement.avg_cell_voltage(), rested) {
            Ok(()) => {
                self.rest_since = Some(measurement.timestamp);
            }
            Err(refused) => {
                warn!(error = %refused, "OCV calibration refused");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::estimator::EstimatorParams;
    use crate::domain::ocv::OcvTable;
    use crate::domain::protection::ProtectionLevel;
    use async_trait::async_trait;

    struct FixedSource {
        cells: Vec<f64>,
        current: f64,
        temperature: f64,
    }

    #[async_trait]
    impl MeasurementSource for FixedSource {
        async fn sample(&self) -> anyhow::Result<Measurement> {
            Ok(Measurement::new(
                self.cells.clone(),
                self.current,
                self.temperature,
                Instant::now(),
            ))
        }
    }

    fn service_at(initial_soc: f64, now: Instant) -> (MonitoringService, watch::Receiver<Option<BmsSnapshot>>) {
        let source = Arc::new(FixedSource {
            cells: vec![3.20; 4],
            current: 0.0,
            temperature: 25.0,
        });
        let params = EstimatorParams {
            initial_soc,
            ..EstimatorParams::default()
        };
        let estimator = ChargeEstimator::new(params, OcvTable::lifepo4(), now);
        MonitoringService::new(
            source,
            estimator,
            ProtectionThresholds::default(),
            BalancingPolicy::default(),
        )
    }

    fn idle_at(t: Instant) -> Measurement {
        Measurement::new(vec![3.20; 4], 0.0, 25.0, t)
    }

    #[test]
    fn test_cycle_publishes_estimator_output() {
        let t0 = Instant::now();
        let (mut service, _rx) = service_at(100.0, t0);

        let m = Measurement::new(
            vec![3.30, 3.30, 3.30, 3.30],
            -1.2,
            25.0,
            t0 + Duration::from_secs(3600),
        );
        let snapshot = service.run_cycle(m);

        assert!((snapshot.soc - 80.0).abs() < 1e-9);
        assert_eq!(snapshot.charging, ChargingStatus::Discharging);
        assert!(!snapshot.balancing.active);
        assert_eq!(snapshot.protection.over_voltage, ProtectionLevel::Normal);
        assert!((snapshot.expected_ocv - 3.30).abs() < 1e-9);
        assert!(snapshot.alerts.is_empty());
    }

    #[test]
    fn test_balancing_engages_while_charging() {
        let t0 = Instant::now();
        let (mut service, _rx) = service_at(50.0, t0);

        let m = Measurement::new(
            vec![3.30, 3.30, 3.30, 3.36],
            1.5,
            25.0,
            t0 + Duration::from_secs(1),
        );
        let snapshot = service.run_cycle(m);

        assert_eq!(snapshot.charging, ChargingStatus::Charging);
        assert!(snapshot.balancing.active);
        assert_eq!(snapshot.balancing.cells, vec![4]);
        // Spread 0.06 V crosses the imbalance delta while balancing.
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].message, "Cell voltage imbalance detected");
    }

    #[test]
    fn test_rested_pack_recalibrates_once_per_window() {
        let t0 = Instant::now();
        let (mut service, _rx) = service_at(100.0, t0);

        // Rest begins on the first idle cycle.
        service.run_cycle(idle_at(t0 + Duration::from_secs(1)));
        // 1801 s later the gate opens: 3.20 V reads as 50% SOC, so the
        // blend lands at 0.7*100 + 0.3*50.
        let snapshot = service.run_cycle(idle_at(t0 + Duration::from_secs(1802)));
        assert!((snapshot.soc - 85.0).abs() < 1e-9);

        // The window restarted: the very next idle cycle must not blend again.
        let snapshot = service.run_cycle(idle_at(t0 + Duration::from_secs(1803)));
        assert!((snapshot.soc - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_current_flow_resets_the_rest_timer() {
        let t0 = Instant::now();
        let (mut service, _rx) = service_at(100.0, t0);

        service.run_cycle(idle_at(t0 + Duration::from_secs(1)));
        // A discharge pulse interrupts the rest window.
        service.run_cycle(Measurement::new(
            vec![3.20; 4],
            -1.2,
            25.0,
            t0 + Duration::from_secs(900),
        ));
        // 1800 s after the original idle start, but only 902 s after the
        // pulse: no calibration. SOC only reflects the one pulse.
        let snapshot = service.run_cycle(idle_at(t0 + Duration::from_secs(1802)));
        let expected = (6.0 - 1.2 * (899.0 / 3600.0)) / 6.0 * 100.0;
        assert!((snapshot.soc - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_run_publishes_snapshots() {
        let t0 = Instant::now();
        let (service, mut rx) = service_at(100.0, t0);

        let handle = tokio::spawn(service.run(Duration::from_millis(5)));
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());
        handle.abort();
    }
}
