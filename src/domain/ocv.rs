// Open-circuit voltage table - bidirectional SOC/voltage conversion

/// Fixed lookup table of (SOC %, cell voltage) breakpoints, ascending in
/// both columns. Replace the table to model a different chemistry; the
/// estimator never hardcodes voltages.
#[derive(Debug, Clone)]
pub struct OcvTable {
    points: Vec<(f64, f64)>,
}

impl OcvTable {
    /// Breakpoints must be strictly ascending in both SOC and voltage.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        debug_assert!(points.len() >= 2, "OCV table needs at least two breakpoints");
        debug_assert!(
            points.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 < w[1].1),
            "OCV table breakpoints must ascend in both columns"
        );
        Self { points }
    }

    /// The LiFePO4 curve used by the reference pack.
    pub fn lifepo4() -> Self {
        Self::new(vec![
            (0.0, 2.50),
            (10.0, 2.90),
            (20.0, 3.00),
            (30.0, 3.10),
            (40.0, 3.15),
            (50.0, 3.20),
            (60.0, 3.25),
            (70.0, 3.28),
            (80.0, 3.30),
            (90.0, 3.35),
            (100.0, 3.40),
        ])
    }

    /// Expected resting cell voltage for a given SOC. Input outside the
    /// table range is clamped to the table extremes.
    pub fn voltage_from_soc(&self, soc: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let soc = soc.clamp(first.0, last.0);

        for pair in self.points.windows(2) {
            let (soc1, v1) = pair[0];
            let (soc2, v2) = pair[1];
            if soc >= soc1 && soc <= soc2 {
                return v1 + (v2 - v1) * (soc - soc1) / (soc2 - soc1);
            }
        }
        last.1
    }

    /// SOC inferred from a resting cell voltage. Input outside the table
    /// range is clamped to the table extremes.
    pub fn soc_from_voltage(&self, voltage: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let voltage = voltage.clamp(first.1, last.1);

        for pair in self.points.windows(2) {
            let (soc1, v1) = pair[0];
            let (soc2, v2) = pair[1];
            if voltage >= v1 && voltage <= v2 {
                return soc1 + (soc2 - soc1) * (voltage - v1) / (v2 - v1);
            }
        }
        last.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_at_every_breakpoint() {
        let table = OcvTable::lifepo4();
        for &(soc, voltage) in &table.points {
            assert!((table.voltage_from_soc(soc) - voltage).abs() < 1e-9);
            assert!((table.soc_from_voltage(voltage) - soc).abs() < 1e-9);
        }
    }

    #[test]
    fn test_interpolation_between_breakpoints() {
        let table = OcvTable::lifepo4();
        // Midway between (40, 3.15) and (50, 3.20).
        assert!((table.voltage_from_soc(45.0) - 3.175).abs() < 1e-9);
        assert!((table.soc_from_voltage(3.175) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_is_monotonic() {
        let table = OcvTable::lifepo4();
        let mut prev = table.voltage_from_soc(0.0);
        for step in 1..=100 {
            let v = table.voltage_from_soc(step as f64);
            assert!(v >= prev, "voltage decreased at soc {}", step);
            prev = v;
        }
    }

    #[test]
    fn test_out_of_range_clamps_to_extremes() {
        let table = OcvTable::lifepo4();
        assert!((table.voltage_from_soc(-20.0) - 2.50).abs() < 1e-9);
        assert!((table.voltage_from_soc(140.0) - 3.40).abs() < 1e-9);
        assert!((table.soc_from_voltage(1.0) - 0.0).abs() < 1e-9);
        assert!((table.soc_from_voltage(4.2) - 100.0).abs() < 1e-9);
    }
}
