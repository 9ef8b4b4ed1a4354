// Mapper to convert the snapshot into its wire JSON shape
use crate::domain::snapshot::BmsSnapshot;
use serde_json::{json, Value};

/// Build the `/bms` payload. Numeric readings are serialized as fixed-
/// precision strings so the wire format is stable regardless of float
/// representation: cell voltages to 3 decimals, pack voltage and current to
/// 2, temperature and SOC/SOH to 1.
pub fn snapshot_to_json(snapshot: &BmsSnapshot) -> Value {
    let cells: Vec<Value> = snapshot
        .measurement
        .cell_voltages
        .iter()
        .enumerate()
        .map(|(i, v)| {
            json!({
                "cell": i + 1,
                "voltage": format!("{v:.3}"),
            })
        })
        .collect();

    let alerts: Vec<Value> = snapshot
        .alerts
        .iter()
        .map(|alert| {
            let mut body = json!({
                "severity": alert.severity.as_str(),
                "message": alert.message,
            });
            if let Some(soc) = alert.soc {
                body["soc"] = json!(format!("{soc:.1}"));
            }
            body
        })
        .collect();

    json!({
        "measurement": {
            "cellVoltages": cells,
            "packVoltage": format!("{:.2}", snapshot.measurement.pack_voltage()),
            "current": format!("{:.2}", snapshot.measurement.current),
            "packTemperature": format!("{:.1}", snapshot.measurement.temperature),
        },
        "calculation": {
            "soc": format!("{:.1}", snapshot.soc),
            "soh": format!("{:.1}", snapshot.soh),
            "remainingAh": format!("{:.3}", snapshot.remaining_capacity_ah),
            "cycleCount": snapshot.cycle_count,
            "expectedOcv": format!("{:.3}", snapshot.expected_ocv),
        },
        "status": {
            "charging": snapshot.charging.as_str(),
            "balancing": {
                "active": snapshot.balancing.active,
                "cells": snapshot.balancing.cells,
            },
        },
        "protection": {
            "overVoltage": snapshot.protection.over_voltage.as_str(),
            "underVoltage": snapshot.protection.under_voltage.as_str(),
            "overCurrent": snapshot.protection.over_current.as_str(),
            "overTemperature": snapshot.protection.over_temperature.as_str(),
            "shortCircuit": snapshot.protection.short_circuit.as_str(),
        },
        "alerts": alerts,
        "capturedAt": snapshot.captured_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::balancing::BalancingStatus;
    use crate::domain::measurement::Measurement;
    use crate::domain::protection::{Alert, AlertSeverity, ProtectionLevel, ProtectionLevels};
    use crate::domain::snapshot::ChargingStatus;
    use chrono::Utc;
    use std::time::Instant;

    fn snapshot() -> BmsSnapshot {
        BmsSnapshot {
            measurement: Measurement::new(
                vec![3.40, 3.40, 3.40, 3.40],
                -1.2,
                28.34,
                Instant::now(),
            ),
            captured_at: Utc::now(),
            soc: 80.04,
            soh: 99.98,
            remaining_capacity_ah: 4.8024,
            cycle_count: 2,
            expected_ocv: 3.3001,
            charging: ChargingStatus::Discharging,
            balancing: BalancingStatus {
                active: true,
                cells: vec![2, 4],
            },
            protection: ProtectionLevels {
                over_voltage: ProtectionLevel::Normal,
                under_voltage: ProtectionLevel::Warning,
                over_current: ProtectionLevel::Normal,
                over_temperature: ProtectionLevel::Normal,
                short_circuit: ProtectionLevel::Normal,
            },
            alerts: vec![Alert {
                severity: AlertSeverity::Warning,
                message: "Under Voltage Warning".to_string(),
                soc: None,
            }],
        }
    }

    #[test]
    fn test_measurement_formatting() {
        let v = snapshot_to_json(&snapshot());
        assert_eq!(v["measurement"]["cellVoltages"][0]["cell"], 1);
        assert_eq!(v["measurement"]["cellVoltages"][0]["voltage"], "3.400");
        assert_eq!(v["measurement"]["packVoltage"], "13.60");
        assert_eq!(v["measurement"]["current"], "-1.20");
        assert_eq!(v["measurement"]["packTemperature"], "28.3");
        assert_eq!(v["calculation"]["expectedOcv"], "3.300");
    }

    #[test]
    fn test_calculation_and_status_sections() {
        let v = snapshot_to_json(&snapshot());
        assert_eq!(v["calculation"]["soc"], "80.0");
        assert_eq!(v["calculation"]["soh"], "100.0");
        assert_eq!(v["calculation"]["cycleCount"], 2);
        assert_eq!(v["status"]["charging"], "discharging");
        assert_eq!(v["status"]["balancing"]["active"], true);
        assert_eq!(v["status"]["balancing"]["cells"][1], 4);
    }

    #[test]
    fn test_protection_levels_render_as_strings() {
        let v = snapshot_to_json(&snapshot());
        assert_eq!(v["protection"]["overVoltage"], "normal");
        assert_eq!(v["protection"]["underVoltage"], "warning");
        assert_eq!(v["protection"]["shortCircuit"], "normal");
    }

    #[test]
    fn test_alerts_include_soc_only_when_present() {
        let mut s = snapshot();
        let v = snapshot_to_json(&s);
        assert_eq!(v["alerts"][0]["severity"], "warning");
        assert!(v["alerts"][0].get("soc").is_none());

        s.alerts = vec![Alert {
            severity: AlertSeverity::Critical,
            message: "SOC exceeds 105% - possible overcharge condition!".to_string(),
            soc: Some(106.2),
        }];
        let v = snapshot_to_json(&s);
        assert_eq!(v["alerts"][0]["soc"], "106.2");
    }
}
