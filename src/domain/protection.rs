// Protection classifier - per-fault severity levels and alert assembly
use super::balancing::BalancingStatus;
use super::measurement::Measurement;

/// Ordinal fault severity. `Alarm` always outranks `Warning` when a reading
/// crosses both cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtectionLevel {
    Normal,
    Warning,
    Alarm,
}

impl ProtectionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionLevel::Normal => "normal",
            ProtectionLevel::Warning => "warning",
            ProtectionLevel::Alarm => "alarm",
        }
    }
}

/// Severity levels for every tracked fault category, recomputed in full
/// each cycle.
#[derive(Debug, Clone, Copy)]
pub struct ProtectionLevels {
    pub over_voltage: ProtectionLevel,
    pub under_voltage: ProtectionLevel,
    pub over_current: ProtectionLevel,
    pub over_temperature: ProtectionLevel,
    pub short_circuit: ProtectionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// A transient human-readable alert, rebuilt from scratch every cycle.
#[derive(Debug, Clone)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
    /// SOC reading attached to the overcharge alert only.
    pub soc: Option<f64>,
}

impl Alert {
    fn new(severity: AlertSeverity, message: &str) -> Self {
        Self {
            severity,
            message: message.to_string(),
            soc: None,
        }
    }
}

/// Warning/alarm cutoffs per fault category. Over-voltage is graded on the
/// reported SOC rather than terminal voltage.
#[derive(Debug, Clone)]
pub struct ProtectionThresholds {
    pub soc_warning: f64,
    pub soc_alarm: f64,
    pub under_voltage_warning: f64,
    pub under_voltage_alarm: f64,
    pub over_current_warning: f64,
    pub over_current_alarm: f64,
    pub over_temperature_warning: f64,
    pub over_temperature_alarm: f64,
    /// Discharge magnitude treated as a short circuit, in amps.
    pub short_circuit_current: f64,
    /// Cell spread that counts as an imbalance, in volts.
    pub imbalance_delta: f64,
}

impl Default for ProtectionThresholds {
    fn default() -> Self {
        Self {
            soc_warning: 100.0,
            soc_alarm: 105.0,
            under_voltage_warning: 2.90,
            under_voltage_alarm: 2.60,
            over_current_warning: 9.0,
            over_current_alarm: 12.0,
            over_temperature_warning: 45.0,
            over_temperature_alarm: 55.0,
            short_circuit_current: 30.0,
            imbalance_delta: 0.05,
        }
    }
}

fn grade_high(value: f64, warning: f64, alarm: f64) -> ProtectionLevel {
    if value > alarm {
        ProtectionLevel::Alarm
    } else if value > warning {
        ProtectionLevel::Warning
    } else {
        ProtectionLevel::Normal
    }
}

fn grade_low(value: f64, warning: f64, alarm: f64) -> ProtectionLevel {
    if value < alarm {
        ProtectionLevel::Alarm
    } else if value < warning {
        ProtectionLevel::Warning
    } else {
        ProtectionLevel::Normal
    }
}

/// Grade one cycle's readings against the thresholds.
///
/// Pure function of its inputs: no history, no hysteresis. A reading that
/// hovers on a cutoff will flap between cycles; callers that need debounce
/// must add it upstream.
pub fn classify(
    measurement: &Measurement,
    soc: f64,
    balancing: &BalancingStatus,
    thresholds: &ProtectionThresholds,
) -> (ProtectionLevels, Vec<Alert>) {
    let levels = ProtectionLevels {
        over_voltage: grade_high(soc, thresholds.soc_warning, thresholds.soc_alarm),
        under_voltage: grade_low(
            measurement.min_cell_voltage(),
            thresholds.under_voltage_warning,
            thresholds.under_voltage_alarm,
        ),
        over_current: grade_high(
            measurement.current.abs(),
            thresholds.over_current_warning,
            thresholds.over_current_alarm,
        ),
        over_temperature: grade_high(
            measurement.temperature,
            thresholds.over_temperature_warning,
            thresholds.over_temperature_alarm,
        ),
        short_circuit: if measurement.current <= -thresholds.short_circuit_current {
            ProtectionLevel::Alarm
        } else {
            ProtectionLevel::Normal
        },
    };

    let mut alerts = Vec::new();

    if levels.over_voltage >= ProtectionLevel::Warning {
        let mut alert = if levels.over_voltage == ProtectionLevel::Alarm {
            Alert::new(
                AlertSeverity::Critical,
                "SOC exceeds 105% - possible overcharge condition!",
            )
        } else {
            Alert::new(AlertSeverity::Warning, "SOC above 100% - battery fully charged.")
        };
        alert.soc = Some(soc);
        alerts.push(alert);
    }

    if levels.under_voltage >= ProtectionLevel::Warning {
        alerts.push(if levels.under_voltage == ProtectionLevel::Alarm {
            Alert::new(AlertSeverity::Critical, "Under Voltage ALARM!")
        } else {
            Alert::new(AlertSeverity::Warning, "Under Voltage Warning")
        });
    }

    if levels.over_current >= ProtectionLevel::Warning {
        alerts.push(if levels.over_current == ProtectionLevel::Alarm {
            Alert::new(AlertSeverity::Critical, "Over Current ALARM!")
        } else {
            Alert::new(AlertSeverity::Warning, "Over Current Warning")
        });
    }

    if levels.over_temperature >= ProtectionLevel::Warning {
        alerts.push(if levels.over_temperature == ProtectionLevel::Alarm {
            Alert::new(AlertSeverity::Critical, "Over Temperature ALARM!")
        } else {
            Alert::new(AlertSeverity::Warning, "High Temperature Warning")
        });
    }

    // Short circuit is exported as a status level but never raises an
    // alert; the condition is assumed to trip hardware protection directly.

    if balancing.active && measurement.cell_spread() > thresholds.imbalance_delta {
        alerts.push(Alert::new(
            AlertSeverity::Warning,
            "Cell voltage imbalance detected",
        ));
    }

    (levels, alerts)
}
