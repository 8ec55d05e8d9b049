//! Vital signs and the fixed thresholds they are checked against.

use serde::Deserialize;

/// Lowest normal resting heart rate, BPM.
pub const HEART_RATE_MIN: f64 = 50.0;
/// Highest normal heart rate, BPM.
pub const HEART_RATE_MAX: f64 = 120.0;
/// Systolic pressure above this is high.
pub const SYSTOLIC_MAX: f64 = 140.0;
/// Diastolic pressure above this is high.
pub const DIASTOLIC_MAX: f64 = 90.0;
/// Blood oxygen saturation below this is low, percent.
pub const SPO2_MIN: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

/// One reading from the wearable data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VitalSigns {
    pub heart_rate: f64,
    pub blood_pressure: BloodPressure,
    pub spo2: f64,
}

/// A single abnormal measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VitalAlert {
    HeartRate(f64),
    BloodPressure(BloodPressure),
    BloodOxygen(f64),
}

impl std::fmt::Display for VitalAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeartRate(bpm) => {
                write!(f, "Alerta: Tu frecuencia cardiaca es anormal ({bpm} BPM).")
            }
            Self::BloodPressure(bp) => write!(
                f,
                "Alerta: Tu presión arterial está alta ({}/{}).",
                bp.systolic, bp.diastolic
            ),
            Self::BloodOxygen(spo2) => {
                write!(f, "Alerta: Tu nivel de oxígeno en sangre es bajo ({spo2}%).")
            }
        }
    }
}

impl VitalSigns {
    /// Check each rule independently; any number of alerts may fire.
    pub fn evaluate(&self) -> Vec<VitalAlert> {
        let mut alerts = Vec::new();
        if self.heart_rate < HEART_RATE_MIN || self.heart_rate > HEART_RATE_MAX {
            alerts.push(VitalAlert::HeartRate(self.heart_rate));
        }
        if self.blood_pressure.systolic > SYSTOLIC_MAX
            || self.blood_pressure.diastolic > DIASTOLIC_MAX
        {
            alerts.push(VitalAlert::BloodPressure(self.blood_pressure));
        }
        if self.spo2 < SPO2_MIN {
            alerts.push(VitalAlert::BloodOxygen(self.spo2));
        }
        alerts
    }
}
