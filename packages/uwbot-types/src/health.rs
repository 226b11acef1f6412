//! Operator status-bar levels derived from a state record.

use serde::{Deserialize, Serialize};

use crate::state::{CommStatus, Reported, StateRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLevel {
    Normal,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    /// Main bus below this is a warning (48 V pack)
    pub voltage_warning_v: f32,
    pub voltage_error_v: f32,
    pub latency_warning_ms: u16,
    pub latency_error_ms: u16,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            voltage_warning_v: 44.0,
            voltage_error_v: 42.0,
            latency_warning_ms: 100,
            latency_error_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub voltage: HealthLevel,
    pub comm: HealthLevel,
    pub latency: HealthLevel,
    pub leak: HealthLevel,
}

impl HealthSummary {
    pub fn assess(state: &StateRecord, t: &StatusThresholds) -> Self {
        let v = state.power.voltage_v;
        // NaN compares false everywhere, so it lands on Error
        let voltage = if v >= t.voltage_warning_v {
            HealthLevel::Normal
        } else if v >= t.voltage_error_v {
            HealthLevel::Warning
        } else {
            HealthLevel::Error
        };

        let comm = match state.comm.status.normalized() {
            Reported::Known(CommStatus::Ok) => HealthLevel::Normal,
            Reported::Known(CommStatus::HighLatency | CommStatus::Unstable) => HealthLevel::Warning,
            Reported::Known(CommStatus::Disconnected) | Reported::Unrecognized(_) => {
                HealthLevel::Error
            }
        };

        let ms = state.comm.latency_ms;
        let latency = if ms > t.latency_error_ms {
            HealthLevel::Error
        } else if ms > t.latency_warning_ms {
            HealthLevel::Warning
        } else {
            HealthLevel::Normal
        };

        let leak = if state.diagnostics.leak_detected {
            HealthLevel::Error
        } else {
            HealthLevel::Normal
        };

        Self { voltage, comm, latency, leak }
    }

    pub fn overall(&self) -> HealthLevel {
        self.voltage.max(self.comm).max(self.latency).max(self.leak)
    }
}

/// "1d 3h 5m"; seconds only shown below one minute.
pub fn format_uptime(seconds: u32) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if parts.is_empty() {
        parts.push(format!("{}s", seconds % 60));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> StateRecord {
        let mut s = StateRecord::default();
        s.power.voltage_v = 48.5;
        s.comm.status = CommStatus::Ok.into();
        s.comm.latency_ms = 20;
        s
    }

    #[test]
    fn healthy_vehicle_is_normal() {
        let h = HealthSummary::assess(&healthy(), &StatusThresholds::default());
        assert_eq!(h.overall(), HealthLevel::Normal);
    }

    #[test]
    fn voltage_bands() {
        let t = StatusThresholds::default();
        let mut s = healthy();
        s.power.voltage_v = 43.0;
        assert_eq!(HealthSummary::assess(&s, &t).voltage, HealthLevel::Warning);
        s.power.voltage_v = 41.9;
        assert_eq!(HealthSummary::assess(&s, &t).voltage, HealthLevel::Error);
        s.power.voltage_v = 44.0;
        assert_eq!(HealthSummary::assess(&s, &t).voltage, HealthLevel::Normal);
    }

    #[test]
    fn comm_and_latency() {
        let t = StatusThresholds::default();
        let mut s = healthy();
        s.comm.status = CommStatus::Unstable.into();
        s.comm.latency_ms = 150;
        let h = HealthSummary::assess(&s, &t);
        assert_eq!(h.comm, HealthLevel::Warning);
        assert_eq!(h.latency, HealthLevel::Warning);

        s.comm.status = Reported::Unrecognized(5);
        s.comm.latency_ms = 301;
        let h = HealthSummary::assess(&s, &t);
        assert_eq!(h.comm, HealthLevel::Error);
        assert_eq!(h.latency, HealthLevel::Error);
    }

    #[test]
    fn leak_dominates() {
        let mut s = healthy();
        s.diagnostics.leak_detected = true;
        let h = HealthSummary::assess(&s, &StatusThresholds::default());
        assert_eq!(h.leak, HealthLevel::Error);
        assert_eq!(h.overall(), HealthLevel::Error);
    }

    #[test]
    fn uptime_text() {
        assert_eq!(format_uptime(0), "0s");
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(3_785), "1h 3m");
        assert_eq!(format_uptime(90_000), "1d 1h");
    }
}
