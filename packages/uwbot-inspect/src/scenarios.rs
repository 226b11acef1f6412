//! scenarios.rs: Injectable faults for synthetic telemetry
//!
//! Each scenario exercises one path of the state checker or the status bar.
//! Faults are applied after the nominal record is built, so a scenario never
//! changes the kinematics stub itself.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// Vehicle reboots mid-run: uptime and packet loss restart from zero
    CounterReset,
    /// Water pump reports a code outside 0–3
    BadStatus,
    /// Leak sensor trips, error count goes up
    Leak,
    /// Pack sags through the warning and error bands
    LowBattery,
    /// Link degrades: latency spikes, status goes UNSTABLE, packets drop
    LinkDegraded,
}

impl FromStr for ScenarioType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter_reset" => Ok(Self::CounterReset),
            "bad_status" => Ok(Self::BadStatus),
            "leak" => Ok(Self::Leak),
            "low_battery" => Ok(Self::LowBattery),
            "link_degraded" => Ok(Self::LinkDegraded),
            other => Err(format!("unknown scenario: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub active: Vec<ScenarioType>,
    /// Cycle at which one-off faults (reset, leak, bad status) fire
    pub trigger_cycle: u32,
    /// Out-of-range pump code for BadStatus
    pub bad_status_code: u8,
    /// Extra pack sag per second for LowBattery, volts
    pub battery_sag_v_per_s: f32,
    /// Probability of a lost packet per cycle under LinkDegraded
    pub degraded_loss_rate: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            active: vec![],
            trigger_cycle: 50,
            bad_status_code: 7,
            battery_sag_v_per_s: 0.5,
            degraded_loss_rate: 0.3,
        }
    }
}

impl ScenarioConfig {
    pub fn with_active(active: Vec<ScenarioType>) -> Self {
        Self { active, ..Default::default() }
    }

    pub fn has(&self, s: ScenarioType) -> bool {
        self.active.contains(&s)
    }

    /// True from `trigger_cycle` onwards for scenario `s`.
    pub fn triggered(&self, s: ScenarioType, cycle: u32) -> bool {
        self.has(s) && cycle >= self.trigger_cycle
    }

    /// Packet loss probability per cycle
    pub fn loss_rate(&self, nominal: f64) -> f64 {
        if self.has(ScenarioType::LinkDegraded) { self.degraded_loss_rate } else { nominal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_names() {
        assert_eq!("leak".parse::<ScenarioType>(), Ok(ScenarioType::Leak));
        assert_eq!("counter_reset".parse::<ScenarioType>(), Ok(ScenarioType::CounterReset));
        assert!("sharks".parse::<ScenarioType>().is_err());
    }

    #[test]
    fn trigger_waits_for_cycle() {
        let sc = ScenarioConfig {
            trigger_cycle: 3,
            ..ScenarioConfig::with_active(vec![ScenarioType::Leak])
        };
        assert!(!sc.triggered(ScenarioType::Leak, 2));
        assert!(sc.triggered(ScenarioType::Leak, 3));
        assert!(!sc.triggered(ScenarioType::BadStatus, 10));
    }
}
