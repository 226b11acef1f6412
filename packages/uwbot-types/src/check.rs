//! State consistency checker.
//!
//! Runs on every freshly filled [`StateRecord`] before it is published. It
//! never blocks publication: whatever it finds is attached to the record as
//! [`Anomaly`] values and the record goes out anyway.
//!
//! Thruster and motor cardinality (4 and 3) is fixed by the record's types,
//! so there is nothing left to check for it at runtime.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::command::ValidatedCommand;
use crate::state::{AutoModeStatus, Reported, StateRecord, StatusCode};

/// Session-monotonic counters carried in the state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Counter {
    Uptime,
    PacketLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum Anomaly {
    /// Status code outside its closed set.
    InvalidStatus { field: &'static str, code: u8 },
    /// Counter went backwards: the vehicle restarted or the link reconnected.
    CounterDecreased { counter: Counter, previous: u32, current: u32 },
    /// `auto_mode_status` disagrees with the holds last accepted on the command side.
    AutoModeMismatch { expected: AutoModeStatus, reported: Reported<AutoModeStatus> },
    NonFinite { field: &'static str },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStatus { field, code } => write!(f, "{field}: invalid status code {code}"),
            Self::CounterDecreased { counter, previous, current } => {
                write!(f, "{counter:?} decreased {previous} -> {current} (session reset)")
            }
            Self::AutoModeMismatch { expected, reported } => {
                write!(f, "auto mode {reported:?}, expected {expected:?}")
            }
            Self::NonFinite { field } => write!(f, "{field}: not a finite number"),
        }
    }
}

/// A state record plus everything the checker found wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckedState {
    pub record: StateRecord,
    pub anomalies: Vec<Anomaly>,
    /// Session index, starting at 0 and bumped on every counter decrease.
    pub session: u32,
}

impl CheckedState {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// True when this record opened a new session.
    pub fn session_reset(&self) -> bool {
        self.anomalies.iter().any(|a| matches!(a, Anomaly::CounterDecreased { .. }))
    }
}

#[derive(Debug, Clone, Copy)]
struct Counters {
    uptime_s: u32,
    packet_loss: u32,
}

/// Checker state for one telemetry stream.
#[derive(Debug, Default)]
pub struct StateChecker {
    last: Option<Counters>,
    session: u32,
    expected_auto: Option<AutoModeStatus>,
}

impl StateChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the command the control loop accepted, so the next records'
    /// `auto_mode_status` can be compared against it.
    pub fn acknowledge(&mut self, command: &ValidatedCommand) {
        self.expected_auto = Some(command.autopilot().expected_status());
    }

    pub fn session(&self) -> u32 {
        self.session
    }

    /// Forget the previous record; the next one starts a fresh baseline.
    pub fn reset(&mut self) {
        self.last = None;
        self.expected_auto = None;
    }

    pub fn check(&mut self, record: StateRecord) -> CheckedState {
        let mut anomalies = Vec::new();

        let statuses = [
            status("cleaning.water_pump", record.cleaning.water_pump),
            status("camera.status[0]", record.camera.status[0]),
            status("camera.status[1]", record.camera.status[1]),
            status("comm.status", record.comm.status),
            status("control.mode", record.control.mode),
            status("control.auto_mode", record.control.auto_mode),
        ];
        anomalies.extend(statuses.into_iter().flatten());

        anomalies.extend(
            record
                .float_fields()
                .into_iter()
                .filter(|(_, v)| !v.is_finite())
                .map(|(field, _)| Anomaly::NonFinite { field }),
        );

        if let Some(expected) = self.expected_auto {
            if record.control.auto_mode != Reported::Known(expected) {
                anomalies.push(Anomaly::AutoModeMismatch {
                    expected,
                    reported: record.control.auto_mode,
                });
            }
        }

        let current = Counters {
            uptime_s: record.diagnostics.uptime_s,
            packet_loss: record.comm.packet_loss,
        };
        if let Some(previous) = self.last {
            let decreases = [
                (Counter::Uptime, previous.uptime_s, current.uptime_s),
                (Counter::PacketLoss, previous.packet_loss, current.packet_loss),
            ];
            let before = anomalies.len();
            for (counter, previous, current) in decreases {
                if current < previous {
                    anomalies.push(Anomaly::CounterDecreased { counter, previous, current });
                }
            }
            if anomalies.len() > before {
                self.session += 1;
            }
        }
        self.last = Some(current);

        for anomaly in &anomalies {
            warn!(session = self.session, "state anomaly: {anomaly}");
        }

        CheckedState { record, anomalies, session: self.session }
    }
}

fn status<T: StatusCode>(field: &'static str, value: Reported<T>) -> Option<Anomaly> {
    match value.normalized() {
        Reported::Known(_) => None,
        Reported::Unrecognized(code) => Some(Anomaly::InvalidStatus { field, code }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandRecord;
    use crate::state::{CommStatus, SubsystemStatus};
    use crate::validate;

    fn record(uptime_s: u32, packet_loss: u32) -> StateRecord {
        let mut r = StateRecord::default();
        r.diagnostics.uptime_s = uptime_s;
        r.comm.packet_loss = packet_loss;
        r.comm.status = CommStatus::Ok.into();
        r
    }

    #[test]
    fn clean_monotonic_stream() {
        let mut checker = StateChecker::new();
        for t in 0..5 {
            let checked = checker.check(record(t, t / 2));
            assert!(checked.is_clean(), "{:?}", checked.anomalies);
            assert_eq!(checked.session, 0);
        }
    }

    #[test]
    fn packet_loss_decrease_is_flagged_and_published() {
        let mut checker = StateChecker::new();
        checker.check(record(10, 7));
        let checked = checker.check(record(11, 2));
        assert_eq!(
            checked.anomalies,
            vec![Anomaly::CounterDecreased {
                counter: Counter::PacketLoss,
                previous: 7,
                current: 2,
            }]
        );
        assert!(checked.session_reset());
        assert_eq!(checked.session, 1);
        assert_eq!(checked.record.comm.packet_loss, 2);

        // new baseline: no repeat flag
        assert!(checker.check(record(12, 3)).is_clean());
    }

    #[test]
    fn restart_drops_both_counters_in_one_session_bump() {
        let mut checker = StateChecker::new();
        checker.check(record(500, 40));
        let checked = checker.check(record(1, 0));
        assert_eq!(checked.anomalies.len(), 2);
        assert_eq!(checker.session(), 1);
    }

    #[test]
    fn equal_counters_are_fine() {
        let mut checker = StateChecker::new();
        checker.check(record(5, 5));
        assert!(checker.check(record(5, 5)).is_clean());
    }

    #[test]
    fn invalid_status_codes() {
        let mut r = record(0, 0);
        r.cleaning.water_pump = Reported::Unrecognized(4);
        r.camera.status[1] = Reported::Unrecognized(200);
        r.camera.status[0] = SubsystemStatus::Error.into();
        let checked = StateChecker::new().check(r);
        assert_eq!(
            checked.anomalies,
            vec![
                Anomaly::InvalidStatus { field: "cleaning.water_pump", code: 4 },
                Anomaly::InvalidStatus { field: "camera.status[1]", code: 200 },
            ]
        );
    }

    #[test]
    fn numeric_json_status_in_range_is_not_flagged() {
        let mut json = serde_json::to_value(record(1, 0)).unwrap();
        json["comm"]["status"] = serde_json::json!(1);
        json["control"]["auto_mode"] = serde_json::json!(0);
        let decoded: StateRecord = serde_json::from_value(json).unwrap();
        assert!(matches!(decoded.comm.status, Reported::Known(CommStatus::Ok)));

        let checked = StateChecker::new().check(decoded.clone());
        assert!(checked.is_clean(), "{:?}", checked.anomalies);

        let binary = crate::wire::decode_state(&crate::wire::encode_state(&decoded)).unwrap();
        assert_eq!(binary, decoded);
    }

    #[test]
    fn non_finite_reading() {
        let mut r = record(0, 0);
        r.thrusters[2].temperature_c = f32::NAN;
        let checked = StateChecker::new().check(r);
        assert_eq!(
            checked.anomalies,
            vec![Anomaly::NonFinite { field: "thrusters[2].temperature_c" }]
        );
    }

    #[test]
    fn auto_mode_must_match_last_command() {
        let mut checker = StateChecker::new();
        let cmd = validate(CommandRecord {
            mode_floating: true,
            depth_hold: true,
            target_depth: 2.0,
            ..Default::default()
        })
        .unwrap();
        checker.acknowledge(&cmd);

        let mut r = record(1, 0);
        r.control.auto_mode = AutoModeStatus::DepthHold.into();
        assert!(checker.check(r).is_clean());

        let r = record(2, 0);
        let checked = checker.check(r);
        assert_eq!(
            checked.anomalies,
            vec![Anomaly::AutoModeMismatch {
                expected: AutoModeStatus::DepthHold,
                reported: AutoModeStatus::Manual.into(),
            }]
        );
    }

    #[test]
    fn anomalies_serialize_with_tag() {
        let a = Anomaly::CounterDecreased { counter: Counter::Uptime, previous: 9, current: 1 };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["anomaly"], "counter_decreased");
        assert_eq!(v["counter"], "UPTIME");
    }
}
