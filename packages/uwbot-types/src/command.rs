//! Command Record: operator/autopilot intent for one control cycle.
//!
//! [`CommandRecord`] is the flat, lossless form that crosses the wire. Fields
//! of the inactive locomotion mode still round-trip untouched. A control loop
//! never acts on a `CommandRecord` directly; it acts on the
//! [`ValidatedCommand`] returned by [`crate::validate`], which also exposes the
//! typed [`Locomotion`] view.

use serde::{Deserialize, Serialize};

use crate::state::AutoModeStatus;
use crate::Vec3;

// ── Subsystem groups ──────────────────────────────────────────────────────────

/// Anchoring electromagnet. `voltage_pct` is ignored while disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectromagnetCommand {
    pub enable: bool,
    /// Coil drive, 0–100 %
    pub voltage_pct: u8,
}

/// One cleaning actuator (brush, vacuum or water jet).
/// `power_pct` is ignored while disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningChannel {
    /// Power or flow, 0–100 %
    pub power_pct: u8,
    pub enable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCommand {
    /// 0 = front, 1 = rear
    pub select: u8,
    /// 0–100 %
    pub zoom_pct: u8,
    pub record: bool,
    /// Edge-triggered: the sender clears it after one publish.
    pub snapshot: bool,
}

// ── Command Record ────────────────────────────────────────────────────────────

/// One command snapshot, field order identical to the firmware `LowlevelCmd`.
///
/// The all-zero value (`Default`) is the neutral command: no mode, no motion,
/// every subsystem off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub mode_floating: bool,
    /// m/s, body frame
    pub floating_linear_vel: Vec3,
    /// rad/s, body frame
    pub floating_angular_vel: Vec3,
    pub depth_hold: bool,
    /// Meters below the surface
    pub target_depth: f32,

    pub mode_wheel: bool,
    /// m/s
    pub wheel_linear_vel: f32,
    /// rad/s
    pub wheel_angular_vel: f32,
    /// Crawl gear, 0–5
    pub speed_level: u8,
    pub direction_hold: bool,
    /// Degrees, 0–360
    pub target_direction: f32,

    pub electromagnet: ElectromagnetCommand,
    pub brush: CleaningChannel,
    pub vacuum: CleaningChannel,
    pub water: CleaningChannel,
    pub camera: CameraCommand,

    /// 0 = UI, 1 = gamepad
    pub control_source: u8,

    pub emergency_stop: bool,
    pub auto_surface: bool,
}

impl CommandRecord {
    /// Reset edge-triggered fields once the record has been published.
    pub fn clear_one_shots(&mut self) {
        self.camera.snapshot = false;
    }

    /// Copy of `self` with every motion and autopilot field cleared, keeping the
    /// mode flags and subsystem groups.
    pub(crate) fn with_motion_cleared(&self) -> CommandRecord {
        CommandRecord {
            floating_linear_vel: Vec3::ZERO,
            floating_angular_vel: Vec3::ZERO,
            depth_hold: false,
            target_depth: 0.0,
            wheel_linear_vel: 0.0,
            wheel_angular_vel: 0.0,
            speed_level: 0,
            direction_hold: false,
            target_direction: 0.0,
            auto_surface: false,
            ..*self
        }
    }
}

// ── Selectors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CameraSelect {
    Front = 0,
    Rear = 1,
}

impl CameraSelect {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Front),
            1 => Some(Self::Rear),
            _ => None,
        }
    }
}

/// Which upstream producer is authoritative for this command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ControlSource {
    Ui = 0,
    Gamepad = 1,
}

impl ControlSource {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Ui),
            1 => Some(Self::Gamepad),
            _ => None,
        }
    }
}

// ── Typed locomotion view ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloatingMotion {
    /// m/s
    pub linear: Vec3,
    /// rad/s
    pub angular: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelMotion {
    /// m/s
    pub linear: f32,
    /// rad/s
    pub angular: f32,
    pub speed_level: u8,
}

/// The locomotion intent that actually applies, with the other mode's fields gone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Locomotion {
    /// No mode selected, or emergency stop.
    Idle,
    Floating(FloatingMotion),
    Wheel(WheelMotion),
}

/// Autopilot setpoints; `None` means the hold is off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Autopilot {
    pub depth_m: Option<f32>,
    pub direction_deg: Option<f32>,
}

impl Autopilot {
    /// Status the vehicle is expected to acknowledge in `auto_mode_status`.
    pub fn expected_status(&self) -> AutoModeStatus {
        match (self.depth_m.is_some(), self.direction_deg.is_some()) {
            (false, false) => AutoModeStatus::Manual,
            (true, false) => AutoModeStatus::DepthHold,
            (false, true) => AutoModeStatus::DirectionHold,
            (true, true) => AutoModeStatus::Both,
        }
    }
}

// ── Validated command ─────────────────────────────────────────────────────────

/// A command that passed [`crate::validate`]. Immutable: the control loop sees
/// the same values for the whole cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedCommand {
    record: CommandRecord,
    camera: CameraSelect,
    source: ControlSource,
}

impl ValidatedCommand {
    pub(crate) fn new(record: CommandRecord, camera: CameraSelect, source: ControlSource) -> Self {
        Self { record, camera, source }
    }

    /// The normalized record.
    pub fn record(&self) -> &CommandRecord {
        &self.record
    }

    pub fn into_record(self) -> CommandRecord {
        self.record
    }

    pub fn is_emergency_stop(&self) -> bool {
        self.record.emergency_stop
    }

    pub fn camera_select(&self) -> CameraSelect {
        self.camera
    }

    pub fn control_source(&self) -> ControlSource {
        self.source
    }

    pub fn locomotion(&self) -> Locomotion {
        let r = &self.record;
        if r.emergency_stop {
            return Locomotion::Idle;
        }
        if r.mode_floating {
            Locomotion::Floating(FloatingMotion {
                linear: r.floating_linear_vel,
                angular: r.floating_angular_vel,
            })
        } else if r.mode_wheel {
            Locomotion::Wheel(WheelMotion {
                linear: r.wheel_linear_vel,
                angular: r.wheel_angular_vel,
                speed_level: r.speed_level,
            })
        } else {
            Locomotion::Idle
        }
    }

    pub fn autopilot(&self) -> Autopilot {
        let r = &self.record;
        Autopilot {
            depth_m: r.depth_hold.then_some(r.target_depth),
            direction_deg: r.direction_hold.then_some(r.target_direction),
        }
    }

    /// Electromagnet drive, `None` while disabled.
    pub fn electromagnet_pct(&self) -> Option<u8> {
        let e = self.record.electromagnet;
        e.enable.then_some(e.voltage_pct)
    }

    /// Same record with new motion setpoints. Used by [`crate::VehicleLimits`];
    /// the caller keeps the values finite.
    pub(crate) fn with_record(&self, record: CommandRecord) -> Self {
        Self { record, ..*self }
    }
}
