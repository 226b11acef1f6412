//! # uwbot-types
//!
//! Shared command/state records for the UWBot hybrid underwater vehicle
//! (free-swimming "floating" mode + wheeled "crawling" mode, plus cleaning,
//! camera and electromagnet subsystems).
//!
//! These types are used by:
//! - the operator/autopilot side: builds a [`CommandRecord`] every cycle and
//!   publishes it on [`COMMAND_CHANNEL`]
//! - the vehicle controller: accepts commands only through [`validate`],
//!   fills a [`StateRecord`] and publishes it on [`STATE_CHANNEL`]
//! - observers/UI: consume the output of [`StateChecker`], anomalies included
//!
//! ## Units
//!
//! - Lengths in meters, linear velocity in m/s, angular velocity in rad/s
//! - Orientation (roll/pitch/yaw) in radians; `target_direction` in degrees
//! - Percentages are integers 0–100
//!
//! ## Invariants
//! - A command reaches actuation only as a [`ValidatedCommand`]
//! - `emergency_stop` overrides every motion field
//! - Telemetry is never dropped: anomalies are attached, not raised
//! - Wire layout is byte-identical to the firmware `LowlevelCmd` / `LowlevelState` C structs

use serde::{Deserialize, Serialize};

pub mod check;
pub mod command;
pub mod error;
pub mod health;
pub mod limits;
pub mod state;
pub mod validate;
pub mod wire;

pub use check::{Anomaly, CheckedState, Counter, StateChecker};
pub use command::{
    Autopilot, CameraCommand, CameraSelect, CleaningChannel, CommandRecord, ControlSource,
    ElectromagnetCommand, FloatingMotion, Locomotion, ValidatedCommand, WheelMotion,
};
pub use error::{Rejection, RejectionKind, TextError, WireError};
pub use health::{format_uptime, HealthLevel, HealthSummary, StatusThresholds};
pub use limits::VehicleLimits;
pub use state::{
    Attitude, AutoModeStatus, BoundedText, CameraState, CleaningState, CommState, CommStatus,
    ControlMode, ControlState, Diagnostics, DriveReading, ElectromagnetState, Environment,
    Kinematics, MotorBank, Pose, Power, Reported, StateRecord, StatusCode, SteeringReading,
    SubsystemStatus, ThrusterReading,
};
pub use validate::validate;

// ── Transport collaborator constants ──────────────────────────────────────────

/// Channel carrying [`CommandRecord`]s, operator → vehicle.
pub const COMMAND_CHANNEL: &str = "uwbot_command";
/// Channel carrying [`StateRecord`]s, vehicle → operator.
pub const STATE_CHANNEL: &str = "uwbot_state";
/// Default LCM multicast URL used by the control application.
pub const DEFAULT_LCM_URL: &str = "udpm://239.255.76.67:7667?ttl=255";
/// Command publish rate expected by the vehicle controller.
pub const COMMAND_RATE_HZ: u32 = 100;
/// Operator UI refresh period.
pub const UI_REFRESH_MS: u32 = 20;

// ── 3D Vector ─────────────────────────────────────────────────────────────────

/// 3-axis vector. Unit depends on the field carrying it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component-wise clamp into `[-limit, limit]`. Never panics, whatever the limit.
    pub fn clamp_abs(&self, limit: f32) -> Vec3 {
        let limit = limit.abs();
        let c = |v: f32| v.max(-limit).min(limit);
        Vec3 { x: c(self.x), y: c(self.y), z: c(self.z) }
    }
}
