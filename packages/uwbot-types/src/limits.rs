//! Receiver-side capability limits.
//!
//! The command record itself is unbounded; the vehicle clamps setpoints to what
//! it can physically do. Clamping only moves setpoints. It never touches flags,
//! so an emergency-stopped command comes out unchanged.

use serde::{Deserialize, Serialize};

use crate::command::ValidatedCommand;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleLimits {
    /// Per-axis floating linear speed, m/s
    pub max_linear_mps: f32,
    /// Per-axis floating angular rate, rad/s
    pub max_angular_radps: f32,
    pub min_depth_m: f32,
    pub max_depth_m: f32,
    pub max_wheel_linear_mps: f32,
    pub max_wheel_angular_radps: f32,
}

impl Default for VehicleLimits {
    fn default() -> Self {
        Self {
            max_linear_mps: 2.0,
            max_angular_radps: 1.0,
            min_depth_m: 0.0,
            max_depth_m: 50.0,
            max_wheel_linear_mps: 2.0,
            max_wheel_angular_radps: 2.0,
        }
    }
}

impl VehicleLimits {
    pub fn clamp(&self, command: &ValidatedCommand) -> ValidatedCommand {
        let mut r = *command.record();
        r.floating_linear_vel = r.floating_linear_vel.clamp_abs(self.max_linear_mps);
        r.floating_angular_vel = r.floating_angular_vel.clamp_abs(self.max_angular_radps);
        // f32::clamp panics on inverted or NaN limits
        r.target_depth = r.target_depth.max(self.min_depth_m).min(self.max_depth_m);
        r.wheel_linear_vel = symmetric(r.wheel_linear_vel, self.max_wheel_linear_mps);
        r.wheel_angular_vel = symmetric(r.wheel_angular_vel, self.max_wheel_angular_radps);
        r.target_direction = wrap_degrees(r.target_direction);
        command.with_record(r)
    }
}

fn symmetric(v: f32, limit: f32) -> f32 {
    let limit = limit.abs();
    v.max(-limit).min(limit)
}

/// Wrap a heading into `[0, 360)`.
pub fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandRecord;
    use crate::{validate, Vec3};

    #[test]
    fn clamps_floating_setpoints() {
        let cmd = validate(CommandRecord {
            mode_floating: true,
            floating_linear_vel: Vec3::new(3.5, -4.0, 0.5),
            floating_angular_vel: Vec3::new(0.0, 2.0, -0.5),
            depth_hold: true,
            target_depth: 80.0,
            ..Default::default()
        })
        .unwrap();
        let clamped = VehicleLimits::default().clamp(&cmd);
        let r = clamped.record();
        assert_eq!(r.floating_linear_vel, Vec3::new(2.0, -2.0, 0.5));
        assert_eq!(r.floating_angular_vel, Vec3::new(0.0, 1.0, -0.5));
        assert_eq!(r.target_depth, 50.0);
        assert!(r.depth_hold);
    }

    #[test]
    fn negative_depth_clamped_to_surface() {
        let cmd = validate(CommandRecord { target_depth: -3.0, ..Default::default() }).unwrap();
        assert_eq!(VehicleLimits::default().clamp(&cmd).record().target_depth, 0.0);
    }

    #[test]
    fn bad_limits_do_not_panic() {
        let cmd = validate(CommandRecord {
            mode_wheel: true,
            wheel_linear_vel: 0.5,
            target_depth: 5.0,
            ..Default::default()
        })
        .unwrap();
        let limits = VehicleLimits {
            max_wheel_linear_mps: f32::NAN,
            min_depth_m: 10.0,
            max_depth_m: 1.0,
            ..Default::default()
        };
        let r = *limits.clamp(&cmd).record();
        assert!(r.wheel_linear_vel.is_finite());
        assert!(r.target_depth.is_finite());
    }

    #[test]
    fn heading_wraps() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn emergency_stop_unchanged() {
        let cmd = validate(CommandRecord {
            emergency_stop: true,
            mode_wheel: true,
            wheel_linear_vel: 5.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(VehicleLimits::default().clamp(&cmd), cmd);
    }
}
