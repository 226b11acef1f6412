//! Command validation boundary.
//!
//! [`validate`] is the only way to obtain a [`ValidatedCommand`]. Checks run in
//! a fixed order and the first violation is reported:
//!
//! 1. percentages (electromagnet, brush, vacuum, water, camera zoom) ≤ 100
//! 2. `speed_level` ≤ 5
//! 3. `camera.select` and `control_source` in {0, 1}
//! 4. velocity/depth/direction setpoints finite
//! 5. not both `mode_floating` and `mode_wheel`
//!
//! With `emergency_stop` set the record is always accepted. Motion and
//! autopilot fields are cleared first, so steps 2, 4 and 5 no longer apply;
//! subsystem groups that would fail steps 1 or 3 are switched off instead of
//! rejecting the stop.

use tracing::debug;

use crate::command::{
    CameraCommand, CameraSelect, CleaningChannel, CommandRecord, ControlSource,
    ElectromagnetCommand, ValidatedCommand,
};
use crate::error::Rejection;

pub const MAX_PERCENT: u8 = 100;
pub const MAX_SPEED_LEVEL: u8 = 5;

/// Validate and normalize one command record.
pub fn validate(record: CommandRecord) -> Result<ValidatedCommand, Rejection> {
    if record.emergency_stop {
        return Ok(emergency_stop(record));
    }

    let result = check(&record);
    if let Err(rejection) = &result {
        debug!(field = rejection.field(), "command rejected: {rejection}");
    }
    result
}

fn check(record: &CommandRecord) -> Result<ValidatedCommand, Rejection> {
    check_electromagnet(&record.electromagnet)?;
    check_cleaning("brush.power_pct", &record.brush)?;
    check_cleaning("vacuum.power_pct", &record.vacuum)?;
    check_cleaning("water.power_pct", &record.water)?;
    check_percent("camera.zoom_pct", record.camera.zoom_pct)?;

    if record.speed_level > MAX_SPEED_LEVEL {
        return Err(Rejection::InvalidSpeedLevel { value: record.speed_level });
    }

    let camera = camera_select(&record.camera)?;
    let source = control_source(record.control_source)?;

    check_setpoints(record)?;

    if record.mode_floating && record.mode_wheel {
        return Err(Rejection::ModeConflict);
    }

    Ok(ValidatedCommand::new(*record, camera, source))
}

fn emergency_stop(record: CommandRecord) -> ValidatedCommand {
    let mut out = record.with_motion_cleared();

    if check_electromagnet(&out.electromagnet).is_err() {
        out.electromagnet = ElectromagnetCommand::default();
    }
    for (name, channel) in [
        ("brush.power_pct", &mut out.brush),
        ("vacuum.power_pct", &mut out.vacuum),
        ("water.power_pct", &mut out.water),
    ] {
        if check_cleaning(name, channel).is_err() {
            *channel = CleaningChannel::default();
        }
    }
    let zoom = check_percent("camera.zoom_pct", out.camera.zoom_pct);
    let camera = match (zoom, camera_select(&out.camera)) {
        (Ok(()), Ok(camera)) => camera,
        _ => {
            out.camera = CameraCommand::default();
            CameraSelect::Front
        }
    };
    let source = control_source(out.control_source).unwrap_or_else(|_| {
        out.control_source = ControlSource::Ui as u8;
        ControlSource::Ui
    });

    debug!(
        floating = record.mode_floating,
        wheel = record.mode_wheel,
        "emergency stop: motion and autopilot fields cleared"
    );
    ValidatedCommand::new(out, camera, source)
}

fn check_percent(field: &'static str, value: u8) -> Result<(), Rejection> {
    if value > MAX_PERCENT {
        return Err(Rejection::PercentageOutOfRange { field, value });
    }
    Ok(())
}

fn check_electromagnet(e: &ElectromagnetCommand) -> Result<(), Rejection> {
    check_percent("electromagnet.voltage_pct", e.voltage_pct)
}

fn check_cleaning(field: &'static str, c: &CleaningChannel) -> Result<(), Rejection> {
    check_percent(field, c.power_pct)
}

fn camera_select(c: &CameraCommand) -> Result<CameraSelect, Rejection> {
    CameraSelect::from_u8(c.select)
        .ok_or(Rejection::InvalidSelector { field: "camera.select", value: c.select })
}

fn control_source(v: u8) -> Result<ControlSource, Rejection> {
    ControlSource::from_u8(v)
        .ok_or(Rejection::InvalidSelector { field: "control_source", value: v })
}

fn check_setpoints(r: &CommandRecord) -> Result<(), Rejection> {
    let setpoints = [
        ("floating_linear_vel", r.floating_linear_vel.is_finite()),
        ("floating_angular_vel", r.floating_angular_vel.is_finite()),
        ("target_depth", r.target_depth.is_finite()),
        ("wheel_linear_vel", r.wheel_linear_vel.is_finite()),
        ("wheel_angular_vel", r.wheel_angular_vel.is_finite()),
        ("target_direction", r.target_direction.is_finite()),
    ];
    match setpoints.into_iter().find(|(_, finite)| !finite) {
        Some((field, _)) => Err(Rejection::NonFiniteSetpoint { field }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Locomotion;
    use crate::error::RejectionKind;
    use crate::Vec3;

    fn floating_depth_hold() -> CommandRecord {
        CommandRecord {
            mode_floating: true,
            floating_linear_vel: Vec3::new(0.5, 0.0, 0.0),
            depth_hold: true,
            target_depth: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn valid_command_passes_unchanged() {
        let cmd = floating_depth_hold();
        let ok = validate(cmd).expect("valid");
        assert_eq!(*ok.record(), cmd);
        assert!(matches!(ok.locomotion(), Locomotion::Floating(m) if m.linear.x == 0.5));
        assert_eq!(ok.autopilot().depth_m, Some(3.0));
    }

    #[test]
    fn emergency_stop_clears_motion() {
        let cmd = CommandRecord { emergency_stop: true, ..floating_depth_hold() };
        let ok = validate(cmd).expect("e-stop always accepted");
        let r = ok.record();
        assert_eq!(r.floating_linear_vel.x, 0.0);
        assert!(!r.depth_hold);
        assert_eq!(r.target_depth, 0.0);
        assert!(r.emergency_stop);
        assert!(r.mode_floating);
        assert_eq!(ok.locomotion(), Locomotion::Idle);
    }

    #[test]
    fn percentage_bounds() {
        for pct in [0u8, 1, 50, 99, 100] {
            let cmd = CommandRecord {
                vacuum: CleaningChannel { power_pct: pct, enable: true },
                ..Default::default()
            };
            assert_eq!(validate(cmd).unwrap().record().vacuum.power_pct, pct);
        }
        for pct in [101u8, 200, 255] {
            let cmd = CommandRecord {
                vacuum: CleaningChannel { power_pct: pct, enable: false },
                ..Default::default()
            };
            let err = validate(cmd).unwrap_err();
            assert_eq!(
                err,
                Rejection::PercentageOutOfRange { field: "vacuum.power_pct", value: pct }
            );
            assert_eq!(err.kind(), RejectionKind::OutOfRange);
        }
    }

    #[test]
    fn every_percentage_field_is_bounded() {
        type Set = fn(&mut CommandRecord, u8);
        type Get = fn(&CommandRecord) -> u8;
        let fields: [(&'static str, Set, Get); 5] = [
            (
                "electromagnet.voltage_pct",
                |c, v| c.electromagnet.voltage_pct = v,
                |c| c.electromagnet.voltage_pct,
            ),
            ("brush.power_pct", |c, v| c.brush.power_pct = v, |c| c.brush.power_pct),
            ("vacuum.power_pct", |c, v| c.vacuum.power_pct = v, |c| c.vacuum.power_pct),
            ("water.power_pct", |c, v| c.water.power_pct = v, |c| c.water.power_pct),
            ("camera.zoom_pct", |c, v| c.camera.zoom_pct = v, |c| c.camera.zoom_pct),
        ];

        for (name, set, get) in fields {
            for pct in [0u8, 1, 50, 99, 100] {
                let mut cmd = CommandRecord::default();
                set(&mut cmd, pct);
                let ok = validate(cmd).unwrap_or_else(|e| panic!("{name}={pct}: {e}"));
                assert_eq!(get(ok.record()), pct, "{name}");
                assert_eq!(*ok.record(), cmd, "{name}");
            }
            for pct in [101u8, 150, 255] {
                let mut cmd = CommandRecord::default();
                set(&mut cmd, pct);
                let err = validate(cmd).unwrap_err();
                assert_eq!(err, Rejection::PercentageOutOfRange { field: name, value: pct });
                assert_eq!(err.field(), name);
                assert_eq!(err.kind(), RejectionKind::OutOfRange);
            }
        }
    }

    #[test]
    fn speed_level_bounds() {
        for level in 0..=5u8 {
            let cmd = CommandRecord { speed_level: level, ..Default::default() };
            assert!(validate(cmd).is_ok());
        }
        for level in [6u8, 7, 255] {
            let cmd = CommandRecord { speed_level: level, ..Default::default() };
            assert_eq!(validate(cmd), Err(Rejection::InvalidSpeedLevel { value: level }));
        }
    }

    #[test]
    fn selectors() {
        let cmd = CommandRecord {
            camera: CameraCommand { select: 2, ..Default::default() },
            ..Default::default()
        };
        let err = validate(cmd).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidSelector);
        assert_eq!(err.field(), "camera.select");

        let cmd = CommandRecord { control_source: 1, ..Default::default() };
        assert_eq!(validate(cmd).unwrap().control_source(), ControlSource::Gamepad);
        let cmd = CommandRecord { control_source: 3, ..Default::default() };
        assert_eq!(
            validate(cmd),
            Err(Rejection::InvalidSelector { field: "control_source", value: 3 })
        );
    }

    #[test]
    fn both_modes_conflict() {
        let cmd = CommandRecord { mode_floating: true, mode_wheel: true, ..Default::default() };
        assert_eq!(validate(cmd), Err(Rejection::ModeConflict));
    }

    #[test]
    fn nan_setpoint_rejected() {
        let cmd = CommandRecord { target_direction: f32::NAN, ..Default::default() };
        assert_eq!(
            validate(cmd),
            Err(Rejection::NonFiniteSetpoint { field: "target_direction" })
        );
    }

    #[test]
    fn emergency_stop_with_bad_subsystems_still_stops() {
        let cmd = CommandRecord {
            emergency_stop: true,
            mode_floating: true,
            mode_wheel: true,
            speed_level: 9,
            floating_angular_vel: Vec3::new(f32::NAN, 0.0, 0.0),
            brush: CleaningChannel { power_pct: 180, enable: true },
            water: CleaningChannel { power_pct: 30, enable: true },
            camera: CameraCommand { select: 4, zoom_pct: 10, record: true, snapshot: false },
            control_source: 8,
            ..Default::default()
        };
        let ok = validate(cmd).expect("e-stop always accepted");
        let r = ok.record();
        assert_eq!(r.brush, CleaningChannel::default());
        assert_eq!(r.water, cmd.water);
        assert_eq!(r.camera, CameraCommand::default());
        assert_eq!(r.control_source, 0);
        assert_eq!(r.speed_level, 0);
        assert_eq!(r.floating_angular_vel, Vec3::ZERO);
        assert_eq!(ok.locomotion(), Locomotion::Idle);
    }

    #[test]
    fn wheel_mode_view() {
        let cmd = CommandRecord {
            mode_wheel: true,
            wheel_linear_vel: 0.3,
            wheel_angular_vel: -0.2,
            speed_level: 3,
            floating_linear_vel: Vec3::new(1.0, 1.0, 1.0),
            ..Default::default()
        };
        let ok = validate(cmd).unwrap();
        // inactive floating fields still round-trip
        assert_eq!(ok.record().floating_linear_vel, Vec3::new(1.0, 1.0, 1.0));
        match ok.locomotion() {
            Locomotion::Wheel(w) => {
                assert_eq!(w.linear, 0.3);
                assert_eq!(w.speed_level, 3);
            }
            other => panic!("expected wheel, got {other:?}"),
        }
    }
}
