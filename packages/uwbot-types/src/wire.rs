//! Binary wire format: byte-identical to the firmware `LowlevelCmd` and
//! `LowlevelState` C structs (natural alignment, little-endian).
//!
//! The `Raw*` structs mirror the C layout field for field, with the compiler's
//! padding spelled out so they can derive `bytemuck::Pod`. Padding is written
//! as zero and ignored on read.
//!
//! Commands decode strictly: a flag byte other than 0/1 is an error. State
//! records decode whenever the length is right, so telemetry keeps flowing: a
//! nonzero flag byte reads as set and a damaged text buffer is repaired, both
//! with a warning.
//!
//! | Struct          | Size  |
//! |-----------------|-------|
//! | `LowlevelCmd`   | 72 B  |
//! | `LowlevelState` | 696 B |

use bytemuck::{Pod, Zeroable};
use tracing::warn;

use crate::command::{CameraCommand, CleaningChannel, CommandRecord, ElectromagnetCommand};
use crate::error::WireError;
use crate::state::{
    Attitude, BoundedText, CameraState, CleaningState, CommState, ControlState, Diagnostics,
    DriveReading, ElectromagnetState, Environment, Kinematics, MotorBank, Pose, Power, Reported,
    StateRecord, SteeringReading, ThrusterReading, TEXT_CAPACITY,
};
use crate::Vec3;

#[cfg(not(target_endian = "little"))]
compile_error!("the firmware wire layout is little-endian");

pub const COMMAND_WIRE_LEN: usize = 72;
pub const STATE_WIRE_LEN: usize = 696;

// ── Command ───────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawCommand {
    pub mode_floating: u8,
    _pad0: [u8; 3],
    pub floating_linear_vel_x: f32,
    pub floating_linear_vel_y: f32,
    pub floating_linear_vel_z: f32,
    pub floating_angular_vel_x: f32,
    pub floating_angular_vel_y: f32,
    pub floating_angular_vel_z: f32,
    pub depth_hold: u8,
    _pad1: [u8; 3],
    pub target_depth: f32,
    pub mode_wheel: u8,
    _pad2: [u8; 3],
    pub wheel_linear_vel: f32,
    pub wheel_angular_vel: f32,
    pub speed_level: u8,
    pub direction_hold: u8,
    _pad3: [u8; 2],
    pub target_direction: f32,
    pub electromagnet_enable: u8,
    pub electromagnet_voltage: u8,
    pub brush_power: u8,
    pub brush_enable: u8,
    pub vacuum_power: u8,
    pub vacuum_enable: u8,
    pub water_flow: u8,
    pub water_enable: u8,
    pub camera_select: u8,
    pub camera_zoom: u8,
    pub camera_record: u8,
    pub camera_snapshot: u8,
    pub control_source: u8,
    pub emergency_stop: u8,
    pub auto_surface: u8,
    _pad4: [u8; 1],
}

const _: () = assert!(std::mem::size_of::<RawCommand>() == COMMAND_WIRE_LEN);

impl From<&CommandRecord> for RawCommand {
    fn from(c: &CommandRecord) -> Self {
        let mut raw = RawCommand::zeroed();
        raw.mode_floating = c.mode_floating as u8;
        raw.floating_linear_vel_x = c.floating_linear_vel.x;
        raw.floating_linear_vel_y = c.floating_linear_vel.y;
        raw.floating_linear_vel_z = c.floating_linear_vel.z;
        raw.floating_angular_vel_x = c.floating_angular_vel.x;
        raw.floating_angular_vel_y = c.floating_angular_vel.y;
        raw.floating_angular_vel_z = c.floating_angular_vel.z;
        raw.depth_hold = c.depth_hold as u8;
        raw.target_depth = c.target_depth;
        raw.mode_wheel = c.mode_wheel as u8;
        raw.wheel_linear_vel = c.wheel_linear_vel;
        raw.wheel_angular_vel = c.wheel_angular_vel;
        raw.speed_level = c.speed_level;
        raw.direction_hold = c.direction_hold as u8;
        raw.target_direction = c.target_direction;
        raw.electromagnet_enable = c.electromagnet.enable as u8;
        raw.electromagnet_voltage = c.electromagnet.voltage_pct;
        raw.brush_power = c.brush.power_pct;
        raw.brush_enable = c.brush.enable as u8;
        raw.vacuum_power = c.vacuum.power_pct;
        raw.vacuum_enable = c.vacuum.enable as u8;
        raw.water_flow = c.water.power_pct;
        raw.water_enable = c.water.enable as u8;
        raw.camera_select = c.camera.select;
        raw.camera_zoom = c.camera.zoom_pct;
        raw.camera_record = c.camera.record as u8;
        raw.camera_snapshot = c.camera.snapshot as u8;
        raw.control_source = c.control_source;
        raw.emergency_stop = c.emergency_stop as u8;
        raw.auto_surface = c.auto_surface as u8;
        raw
    }
}

impl TryFrom<&RawCommand> for CommandRecord {
    type Error = WireError;

    fn try_from(raw: &RawCommand) -> Result<Self, Self::Error> {
        Ok(CommandRecord {
            mode_floating: flag("mode_floating", raw.mode_floating)?,
            floating_linear_vel: Vec3::new(
                raw.floating_linear_vel_x,
                raw.floating_linear_vel_y,
                raw.floating_linear_vel_z,
            ),
            floating_angular_vel: Vec3::new(
                raw.floating_angular_vel_x,
                raw.floating_angular_vel_y,
                raw.floating_angular_vel_z,
            ),
            depth_hold: flag("depth_hold", raw.depth_hold)?,
            target_depth: raw.target_depth,
            mode_wheel: flag("mode_wheel", raw.mode_wheel)?,
            wheel_linear_vel: raw.wheel_linear_vel,
            wheel_angular_vel: raw.wheel_angular_vel,
            speed_level: raw.speed_level,
            direction_hold: flag("direction_hold", raw.direction_hold)?,
            target_direction: raw.target_direction,
            electromagnet: ElectromagnetCommand {
                enable: flag("electromagnet_enable", raw.electromagnet_enable)?,
                voltage_pct: raw.electromagnet_voltage,
            },
            brush: CleaningChannel {
                power_pct: raw.brush_power,
                enable: flag("brush_enable", raw.brush_enable)?,
            },
            vacuum: CleaningChannel {
                power_pct: raw.vacuum_power,
                enable: flag("vacuum_enable", raw.vacuum_enable)?,
            },
            water: CleaningChannel {
                power_pct: raw.water_flow,
                enable: flag("water_enable", raw.water_enable)?,
            },
            camera: CameraCommand {
                select: raw.camera_select,
                zoom_pct: raw.camera_zoom,
                record: flag("camera_record", raw.camera_record)?,
                snapshot: flag("camera_snapshot", raw.camera_snapshot)?,
            },
            control_source: raw.control_source,
            emergency_stop: flag("emergency_stop", raw.emergency_stop)?,
            auto_surface: flag("auto_surface", raw.auto_surface)?,
        })
    }
}

pub fn encode_command(cmd: &CommandRecord) -> Vec<u8> {
    bytemuck::bytes_of(&RawCommand::from(cmd)).to_vec()
}

pub fn decode_command(bytes: &[u8]) -> Result<CommandRecord, WireError> {
    let raw: RawCommand = read_raw(bytes, COMMAND_WIRE_LEN)?;
    CommandRecord::try_from(&raw)
}

// ── State ─────────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawState {
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub velocity_z: f32,
    pub angular_vel_x: f32,
    pub angular_vel_y: f32,
    pub angular_vel_z: f32,
    pub depth: f32,
    pub temperature_inside: f32,
    pub humidity_inside: f32,
    pub pressure_water: f32,
    pub pressure_inside: f32,
    pub voltage_main: f32,
    pub current_main: f32,
    pub power_consumption: f32,
    pub thruster_power: [f32; 4],
    pub thruster_temp: [f32; 4],
    /// 0 = steering angle (°), 1–2 = drive speed (m/s)
    pub motor_data: [f32; 3],
    pub motor_temp: [f32; 3],
    pub electromagnet_status: u8,
    _pad0: [u8; 3],
    pub electromagnet_voltage: f32,
    pub water_pump_status: u8,
    _pad1: [u8; 3],
    pub water_flow_rate: f32,
    pub camera_status: [u8; 2],
    pub recording_status: [u8; 2],
    pub storage_path: [[u8; TEXT_CAPACITY]; 2],
    pub camera_path: [[u8; TEXT_CAPACITY]; 2],
    pub storage_used: u32,
    pub storage_total: u32,
    pub comm_status: u8,
    _pad2: [u8; 1],
    pub comm_latency: u16,
    pub packet_loss: u32,
    pub signal_strength: i8,
    pub control_mode: u8,
    pub auto_mode_status: u8,
    pub leak_detected: u8,
    pub system_warnings: u8,
    pub system_errors: u8,
    _pad3: [u8; 2],
    pub uptime: u32,
}

const _: () = assert!(std::mem::size_of::<RawState>() == STATE_WIRE_LEN);

impl From<&StateRecord> for RawState {
    fn from(s: &StateRecord) -> Self {
        let mut raw = RawState::zeroed();
        let p = &s.pose;
        raw.position_x = p.position.x;
        raw.position_y = p.position.y;
        raw.position_z = p.position.z;
        raw.roll = p.orientation.roll;
        raw.pitch = p.orientation.pitch;
        raw.yaw = p.orientation.yaw;

        let k = &s.kinematics;
        raw.velocity_x = k.linear_vel.x;
        raw.velocity_y = k.linear_vel.y;
        raw.velocity_z = k.linear_vel.z;
        raw.angular_vel_x = k.angular_vel.x;
        raw.angular_vel_y = k.angular_vel.y;
        raw.angular_vel_z = k.angular_vel.z;

        let e = &s.environment;
        raw.depth = e.depth_m;
        raw.temperature_inside = e.temperature_c;
        raw.humidity_inside = e.humidity_pct;
        raw.pressure_water = e.water_pressure_kpa;
        raw.pressure_inside = e.internal_pressure_kpa;

        raw.voltage_main = s.power.voltage_v;
        raw.current_main = s.power.current_a;
        raw.power_consumption = s.power.consumption_w;

        for (i, t) in s.thrusters.iter().enumerate() {
            raw.thruster_power[i] = t.power_pct;
            raw.thruster_temp[i] = t.temperature_c;
        }

        let m = &s.motors;
        raw.motor_data = [m.steering.angle_deg, m.drive_1.speed_mps, m.drive_2.speed_mps];
        raw.motor_temp =
            [m.steering.temperature_c, m.drive_1.temperature_c, m.drive_2.temperature_c];

        raw.electromagnet_status = s.electromagnet.active as u8;
        raw.electromagnet_voltage = s.electromagnet.voltage_v;
        raw.water_pump_status = s.cleaning.water_pump.code();
        raw.water_flow_rate = s.cleaning.flow_rate_lpm;

        let c = &s.camera;
        for i in 0..2 {
            raw.camera_status[i] = c.status[i].code();
            raw.recording_status[i] = c.recording[i] as u8;
            raw.storage_path[i] = c.storage_path[i].to_c_buf();
            raw.camera_path[i] = c.clip_name[i].to_c_buf();
        }
        raw.storage_used = c.storage_used_mb;
        raw.storage_total = c.storage_total_mb;

        raw.comm_status = s.comm.status.code();
        raw.comm_latency = s.comm.latency_ms;
        raw.packet_loss = s.comm.packet_loss;
        raw.signal_strength = s.comm.signal_dbm;

        raw.control_mode = s.control.mode.code();
        raw.auto_mode_status = s.control.auto_mode.code();

        let d = &s.diagnostics;
        raw.leak_detected = d.leak_detected as u8;
        raw.system_warnings = d.warnings;
        raw.system_errors = d.errors;
        raw.uptime = d.uptime_s;
        raw
    }
}

impl From<&RawState> for StateRecord {
    fn from(raw: &RawState) -> Self {
        let thrusters = std::array::from_fn(|i| ThrusterReading {
            power_pct: raw.thruster_power[i],
            temperature_c: raw.thruster_temp[i],
        });
        let motors = MotorBank {
            steering: SteeringReading {
                angle_deg: raw.motor_data[0],
                temperature_c: raw.motor_temp[0],
            },
            drive_1: DriveReading {
                speed_mps: raw.motor_data[1],
                temperature_c: raw.motor_temp[1],
            },
            drive_2: DriveReading {
                speed_mps: raw.motor_data[2],
                temperature_c: raw.motor_temp[2],
            },
        };

        const RECORDING: [&str; 2] = ["recording_status[0]", "recording_status[1]"];
        const STORAGE: [&str; 2] = ["storage_path[0]", "storage_path[1]"];
        const CLIP: [&str; 2] = ["camera_path[0]", "camera_path[1]"];
        let camera = CameraState {
            status: [
                Reported::from_code(raw.camera_status[0]),
                Reported::from_code(raw.camera_status[1]),
            ],
            recording: [
                state_flag(RECORDING[0], raw.recording_status[0]),
                state_flag(RECORDING[1], raw.recording_status[1]),
            ],
            storage_path: [
                state_text(STORAGE[0], &raw.storage_path[0]),
                state_text(STORAGE[1], &raw.storage_path[1]),
            ],
            clip_name: [
                state_text(CLIP[0], &raw.camera_path[0]),
                state_text(CLIP[1], &raw.camera_path[1]),
            ],
            storage_used_mb: raw.storage_used,
            storage_total_mb: raw.storage_total,
        };

        StateRecord {
            pose: Pose {
                position: Vec3::new(raw.position_x, raw.position_y, raw.position_z),
                orientation: Attitude { roll: raw.roll, pitch: raw.pitch, yaw: raw.yaw },
            },
            kinematics: Kinematics {
                linear_vel: Vec3::new(raw.velocity_x, raw.velocity_y, raw.velocity_z),
                angular_vel: Vec3::new(raw.angular_vel_x, raw.angular_vel_y, raw.angular_vel_z),
            },
            environment: Environment {
                depth_m: raw.depth,
                temperature_c: raw.temperature_inside,
                humidity_pct: raw.humidity_inside,
                water_pressure_kpa: raw.pressure_water,
                internal_pressure_kpa: raw.pressure_inside,
            },
            power: Power {
                voltage_v: raw.voltage_main,
                current_a: raw.current_main,
                consumption_w: raw.power_consumption,
            },
            thrusters,
            motors,
            electromagnet: ElectromagnetState {
                active: state_flag("electromagnet_status", raw.electromagnet_status),
                voltage_v: raw.electromagnet_voltage,
            },
            cleaning: CleaningState {
                water_pump: Reported::from_code(raw.water_pump_status),
                flow_rate_lpm: raw.water_flow_rate,
            },
            camera,
            comm: CommState {
                status: Reported::from_code(raw.comm_status),
                latency_ms: raw.comm_latency,
                packet_loss: raw.packet_loss,
                signal_dbm: raw.signal_strength,
            },
            control: ControlState {
                mode: Reported::from_code(raw.control_mode),
                auto_mode: Reported::from_code(raw.auto_mode_status),
            },
            diagnostics: Diagnostics {
                leak_detected: state_flag("leak_detected", raw.leak_detected),
                warnings: raw.system_warnings,
                errors: raw.system_errors,
                uptime_s: raw.uptime,
            },
        }
    }
}

pub fn encode_state(state: &StateRecord) -> Vec<u8> {
    bytemuck::bytes_of(&RawState::from(state)).to_vec()
}

pub fn decode_state(bytes: &[u8]) -> Result<StateRecord, WireError> {
    let raw: RawState = read_raw(bytes, STATE_WIRE_LEN)?;
    Ok(StateRecord::from(&raw))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_raw<T: Pod>(bytes: &[u8], expected: usize) -> Result<T, WireError> {
    bytemuck::try_pod_read_unaligned(bytes)
        .map_err(|_| WireError::Length { expected, actual: bytes.len() })
}

fn flag(field: &'static str, value: u8) -> Result<bool, WireError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(WireError::Flag { field, value }),
    }
}

/// C truthiness: any nonzero byte is set.
fn state_flag(field: &'static str, value: u8) -> bool {
    if value > 1 {
        warn!(field, value, "state flag byte is not 0/1, reading it as set");
    }
    value != 0
}

fn state_text(field: &'static str, buf: &[u8; TEXT_CAPACITY]) -> BoundedText {
    let (text, repaired) = BoundedText::from_c_buf_lossy(buf);
    if repaired {
        warn!(field, "state text buffer unterminated or not UTF-8, repaired");
    }
    text
}
