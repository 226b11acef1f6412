//! State Record: vehicle telemetry for one cycle.
//!
//! Always complete: producers fill every group before publishing. Staleness is
//! the age of the record, never a field inside it.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TextError;
use crate::Vec3;

// ── Ordinal status codes ──────────────────────────────────────────────────────

/// Closed set of small status codes as carried on the wire.
pub trait StatusCode: Copy {
    fn from_code(code: u8) -> Option<Self>;
    fn code(self) -> u8;
}

macro_rules! status_code {
    ($ty:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl StatusCode for $ty {
            fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn code(self) -> u8 {
                self as u8
            }
        }
    };
}

/// Pump and camera health. Ordered by code: `Off < Ok < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SubsystemStatus {
    Off = 0,
    Ok = 1,
    Warning = 2,
    Error = 3,
}
status_code!(SubsystemStatus { Off = 0, Ok = 1, Warning = 2, Error = 3 });

/// Link quality. Ordered by code: `Disconnected < Ok < HighLatency < Unstable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CommStatus {
    Disconnected = 0,
    Ok = 1,
    HighLatency = 2,
    Unstable = 3,
}
status_code!(CommStatus { Disconnected = 0, Ok = 1, HighLatency = 2, Unstable = 3 });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ControlMode {
    Floating = 0,
    Crawling = 1,
    Cleaning = 2,
}
status_code!(ControlMode { Floating = 0, Crawling = 1, Cleaning = 2 });

/// Autopilot state the vehicle has actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AutoModeStatus {
    Manual = 0,
    DepthHold = 1,
    DirectionHold = 2,
    Both = 3,
}
status_code!(AutoModeStatus { Manual = 0, DepthHold = 1, DirectionHold = 2, Both = 3 });

/// A status field as reported. Codes outside the closed set are kept rather
/// than dropped so the record still reaches observers.
///
/// Equality, hashing and serialization go through the wire code, so
/// `Unrecognized(1)` and `Known(CommStatus::Ok)` are the same value. Build
/// from raw codes with [`Reported::from_code`].
#[derive(Debug, Clone, Copy)]
pub enum Reported<T> {
    Known(T),
    Unrecognized(u8),
}

impl<T: StatusCode> Reported<T> {
    pub fn from_code(code: u8) -> Self {
        match T::from_code(code) {
            Some(v) => Self::Known(v),
            None => Self::Unrecognized(code),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Known(v) => v.code(),
            Self::Unrecognized(code) => code,
        }
    }

    pub fn known(self) -> Option<T> {
        T::from_code(self.code())
    }

    /// `Known` whenever the code is in the closed set.
    pub fn normalized(self) -> Self {
        Self::from_code(self.code())
    }
}

impl<T: StatusCode> PartialEq for Reported<T> {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl<T: StatusCode> Eq for Reported<T> {}

impl<T: StatusCode> Hash for Reported<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

/// Known codes serialize by name, unknown ones as the bare integer.
impl<T: StatusCode + Serialize> Serialize for Reported<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.normalized() {
            Self::Known(v) => v.serialize(serializer),
            Self::Unrecognized(code) => serializer.serialize_u8(code),
        }
    }
}

/// Accepts the variant name or the integer wire code.
impl<'de, T: StatusCode + Deserialize<'de>> Deserialize<'de> for Reported<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Name(T),
            Code(u8),
        }

        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Name(v) => Self::Known(v),
            Repr::Code(code) => Self::from_code(code),
        })
    }
}

impl<T> From<T> for Reported<T> {
    fn from(v: T) -> Self {
        Self::Known(v)
    }
}

// ── Bounded text ──────────────────────────────────────────────────────────────

/// Bytes in a firmware text buffer, NUL terminator included.
pub const TEXT_CAPACITY: usize = 128;

/// UTF-8 text that fits a [`TEXT_CAPACITY`] C buffer: at most 127 bytes, no NUL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundedText(String);

impl BoundedText {
    pub const MAX_LEN: usize = TEXT_CAPACITY - 1;

    pub fn new(text: impl Into<String>) -> Result<Self, TextError> {
        let text = text.into();
        if text.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { len: text.len(), max: Self::MAX_LEN });
        }
        if text.as_bytes().contains(&0) {
            return Err(TextError::InteriorNul);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// NUL-terminated, zero-filled firmware buffer.
    pub fn to_c_buf(&self) -> [u8; TEXT_CAPACITY] {
        let mut buf = [0u8; TEXT_CAPACITY];
        buf[..self.0.len()].copy_from_slice(self.0.as_bytes());
        buf
    }

    /// Read a firmware buffer up to its first NUL.
    pub fn from_c_buf(buf: &[u8; TEXT_CAPACITY]) -> Result<Self, TextError> {
        let end = buf.iter().position(|&b| b == 0).ok_or(TextError::Unterminated)?;
        let text = std::str::from_utf8(&buf[..end]).map_err(|_| TextError::InvalidUtf8)?;
        Ok(Self(text.to_owned()))
    }

    /// Never-failing variant of [`from_c_buf`](Self::from_c_buf) for telemetry:
    /// stops at the first NUL or after [`MAX_LEN`](Self::MAX_LEN) bytes and
    /// replaces invalid UTF-8. The flag is true when the buffer needed repair.
    pub fn from_c_buf_lossy(buf: &[u8; TEXT_CAPACITY]) -> (Self, bool) {
        if let Ok(text) = Self::from_c_buf(buf) {
            return (text, false);
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(Self::MAX_LEN).min(Self::MAX_LEN);
        let mut text = String::from_utf8_lossy(&buf[..end]).into_owned();
        // replacement characters are wider than the bytes they replace
        while text.len() > Self::MAX_LEN {
            text.pop();
        }
        (Self(text), true)
    }
}

impl TryFrom<String> for BoundedText {
    type Error = TextError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for BoundedText {
    type Error = TextError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BoundedText> for String {
    fn from(t: BoundedText) -> Self {
        t.0
    }
}

impl fmt::Display for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Record groups ─────────────────────────────────────────────────────────────

/// Roll/pitch/yaw in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Meters. `z` doubles as depth in floating mode.
    pub position: Vec3,
    pub orientation: Attitude,
}

/// In wheel mode only `linear_vel.x` and `angular_vel.x` are populated; the
/// y/z components are unused in that mode and carry no meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// m/s
    pub linear_vel: Vec3,
    /// rad/s
    pub angular_vel: Vec3,
}

impl Kinematics {
    /// The two components valid in wheel mode: (m/s, rad/s).
    pub fn wheel_components(&self) -> (f32, f32) {
        (self.linear_vel.x, self.angular_vel.x)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub depth_m: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub water_pressure_kpa: f32,
    pub internal_pressure_kpa: f32,
}

/// `consumption_w` is measured separately; it is not required to equal V×A.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Power {
    pub voltage_v: f32,
    pub current_a: f32,
    pub consumption_w: f32,
}

impl Power {
    pub fn apparent_w(&self) -> f32 {
        self.voltage_v * self.current_a
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrusterReading {
    /// 0–100 %
    pub power_pct: f32,
    pub temperature_c: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SteeringReading {
    pub angle_deg: f32,
    pub temperature_c: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveReading {
    pub speed_mps: f32,
    pub temperature_c: f32,
}

/// Crawler motors. Firmware slot 0 is steering, slots 1 and 2 are the drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorBank {
    pub steering: SteeringReading,
    pub drive_1: DriveReading,
    pub drive_2: DriveReading,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectromagnetState {
    pub active: bool,
    pub voltage_v: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleaningState {
    pub water_pump: Reported<SubsystemStatus>,
    pub flow_rate_lpm: f32,
}

impl Default for CleaningState {
    fn default() -> Self {
        Self { water_pump: SubsystemStatus::Off.into(), flow_rate_lpm: 0.0 }
    }
}

/// Front camera at index 0, rear at index 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub status: [Reported<SubsystemStatus>; 2],
    pub recording: [bool; 2],
    pub storage_path: [BoundedText; 2],
    pub clip_name: [BoundedText; 2],
    pub storage_used_mb: u32,
    pub storage_total_mb: u32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            status: [SubsystemStatus::Off.into(); 2],
            recording: [false; 2],
            storage_path: Default::default(),
            clip_name: Default::default(),
            storage_used_mb: 0,
            storage_total_mb: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommState {
    pub status: Reported<CommStatus>,
    pub latency_ms: u16,
    /// Cumulative within a session; a decrease means the link was re-established.
    pub packet_loss: u32,
    pub signal_dbm: i8,
}

impl Default for CommState {
    fn default() -> Self {
        Self {
            status: CommStatus::Disconnected.into(),
            latency_ms: 0,
            packet_loss: 0,
            signal_dbm: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub mode: Reported<ControlMode>,
    /// Acknowledges the holds last accepted from the command side.
    pub auto_mode: Reported<AutoModeStatus>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self { mode: ControlMode::Floating.into(), auto_mode: AutoModeStatus::Manual.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub leak_detected: bool,
    pub warnings: u8,
    pub errors: u8,
    /// Seconds since boot; a decrease means the vehicle restarted.
    pub uptime_s: u32,
}

// ── State Record ──────────────────────────────────────────────────────────────

/// One telemetry snapshot, group order identical to the firmware `LowlevelState`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub pose: Pose,
    pub kinematics: Kinematics,
    pub environment: Environment,
    pub power: Power,
    pub thrusters: [ThrusterReading; 4],
    pub motors: MotorBank,
    pub electromagnet: ElectromagnetState,
    pub cleaning: CleaningState,
    pub camera: CameraState,
    pub comm: CommState,
    pub control: ControlState,
    pub diagnostics: Diagnostics,
}

impl StateRecord {
    /// Every float field with its name, in record order.
    pub fn float_fields(&self) -> Vec<(&'static str, f32)> {
        let p = &self.pose;
        let k = &self.kinematics;
        let e = &self.environment;
        let m = &self.motors;
        let mut out = vec![
            ("pose.position.x", p.position.x),
            ("pose.position.y", p.position.y),
            ("pose.position.z", p.position.z),
            ("pose.orientation.roll", p.orientation.roll),
            ("pose.orientation.pitch", p.orientation.pitch),
            ("pose.orientation.yaw", p.orientation.yaw),
            ("kinematics.linear_vel.x", k.linear_vel.x),
            ("kinematics.linear_vel.y", k.linear_vel.y),
            ("kinematics.linear_vel.z", k.linear_vel.z),
            ("kinematics.angular_vel.x", k.angular_vel.x),
            ("kinematics.angular_vel.y", k.angular_vel.y),
            ("kinematics.angular_vel.z", k.angular_vel.z),
            ("environment.depth_m", e.depth_m),
            ("environment.temperature_c", e.temperature_c),
            ("environment.humidity_pct", e.humidity_pct),
            ("environment.water_pressure_kpa", e.water_pressure_kpa),
            ("environment.internal_pressure_kpa", e.internal_pressure_kpa),
            ("power.voltage_v", self.power.voltage_v),
            ("power.current_a", self.power.current_a),
            ("power.consumption_w", self.power.consumption_w),
        ];
        const THRUSTER_POWER: [&str; 4] = [
            "thrusters[0].power_pct",
            "thrusters[1].power_pct",
            "thrusters[2].power_pct",
            "thrusters[3].power_pct",
        ];
        const THRUSTER_TEMP: [&str; 4] = [
            "thrusters[0].temperature_c",
            "thrusters[1].temperature_c",
            "thrusters[2].temperature_c",
            "thrusters[3].temperature_c",
        ];
        for (i, t) in self.thrusters.iter().enumerate() {
            out.push((THRUSTER_POWER[i], t.power_pct));
            out.push((THRUSTER_TEMP[i], t.temperature_c));
        }
        out.extend([
            ("motors.steering.angle_deg", m.steering.angle_deg),
            ("motors.steering.temperature_c", m.steering.temperature_c),
            ("motors.drive_1.speed_mps", m.drive_1.speed_mps),
            ("motors.drive_1.temperature_c", m.drive_1.temperature_c),
            ("motors.drive_2.speed_mps", m.drive_2.speed_mps),
            ("motors.drive_2.temperature_c", m.drive_2.temperature_c),
            ("electromagnet.voltage_v", self.electromagnet.voltage_v),
            ("cleaning.flow_rate_lpm", self.cleaning.flow_rate_lpm),
        ]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered_by_code() {
        assert!(SubsystemStatus::Ok < SubsystemStatus::Warning);
        assert!(SubsystemStatus::Warning < SubsystemStatus::Error);
        assert!(CommStatus::HighLatency < CommStatus::Unstable);
        assert_eq!(SubsystemStatus::Error.code(), 3);
    }

    #[test]
    fn unrecognized_codes_are_kept() {
        let r: Reported<CommStatus> = Reported::from_code(9);
        assert_eq!(r, Reported::Unrecognized(9));
        assert_eq!(r.code(), 9);
        assert_eq!(r.known(), None);
        let r: Reported<CommStatus> = Reported::from_code(2);
        assert_eq!(r.known(), Some(CommStatus::HighLatency));
    }

    #[test]
    fn reported_json_shape() {
        let known: Reported<SubsystemStatus> = SubsystemStatus::Warning.into();
        assert_eq!(serde_json::to_string(&known).unwrap(), "\"WARNING\"");
        let odd: Reported<SubsystemStatus> = Reported::Unrecognized(7);
        assert_eq!(serde_json::to_string(&odd).unwrap(), "7");
        let back: Reported<SubsystemStatus> = serde_json::from_str("7").unwrap();
        assert_eq!(back, odd);
    }

    #[test]
    fn numeric_json_for_a_known_code_is_known() {
        let r: Reported<CommStatus> = serde_json::from_str("1").unwrap();
        assert!(matches!(r, Reported::Known(CommStatus::Ok)));
        let r: Reported<AutoModeStatus> = serde_json::from_str("\"BOTH\"").unwrap();
        assert!(matches!(r, Reported::Known(AutoModeStatus::Both)));
    }

    #[test]
    fn unrecognized_with_a_known_code_is_the_known_value() {
        let odd: Reported<CommStatus> = Reported::Unrecognized(1);
        assert_eq!(odd, CommStatus::Ok.into());
        assert_eq!(odd.known(), Some(CommStatus::Ok));
        assert!(matches!(odd.normalized(), Reported::Known(CommStatus::Ok)));
        assert_eq!(serde_json::to_string(&odd).unwrap(), "\"OK\"");
    }

    #[test]
    fn bounded_text_limits() {
        assert!(BoundedText::new("a".repeat(127)).is_ok());
        assert_eq!(
            BoundedText::new("a".repeat(128)),
            Err(TextError::TooLong { len: 128, max: 127 })
        );
        assert_eq!(BoundedText::new("a\0b"), Err(TextError::InteriorNul));
    }

    #[test]
    fn bounded_text_c_buffer() {
        let t = BoundedText::new("/media/sd0/front").unwrap();
        let buf = t.to_c_buf();
        assert_eq!(buf[t.as_str().len()], 0);
        assert_eq!(BoundedText::from_c_buf(&buf).unwrap(), t);

        let full = [b'x'; TEXT_CAPACITY];
        assert_eq!(BoundedText::from_c_buf(&full), Err(TextError::Unterminated));
    }

    #[test]
    fn lossy_c_buffer_always_yields_text() {
        let full = [b'x'; TEXT_CAPACITY];
        let (t, repaired) = BoundedText::from_c_buf_lossy(&full);
        assert!(repaired);
        assert_eq!(t.as_str().len(), BoundedText::MAX_LEN);

        let mut bad = [0u8; TEXT_CAPACITY];
        bad[..4].copy_from_slice(&[b'c', 0xFF, 0xFE, b'd']);
        let (t, repaired) = BoundedText::from_c_buf_lossy(&bad);
        assert!(repaired);
        assert!(t.as_str().starts_with('c') && t.as_str().ends_with('d'));

        let mut wide = [0xFFu8; TEXT_CAPACITY];
        wide[TEXT_CAPACITY - 1] = 0;
        let (t, _) = BoundedText::from_c_buf_lossy(&wide);
        assert!(t.as_str().len() <= BoundedText::MAX_LEN);

        let ok = BoundedText::new("clip.mp4").unwrap();
        assert_eq!(BoundedText::from_c_buf_lossy(&ok.to_c_buf()), (ok, false));
    }

    #[test]
    fn bounded_text_rejected_by_serde() {
        let json = format!("\"{}\"", "p".repeat(200));
        assert!(serde_json::from_str::<BoundedText>(&json).is_err());
    }

    #[test]
    fn wheel_components_use_x_axis() {
        let k = Kinematics {
            linear_vel: Vec3::new(0.4, 9.0, 9.0),
            angular_vel: Vec3::new(0.1, 9.0, 9.0),
        };
        assert_eq!(k.wheel_components(), (0.4, 0.1));
    }

    #[test]
    fn float_fields_cover_every_float() {
        // 6 pose + 6 kinematics + 5 environment + 3 power + 8 thruster + 6 motor + 2
        assert_eq!(StateRecord::default().float_fields().len(), 36);
    }
}
