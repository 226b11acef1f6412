//! vehicle_sim.rs: Synthetic telemetry for bench testing
//!
//! Produces plausible `StateRecord`s from a validated command:
//! - First-order lag from commanded to actual velocity
//! - Depth converges on the hold setpoint, heading integrates yaw rate
//! - Gaussian sensor noise on depth, temperatures and the power bus
//! - Monotonic uptime/packet-loss counters, with faults from `scenarios.rs`
//!
//! This is a test-data generator. It is not a model of the real vehicle.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use uwbot_types::{
    CommStatus, ControlMode, Locomotion, Reported, StateRecord, SubsystemStatus, ValidatedCommand,
    Vec3,
};

use crate::scenarios::{ScenarioConfig, ScenarioType};

// ── Config struct (populated from [simulation] in uwbot.toml) ─────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub update_rate_hz: f64,
    /// Velocity lag time constant, seconds
    pub response_time_s: f32,
    /// Depth approach rate under depth hold, m/s
    pub depth_rate_mps: f32,
    pub sigma_depth_m: f32,
    pub sigma_temperature_c: f32,
    pub sigma_voltage_v: f32,
    pub pack_voltage_v: f32,
    /// Nominal sag while drawing current, volts per second
    pub drain_v_per_s: f32,
    pub idle_current_a: f32,
    /// Current per 100 % of thruster power, amps
    pub thruster_current_a: f32,
    pub water_temperature_c: f32,
    pub base_latency_ms: f32,
    pub loss_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: 50.0,
            response_time_s: 0.5,
            depth_rate_mps: 0.3,
            sigma_depth_m: 0.02,
            sigma_temperature_c: 0.1,
            sigma_voltage_v: 0.05,
            pack_voltage_v: 50.4,
            drain_v_per_s: 0.002,
            idle_current_a: 1.5,
            thruster_current_a: 8.0,
            water_temperature_c: 18.0,
            base_latency_ms: 35.0,
            loss_rate: 0.001,
        }
    }
}

// ── Simulation tick ───────────────────────────────────────────────────────────

pub struct VehicleSim {
    pub state: StateRecord,
    pub cycle: u32,
    t_elapsed: f64,
    voltage_v: f32,
    cfg: SimConfig,
    scenario: ScenarioConfig,
    rng: StdRng,
    reset_done: bool,
}

impl VehicleSim {
    pub fn new(cfg: SimConfig, scenario: ScenarioConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let mut state = StateRecord::default();
        state.comm.status = CommStatus::Ok.into();
        state.comm.signal_dbm = -60;
        state.environment.internal_pressure_kpa = 101.3;
        state.environment.temperature_c = cfg.water_temperature_c + 8.0;
        state.camera.status = [SubsystemStatus::Ok.into(); 2];
        state.camera.storage_total_mb = 65_536;
        Self {
            state,
            cycle: 0,
            t_elapsed: 0.0,
            voltage_v: cfg.pack_voltage_v,
            cfg,
            scenario,
            rng,
            reset_done: false,
        }
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.cfg.update_rate_hz
    }

    /// Advance one cycle under `cmd` and return the published snapshot.
    pub fn tick(&mut self, cmd: &ValidatedCommand) -> StateRecord {
        let dt = self.dt();
        let dtf = dt as f32;
        self.t_elapsed += dt;
        let alpha = (dtf / self.cfg.response_time_s).min(1.0);
        let r = cmd.record();

        // Kinematics
        let s = &mut self.state;
        let (target_lin, target_ang, mode) = match cmd.locomotion() {
            Locomotion::Floating(f) => (f.linear, f.angular, ControlMode::Floating),
            Locomotion::Wheel(w) => (
                Vec3::new(w.linear, 0.0, 0.0),
                Vec3::new(w.angular, 0.0, 0.0),
                ControlMode::Crawling,
            ),
            Locomotion::Idle => (Vec3::ZERO, Vec3::ZERO, ControlMode::Floating),
        };
        let k = &mut s.kinematics;
        k.linear_vel = lag(k.linear_vel, target_lin, alpha);
        k.angular_vel = lag(k.angular_vel, target_ang, alpha);
        if mode == ControlMode::Crawling {
            // only x is populated in wheel mode
            k.linear_vel.y = 0.0;
            k.linear_vel.z = 0.0;
            k.angular_vel.y = 0.0;
            k.angular_vel.z = 0.0;
        }

        let pose = &mut s.pose;
        let yaw = pose.orientation.yaw;
        pose.position.x += (k.linear_vel.x * yaw.cos() - k.linear_vel.y * yaw.sin()) * dtf;
        pose.position.y += (k.linear_vel.x * yaw.sin() + k.linear_vel.y * yaw.cos()) * dtf;
        let heading_rate =
            if mode == ControlMode::Crawling { k.angular_vel.x } else { k.angular_vel.z };
        pose.orientation.yaw = wrap_pi(yaw + heading_rate * dtf);

        let autopilot = cmd.autopilot();
        pose.position.z = match (mode, autopilot.depth_m) {
            (ControlMode::Floating, Some(target)) => {
                let step = (self.cfg.depth_rate_mps * dtf).abs();
                pose.position.z + (target - pose.position.z).max(-step).min(step)
            }
            (ControlMode::Floating, None) => (pose.position.z + k.linear_vel.z * dtf).max(0.0),
            _ => pose.position.z,
        };

        // Actuators
        let thrust = if mode == ControlMode::Floating {
            (k.linear_vel.x.abs() + k.linear_vel.y.abs() + k.linear_vel.z.abs()).min(2.0) * 50.0
        } else {
            0.0
        };
        for (i, t) in s.thrusters.iter_mut().enumerate() {
            t.power_pct = thrust * if i % 2 == 0 { 1.0 } else { 0.9 };
            let target_c = self.cfg.water_temperature_c + t.power_pct * 0.2;
            t.temperature_c += (target_c - t.temperature_c) * 0.01;
        }
        if mode == ControlMode::Crawling {
            let (v, w) = s.kinematics.wheel_components();
            s.motors.steering.angle_deg = (w * 30.0).clamp(-45.0, 45.0);
            s.motors.drive_1.speed_mps = v;
            s.motors.drive_2.speed_mps = v;
        } else {
            s.motors.drive_1.speed_mps = 0.0;
            s.motors.drive_2.speed_mps = 0.0;
        }

        s.electromagnet.active = cmd.electromagnet_pct().is_some();
        s.electromagnet.voltage_v = cmd.electromagnet_pct().map_or(0.0, |p| p as f32 * 0.24);

        let cleaning = r.water.enable || r.brush.enable || r.vacuum.enable;
        let pump = if r.water.enable { SubsystemStatus::Ok } else { SubsystemStatus::Off };
        s.cleaning.water_pump = pump.into();
        s.cleaning.flow_rate_lpm =
            if r.water.enable { r.water.power_pct as f32 * 0.2 } else { 0.0 };

        let cam = cmd.camera_select() as usize;
        s.camera.recording = [false; 2];
        s.camera.recording[cam] = r.camera.record;
        if r.camera.record {
            s.camera.storage_used_mb = s.camera.storage_used_mb.saturating_add(1);
        }

        let reported_mode =
            if cleaning && mode == ControlMode::Crawling { ControlMode::Cleaning } else { mode };
        s.control.mode = reported_mode.into();
        s.control.auto_mode = autopilot.expected_status().into();

        // Power bus
        let current = self.cfg.idle_current_a + thrust / 100.0 * self.cfg.thruster_current_a;
        let mut sag = self.cfg.drain_v_per_s * current / self.cfg.idle_current_a;
        if self.scenario.has(ScenarioType::LowBattery) {
            sag += self.scenario.battery_sag_v_per_s;
        }
        self.voltage_v -= sag * dtf;
        s.power.voltage_v = self.voltage_v + noise(&mut self.rng, self.cfg.sigma_voltage_v);
        s.power.current_a = current;
        s.power.consumption_w = s.power.voltage_v * current;

        // Environment
        let depth_noise = noise(&mut self.rng, self.cfg.sigma_depth_m);
        s.environment.depth_m = s.pose.position.z.max(0.0) + depth_noise;
        s.environment.water_pressure_kpa = 101.3 + 9.81 * s.environment.depth_m;
        s.environment.temperature_c += noise(&mut self.rng, self.cfg.sigma_temperature_c) * 0.1;
        s.environment.humidity_pct = 35.0;

        // Link
        let loss_rate = self.scenario.loss_rate(self.cfg.loss_rate);
        if loss_rate.is_finite() && self.rng.gen_bool(loss_rate.clamp(0.0, 1.0)) {
            s.comm.packet_loss += 1;
        }
        let latency = self.cfg.base_latency_ms + noise(&mut self.rng, 5.0);
        s.comm.latency_ms = latency.clamp(0.0, u16::MAX as f32) as u16;
        s.comm.status = CommStatus::Ok.into();

        // Diagnostics
        s.diagnostics.uptime_s = self.t_elapsed as u32;

        self.apply_faults();
        self.cycle += 1;
        self.state.clone()
    }

    fn apply_faults(&mut self) {
        let sc = &self.scenario;
        let s = &mut self.state;

        if sc.triggered(ScenarioType::CounterReset, self.cycle) && !self.reset_done {
            self.t_elapsed = 0.0;
            s.diagnostics.uptime_s = 0;
            s.comm.packet_loss = 0;
            self.reset_done = true;
        }
        if sc.triggered(ScenarioType::BadStatus, self.cycle) {
            s.cleaning.water_pump = Reported::Unrecognized(sc.bad_status_code);
        }
        if sc.triggered(ScenarioType::Leak, self.cycle) && !s.diagnostics.leak_detected {
            s.diagnostics.leak_detected = true;
            s.diagnostics.errors = s.diagnostics.errors.saturating_add(1);
        }
        if sc.has(ScenarioType::LinkDegraded) {
            s.comm.status = CommStatus::Unstable.into();
            s.comm.latency_ms = s.comm.latency_ms.saturating_add(250);
        }
    }
}

fn lag(current: Vec3, target: Vec3, alpha: f32) -> Vec3 {
    Vec3::new(
        current.x + (target.x - current.x) * alpha,
        current.y + (target.y - current.y) * alpha,
        current.z + (target.z - current.z) * alpha,
    )
}

fn wrap_pi(a: f32) -> f32 {
    (a + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU) - std::f32::consts::PI
}

fn noise(rng: &mut StdRng, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, sigma).map(|n| n.sample(rng)).unwrap_or(0.0)
}
