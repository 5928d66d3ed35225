//! Shared telemetry data model for Pitwall.
//!
//! Per-wheel arrays are always indexed FL, FR, RL, RR.

use serde::{Deserialize, Serialize};

/// Gear advice derived from engine speed against the rev limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftAdvice {
    ShiftUp,
    ShiftDown,
    #[default]
    Optimal,
}

/// Liveness of the inbound telemetry feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// The most recently known state of the vehicle: decoded wire fields plus
/// derived metrics, published as one complete immutable record per update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    // session identity, set by handshake packets only
    pub car_name: String,
    pub driver_name: String,

    // motion
    pub speed_kmh: f32,
    pub speed_mph: f32,
    pub rpm: f32,
    pub max_rpm: f32,
    /// Negative = reverse, 0 = neutral.
    pub gear: i32,
    pub g_force_lateral: f32,
    pub g_force_longitudinal: f32,
    pub g_force_vertical: f32,

    // lap timing, seconds
    pub lap_time_s: f32,
    pub last_lap_s: f32,
    pub best_lap_s: f32,
    pub lap_count: i32,

    pub fuel_l: f32,
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],

    // per-wheel
    pub wheel_angular_speed: [f32; 4],
    pub wheel_slip: [f32; 4],
    pub wheel_load: [f32; 4],
    pub tire_pressure: [f32; 4],
    pub tire_temperature_core: [f32; 4],
    pub tire_wear: [f32; 4],
    pub suspension_travel: [f32; 4],

    // electronics; the current wire revision carries no offsets for these,
    // so they hold their defaults
    pub tc_level: i32,
    pub abs_level: i32,
    /// 0.0 = rear, 1.0 = front.
    pub brake_bias: f32,
    pub turbo_pressure: f32,
    pub pit_limiter_on: bool,
    pub water_temp_c: f32,
    pub oil_temp_c: f32,

    // derived, recomputed on every update packet
    pub wheel_lock: [bool; 4],
    pub abs_active: bool,
    pub tire_pressure_delta: [f32; 4],
    pub shift_advice: ShiftAdvice,
    pub g_force_total: f32,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            car_name: String::new(),
            driver_name: String::new(),
            speed_kmh: 0.0,
            speed_mph: 0.0,
            rpm: 0.0,
            max_rpm: 8000.0,
            gear: 0,
            g_force_lateral: 0.0,
            g_force_longitudinal: 0.0,
            g_force_vertical: 0.0,
            lap_time_s: 0.0,
            last_lap_s: 0.0,
            best_lap_s: 0.0,
            lap_count: 0,
            fuel_l: 0.0,
            velocity: [0.0; 3],
            acceleration: [0.0; 3],
            wheel_angular_speed: [0.0; 4],
            wheel_slip: [0.0; 4],
            wheel_load: [0.0; 4],
            tire_pressure: [0.0; 4],
            tire_temperature_core: [0.0; 4],
            tire_wear: [100.0; 4],
            suspension_travel: [0.0; 4],
            tc_level: 0,
            abs_level: 0,
            brake_bias: 0.5,
            turbo_pressure: 0.0,
            pit_limiter_on: false,
            water_temp_c: 0.0,
            oil_temp_c: 0.0,
            wheel_lock: [false; 4],
            abs_active: false,
            tire_pressure_delta: [0.0; 4],
            shift_advice: ShiftAdvice::Optimal,
            g_force_total: 0.0,
        }
    }
}

pub fn bar_to_psi(bar: f32) -> f32 {
    bar * 14.5038
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}
