//! Secondary driving metrics computed from each decoded update.

use model::ShiftAdvice;

use crate::codec::CarUpdate;

/// Reference tire pressure the deltas are measured against (27.5 psi).
pub const OPTIMAL_PRESSURE_BAR: f32 = 1.896;

const LOCK_SLIP_MIN: f32 = 0.1;
const LOCK_ANGULAR_SPEED_MAX: f32 = 1.0;
const SHIFT_UP_FRACTION: f32 = 0.85;
const SHIFT_DOWN_FRACTION: f32 = 0.30;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    pub wheel_lock: [bool; 4],
    pub abs_active: bool,
    pub tire_pressure_delta: [f32; 4],
    pub shift_advice: ShiftAdvice,
    pub g_force_total: f32,
}

/// Recomputed in full on every update packet; nothing here is cached.
pub fn derive(update: &CarUpdate) -> DerivedMetrics {
    let wheel_lock = std::array::from_fn(|i| {
        update.wheel_slip[i].abs() > LOCK_SLIP_MIN
            && update.wheel_angular_speed[i].abs() < LOCK_ANGULAR_SPEED_MAX
    });

    DerivedMetrics {
        wheel_lock,
        abs_active: wheel_lock.iter().any(|&locked| locked),
        tire_pressure_delta: std::array::from_fn(|i| {
            update.tire_pressure[i] - OPTIMAL_PRESSURE_BAR
        }),
        shift_advice: shift_advice(update.rpm, update.max_rpm),
        g_force_total: (update.g_force_lateral.powi(2) + update.g_force_longitudinal.powi(2))
            .sqrt(),
    }
}

/// Strict thresholds; a rev limit of zero gives no advice.
fn shift_advice(rpm: f32, max_rpm: f32) -> ShiftAdvice {
    if max_rpm <= 0.0 {
        return ShiftAdvice::Optimal;
    }
    if rpm > max_rpm * SHIFT_UP_FRACTION {
        ShiftAdvice::ShiftUp
    } else if rpm < max_rpm * SHIFT_DOWN_FRACTION {
        ShiftAdvice::ShiftDown
    } else {
        ShiftAdvice::Optimal
    }
}
