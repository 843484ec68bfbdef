//! Bounded transfer functions and sigmoid-weighted annealing.
//!
//! `anneal*` pulls a value towards a target by a fraction of the remaining
//! distance. The fraction is `rate * dt * transfer(target, slope)`, so the
//! transfer shapes how eagerly a target is approached depending on its
//! magnitude. Fractions are clamped to `[0, 1]`: the value never overshoots.

#[allow(unused_imports)]
use micromath::F32Ext;

/// Transfer function signature: `(x, slope) -> weight`.
pub type Transfer = fn(f32, f32) -> f32;

/// Attitude tuning. Largest (≈0.707) at `x = 0`, decays towards zero as
/// `|slope * x|` approaches 180 and stays there beyond.
pub fn sigmoid_attitude(x: f32, slope: f32) -> f32 {
    let v = (180.0 - (slope * x).abs().min(179.9)) / 180.0;
    v / (1.0 + v * v).sqrt()
}

/// Climb-rate tuning. Zero at `x = 0`, grows with `|slope * x|` and saturates
/// at ≈0.447 once `|slope * x| >= 125`.
pub fn sigmoid_climb(x: f32, slope: f32) -> f32 {
    let v = (slope * x).abs().min(125.0) / 250.0;
    v / (1.0 + v * v).sqrt()
}

fn fraction(rate: f32, dt: f32, weight: f32) -> f32 {
    let f = rate * dt * weight;
    if f.is_nan() {
        return 0.0;
    }
    f.clamp(0.0, 1.0)
}

/// `dt_s` in seconds.
pub fn anneal(value: f32, target: f32, dt_s: f32, slope: f32, rate: f32, transfer: Transfer) -> f32 {
    let f = fraction(rate, dt_s, transfer(target, slope));
    value + (target - value) * f
}

pub fn anneal_axes(value: [f32; 3], target: [f32; 3], dt_s: f32, slope: f32, rate: f32, transfer: Transfer) -> [f32; 3] {
    [
        anneal(value[0], target[0], dt_s, slope, rate, transfer),
        anneal(value[1], target[1], dt_s, slope, rate, transfer),
        anneal(value[2], target[2], dt_s, slope, rate, transfer),
    ]
}

/// Integer form, `dt_ms` in milliseconds. The transfer weight is applied as an
/// integer divisor `1 / weight`, truncated, so small corrections round to zero.
pub fn anneal_i32(value: i32, target: i32, dt_ms: i32, slope: f32, rate: i32, transfer: Transfer) -> i32 {
    let w = transfer(target as f32, slope);
    if !(w > 0.0) {
        return value;
    }
    let divisor = ((1.0 / w) as i64).max(1);
    let diff = target as i64 - value as i64;
    let step = diff * (rate as i64 * dt_ms as i64) / divisor / 1000;
    let next = value as i64 + step;
    let (lo, hi) = if value <= target { (value, target) } else { (target, value) };
    next.clamp(lo as i64, hi as i64) as i32
}
