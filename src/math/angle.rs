/// Wraps degrees into `[0, 360)`.
pub fn wrap_360(deg: f32) -> f32 {
    let mut r = deg % 360.0;
    if r < 0.0 {
        r += 360.0;
    }
    // -1e-8 + 360.0 rounds to 360.0 in f32
    if r >= 360.0 {
        r -= 360.0;
    }
    r
}

/// Wraps degrees into `[-180, 180)`.
pub fn wrap_180(deg: f32) -> f32 {
    wrap_360(deg + 180.0) - 180.0
}

/// Shortest signed rotation from `previous` to `current`, in `[-180, 180)`.
pub fn delta_deg(current: f32, previous: f32) -> f32 {
    wrap_180(current - previous)
}

pub fn wrap_180_axes(v: [f32; 3]) -> [f32; 3] {
    v.map(wrap_180)
}

pub fn wrap_360_axes(v: [f32; 3]) -> [f32; 3] {
    v.map(wrap_360)
}
