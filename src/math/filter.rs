/// First-order blend: `p * new + (1 - p) * old`, with `p` clamped to `[0, 1]`.
pub fn low_pass(new: f32, old: f32, p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    p * new + (1.0 - p) * old
}

/// Integer form with `p` in percent.
pub fn low_pass_pct(new: i32, old: i32, p_pct: u8) -> i32 {
    let p = p_pct.min(100) as i64;
    ((new as i64 * p + old as i64 * (100 - p)) / 100) as i32
}

pub fn low_pass_axes(new: [f32; 3], old: [f32; 3], p: f32) -> [f32; 3] {
    [
        low_pass(new[0], old[0], p),
        low_pass(new[1], old[1], p),
        low_pass(new[2], old[2], p),
    ]
}

/// Running low-pass over a sample stream. The first sample after construction
/// or [`reset`](Self::reset) passes through unfiltered.
#[derive(Debug, Clone, Copy)]
pub struct LowPass {
    p: f32,
    value: Option<f32>,
}

impl LowPass {
    pub fn new(p: f32) -> Self {
        Self { p: p.clamp(0.0, 1.0), value: None }
    }

    pub fn filter(&mut self, input: f32) -> f32 {
        let out = match self.value {
            Some(old) => low_pass(input, old, self.p),
            None => input,
        };
        self.value = Some(out);
        out
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
