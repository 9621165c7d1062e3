//! A simulated scale that plays a scripted weighing.
//!
//! The script is: a ramp while the user steps on, a settle phase with bounded noise
//! around the target weight (stabilized bit and impedance once settled), then a
//! weight-removed frame. Noise comes from a seeded xorshift so runs are reproducible.

use miscale_traits::{Clock, Uuid, gatt};

use crate::encode::{FLAG_POUNDS, FLAG_STABILIZED, FLAG_WEIGHT_REMOVED, FrameLayout, encode_frame};
use crate::replay::{ReplayTransport, ScriptedFrame};

#[derive(Debug, Clone)]
pub struct SimulatedScale {
    pub target_kg: f32,
    pub impedance: Option<u16>,
    pub layout: FrameLayout,
    pub pounds: bool,
    /// Spacing between notifications.
    pub interval_ms: u64,
    pub ramp_frames: usize,
    pub settle_frames: usize,
    /// Noise amplitude in kg (uniform in `[-noise, +noise]`).
    pub noise_kg: f32,
    /// Settle frames before the stabilized bit is raised.
    pub stabilized_after: usize,
    /// Also emit every settle frame on a second characteristic shortly after.
    pub mirror_ms: Option<u64>,
    pub step_off: bool,
    pub seed: u32,
    pub characteristic: Uuid,
}

impl Default for SimulatedScale {
    fn default() -> Self {
        Self {
            target_kg: 70.0,
            impedance: Some(500),
            layout: FrameLayout::Mi2,
            pounds: false,
            interval_ms: 250,
            ramp_frames: 4,
            settle_frames: 12,
            noise_kg: 0.02,
            stabilized_after: 6,
            mirror_ms: None,
            step_off: true,
            seed: 0x5eed,
            characteristic: gatt::STANDARD_MEASUREMENT,
        }
    }
}

struct XorShift(u32);

impl XorShift {
    fn next_unit(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    }
}

impl SimulatedScale {
    pub fn new(target_kg: f32) -> Self {
        Self {
            target_kg,
            ..Self::default()
        }
    }

    /// Build the frame script.
    pub fn script(&self) -> Vec<ScriptedFrame> {
        let mut rng = XorShift(self.seed.max(1));
        let unit = if self.pounds { FLAG_POUNDS } else { 0 };
        let mut out = Vec::with_capacity(self.ramp_frames + self.settle_frames * 2 + 1);
        let mut t = 0u64;

        for i in 0..self.ramp_frames {
            let frac = (i + 1) as f32 / (self.ramp_frames + 1) as f32;
            let w = self.target_kg * frac;
            out.push(self.frame(t, unit, w, None));
            t += self.interval_ms;
        }

        for i in 0..self.settle_frames {
            let noise = (rng.next_unit() * 2.0 - 1.0) * self.noise_kg;
            let settled = i >= self.stabilized_after;
            let flags = unit | if settled { FLAG_STABILIZED } else { 0 };
            let z = if settled { self.impedance } else { None };
            let w = self.target_kg + noise;
            out.push(self.frame(t, flags, w, z));
            if let Some(m) = self.mirror_ms {
                out.push(ScriptedFrame {
                    at_ms: t + m,
                    characteristic: gatt::WEIGHT_MEASUREMENT,
                    payload: encode_frame(self.layout, flags, w, z),
                });
            }
            t += self.interval_ms;
        }

        if self.step_off {
            out.push(self.frame(t, unit | FLAG_WEIGHT_REMOVED, 0.0, None));
        }
        out
    }

    fn frame(&self, at_ms: u64, flags: u8, weight_kg: f32, z: Option<u16>) -> ScriptedFrame {
        ScriptedFrame {
            at_ms,
            characteristic: self.characteristic,
            payload: encode_frame(self.layout, flags, weight_kg, z),
        }
    }

    /// Play the script on `clock`.
    pub fn into_transport<C: Clock>(self, clock: C) -> ReplayTransport<C> {
        ReplayTransport::new(self.script(), clock)
    }
}
