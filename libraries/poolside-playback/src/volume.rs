//! Volume control
//!
//! UI level is an integer in 0..=120 where 100 is unity. The level maps to an
//! exponent applied with base 2, every 16 steps doubling or halving amplitude.

use crate::source::Frame;

/// Volume controller mapping a UI level onto sink gain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    level: i32,
}

impl Volume {
    pub const MIN: i32 = 0;
    pub const MAX: i32 = 120;
    pub const UNITY: i32 = 100;

    /// Steps per doubling of amplitude
    const STEPS_PER_UNIT: f64 = 16.0;

    /// Exponent base for the gain stage
    const BASE: f64 = 2.0;

    pub fn new(level: i32) -> Self {
        Self {
            level: level.clamp(Self::MIN, Self::MAX),
        }
    }

    /// Store a new level, clamped into range. Returns the stored level.
    pub fn set_level(&mut self, level: i32) -> i32 {
        self.level = level.clamp(Self::MIN, Self::MAX);
        self.level
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Gain exponent: `(level - 100) / 16`
    pub fn gain(&self) -> f64 {
        f64::from(self.level - Self::UNITY) / Self::STEPS_PER_UNIT
    }

    pub fn is_silent(&self) -> bool {
        self.level == Self::MIN
    }

    /// Linear amplitude multiplier derived from the gain
    pub fn amplitude(&self) -> f32 {
        if self.is_silent() {
            0.0
        } else {
            Self::BASE.powf(self.gain()) as f32
        }
    }

    /// Apply volume to frames in place
    pub fn apply(&self, frames: &mut [Frame]) {
        let amplitude = self.amplitude();

        if amplitude == 0.0 {
            frames.fill([0.0; 2]);
        } else if amplitude != 1.0 {
            for frame in frames.iter_mut() {
                frame[0] *= amplitude;
                frame[1] *= amplitude;
            }
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(Self::UNITY)
    }
}
