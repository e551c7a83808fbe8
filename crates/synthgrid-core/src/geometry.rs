//! Beat, pixel and second coordinate conversions

use serde::{Deserialize, Serialize};

/// Quantization step of the snap grid (a sixteenth note)
pub const SNAP_STEP: f64 = 0.25;

/// Quantize a beat position to the sixteenth grid, never below zero.
pub fn snap(beat: f64) -> f64 {
    ((beat / SNAP_STEP).round() * SNAP_STEP).max(0.0)
}

/// Tempo and zoom for converting between the three coordinate spaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub bpm: f64,
    pub px_per_beat: f64,
}

impl GridGeometry {
    pub fn new(bpm: f64, px_per_beat: f64) -> Self {
        Self { bpm, px_per_beat }
    }

    pub fn beat_to_pixel(&self, beat: f64) -> f64 {
        beat * self.px_per_beat
    }

    pub fn pixel_to_beat(&self, px: f64) -> f64 {
        px / self.px_per_beat
    }

    pub fn sec_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn beat_to_sec(&self, beat: f64) -> f64 {
        beat * self.sec_per_beat()
    }

    pub fn sec_to_beat(&self, secs: f64) -> f64 {
        secs / self.sec_per_beat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_quantizes_to_sixteenths() {
        assert_eq!(snap(0.1), 0.0);
        assert_eq!(snap(0.13), 0.25);
        assert_eq!(snap(1.6), 1.5);
        assert_eq!(snap(1.63), 1.75);
        assert_eq!(snap(-3.0), 0.0);
    }

    #[test]
    fn test_snap_idempotent_and_monotonic() {
        let mut prev = snap(-1.0);
        let mut x = -1.0;
        while x < 8.0 {
            let s = snap(x);
            assert_eq!(snap(s), s);
            assert!(s >= prev);
            prev = s;
            x += 0.037;
        }
    }

    #[test]
    fn test_conversions() {
        let geo = GridGeometry::new(120.0, 40.0);
        assert_eq!(geo.sec_per_beat(), 0.5);
        assert_eq!(geo.beat_to_sec(4.0), 2.0);
        assert_eq!(geo.sec_to_beat(2.0), 4.0);
        assert_eq!(geo.beat_to_pixel(2.5), 100.0);
        assert_eq!(geo.pixel_to_beat(100.0), 2.5);
    }
}
