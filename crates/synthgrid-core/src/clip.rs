//! Clips placed on the timeline

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::patch::PatchSummary;

/// Shortest clip the store will hold, in beats
pub const MIN_CLIP_BEATS: f64 = 0.25;

/// Unique identifier for clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which edge of a clip a resize grabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipEdge {
    Left,
    Right,
}

/// A patch placed on a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    /// Index into the lane registry
    pub lane: usize,
    pub start_beat: f64,
    pub length_beats: f64,
    #[serde(default)]
    pub label: String,
    /// None when the patch could not be resolved; such clips are skipped at playback
    #[serde(default)]
    pub patch_ref: Option<PatchSummary>,
}

impl Clip {
    pub fn new(id: ClipId, lane: usize, start_beat: f64, length_beats: f64) -> Self {
        Self {
            id,
            lane,
            start_beat: start_beat.max(0.0),
            length_beats: length_beats.max(MIN_CLIP_BEATS),
            label: String::new(),
            patch_ref: None,
        }
    }

    /// End position in beats (exclusive)
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.length_beats
    }

    /// Half-open overlap test against a beat range and an inclusive lane range
    pub fn intersects(&self, beats: (f64, f64), lanes: (usize, usize)) -> bool {
        let (lane_lo, lane_hi) = lanes;
        if self.lane < lane_lo || self.lane > lane_hi {
            return false;
        }
        let (beat_lo, beat_hi) = beats;
        self.start_beat < beat_hi && beat_lo < self.end_beat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_bounds() {
        let clip = Clip::new(ClipId(1), 0, -2.0, 0.1);
        assert_eq!(clip.start_beat, 0.0);
        assert_eq!(clip.length_beats, MIN_CLIP_BEATS);
    }

    #[test]
    fn test_intersects_is_half_open() {
        let clip = Clip::new(ClipId(1), 2, 4.0, 2.0);
        assert!(clip.intersects((5.0, 5.5), (2, 2)));
        assert!(clip.intersects((0.0, 4.25), (0, 3)));
        assert!(!clip.intersects((6.0, 8.0), (2, 2)));
        assert!(!clip.intersects((0.0, 4.0), (2, 2)));
        assert!(!clip.intersects((4.0, 6.0), (0, 1)));
    }
}
