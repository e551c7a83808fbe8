//! Timeline tempo, length and zoom

use serde::{Deserialize, Serialize};

use crate::geometry::GridGeometry;

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_PX_PER_BEAT: f64 = 40.0;
pub const DEFAULT_LENGTH_BEATS: f64 = 16.0;
pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Tempo in BPM
    pub bpm: f64,
    /// Visible length; never shorter than the last clip
    pub length_beats: f64,
    /// Horizontal zoom
    pub px_per_beat: f64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            length_beats: DEFAULT_LENGTH_BEATS,
            px_per_beat: DEFAULT_PX_PER_BEAT,
        }
    }
}

impl Timeline {
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.bpm, self.px_per_beat)
    }

    /// Clamp stored values back into range (used after loading)
    pub fn sanitized(self) -> Self {
        let bpm = if self.bpm.is_finite() && self.bpm > 0.0 {
            self.bpm.clamp(MIN_BPM, MAX_BPM)
        } else {
            DEFAULT_BPM
        };
        let px_per_beat = if self.px_per_beat.is_finite() && self.px_per_beat > 0.0 {
            self.px_per_beat
        } else {
            DEFAULT_PX_PER_BEAT
        };
        let length_beats = if self.length_beats.is_finite() {
            self.length_beats.max(0.0)
        } else {
            DEFAULT_LENGTH_BEATS
        };
        Self {
            bpm,
            length_beats,
            px_per_beat,
        }
    }

    /// Total length in seconds at current tempo
    pub fn length_secs(&self) -> f64 {
        self.geometry().beat_to_sec(self.length_beats)
    }

    /// Format seconds as MM:SS.ss
    pub fn format_time(secs: f64) -> String {
        let secs = secs.max(0.0);
        let mins = (secs / 60.0) as u32;
        let secs_rem = secs % 60.0;
        format!("{:02}:{:05.2}", mins, secs_rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_replaces_invalid_values() {
        let timeline = Timeline {
            bpm: 0.0,
            length_beats: f64::NAN,
            px_per_beat: -3.0,
        }
        .sanitized();
        assert_eq!(timeline, Timeline::default());

        let fast = Timeline { bpm: 999.0, ..Timeline::default() }.sanitized();
        assert_eq!(fast.bpm, MAX_BPM);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(Timeline::format_time(0.0), "00:00.00");
        assert_eq!(Timeline::format_time(65.5), "01:05.50");
    }
}
