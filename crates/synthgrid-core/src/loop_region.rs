//! Loop region and the two-click loop picker

use serde::{Deserialize, Serialize};

use crate::geometry::{snap, GridGeometry};

/// Shortest loop the picker will commit, in seconds
pub const MIN_LOOP_SECS: f64 = 0.1;

/// A committed `[start_sec, end_sec)` interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopRegion {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl LoopRegion {
    /// Build from two picked times in either order, enforcing the minimum length
    pub fn from_points(a: f64, b: f64) -> Self {
        let start_sec = a.min(b).max(0.0);
        let end_sec = a.max(b).max(start_sec + MIN_LOOP_SECS);
        Self { start_sec, end_sec }
    }

    /// Re-apply invariants to a stored region
    pub fn sanitized(self) -> Option<Self> {
        if !self.start_sec.is_finite() || !self.end_sec.is_finite() {
            return None;
        }
        Some(Self::from_points(self.start_sec, self.end_sec))
    }

    pub fn len_secs(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    pub fn contains(&self, secs: f64) -> bool {
        secs >= self.start_sec && secs < self.end_sec
    }

    /// Map a raw clock time into the loop, always landing in `[start, end)`
    pub fn phase(&self, secs: f64) -> f64 {
        let wrapped = (secs - self.start_sec).rem_euclid(self.len_secs()) + self.start_sec;
        if wrapped >= self.end_sec {
            self.start_sec
        } else {
            wrapped
        }
    }
}

/// Picker progress
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PickerState {
    #[default]
    Idle,
    PickingFirst,
    PickingSecond { first_sec: f64 },
    Committed(LoopRegion),
}

/// Two-click loop picker: arm, click the first point, click the second
#[derive(Debug, Clone, Default)]
pub struct LoopPicker {
    state: PickerState,
}

impl LoopPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn is_picking(&self) -> bool {
        matches!(self.state, PickerState::PickingFirst | PickerState::PickingSecond { .. })
    }

    /// Start picking; an existing commit is replaced on the second click
    pub fn arm(&mut self) {
        self.state = PickerState::PickingFirst;
    }

    /// Abandon an in-progress pick
    pub fn cancel(&mut self) {
        if self.is_picking() {
            self.state = PickerState::Idle;
        }
    }

    /// Feed a timeline click at `beat`. Returns the region once both points are in.
    pub fn click(&mut self, beat: f64, geometry: &GridGeometry) -> Option<LoopRegion> {
        let secs = geometry.beat_to_sec(snap(beat));
        match self.state {
            PickerState::PickingFirst => {
                self.state = PickerState::PickingSecond { first_sec: secs };
                None
            }
            PickerState::PickingSecond { first_sec } => {
                let region = LoopRegion::from_points(first_sec, secs);
                self.state = PickerState::Committed(region);
                Some(region)
            }
            PickerState::Idle | PickerState::Committed(_) => None,
        }
    }

    /// Forget any committed or in-progress region
    pub fn clear(&mut self) {
        self.state = PickerState::Idle;
    }

    /// Restore a committed region loaded from storage
    pub fn restore(&mut self, region: Option<LoopRegion>) {
        self.state = region.map_or(PickerState::Idle, PickerState::Committed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> GridGeometry {
        GridGeometry::new(120.0, 40.0)
    }

    #[test]
    fn test_two_clicks_commit() {
        let mut picker = LoopPicker::new();
        assert_eq!(picker.click(1.0, &geo()), None);
        assert_eq!(picker.state(), PickerState::Idle);

        picker.arm();
        assert_eq!(picker.click(6.1, &geo()), None);
        assert_eq!(picker.state(), PickerState::PickingSecond { first_sec: 3.0 });
        let region = picker.click(2.0, &geo()).unwrap();
        assert_eq!(region, LoopRegion { start_sec: 1.0, end_sec: 3.0 });
        assert_eq!(picker.state(), PickerState::Committed(region));
    }

    #[test]
    fn test_commit_is_order_independent() {
        let pick = |a: f64, b: f64| {
            let mut picker = LoopPicker::new();
            picker.arm();
            picker.click(a, &geo());
            picker.click(b, &geo()).unwrap()
        };
        assert_eq!(pick(1.0, 5.0), pick(5.0, 1.0));
        assert_eq!(pick(3.0, 3.0), pick(3.0, 3.0));
    }

    #[test]
    fn test_short_loop_extended_to_minimum() {
        let region = LoopRegion::from_points(2.0, 2.0);
        assert_eq!(region.start_sec, 2.0);
        assert!((region.len_secs() - MIN_LOOP_SECS).abs() < 1e-12);
    }

    #[test]
    fn test_phase_stays_inside_region() {
        let region = LoopRegion { start_sec: 1.0, end_sec: 3.0 };
        assert_eq!(region.phase(1.0), 1.0);
        assert_eq!(region.phase(2.5), 2.5);
        assert_eq!(region.phase(3.0), 1.0);
        assert_eq!(region.phase(4.5), 2.5);
        assert_eq!(region.phase(0.0), 2.0);
        let mut t = -10.0;
        while t < 50.0 {
            let phase = region.phase(t);
            assert!((1.0..3.0).contains(&phase), "t={t} phase={phase}");
            t += 0.173;
        }
    }

    #[test]
    fn test_cancel_only_affects_picking() {
        let mut picker = LoopPicker::new();
        picker.restore(Some(LoopRegion::from_points(0.0, 1.0)));
        picker.cancel();
        assert!(matches!(picker.state(), PickerState::Committed(_)));
        picker.arm();
        picker.cancel();
        assert_eq!(picker.state(), PickerState::Idle);
    }
}
