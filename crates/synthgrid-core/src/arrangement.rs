//! The arrangement document: clips, lanes, timeline and loop region

use crate::clip::{Clip, ClipEdge, ClipId};
use crate::geometry::GridGeometry;
use crate::lane::{Lane, LaneColor, LaneRegistry};
use crate::loop_region::LoopRegion;
use crate::patch::PatchSummary;
use crate::store::ClipStore;
use crate::timeline::{Timeline, MAX_BPM, MIN_BPM};

/// Immutable copy of everything playback depends on
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangementSnapshot {
    pub clips: Vec<Clip>,
    pub lanes: Vec<Lane>,
    pub bpm: f64,
    pub loop_region: Option<LoopRegion>,
    /// Revision of the arrangement this was taken from
    pub revision: u64,
}

impl ArrangementSnapshot {
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.bpm, 1.0)
    }

    /// End of the last clip in seconds
    pub fn duration_secs(&self) -> f64 {
        let end_beat = self.clips.iter().map(|c| c.end_beat()).fold(0.0, f64::max);
        self.geometry().beat_to_sec(end_beat)
    }
}

/// Owns the clip store and lane registry and keeps them consistent:
/// the registry always covers every lane a clip uses, and the timeline
/// is never shorter than the last clip.
#[derive(Debug, Clone, Default)]
pub struct Arrangement {
    timeline: Timeline,
    lanes: LaneRegistry,
    clips: ClipStore,
    loop_region: Option<LoopRegion>,
    revision: u64,
}

impl Arrangement {
    pub fn new() -> Self {
        let mut arrangement = Self::default();
        arrangement.lanes.ensure_len(1);
        arrangement
    }

    /// Assemble from stored parts, re-establishing invariants
    pub fn from_parts(
        timeline: Timeline,
        lanes: LaneRegistry,
        clips: ClipStore,
        loop_region: Option<LoopRegion>,
    ) -> Self {
        let mut arrangement = Self {
            timeline: timeline.sanitized(),
            lanes,
            clips,
            loop_region: loop_region.and_then(LoopRegion::sanitized),
            revision: 0,
        };
        arrangement.lanes.ensure_len(1);
        arrangement.fit_extent();
        arrangement
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn geometry(&self) -> GridGeometry {
        self.timeline.geometry()
    }

    pub fn lanes(&self) -> &LaneRegistry {
        &self.lanes
    }

    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(id)
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    /// Bumped by every change that affects playback
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Grow lanes and timeline length to cover every clip
    fn fit_extent(&mut self) {
        if let Some(max_lane) = self.clips.max_lane() {
            self.lanes.ensure_len(max_lane + 1);
        }
        self.timeline.length_beats = self.timeline.length_beats.max(self.clips.extent_beats());
    }

    pub fn snapshot(&self) -> ArrangementSnapshot {
        ArrangementSnapshot {
            clips: self.clips.as_slice().to_vec(),
            lanes: self.lanes.as_slice().to_vec(),
            bpm: self.timeline.bpm,
            loop_region: self.loop_region,
            revision: self.revision,
        }
    }

    // --- clips ---

    pub fn add_clip(
        &mut self,
        lane: usize,
        start_beat: f64,
        length_beats: f64,
        patch: Option<PatchSummary>,
    ) -> ClipId {
        let id = self.clips.add_clip(lane, start_beat, length_beats, patch);
        self.fit_extent();
        self.touch();
        id
    }

    pub fn insert_copy(&mut self, source: &Clip, start_beat: f64, lane: usize) -> ClipId {
        let lane = lane.min(self.lanes.len().saturating_sub(1));
        let id = self.clips.insert_copy(source, start_beat, lane);
        self.fit_extent();
        self.touch();
        id
    }

    pub fn move_clip(&mut self, id: ClipId, new_start_beat: f64, new_lane: usize) -> bool {
        let lane_count = self.lanes.len();
        let changed = self.clips.get(id).is_some_and(|c| {
            c.start_beat != new_start_beat.max(0.0) || c.lane != new_lane.min(lane_count.saturating_sub(1))
        });
        if !changed {
            return false;
        }
        self.clips.move_clip(id, new_start_beat, new_lane, lane_count);
        self.fit_extent();
        self.touch();
        true
    }

    pub fn resize_clip(&mut self, id: ClipId, edge: ClipEdge, pointer_beat: f64) -> bool {
        let Some(before) = self.clips.get(id).cloned() else { return false };
        self.clips.resize_clip(id, edge, pointer_beat);
        if self.clips.get(id) == Some(&before) {
            return false;
        }
        self.fit_extent();
        self.touch();
        true
    }

    /// Put a clip back to exactly the given field values
    pub fn restore_clip(&mut self, base: &Clip) -> bool {
        let Some(clip) = self.clips.get_mut(base.id) else { return false };
        if clip == base {
            return false;
        }
        *clip = base.clone();
        self.fit_extent();
        self.touch();
        true
    }

    pub fn duplicate_clips(&mut self, ids: &[ClipId], beat_offset: f64) -> Vec<ClipId> {
        let copies = self.clips.duplicate_clips(ids, beat_offset);
        if !copies.is_empty() {
            self.fit_extent();
            self.touch();
        }
        copies
    }

    pub fn delete_clips(&mut self, ids: &[ClipId]) -> usize {
        let removed = self.clips.delete_clips(ids);
        if removed > 0 {
            self.touch();
        }
        removed
    }

    pub fn set_clip_label(&mut self, id: ClipId, label: impl Into<String>) -> bool {
        let Some(clip) = self.clips.get_mut(id) else { return false };
        clip.label = label.into();
        self.touch();
        true
    }

    // --- lanes ---

    pub fn add_lane(&mut self) -> usize {
        let before = self.lanes.len();
        let index = self.lanes.push();
        if self.lanes.len() != before {
            self.touch();
        }
        index
    }

    /// Remove every clip on a lane; the lane itself stays
    pub fn clear_lane(&mut self, lane: usize) -> Vec<ClipId> {
        let removed = self.clips.clear_lane(lane);
        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    pub fn rename_lane(&mut self, lane: usize, name: impl Into<String>) -> bool {
        let changed = self.lanes.rename(lane, name);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn set_lane_color(&mut self, lane: usize, color: LaneColor) -> bool {
        let changed = self.lanes.set_color(lane, color);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn toggle_mute(&mut self, lane: usize) -> bool {
        let changed = self.lanes.toggle_mute(lane);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn toggle_solo(&mut self, lane: usize) -> bool {
        let changed = self.lanes.toggle_solo(lane);
        if changed {
            self.touch();
        }
        changed
    }

    // --- timeline ---

    pub fn set_bpm(&mut self, bpm: f64) {
        if !bpm.is_finite() {
            return;
        }
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        if bpm != self.timeline.bpm {
            self.timeline.bpm = bpm;
            self.touch();
        }
    }

    /// Zoom only; does not affect playback
    pub fn set_px_per_beat(&mut self, px_per_beat: f64) {
        if px_per_beat.is_finite() && px_per_beat > 0.0 {
            self.timeline.px_per_beat = px_per_beat;
        }
    }

    pub fn set_length_beats(&mut self, length_beats: f64) {
        self.timeline.length_beats = length_beats.max(self.clips.extent_beats());
        self.touch();
    }

    pub fn set_loop_region(&mut self, region: Option<LoopRegion>) {
        if region != self.loop_region {
            self.loop_region = region;
            self.touch();
        }
    }
}
