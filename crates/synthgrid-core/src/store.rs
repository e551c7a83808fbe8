//! Canonical clip storage with invariant enforcement
//!
//! Every mutation clamps instead of failing: positions stay >= 0, lengths
//! stay >= [`MIN_CLIP_BEATS`], lanes stay inside the registry. Out-of-range
//! values arrive routinely from pointer motion mid-gesture.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipEdge, ClipId, MIN_CLIP_BEATS};
use crate::geometry::snap;
use crate::lane::MAX_LANES;
use crate::patch::PatchSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipStore {
    clips: Vec<Clip>,
    next_id: u64,
}

impl Default for ClipStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipStore {
    pub fn new() -> Self {
        Self {
            clips: Vec::new(),
            next_id: 1,
        }
    }

    /// Restore from stored clips. Bounds are re-clamped and duplicate ids
    /// are reassigned so every clip stays uniquely addressable. Ids leaving
    /// no room for a successor are renumbered from 1.
    pub fn from_clips(clips: Vec<Clip>) -> Self {
        let mut store = Self::new();
        let next = clips.iter().map(|c| c.id.0).max().unwrap_or(0).checked_add(1);
        let renumber = next.is_none();
        if renumber {
            tracing::warn!(clips = clips.len(), "Stored clip ids exhausted, renumbering");
        }
        store.next_id = next.unwrap_or(1);

        let mut seen = BTreeSet::new();
        for mut clip in clips {
            if renumber || !seen.insert(clip.id) {
                clip.id = store.fresh_id();
            }
            clip.start_beat = clip.start_beat.max(0.0);
            clip.length_beats = clip.length_beats.max(MIN_CLIP_BEATS);
            if clip.lane >= MAX_LANES {
                tracing::warn!(clip = ?clip.id, lane = clip.lane, "Stored lane out of range, clamping");
                clip.lane = MAX_LANES - 1;
            }
            store.clips.push(clip);
        }
        store
    }

    fn fresh_id(&mut self) -> ClipId {
        let id = ClipId(self.next_id);
        match self.next_id.checked_add(1) {
            Some(next) => self.next_id = next,
            None => {
                // Counter exhausted: fall back to the lowest unused id
                self.next_id = (1..u64::MAX)
                    .find(|n| *n != id.0 && !self.contains(ClipId(*n)))
                    .unwrap_or(1);
            }
        }
        id
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    pub fn as_slice(&self) -> &[Clip] {
        &self.clips
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ClipId) -> bool {
        self.get(id).is_some()
    }

    /// Insert a clip for `patch`, labelled with the patch name
    pub fn add_clip(
        &mut self,
        lane: usize,
        start_beat: f64,
        length_beats: f64,
        patch: Option<PatchSummary>,
    ) -> ClipId {
        let label = patch.as_ref().map(|p| p.label().to_string()).unwrap_or_default();
        let id = self.fresh_id();
        let mut clip = Clip::new(id, lane.min(MAX_LANES - 1), start_beat, length_beats);
        clip.label = label;
        clip.patch_ref = patch;
        self.clips.push(clip);
        id
    }

    /// Insert a value copy of `source` at a new position, with a fresh id
    pub fn insert_copy(&mut self, source: &Clip, start_beat: f64, lane: usize) -> ClipId {
        let id = self.fresh_id();
        self.clips.push(Clip {
            id,
            lane: lane.min(MAX_LANES - 1),
            start_beat: start_beat.max(0.0),
            ..source.clone()
        });
        id
    }

    /// Reposition a clip. `new_start_beat` is expected to be snapped already.
    pub fn move_clip(&mut self, id: ClipId, new_start_beat: f64, new_lane: usize, lane_count: usize) -> bool {
        let Some(clip) = self.get_mut(id) else { return false };
        clip.start_beat = new_start_beat.max(0.0);
        clip.lane = new_lane.min(lane_count.saturating_sub(1));
        true
    }

    /// Drag one edge of a clip to `pointer_beat`. A left-edge resize keeps
    /// the right boundary fixed.
    pub fn resize_clip(&mut self, id: ClipId, edge: ClipEdge, pointer_beat: f64) -> bool {
        let Some(clip) = self.get_mut(id) else { return false };
        match edge {
            ClipEdge::Right => {
                clip.length_beats = snap(pointer_beat - clip.start_beat).max(MIN_CLIP_BEATS);
            }
            ClipEdge::Left => {
                let right = clip.end_beat();
                let new_start = snap(pointer_beat).max(0.0).min(right - MIN_CLIP_BEATS);
                clip.start_beat = new_start;
                clip.length_beats = right - new_start;
            }
        }
        true
    }

    /// Copy clips shifted by `beat_offset`. Sources are left untouched;
    /// unknown ids are skipped.
    pub fn duplicate_clips(&mut self, ids: &[ClipId], beat_offset: f64) -> Vec<ClipId> {
        let sources: Vec<Clip> = ids.iter().filter_map(|id| self.get(*id).cloned()).collect();
        sources
            .iter()
            .map(|src| self.insert_copy(src, src.start_beat + beat_offset, src.lane))
            .collect()
    }

    /// Remove matching clips, returning how many were removed
    pub fn delete_clips(&mut self, ids: &[ClipId]) -> usize {
        let before = self.clips.len();
        self.clips.retain(|c| !ids.contains(&c.id));
        before - self.clips.len()
    }

    /// Remove every clip on `lane`, returning the removed ids
    pub fn clear_lane(&mut self, lane: usize) -> Vec<ClipId> {
        let removed: Vec<ClipId> = self.clips.iter().filter(|c| c.lane == lane).map(|c| c.id).collect();
        self.clips.retain(|c| c.lane != lane);
        removed
    }

    /// Clips overlapping the half-open beat range on the inclusive lane range
    pub fn query_by_region(&self, beats: (f64, f64), lanes: (usize, usize)) -> BTreeSet<ClipId> {
        self.clips
            .iter()
            .filter(|c| c.intersects(beats, lanes))
            .map(|c| c.id)
            .collect()
    }

    /// Topmost clip under a point; later clips draw over earlier ones
    pub fn clip_at(&self, beat: f64, lane: usize) -> Option<&Clip> {
        self.clips
            .iter()
            .rev()
            .find(|c| c.lane == lane && beat >= c.start_beat && beat < c.end_beat())
    }

    /// End of the last clip in beats
    pub fn extent_beats(&self) -> f64 {
        self.clips.iter().map(|c| c.end_beat()).fold(0.0, f64::max)
    }

    /// Highest lane index used by any clip
    pub fn max_lane(&self) -> Option<usize> {
        self.clips.iter().map(|c| c.lane).max()
    }
}
