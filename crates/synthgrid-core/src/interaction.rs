//! Pointer gestures on the arrangement: move, edge resize, clone-drag and
//! box select.
//!
//! A gesture captures an immutable base copy of the clips it touches when
//! the pointer goes down. Every pointer move recomputes the total delta from
//! the gesture origin and applies it to the base, so rounding never
//! accumulates across frames. The gesture value is owned by the caller and
//! passed back into each handler.

use crate::arrangement::Arrangement;
use crate::clip::{Clip, ClipEdge, ClipId};
use crate::geometry::{snap, GridGeometry, SNAP_STEP};
use crate::selection::SelectionController;

/// Width of the resize hit-zone at each clip edge, in pixels
pub const EDGE_HIT_PX: f64 = 8.0;

/// Pointer position in timeline space: beats across, fractional lanes down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub beat: f64,
    pub lane: f64,
}

impl Pointer {
    pub fn new(beat: f64, lane: f64) -> Self {
        Self { beat, lane }
    }

    /// Lane under the pointer, None above the first lane
    pub fn lane_index(&self) -> Option<usize> {
        (self.lane >= 0.0).then(|| self.lane.floor() as usize)
    }

    fn lane_floor(&self) -> i64 {
        self.lane.floor() as i64
    }
}

/// Modifier keys held at pointer-down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Toggle clip membership in the selection
    pub shift: bool,
    /// Stamp copies at the drop position instead of moving
    pub clone: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Move,
    ResizeLeft,
    ResizeRight,
}

/// State of a drag that started on a clip
#[derive(Debug, Clone)]
pub struct ClipGesture {
    pub mode: GestureMode,
    /// Clip under the pointer at gesture start
    pub target: ClipId,
    /// Field values of every affected clip at gesture start
    pub base: Vec<Clip>,
    pub origin_beat: f64,
    pub origin_lane: i64,
    pub clone: bool,
}

/// Rubber-band selection in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGesture {
    pub origin: Pointer,
    pub current: Pointer,
}

impl BoxGesture {
    /// Half-open beat range covered by the box
    pub fn beat_range(&self) -> (f64, f64) {
        let (a, b) = (self.origin.beat, self.current.beat);
        (a.min(b), a.max(b))
    }

    /// Inclusive lane range covered by the box
    pub fn lane_range(&self) -> (usize, usize) {
        let (a, b) = (self.origin.lane, self.current.lane);
        let lo = a.min(b).max(0.0).floor() as usize;
        let hi = a.max(b).max(0.0).floor() as usize;
        (lo, hi)
    }
}

#[derive(Debug, Clone)]
pub enum Gesture {
    Clip(ClipGesture),
    Box(BoxGesture),
}

/// What a finished gesture did
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Pointer went down and up without changing anything
    Click,
    Moved(Vec<ClipId>),
    Resized(ClipId),
    /// Clone-drag stamped these new clips; sources were left in place
    Cloned(Vec<ClipId>),
    BoxSelected(usize),
}

/// Snap a beat offset to the grid without clamping it to zero
fn snap_delta(delta: f64) -> f64 {
    (delta / SNAP_STEP).round() * SNAP_STEP
}

#[derive(Debug, Clone, Copy)]
pub struct InteractionController {
    pub edge_hit_px: f64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self {
            edge_hit_px: EDGE_HIT_PX,
        }
    }
}

impl InteractionController {
    pub fn new(edge_hit_px: f64) -> Self {
        Self { edge_hit_px }
    }

    /// Pick move or resize from where inside the clip the pointer landed.
    /// Edge zones shrink on narrow clips so the middle third always moves.
    pub fn hit_mode(&self, clip: &Clip, pointer_beat: f64, geometry: &GridGeometry) -> GestureMode {
        let from_left = geometry.beat_to_pixel(pointer_beat - clip.start_beat);
        let from_right = geometry.beat_to_pixel(clip.end_beat() - pointer_beat);
        let zone = self.edge_hit_px.min(geometry.beat_to_pixel(clip.length_beats) / 3.0);

        if from_left <= zone && from_left <= from_right {
            GestureMode::ResizeLeft
        } else if from_right <= zone {
            GestureMode::ResizeRight
        } else {
            GestureMode::Move
        }
    }

    /// Start a gesture. Pressing empty space clears the selection and starts
    /// a box select; pressing a clip updates the selection and grabs it.
    /// Returns None when a shift-click deselected the clip under the pointer.
    pub fn pointer_down(
        &self,
        arrangement: &Arrangement,
        selection: &mut SelectionController,
        pointer: Pointer,
        modifiers: Modifiers,
    ) -> Option<Gesture> {
        let hit = pointer
            .lane_index()
            .and_then(|lane| arrangement.clips().clip_at(pointer.beat, lane))
            .cloned();

        let Some(clip) = hit else {
            selection.clear();
            tracing::debug!(beat = pointer.beat, lane = pointer.lane, "Box select started");
            return Some(Gesture::Box(BoxGesture {
                origin: pointer,
                current: pointer,
            }));
        };

        selection.click_clip(clip.id, modifiers.shift);
        if !selection.is_selected(clip.id) {
            return None;
        }

        let mode = self.hit_mode(&clip, pointer.beat, &arrangement.geometry());
        let base: Vec<Clip> = match mode {
            GestureMode::Move => arrangement
                .clips()
                .iter()
                .filter(|c| selection.is_selected(c.id))
                .cloned()
                .collect(),
            GestureMode::ResizeLeft | GestureMode::ResizeRight => vec![clip.clone()],
        };

        tracing::debug!(clip = %clip.id, ?mode, count = base.len(), clone = modifiers.clone, "Clip gesture started");

        Some(Gesture::Clip(ClipGesture {
            mode,
            target: clip.id,
            base,
            origin_beat: pointer.beat,
            origin_lane: pointer.lane_floor(),
            clone: modifiers.clone,
        }))
    }

    /// Apply the total delta since pointer-down. Returns true if any clip changed.
    pub fn pointer_move(&self, arrangement: &mut Arrangement, gesture: &mut Gesture, pointer: Pointer) -> bool {
        match gesture {
            Gesture::Box(bx) => {
                bx.current = pointer;
                false
            }
            Gesture::Clip(g) => match g.mode {
                GestureMode::Move => Self::apply_move(arrangement, g, pointer),
                GestureMode::ResizeLeft => Self::apply_resize(arrangement, g, ClipEdge::Left, pointer),
                GestureMode::ResizeRight => Self::apply_resize(arrangement, g, ClipEdge::Right, pointer),
            },
        }
    }

    fn apply_move(arrangement: &mut Arrangement, g: &ClipGesture, pointer: Pointer) -> bool {
        let min_start = g.base.iter().map(|c| c.start_beat).fold(f64::INFINITY, f64::min);
        // Clamp the shared delta so the whole group stops at zero together
        let delta = snap_delta(pointer.beat - g.origin_beat).max(-min_start);
        let lane_offset = pointer.lane_floor() - g.origin_lane;
        let max_lane = arrangement.lanes().len().saturating_sub(1) as i64;

        let still = delta == 0.0 && lane_offset == 0;

        let mut changed = false;
        for base in &g.base {
            let lane = (base.lane as i64 + lane_offset).clamp(0, max_lane) as usize;
            // Off-grid clips land on the grid once they actually move
            let start = if still { base.start_beat } else { snap(base.start_beat + delta) };
            changed |= arrangement.move_clip(base.id, start, lane);
        }
        changed
    }

    fn apply_resize(arrangement: &mut Arrangement, g: &ClipGesture, edge: ClipEdge, pointer: Pointer) -> bool {
        let Some(base) = g.base.first() else { return false };
        let delta = pointer.beat - g.origin_beat;
        let edge_beat = match edge {
            ClipEdge::Left => base.start_beat,
            ClipEdge::Right => base.end_beat(),
        };
        let restored = arrangement.restore_clip(base);
        let resized = arrangement.resize_clip(base.id, edge, edge_beat + delta);
        restored || resized
    }

    /// Finish a gesture at `pointer`
    pub fn pointer_up(
        &self,
        arrangement: &mut Arrangement,
        selection: &mut SelectionController,
        mut gesture: Gesture,
        pointer: Pointer,
    ) -> GestureOutcome {
        self.pointer_move(arrangement, &mut gesture, pointer);

        let g = match gesture {
            Gesture::Box(bx) => {
                let (lo, hi) = bx.beat_range();
                if hi <= lo {
                    return GestureOutcome::Click;
                }
                selection.box_select(arrangement.clips(), (lo, hi), bx.lane_range());
                tracing::debug!(count = selection.len(), "Box select finished");
                return GestureOutcome::BoxSelected(selection.len());
            }
            Gesture::Clip(g) => g,
        };

        let changed: Vec<&Clip> = g
            .base
            .iter()
            .filter(|base| arrangement.clip(base.id).is_some_and(|now| now != *base))
            .collect();
        if changed.is_empty() {
            return GestureOutcome::Click;
        }

        match g.mode {
            GestureMode::Move if g.clone => {
                // Stamp copies where the drag ended and put the sources back
                let dropped: Vec<(Clip, f64, usize)> = g
                    .base
                    .iter()
                    .filter_map(|base| {
                        let now = arrangement.clip(base.id)?;
                        Some((base.clone(), now.start_beat, now.lane))
                    })
                    .collect();
                let copies: Vec<ClipId> = dropped
                    .iter()
                    .map(|(base, start, lane)| {
                        arrangement.restore_clip(base);
                        arrangement.insert_copy(base, *start, *lane)
                    })
                    .collect();
                selection.select_group(copies.iter().copied());
                tracing::debug!(count = copies.len(), "Clone drag stamped copies");
                GestureOutcome::Cloned(copies)
            }
            GestureMode::Move => GestureOutcome::Moved(g.base.iter().map(|c| c.id).collect()),
            GestureMode::ResizeLeft | GestureMode::ResizeRight => GestureOutcome::Resized(g.target),
        }
    }

    /// Abort a gesture, putting every touched clip back
    pub fn cancel(&self, arrangement: &mut Arrangement, gesture: Gesture) {
        if let Gesture::Clip(g) = gesture {
            for base in &g.base {
                arrangement.restore_clip(base);
            }
        }
    }
}
