//! The caller-owned editing session and its persisted snapshot form

use serde::{Deserialize, Serialize};

use crate::arrangement::Arrangement;
use crate::clip::{Clip, ClipId};
use crate::composition::Composition;
use crate::engine::{Clock, PatchEngine};
use crate::error::{EngineError, Result};
use crate::geometry::snap;
use crate::interaction::{Gesture, GestureOutcome, InteractionController, Modifiers, Pointer};
use crate::lane::{Lane, LaneColor, LaneRegistry};
use crate::loop_region::{LoopPicker, LoopRegion};
use crate::patch::PatchSummary;
use crate::rack::Rack;
use crate::selection::SelectionController;
use crate::store::ClipStore;
use crate::timeline::{Timeline, DEFAULT_BPM, DEFAULT_LENGTH_BEATS, DEFAULT_PX_PER_BEAT};
use crate::transport::{TickReport, TransportScheduler};

/// Per-lane flags stored alongside the lane names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneMeta {
    pub color: LaneColor,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub solo: bool,
}

/// Whole-state snapshot written at session boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub bpm: f64,
    pub lanes: Vec<String>,
    pub lane_meta: Vec<LaneMeta>,
    pub clips: Vec<Clip>,
    pub loop_region: Option<LoopRegion>,
    pub px_per_beat: f64,
    pub length_beats: f64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        let lane = Lane::new(0);
        Self {
            bpm: DEFAULT_BPM,
            lanes: vec![lane.name],
            lane_meta: vec![LaneMeta {
                color: lane.color,
                mute: false,
                solo: false,
            }],
            clips: Vec::new(),
            loop_region: None,
            px_per_beat: DEFAULT_PX_PER_BEAT,
            length_beats: DEFAULT_LENGTH_BEATS,
        }
    }
}

impl SessionSnapshot {
    fn into_arrangement(self) -> Arrangement {
        let count = self.lanes.len().max(self.lane_meta.len());
        let mut names = self.lanes.into_iter();
        let mut metas = self.lane_meta.into_iter();
        let lanes = (0..count)
            .map(|index| {
                let mut lane = Lane::new(index);
                if let Some(name) = names.next() {
                    lane.name = name;
                }
                if let Some(meta) = metas.next() {
                    lane.color = meta.color;
                    lane.mute = meta.mute;
                    lane.solo = meta.solo;
                }
                lane
            })
            .collect();

        let timeline = Timeline {
            bpm: self.bpm,
            length_beats: self.length_beats,
            px_per_beat: self.px_per_beat,
        };
        Arrangement::from_parts(
            timeline,
            LaneRegistry::from_lanes(lanes),
            ClipStore::from_clips(self.clips),
            self.loop_region,
        )
    }
}

/// Everything one editing session owns. The caller drives it with pointer
/// events, transport commands and periodic ticks, and decides when to persist.
pub struct Session {
    arrangement: Arrangement,
    selection: SelectionController,
    interaction: InteractionController,
    loop_picker: LoopPicker,
    transport: TransportScheduler,
    gesture: Option<Gesture>,
    saved: (u64, f64),
}

impl Session {
    pub fn new(clock: Box<dyn Clock + Send>) -> Self {
        Self::from_snapshot(SessionSnapshot::default(), clock)
    }

    pub fn from_snapshot(snapshot: SessionSnapshot, clock: Box<dyn Clock + Send>) -> Self {
        let arrangement = snapshot.into_arrangement();
        let mut loop_picker = LoopPicker::new();
        loop_picker.restore(arrangement.loop_region());
        let mut transport = TransportScheduler::new(clock);
        if let Some(region) = arrangement.loop_region() {
            transport.recompile_at(&arrangement, region.start_sec, &mut NullEngine);
        }
        let saved = (arrangement.revision(), arrangement.timeline().px_per_beat);
        Self {
            arrangement,
            selection: SelectionController::new(),
            interaction: InteractionController::default(),
            loop_picker,
            transport,
            gesture: None,
            saved,
        }
    }

    pub fn with_lookahead(mut self, lookahead_secs: f64) -> Self {
        self.transport = self.transport.with_lookahead(lookahead_secs);
        self
    }

    pub fn to_snapshot(&self) -> SessionSnapshot {
        let timeline = self.arrangement.timeline();
        let lanes = self.arrangement.lanes();
        SessionSnapshot {
            bpm: timeline.bpm,
            lanes: lanes.iter().map(|l| l.name.clone()).collect(),
            lane_meta: lanes
                .iter()
                .map(|l| LaneMeta {
                    color: l.color,
                    mute: l.mute,
                    solo: l.solo,
                })
                .collect(),
            clips: self.arrangement.clips().as_slice().to_vec(),
            loop_region: self.arrangement.loop_region(),
            px_per_beat: timeline.px_per_beat,
            length_beats: timeline.length_beats,
        }
    }

    /// True when anything persisted changed since the last save
    pub fn is_dirty(&self) -> bool {
        self.saved != (self.arrangement.revision(), self.arrangement.timeline().px_per_beat)
    }

    pub fn mark_saved(&mut self) {
        self.saved = (self.arrangement.revision(), self.arrangement.timeline().px_per_beat);
    }

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    /// Direct access for lane, tempo and zoom edits
    pub fn arrangement_mut(&mut self) -> &mut Arrangement {
        &mut self.arrangement
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn loop_picker(&self) -> &LoopPicker {
        &self.loop_picker
    }

    pub fn transport(&self) -> &TransportScheduler {
        &self.transport
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    // --- gestures ---

    pub fn pointer_down(&mut self, pointer: Pointer, modifiers: Modifiers) {
        if let Some(previous) = self.gesture.take() {
            self.interaction.cancel(&mut self.arrangement, previous);
        }
        self.gesture = self
            .interaction
            .pointer_down(&self.arrangement, &mut self.selection, pointer, modifiers);
    }

    pub fn pointer_move(&mut self, pointer: Pointer) -> bool {
        let Some(gesture) = self.gesture.as_mut() else { return false };
        self.interaction.pointer_move(&mut self.arrangement, gesture, pointer)
    }

    pub fn pointer_up(&mut self, pointer: Pointer) -> Option<GestureOutcome> {
        let gesture = self.gesture.take()?;
        Some(
            self.interaction
                .pointer_up(&mut self.arrangement, &mut self.selection, gesture, pointer),
        )
    }

    /// Abort the current gesture, restoring every clip it touched
    pub fn cancel_gesture(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            self.interaction.cancel(&mut self.arrangement, gesture);
        }
    }

    // --- clip edits ---

    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<ClipId> = self.selection.ids().iter().copied().collect();
        let removed = self.arrangement.delete_clips(&ids);
        self.selection.retain_existing(self.arrangement.clips());
        removed
    }

    /// Copy the selection shifted by `beat_offset`; the copies become the selection
    pub fn duplicate_selected(&mut self, beat_offset: f64) -> Vec<ClipId> {
        let ids: Vec<ClipId> = self.selection.ids().iter().copied().collect();
        let copies = self.arrangement.duplicate_clips(&ids, beat_offset);
        if !copies.is_empty() {
            self.selection.select_group(copies.iter().copied());
        }
        copies
    }

    /// Drop a one-beat clip for `patch` at the snapped playhead
    pub fn insert_patch_at_playhead(&mut self, lane: usize, patch: PatchSummary) -> ClipId {
        let beat = snap(self.arrangement.geometry().sec_to_beat(self.transport.playhead_secs()));
        let id = self.arrangement.add_clip(lane, beat, 1.0, Some(patch));
        self.selection.select_group([id]);
        id
    }

    pub fn clear_lane(&mut self, lane: usize) -> usize {
        let removed = self.arrangement.clear_lane(lane).len();
        self.selection.retain_existing(self.arrangement.clips());
        removed
    }

    pub fn import_rack(&mut self, rack: &Rack) -> Vec<ClipId> {
        rack.import_into(&mut self.arrangement)
    }

    pub fn import_composition(&mut self, composition: Composition, patches: &[PatchSummary]) -> Result<Vec<ClipId>> {
        composition.import_into(&mut self.arrangement, patches)
    }

    pub fn export_composition(&self) -> Composition {
        Composition::from_arrangement(&self.arrangement)
    }

    // --- loop ---

    pub fn arm_loop_picker(&mut self) {
        self.loop_picker.arm();
    }

    pub fn cancel_loop_picker(&mut self) {
        self.loop_picker.cancel();
    }

    /// Feed a timeline click to the picker. On commit, looping starts and
    /// the transport jumps to the loop start.
    pub fn loop_click(&mut self, beat: f64, engine: &mut dyn PatchEngine) -> Option<LoopRegion> {
        let region = self.loop_picker.click(beat, &self.arrangement.geometry())?;
        self.arrangement.set_loop_region(Some(region));
        self.transport.recompile_at(&self.arrangement, region.start_sec, engine);
        tracing::info!(start_secs = region.start_sec, end_secs = region.end_sec, "Loop committed");
        Some(region)
    }

    /// Stop looping and return the transport to zero
    pub fn clear_loop(&mut self, engine: &mut dyn PatchEngine) {
        self.loop_picker.clear();
        self.arrangement.set_loop_region(None);
        self.transport.recompile_at(&self.arrangement, 0.0, engine);
        tracing::info!("Loop cleared");
    }

    // --- transport ---

    pub fn play(&mut self, engine: &mut dyn PatchEngine) -> Result<()> {
        self.transport.play(&self.arrangement, engine)
    }

    pub fn pause(&mut self, engine: &mut dyn PatchEngine) {
        self.transport.pause(engine);
    }

    pub fn resume(&mut self, engine: &mut dyn PatchEngine) {
        self.transport.resume(&self.arrangement, engine);
    }

    pub fn stop(&mut self, engine: &mut dyn PatchEngine) {
        self.transport.stop(engine);
    }

    pub fn recompile(&mut self, engine: &mut dyn PatchEngine) {
        self.transport.recompile(&self.arrangement, engine);
    }

    pub fn seek(&mut self, secs: f64, engine: &mut dyn PatchEngine) {
        self.transport.seek(secs, engine);
    }

    pub fn tick(&mut self, engine: &mut dyn PatchEngine) -> TickReport {
        self.transport.tick(engine)
    }

    pub fn playhead_secs(&self) -> f64 {
        self.transport.playhead_secs()
    }
}

/// Used while restoring, before any real engine is attached; the transport
/// is stopped so nothing is ever triggered.
struct NullEngine;

impl PatchEngine for NullEngine {
    fn start(&mut self) -> std::result::Result<(), EngineError> {
        Ok(())
    }

    fn trigger(
        &mut self,
        _patch: &PatchSummary,
        _at_secs: f64,
        _duration_secs: f64,
    ) -> std::result::Result<(), EngineError> {
        Ok(())
    }

    fn cancel_pending(&mut self) {}
}
