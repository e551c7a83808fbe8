//! Compiling a snapshot into timed trigger events

use crate::clip::{Clip, ClipId};
use crate::geometry::GridGeometry;
use crate::lane::{lane_audible, Lane};
use crate::loop_region::LoopRegion;
use crate::patch::PatchSummary;

/// One note to fire: `patch` at `at_sec` for `duration_sec`
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub at_sec: f64,
    pub duration_sec: f64,
    pub patch: PatchSummary,
    pub clip: ClipId,
    pub lane: usize,
}

impl TriggerEvent {
    pub fn end_sec(&self) -> f64 {
        self.at_sec + self.duration_sec
    }
}

/// Build the trigger list for one playback run.
///
/// Only clips on audible lanes produce events. With a loop region, only
/// events starting inside the region are kept, cut off at its end. Output
/// is ordered by start time, ties kept in clip order, so identical inputs
/// always give an identical list. Clips without a patch are skipped.
pub fn compile_schedule(
    clips: &[Clip],
    lanes: &[Lane],
    bpm: f64,
    loop_region: Option<LoopRegion>,
) -> Vec<TriggerEvent> {
    let geo = GridGeometry::new(bpm, 1.0);

    let mut events: Vec<TriggerEvent> = clips
        .iter()
        .filter(|clip| lane_audible(lanes, clip.lane))
        .filter_map(|clip| {
            let Some(patch) = &clip.patch_ref else {
                tracing::warn!(clip = %clip.id, lane = clip.lane, "Clip has no playable patch, skipping");
                return None;
            };
            Some(TriggerEvent {
                at_sec: geo.beat_to_sec(clip.start_beat),
                duration_sec: geo.beat_to_sec(clip.length_beats),
                patch: patch.clone(),
                clip: clip.id,
                lane: clip.lane,
            })
        })
        .filter_map(|mut event| match loop_region {
            Some(region) if !region.contains(event.at_sec) => None,
            Some(region) => {
                event.duration_sec = event.duration_sec.min(region.end_sec - event.at_sec);
                Some(event)
            }
            None => Some(event),
        })
        .collect();

    events.sort_by(|a, b| a.at_sec.total_cmp(&b.at_sec));
    events
}
