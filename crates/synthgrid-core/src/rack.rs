//! Step rack import: 16-step patterns become sixteenth-beat clips

use serde::{Deserialize, Serialize};

use crate::arrangement::Arrangement;
use crate::clip::ClipId;
use crate::geometry::SNAP_STEP;
use crate::patch::PatchSummary;

/// Steps per rack lane
pub const RACK_STEPS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackLane {
    pub steps: [bool; RACK_STEPS],
    #[serde(default)]
    pub patch: Option<PatchSummary>,
}

impl RackLane {
    pub fn new(patch: PatchSummary) -> Self {
        Self {
            steps: [false; RACK_STEPS],
            patch: Some(patch),
        }
    }

    pub fn active_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().enumerate().filter(|(_, on)| **on).map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rack {
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub lanes: Vec<RackLane>,
}

impl Rack {
    /// Place every active step as a clip. Each rack lane gets its own
    /// timeline lane after the last one holding clips; a rack tempo becomes
    /// the arrangement tempo. Returns the new clip ids in step order.
    pub fn import_into(&self, arrangement: &mut Arrangement) -> Vec<ClipId> {
        if let Some(tempo) = self.tempo {
            arrangement.set_bpm(tempo);
        }

        let first_lane = arrangement.clips().max_lane().map_or(0, |lane| lane + 1);
        let mut ids = Vec::new();

        for (offset, rack_lane) in self.lanes.iter().enumerate() {
            let lane = first_lane + offset;
            if lane >= arrangement.lanes().len() {
                arrangement.add_lane();
            }
            if let Some(patch) = &rack_lane.patch {
                arrangement.rename_lane(lane, patch.label());
            }
            for step in rack_lane.active_steps() {
                let start = step as f64 * SNAP_STEP;
                ids.push(arrangement.add_clip(lane, start, SNAP_STEP, rack_lane.patch.clone()));
            }
        }

        tracing::info!(
            lanes = self.lanes.len(),
            clips = ids.len(),
            first_lane,
            "Imported rack"
        );
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating() -> [bool; RACK_STEPS] {
        std::array::from_fn(|i| i % 2 == 0)
    }

    #[test]
    fn test_alternating_steps() {
        let mut lane = RackLane::new(PatchSummary::new(1, "Kick"));
        lane.steps = alternating();
        let rack = Rack {
            tempo: Some(120.0),
            lanes: vec![lane],
        };

        let mut arr = Arrangement::new();
        let ids = rack.import_into(&mut arr);
        assert_eq!(ids.len(), 8);

        let first = arr.clip(ids[0]).unwrap();
        assert_eq!((first.start_beat, first.length_beats), (0.0, 0.25));
        let second = arr.clip(ids[1]).unwrap();
        assert_eq!((second.start_beat, second.length_beats), (0.5, 0.25));
        assert_eq!(arr.timeline().bpm, 120.0);
        assert_eq!(arr.lanes().get(0).unwrap().name, "Kick");
    }

    #[test]
    fn test_lanes_appended_after_existing_clips() {
        let mut arr = Arrangement::new();
        arr.add_clip(1, 0.0, 4.0, None);

        let mut kick = RackLane::new(PatchSummary::new(1, "Kick"));
        kick.steps[0] = true;
        let mut hat = RackLane::new(PatchSummary::new(2, "Hat"));
        hat.steps[15] = true;
        let rack = Rack {
            tempo: None,
            lanes: vec![kick, hat],
        };

        let ids = rack.import_into(&mut arr);
        assert_eq!(arr.lanes().len(), 4);
        assert_eq!(arr.clip(ids[0]).unwrap().lane, 2);
        let hat_clip = arr.clip(ids[1]).unwrap();
        assert_eq!(hat_clip.lane, 3);
        assert_eq!(hat_clip.start_beat, 3.75);
        assert_eq!(arr.timeline().bpm, 120.0);
    }

    #[test]
    fn test_parse_rack_json() {
        let json = r#"{"tempo":96,"lanes":[{"steps":[true,false,false,false,true,false,false,false,
            true,false,false,false,true,false,false,false],"patch":{"id":4,"name":"Snare"}}]}"#;
        let rack: Rack = serde_json::from_str(json).unwrap();
        assert_eq!(rack.tempo, Some(96.0));
        assert_eq!(rack.lanes[0].active_steps().collect::<Vec<_>>(), vec![0, 4, 8, 12]);
        assert_eq!(rack.lanes[0].patch.as_ref().unwrap().note, "C4");
    }
}
