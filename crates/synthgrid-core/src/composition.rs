//! Composition documents: the portable `{version, items}` form of an arrangement

use serde::{Deserialize, Serialize};

use crate::arrangement::Arrangement;
use crate::clip::ClipId;
use crate::error::{Result, SynthgridError};
use crate::lane::MAX_LANES;
use crate::patch::{PatchId, PatchSummary};

pub const COMPOSITION_VERSION: u32 = 1;

fn default_version() -> u32 {
    COMPOSITION_VERSION
}

/// One placed patch. `start` and `end` are in beats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionItem {
    pub patch: PatchId,
    pub lane: i64,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub items: Vec<CompositionItem>,
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            version: COMPOSITION_VERSION,
            items: Vec::new(),
        }
    }
}

impl Composition {
    /// Export every clip that carries a patch
    pub fn from_arrangement(arrangement: &Arrangement) -> Self {
        let items = arrangement
            .clips()
            .iter()
            .filter_map(|clip| {
                let patch = clip.patch_ref.as_ref()?;
                Some(CompositionItem {
                    patch: patch.id,
                    lane: clip.lane as i64,
                    start: clip.start_beat,
                    end: clip.end_beat(),
                    label: Some(clip.label.clone()),
                })
            })
            .collect();
        Self {
            version: COMPOSITION_VERSION,
            items,
        }
    }

    /// Check item bounds and that every patch id resolves in `patches`.
    /// Null labels normalize to "".
    pub fn validate(&mut self, patches: &[PatchSummary]) -> Result<()> {
        for (i, item) in self.items.iter_mut().enumerate() {
            if item.lane < 0 {
                return Err(SynthgridError::Composition(format!("Item {i}: lane must be >= 0.")));
            }
            if item.lane >= MAX_LANES as i64 {
                return Err(SynthgridError::Composition(format!("Item {i}: lane must be < {MAX_LANES}.")));
            }
            if !item.start.is_finite() || item.start < 0.0 {
                return Err(SynthgridError::Composition(format!("Item {i}: start must be >= 0.")));
            }
            if !item.end.is_finite() || item.end <= item.start {
                return Err(SynthgridError::Composition(format!("Item {i}: end must be > start.")));
            }
            item.label.get_or_insert_with(String::new);
        }

        let missing: Vec<u64> = self
            .items
            .iter()
            .map(|item| item.patch)
            .filter(|id| !patches.iter().any(|p| p.id == *id))
            .map(|id| id.0)
            .collect();
        if !missing.is_empty() {
            return Err(SynthgridError::Composition(format!("Unknown patch id(s): {missing:?}")));
        }
        Ok(())
    }

    /// Validate, then add every item to the arrangement as a clip.
    /// Nothing is added when validation fails.
    pub fn import_into(mut self, arrangement: &mut Arrangement, patches: &[PatchSummary]) -> Result<Vec<ClipId>> {
        self.validate(patches)?;

        let mut ids = Vec::with_capacity(self.items.len());
        for item in self.items {
            let patch = patches.iter().find(|p| p.id == item.patch).cloned();
            let id = arrangement.add_clip(item.lane as usize, item.start, item.end - item.start, patch);
            if let Some(label) = item.label.filter(|l| !l.is_empty()) {
                arrangement.set_clip_label(id, label);
            }
            ids.push(id);
        }
        tracing::info!(clips = ids.len(), "Imported composition");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patches() -> Vec<PatchSummary> {
        vec![PatchSummary::new(1, "Bass"), PatchSummary::new(2, "Lead")]
    }

    #[test]
    fn test_missing_version_and_null_label_normalize() {
        let json = r#"{"items":[{"patch":1,"lane":0,"start":0,"end":2,"label":null}]}"#;
        let mut comp: Composition = serde_json::from_str(json).unwrap();
        assert_eq!(comp.version, 1);
        comp.validate(&patches()).unwrap();
        assert_eq!(comp.items[0].label.as_deref(), Some(""));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let mut comp = Composition {
            version: 1,
            items: vec![CompositionItem {
                patch: PatchId(1),
                lane: 0,
                start: 2.0,
                end: 2.0,
                label: None,
            }],
        };
        let err = comp.validate(&patches()).unwrap_err();
        assert!(err.to_string().contains("end must be > start"));

        comp.items[0].end = 3.0;
        comp.items[0].lane = -1;
        assert!(comp.validate(&patches()).is_err());
    }

    #[test]
    fn test_unknown_patch_ids_listed() {
        let json = r#"{"version":1,"items":[
            {"patch":1,"lane":0,"start":0,"end":1},
            {"patch":7,"lane":0,"start":1,"end":2},
            {"patch":9,"lane":1,"start":0,"end":1}
        ]}"#;
        let comp: Composition = serde_json::from_str(json).unwrap();
        let mut arr = Arrangement::new();
        let err = comp.import_into(&mut arr, &patches()).unwrap_err();
        assert!(err.to_string().contains("[7, 9]"));
        assert!(arr.clips().is_empty());
    }

    #[test]
    fn test_import_and_export() {
        let json = r#"{"items":[
            {"patch":1,"lane":2,"start":0,"end":4,"label":"intro"},
            {"patch":2,"lane":0,"start":4,"end":4.1}
        ]}"#;
        let comp: Composition = serde_json::from_str(json).unwrap();
        let mut arr = Arrangement::new();
        let ids = comp.import_into(&mut arr, &patches()).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(arr.lanes().len(), 3);

        let intro = arr.clip(ids[0]).unwrap();
        assert_eq!(intro.label, "intro");
        assert_eq!(intro.length_beats, 4.0);
        let short = arr.clip(ids[1]).unwrap();
        assert_eq!(short.label, "Lead");
        assert_eq!(short.length_beats, 0.25);

        let exported = Composition::from_arrangement(&arr);
        assert_eq!(exported.items.len(), 2);
        assert_eq!(exported.items[0].lane, 2);
        assert_eq!(exported.items[1].end, 4.25);
    }

    #[test]
    fn test_rejects_lane_past_cap() {
        let json = r#"{"items":[{"patch":1,"lane":4000000000,"start":0,"end":1}]}"#;
        let comp: Composition = serde_json::from_str(json).unwrap();
        let mut arr = Arrangement::new();
        let err = comp.import_into(&mut arr, &patches()).unwrap_err();
        assert!(err.to_string().contains("lane must be < 256"));
        assert_eq!(arr.lanes().len(), 1);
    }
}
