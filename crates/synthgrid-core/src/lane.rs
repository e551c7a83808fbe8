//! Lane metadata, addressed by index

use serde::{Deserialize, Serialize};

/// Upper bound on lane count; lane indices from storage or imports clamp below it
pub const MAX_LANES: usize = 256;

/// RGB lane color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneColor(pub u8, pub u8, pub u8);

const PALETTE: [LaneColor; 6] = [
    LaneColor(87, 148, 242),
    LaneColor(115, 191, 105),
    LaneColor(242, 204, 12),
    LaneColor(255, 152, 48),
    LaneColor(224, 47, 68),
    LaneColor(163, 82, 204),
];

/// A horizontal track holding clips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub index: usize,
    pub name: String,
    pub color: LaneColor,
    pub mute: bool,
    pub solo: bool,
}

impl Lane {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            name: format!("Lane {}", index + 1),
            color: PALETTE[index % PALETTE.len()],
            mute: false,
            solo: false,
        }
    }
}

/// Per-lane metadata. Clips refer to lanes by index only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneRegistry {
    lanes: Vec<Lane>,
}

impl LaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lanes(count: usize) -> Self {
        let mut registry = Self::new();
        registry.ensure_len(count);
        registry
    }

    /// Rebuild from stored lanes, renumbering indices to positions
    pub fn from_lanes(lanes: Vec<Lane>) -> Self {
        let lanes = lanes
            .into_iter()
            .take(MAX_LANES)
            .enumerate()
            .map(|(index, lane)| Lane { index, ..lane })
            .collect();
        Self { lanes }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Grow with default metadata until at least `count` lanes exist,
    /// up to [`MAX_LANES`]. Returns true if lanes were added.
    pub fn ensure_len(&mut self, count: usize) -> bool {
        let count = count.min(MAX_LANES);
        let before = self.lanes.len();
        while self.lanes.len() < count {
            let index = self.lanes.len();
            self.lanes.push(Lane::new(index));
        }
        self.lanes.len() != before
    }

    /// Append a default lane, returning its index. At [`MAX_LANES`] the
    /// last lane's index is returned and nothing is added.
    pub fn push(&mut self) -> usize {
        let index = self.lanes.len();
        if index >= MAX_LANES {
            return MAX_LANES - 1;
        }
        self.lanes.push(Lane::new(index));
        index
    }

    pub fn get(&self, index: usize) -> Option<&Lane> {
        self.lanes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Lane> {
        self.lanes.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    pub fn as_slice(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> bool {
        let Some(lane) = self.lanes.get_mut(index) else { return false };
        lane.name = name.into();
        true
    }

    pub fn set_color(&mut self, index: usize, color: LaneColor) -> bool {
        let Some(lane) = self.lanes.get_mut(index) else { return false };
        lane.color = color;
        true
    }

    pub fn toggle_mute(&mut self, index: usize) -> bool {
        let Some(lane) = self.lanes.get_mut(index) else { return false };
        lane.mute = !lane.mute;
        true
    }

    pub fn toggle_solo(&mut self, index: usize) -> bool {
        let Some(lane) = self.lanes.get_mut(index) else { return false };
        lane.solo = !lane.solo;
        true
    }

    /// Check if any lane is soloed
    pub fn any_solo(&self) -> bool {
        self.lanes.iter().any(|l| l.solo)
    }

    /// Whether clips on `index` should sound: solo wins over mute.
    /// Lanes without metadata count as default (audible unless something is soloed).
    pub fn is_audible(&self, index: usize) -> bool {
        lane_audible(&self.lanes, index)
    }
}

/// Solo/mute resolution over a lane slice
pub fn lane_audible(lanes: &[Lane], index: usize) -> bool {
    let has_solo = lanes.iter().any(|l| l.solo);
    match lanes.get(index) {
        Some(lane) if has_solo => lane.solo,
        Some(lane) => !lane.mute,
        None => !has_solo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_len_grows_with_defaults() {
        let mut lanes = LaneRegistry::new();
        assert!(lanes.ensure_len(3));
        assert!(!lanes.ensure_len(2));
        assert_eq!(lanes.len(), 3);
        let lane = lanes.get(2).unwrap();
        assert_eq!(lane.index, 2);
        assert_eq!(lane.name, "Lane 3");
        assert!(!lane.mute && !lane.solo);
    }

    #[test]
    fn test_solo_overrides_mute() {
        let mut lanes = LaneRegistry::with_lanes(3);
        lanes.toggle_mute(1);
        assert!(lanes.is_audible(0));
        assert!(!lanes.is_audible(1));

        lanes.toggle_solo(1);
        assert!(!lanes.is_audible(0));
        assert!(lanes.is_audible(1));
        assert!(!lanes.is_audible(2));
    }

    #[test]
    fn test_from_lanes_renumbers() {
        let mut stored = vec![Lane::new(5), Lane::new(9)];
        stored[1].name = "Drums".into();
        let lanes = LaneRegistry::from_lanes(stored);
        assert_eq!(lanes.get(1).unwrap().index, 1);
        assert_eq!(lanes.get(1).unwrap().name, "Drums");
    }

    #[test]
    fn test_growth_stops_at_max_lanes() {
        let mut lanes = LaneRegistry::new();
        lanes.ensure_len(4_000_000_000);
        assert_eq!(lanes.len(), MAX_LANES);
        assert_eq!(lanes.push(), MAX_LANES - 1);
        assert_eq!(lanes.len(), MAX_LANES);
    }
}
