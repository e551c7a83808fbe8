//! Clip selection and box-select semantics

use std::collections::BTreeSet;

use crate::clip::ClipId;
use crate::store::ClipStore;

/// Selected clips, plus whether they were gathered by a multi-clip box select.
/// A box group drags as one unit when any member is clicked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub ids: BTreeSet<ClipId>,
    pub is_box_group: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selection: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn ids(&self) -> &BTreeSet<ClipId> {
        &self.selection.ids
    }

    pub fn is_selected(&self, id: ClipId) -> bool {
        self.selection.ids.contains(&id)
    }

    pub fn is_box_group(&self) -> bool {
        self.selection.is_box_group
    }

    pub fn is_empty(&self) -> bool {
        self.selection.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selection.ids.len()
    }

    /// Click on a clip. Shift toggles membership; a plain click on a member
    /// of a box group keeps the group so it can be dragged together.
    pub fn click_clip(&mut self, id: ClipId, shift_held: bool) {
        if shift_held {
            if !self.selection.ids.remove(&id) {
                self.selection.ids.insert(id);
            }
            self.selection.is_box_group = false;
            return;
        }

        if self.selection.is_box_group && self.selection.ids.contains(&id) {
            return;
        }

        self.selection.ids.clear();
        self.selection.ids.insert(id);
        self.selection.is_box_group = false;
    }

    /// Replace the selection with every clip in the region
    pub fn box_select(&mut self, store: &ClipStore, beats: (f64, f64), lanes: (usize, usize)) {
        self.selection.ids = store.query_by_region(beats, lanes);
        self.selection.is_box_group = self.selection.ids.len() > 1;
    }

    /// Select exactly `ids`, treating more than one as a group
    pub fn select_group(&mut self, ids: impl IntoIterator<Item = ClipId>) {
        self.selection.ids = ids.into_iter().collect();
        self.selection.is_box_group = self.selection.ids.len() > 1;
    }

    pub fn clear(&mut self) {
        self.selection.ids.clear();
        self.selection.is_box_group = false;
    }

    /// Drop ids that no longer exist in the store
    pub fn retain_existing(&mut self, store: &ClipStore) {
        self.selection.ids.retain(|id| store.contains(*id));
        if self.selection.ids.len() <= 1 {
            self.selection.is_box_group = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ClipStore, Vec<ClipId>) {
        let mut store = ClipStore::new();
        let ids = vec![
            store.add_clip(0, 0.0, 1.0, None),
            store.add_clip(0, 2.0, 1.0, None),
            store.add_clip(1, 0.0, 1.0, None),
        ];
        (store, ids)
    }

    #[test]
    fn test_plain_click_replaces() {
        let (_, ids) = store();
        let mut sel = SelectionController::new();
        sel.click_clip(ids[0], false);
        sel.click_clip(ids[1], false);
        assert_eq!(sel.ids().iter().copied().collect::<Vec<_>>(), vec![ids[1]]);
        assert!(!sel.is_box_group());
    }

    #[test]
    fn test_shift_click_toggles() {
        let (_, ids) = store();
        let mut sel = SelectionController::new();
        sel.click_clip(ids[0], true);
        sel.click_clip(ids[1], true);
        assert_eq!(sel.len(), 2);
        sel.click_clip(ids[0], true);
        assert_eq!(sel.ids().iter().copied().collect::<Vec<_>>(), vec![ids[1]]);
        assert!(!sel.is_box_group());
    }

    #[test]
    fn test_box_group_survives_member_click() {
        let (store, ids) = store();
        let mut sel = SelectionController::new();
        sel.box_select(&store, (0.0, 3.0), (0, 0));
        assert!(sel.is_box_group());
        assert_eq!(sel.len(), 2);

        sel.click_clip(ids[1], false);
        assert_eq!(sel.len(), 2);
        assert!(sel.is_box_group());

        sel.click_clip(ids[2], false);
        assert_eq!(sel.len(), 1);
        assert!(!sel.is_box_group());
    }

    #[test]
    fn test_single_hit_box_is_not_group() {
        let (store, ids) = store();
        let mut sel = SelectionController::new();
        sel.box_select(&store, (0.0, 0.5), (1, 1));
        assert!(sel.is_selected(ids[2]));
        assert!(!sel.is_box_group());
    }

    #[test]
    fn test_shift_click_breaks_group() {
        let (store, ids) = store();
        let mut sel = SelectionController::new();
        sel.box_select(&store, (0.0, 3.0), (0, 1));
        assert_eq!(sel.len(), 3);
        sel.click_clip(ids[2], true);
        assert_eq!(sel.len(), 2);
        assert!(!sel.is_box_group());
    }

    #[test]
    fn test_retain_existing_prunes() {
        let (mut store, ids) = store();
        let mut sel = SelectionController::new();
        sel.box_select(&store, (0.0, 3.0), (0, 0));
        store.delete_clips(&[ids[0]]);
        sel.retain_existing(&store);
        assert_eq!(sel.len(), 1);
        assert!(!sel.is_box_group());
    }
}
