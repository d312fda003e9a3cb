use crate::domain::catalog::ItemId;
use std::collections::BTreeSet;

/// Which items the user has chosen, and which descriptions are expanded.
///
/// Both sets use toggle semantics and are independent of each other. Ids are
/// not validated against the catalog here; pricing reports unknown ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<ItemId>,
    expanded: BTreeSet<ItemId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id` in the selection. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, id: ItemId) -> bool {
        toggle(&mut self.selected, id)
    }

    /// Flips whether the description of `id` is shown. Returns whether it is now shown.
    pub fn toggle_description(&mut self, id: ItemId) -> bool {
        toggle(&mut self.expanded, id)
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_expanded(&self, id: ItemId) -> bool {
        self.expanded.contains(&id)
    }

    /// Selected ids in ascending order.
    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.selected.iter().copied().collect()
    }

    pub fn expanded_ids(&self) -> Vec<ItemId> {
        self.expanded.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Clears the selection. Description visibility is left alone.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}

fn toggle(set: &mut BTreeSet<ItemId>, id: ItemId) -> bool {
    if set.remove(&id) {
        false
    } else {
        set.insert(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_toggle_selection_flips_membership() {
        let mut state = SelectionState::new();
        assert!(state.toggle_selection(ItemId(3)));
        assert!(state.is_selected(ItemId(3)));
        assert!(!state.toggle_selection(ItemId(3)));
        assert!(!state.is_selected(ItemId(3)));
        assert!(state.is_empty());
    }

    #[test]
    fn test_selection_is_ids_toggled_odd_times() {
        let toggles = [1, 2, 1, 3, 5, 3, 3, 2, 2, 4, 4];
        let mut state = SelectionState::new();
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for id in toggles {
            state.toggle_selection(ItemId(id));
            *counts.entry(id).or_default() += 1;
        }

        let mut expected: Vec<ItemId> = counts
            .into_iter()
            .filter(|(_, n)| n % 2 == 1)
            .map(|(id, _)| ItemId(id))
            .collect();
        expected.sort();

        assert_eq!(state.selected_ids(), expected);
        assert_eq!(expected, vec![ItemId(2), ItemId(3), ItemId(5)]);
    }

    #[test]
    fn test_description_visibility_independent_of_selection() {
        let mut state = SelectionState::new();
        state.toggle_description(ItemId(1));
        assert!(state.is_expanded(ItemId(1)));
        assert!(!state.is_selected(ItemId(1)));

        state.toggle_selection(ItemId(1));
        state.clear_selection();
        assert!(state.is_empty());
        assert_eq!(state.expanded_ids(), vec![ItemId(1)]);
    }

    #[test]
    fn test_unknown_ids_are_accepted() {
        let mut state = SelectionState::new();
        state.toggle_selection(ItemId(999));
        assert_eq!(state.selected_ids(), vec![ItemId(999)]);
    }
}
