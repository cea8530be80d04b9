use engine::Vec2;

use super::actor::UnitId;
use super::room::RoomCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Key,
}

impl ItemKind {
    pub(crate) fn sprite_key(self) -> &'static str {
        match self {
            ItemKind::Key => "key",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Item {
    pub kind: ItemKind,
    pub room: RoomCoord,
    pub position: Vec2,
    pub owner: Option<UnitId>,
}

impl Item {
    pub(crate) fn key(room: RoomCoord, position: Vec2) -> Self {
        Self {
            kind: ItemKind::Key,
            room,
            position,
            owner: None,
        }
    }

    pub(crate) fn is_owned(&self) -> bool {
        self.owner.is_some()
    }
}

/// Indices into the stage item list. Keys open doors without being used up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HeldKeys {
    items: Vec<usize>,
}

impl HeldKeys {
    pub(crate) fn add(&mut self, item_index: usize) {
        if !self.items.contains(&item_index) {
            self.items.push(item_index);
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_ignore_duplicate_indices() {
        let mut keys = HeldKeys::default();
        assert!(keys.is_empty());
        keys.add(2);
        keys.add(2);
        keys.add(0);
        assert_eq!(keys.count(), 2);
    }

    #[test]
    fn new_keys_start_unowned() {
        let key = Item::key(RoomCoord::new(1, 1), Vec2::new(120.0, 120.0));
        assert_eq!(key.kind, ItemKind::Key);
        assert!(!key.is_owned());
    }
}
