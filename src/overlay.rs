//! Overlay images and filename links between positions.
//!
//! A link is a plain id relation from the position owning the overlay to
//! the position that displays its file name. Targets are never enforced at
//! mutation time; a link whose target is gone simply resolves to nothing.

use std::sync::Arc;
use tracing::debug;

use crate::position::{Overlay, PositionId, PositionSet};

impl PositionSet {
    /// Stores an overlay image on `id`. Unknown ids are ignored.
    pub fn set_overlay(&mut self, id: PositionId, bytes: Arc<[u8]>, file_name: String) -> bool {
        let Some(position) = self.get_mut(id) else {
            return false;
        };
        debug!(%id, %file_name, size = bytes.len(), "overlay set");
        position.overlay = Some(Overlay { bytes, file_name });
        true
    }

    /// Removes the overlay and the now meaningless outgoing filename link.
    pub fn clear_overlay(&mut self, id: PositionId) -> bool {
        let Some(position) = self.get_mut(id) else {
            return false;
        };
        position.overlay = None;
        position.file_name_link = None;
        debug!(%id, "overlay cleared");
        true
    }

    /// Shows the overlay file name of `source` inside `target`.
    pub fn link_file_name(&mut self, source: PositionId, target: PositionId) -> bool {
        if source == target || !self.contains_id(target) {
            return false;
        }
        match self.get_mut(source) {
            Some(position) if position.overlay.is_some() => {
                position.file_name_link = Some(target);
                debug!(%source, %target, "file name linked");
                true
            }
            _ => false,
        }
    }

    pub fn unlink_file_name(&mut self, id: PositionId) -> bool {
        match self.get_mut(id) {
            Some(position) if position.file_name_link.is_some() => {
                position.file_name_link = None;
                true
            }
            _ => false,
        }
    }

    /// Outgoing link of `id`, if its target still exists.
    pub fn link_target(&self, id: PositionId) -> Option<PositionId> {
        let target = self.get(id)?.file_name_link?;
        self.contains_id(target).then_some(target)
    }

    /// File name to draw inside `id`.
    ///
    /// When several positions link to the same target, the first one in draw
    /// order wins.
    pub fn resolve_display_file_name(&self, id: PositionId) -> Option<&str> {
        if !self.contains_id(id) {
            return None;
        }
        self.iter()
            .filter(|p| p.id != id && p.file_name_link == Some(id))
            .find_map(|p| p.overlay_file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Shape};
    use crate::position::Position;

    fn set_with_two() -> (PositionSet, PositionId, PositionId) {
        let mut set = PositionSet::default();
        let a = set.push(Position::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), Shape::Rectangle));
        let b = set.push(Position::new(BoundingBox::new(20.0, 0.0, 10.0, 10.0), Shape::Circle));
        (set, a, b)
    }

    fn blob() -> Arc<[u8]> {
        Arc::from(vec![1u8, 2, 3])
    }

    #[test]
    fn test_set_overlay_on_unknown_id_is_noop() {
        let (mut set, _, _) = set_with_two();
        assert!(!set.set_overlay(PositionId::new(), blob(), "x.png".into()));
        assert!(set.iter().all(|p| p.overlay.is_none()));
    }

    #[test]
    fn test_link_resolves_on_target_only() {
        let (mut set, a, b) = set_with_two();
        assert!(set.set_overlay(a, blob(), "logo.png".into()));
        assert!(set.link_file_name(a, b));
        assert_eq!(set.resolve_display_file_name(b), Some("logo.png"));
        assert_eq!(set.resolve_display_file_name(a), None);
        assert_eq!(set.link_target(a), Some(b));
    }

    #[test]
    fn test_link_requires_overlay_and_distinct_target() {
        let (mut set, a, b) = set_with_two();
        assert!(!set.link_file_name(a, b));
        set.set_overlay(a, blob(), "logo.png".into());
        assert!(!set.link_file_name(a, a));
        assert!(!set.link_file_name(a, PositionId::new()));
    }

    #[test]
    fn test_deleted_target_resolves_to_nothing() {
        let (mut set, a, b) = set_with_two();
        set.set_overlay(a, blob(), "logo.png".into());
        set.link_file_name(a, b);
        set.remove(b);
        assert_eq!(set.link_target(a), None);
        assert_eq!(set.resolve_display_file_name(b), None);
        // the stale relation is kept but harmless
        assert!(set.get(a).is_some_and(|p| p.show_file_name()));
    }

    #[test]
    fn test_removed_target_id_never_resolves() {
        let (mut set, a, b) = set_with_two();
        set.set_overlay(a, blob(), "logo.png".into());
        set.link_file_name(a, b);
        assert_eq!(set.resolve_display_file_name(b), Some("logo.png"));
        set.remove(b);
        assert_eq!(set.resolve_display_file_name(b), None);
        assert_eq!(set.resolve_display_file_name(PositionId::new()), None);
    }

    #[test]
    fn test_first_linking_position_wins() {
        let (mut set, a, b) = set_with_two();
        let c = set.push(Position::new(BoundingBox::new(40.0, 0.0, 10.0, 10.0), Shape::Trapezoid));
        set.set_overlay(a, blob(), "first.png".into());
        set.set_overlay(c, blob(), "second.png".into());
        set.link_file_name(c, b);
        set.link_file_name(a, b);
        assert_eq!(set.resolve_display_file_name(b), Some("first.png"));
    }

    #[test]
    fn test_clear_overlay_drops_link() {
        let (mut set, a, b) = set_with_two();
        set.set_overlay(a, blob(), "logo.png".into());
        set.link_file_name(a, b);
        assert!(set.clear_overlay(a));
        let position = set.get(a).unwrap();
        assert!(position.overlay.is_none());
        assert!(!position.show_file_name());
        assert_eq!(set.resolve_display_file_name(b), None);
    }

    #[test]
    fn test_unlink() {
        let (mut set, a, b) = set_with_two();
        set.set_overlay(a, blob(), "logo.png".into());
        set.link_file_name(a, b);
        assert!(set.unlink_file_name(a));
        assert!(!set.unlink_file_name(a));
        assert_eq!(set.resolve_display_file_name(b), None);
    }
}
