//! Committed positions and the ordered set that owns them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::geometry::{self, BoundingBox, Point, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(Uuid);

impl PositionId {
    /// Time-ordered, so ids are never reused within a session.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PositionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Auxiliary image drawn inside a position, with its display name.
#[derive(Clone, PartialEq)]
pub struct Overlay {
    pub bytes: Arc<[u8]>,
    pub file_name: String,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("bytes", &self.bytes.len())
            .field("file_name", &self.file_name)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub id: PositionId,
    pub bounds: BoundingBox,
    shape: Shape,
    pub overlay: Option<Overlay>,
    /// Position whose box displays this position's overlay file name.
    pub file_name_link: Option<PositionId>,
}

impl Position {
    pub fn new(bounds: BoundingBox, shape: Shape) -> Self {
        Self {
            id: PositionId::new(),
            bounds,
            shape,
            overlay: None,
            file_name_link: None,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn show_file_name(&self) -> bool {
        self.file_name_link.is_some()
    }

    pub fn overlay_file_name(&self) -> Option<&str> {
        self.overlay.as_ref().map(|o| o.file_name.as_str())
    }

    pub fn contains(&self, point: Point) -> bool {
        geometry::contains(&self.bounds, point)
    }
}

/// Committed positions in draw order.
#[derive(Clone, Debug, Default)]
pub struct PositionSet {
    items: Vec<Position>,
}

impl PositionSet {
    pub fn push(&mut self, position: Position) -> PositionId {
        let id = position.id;
        self.items.push(position);
        id
    }

    pub fn remove(&mut self, id: PositionId) -> Option<Position> {
        let index = self.items.iter().position(|p| p.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.items.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PositionId) -> Option<&mut Position> {
        self.items.iter_mut().find(|p| p.id == id)
    }

    pub fn contains_id(&self, id: PositionId) -> bool {
        self.get(id).is_some()
    }

    /// First position in draw order whose box contains `point`.
    ///
    /// Overlaps are resolved by draw order only, never by area or z-order.
    pub fn hit_test(&self, point: Point) -> Option<PositionId> {
        self.items.iter().find(|p| p.contains(point)).map(|p| p.id)
    }

    /// Like [`Self::hit_test`], but never returns `skip`.
    pub fn hit_test_except(&self, point: Point, skip: PositionId) -> Option<PositionId> {
        self.items
            .iter()
            .find(|p| p.id != skip && p.contains(point))
            .map(|p| p.id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a> IntoIterator for &'a PositionSet {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = PositionId::new();
        let b = PositionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hit_test_returns_first_in_draw_order() {
        let mut set = PositionSet::default();
        let first = set.push(Position::new(
            BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            Shape::Rectangle,
        ));
        let _second = set.push(Position::new(
            BoundingBox::new(10.0, 10.0, 20.0, 20.0),
            Shape::Circle,
        ));
        assert_eq!(set.hit_test(Point::new(15.0, 15.0)), Some(first));
        assert_eq!(set.hit_test(Point::new(150.0, 15.0)), None);
    }

    #[test]
    fn test_hit_test_except_skips_one_id() {
        let mut set = PositionSet::default();
        let outer = set.push(Position::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), Shape::Rectangle));
        let inner = set.push(Position::new(BoundingBox::new(40.0, 40.0, 20.0, 20.0), Shape::Circle));
        let p = Point::new(50.0, 50.0);
        assert_eq!(set.hit_test(p), Some(outer));
        assert_eq!(set.hit_test_except(p, outer), Some(inner));
        assert_eq!(set.hit_test_except(Point::new(5.0, 5.0), outer), None);
    }

    #[test]
    fn test_remove_by_id() {
        let mut set = PositionSet::default();
        let a = set.push(Position::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), Shape::Rectangle));
        let b = set.push(Position::new(BoundingBox::new(20.0, 0.0, 10.0, 10.0), Shape::Rectangle));
        let removed = set.remove(a).map(|p| p.id);
        assert_eq!(removed, Some(a));
        assert_eq!(set.len(), 1);
        assert!(set.contains_id(b));
        assert!(set.remove(a).is_none());
    }

    #[test]
    fn test_new_position_has_no_overlay_or_link() {
        let p = Position::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), Shape::Trapezoid);
        assert_eq!(p.shape(), Shape::Trapezoid);
        assert!(p.overlay.is_none());
        assert!(!p.show_file_name());
        assert!(p.overlay_file_name().is_none());
    }
}
