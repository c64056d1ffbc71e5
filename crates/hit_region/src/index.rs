//! Bidirectional index between interactive elements and the coordinates that
//! click them.
//!
//! Both views describe one relation and are only ever modified together:
//! every `coordinate -> element` entry has its coordinate in that element's set,
//! and every coordinate in a set maps back to the set's element. Element keys
//! are non-owning; `retain_attached` reconciles them against the document.

use crate::coords::{Coordinate, CoordinateKey};
use dom::{HostDocument, NodeKey};
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

/// Default per-element coordinate cap.
pub const DEFAULT_MAX_COORDINATES_PER_ELEMENT: usize = 10_000;

/// What `HitRegionIndex::insert` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The coordinate was not mapped before.
    Added,
    /// The coordinate moved from another element (last write wins).
    Replaced(NodeKey),
    /// The coordinate already mapped to this element.
    Unchanged,
    /// The element reached its coordinate cap; nothing was stored.
    Capped,
}

#[derive(Debug, Clone)]
pub struct HitRegionIndex {
    coordinate_to_element: FxHashMap<CoordinateKey, NodeKey>,
    element_to_coordinates: FxHashMap<NodeKey, FxHashSet<CoordinateKey>>,
    max_per_element: usize,
    /// Elements that already hit the cap (warned once each).
    capped: FxHashSet<NodeKey>,
}

impl Default for HitRegionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HitRegionIndex {
    pub fn new() -> Self {
        Self::with_max_per_element(DEFAULT_MAX_COORDINATES_PER_ELEMENT)
    }

    /// An empty index storing at most `max_per_element` coordinates per element.
    pub fn with_max_per_element(max_per_element: usize) -> Self {
        Self {
            coordinate_to_element: FxHashMap::default(),
            element_to_coordinates: FxHashMap::default(),
            max_per_element: max_per_element.max(1),
            capped: FxHashSet::default(),
        }
    }

    /// Map `coord` to `element` in both views.
    pub fn insert(&mut self, coord: Coordinate, element: NodeKey) -> Insertion {
        let key = coord.encode();
        let previous = self.coordinate_to_element.get(&key).copied();
        if previous == Some(element) {
            return Insertion::Unchanged;
        }
        let stored = self
            .element_to_coordinates
            .get(&element)
            .map_or(0, FxHashSet::len);
        if stored >= self.max_per_element {
            if self.capped.insert(element) {
                warn!(
                    "Element {} exceeds {} hit coordinates; further coordinates are dropped",
                    element.0, self.max_per_element
                );
            }
            return Insertion::Capped;
        }
        if let Some(old) = previous {
            self.detach_coordinate(old, key);
        }
        self.coordinate_to_element.insert(key, element);
        self.element_to_coordinates
            .entry(element)
            .or_default()
            .insert(key);
        previous.map_or(Insertion::Added, Insertion::Replaced)
    }

    fn detach_coordinate(&mut self, element: NodeKey, key: CoordinateKey) {
        if let Some(set) = self.element_to_coordinates.get_mut(&element) {
            set.remove(&key);
            if set.is_empty() {
                self.element_to_coordinates.remove(&element);
            }
        }
    }

    /// Element a click at `coord` reaches, if it was sampled as a hit.
    pub fn element_at(&self, coord: Coordinate) -> Option<NodeKey> {
        self.coordinate_to_element.get(&coord.encode()).copied()
    }

    /// Coordinate set of `element`, if it has any.
    pub fn coordinates_of(&self, element: NodeKey) -> Option<&FxHashSet<CoordinateKey>> {
        self.element_to_coordinates.get(&element)
    }

    pub fn contains_element(&self, element: NodeKey) -> bool {
        self.element_to_coordinates.contains_key(&element)
    }

    pub fn elements(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.element_to_coordinates.keys().copied()
    }

    /// Number of mapped coordinates.
    pub fn len(&self) -> usize {
        self.coordinate_to_element.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinate_to_element.is_empty()
    }

    pub fn element_count(&self) -> usize {
        self.element_to_coordinates.len()
    }

    /// Remove `element` and all its coordinates; returns how many were removed.
    pub fn remove_element(&mut self, element: NodeKey) -> usize {
        self.capped.remove(&element);
        let Some(set) = self.element_to_coordinates.remove(&element) else {
            return 0;
        };
        for key in &set {
            self.coordinate_to_element.remove(key);
        }
        set.len()
    }

    /// Drop every element the document no longer contains. Returns the number
    /// of elements removed.
    pub fn retain_attached<D: HostDocument + ?Sized>(&mut self, doc: &D) -> usize {
        let detached: Vec<NodeKey> = self
            .elements()
            .filter(|element| !doc.is_attached(*element))
            .collect();
        for element in &detached {
            self.remove_element(*element);
        }
        detached.len()
    }

    pub fn clear(&mut self) {
        self.coordinate_to_element.clear();
        self.element_to_coordinates.clear();
        self.capped.clear();
    }

    /// Whether the two views describe the same relation.
    pub fn is_consistent(&self) -> bool {
        let forward = self
            .coordinate_to_element
            .iter()
            .all(|(key, element)| {
                self.element_to_coordinates
                    .get(element)
                    .is_some_and(|set| set.contains(key))
            });
        let total: usize = self.element_to_coordinates.values().map(FxHashSet::len).sum();
        forward && total == self.coordinate_to_element.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUTTON: NodeKey = NodeKey(1);
    const LINK: NodeKey = NodeKey(2);

    #[test]
    fn both_views_stay_in_step() {
        let mut index = HitRegionIndex::new();
        assert_eq!(index.insert(Coordinate::new(0, 0), BUTTON), Insertion::Added);
        assert_eq!(index.insert(Coordinate::new(10, 0), BUTTON), Insertion::Added);
        assert_eq!(index.insert(Coordinate::new(10, 0), BUTTON), Insertion::Unchanged);
        assert_eq!(index.insert(Coordinate::new(0, 10), LINK), Insertion::Added);

        assert_eq!(index.len(), 3);
        assert_eq!(index.element_count(), 2);
        assert_eq!(index.element_at(Coordinate::new(0, 10)), Some(LINK));
        assert_eq!(index.coordinates_of(BUTTON).map(FxHashSet::len), Some(2));
        assert!(index.is_consistent());
    }

    #[test]
    fn rewrite_moves_coordinate_between_elements() {
        let mut index = HitRegionIndex::new();
        index.insert(Coordinate::new(5, 5), BUTTON);
        assert_eq!(
            index.insert(Coordinate::new(5, 5), LINK),
            Insertion::Replaced(BUTTON)
        );
        assert_eq!(index.element_at(Coordinate::new(5, 5)), Some(LINK));
        assert!(!index.contains_element(BUTTON));
        assert!(index.is_consistent());
    }

    #[test]
    fn cap_drops_excess_coordinates_in_both_views() {
        let mut index = HitRegionIndex::with_max_per_element(2);
        index.insert(Coordinate::new(0, 0), BUTTON);
        index.insert(Coordinate::new(1, 0), BUTTON);
        assert_eq!(index.insert(Coordinate::new(2, 0), BUTTON), Insertion::Capped);
        assert_eq!(index.insert(Coordinate::new(3, 0), BUTTON), Insertion::Capped);

        assert_eq!(index.element_at(Coordinate::new(2, 0)), None);
        assert_eq!(index.len(), 2);
        assert!(index.is_consistent());
    }

    #[test]
    fn remove_element_clears_its_coordinates() {
        let mut index = HitRegionIndex::new();
        index.insert(Coordinate::new(0, 0), BUTTON);
        index.insert(Coordinate::new(0, 1), BUTTON);
        index.insert(Coordinate::new(0, 2), LINK);

        assert_eq!(index.remove_element(BUTTON), 2);
        assert_eq!(index.remove_element(BUTTON), 0);
        assert_eq!(index.len(), 1);
        assert!(index.is_consistent());

        index.clear();
        assert!(index.is_empty());
    }
}
