//! Resource model.
//!
//! Resources are the claimable elements of the driving course: points
//! (halt, parking and recharge positions) and the paths connecting them.
//! A resource's identity is its name; occupancy is tracked by the claim
//! service, never on the resource value itself.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// An addressable point or path segment a vehicle can occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource name.
    pub name: String,
    /// Point or path.
    pub kind: ResourceKind,
    /// Parking priority (lower = more desirable). `None` = unprioritized.
    pub parking_priority: Option<i32>,
    /// Domain-specific metadata.
    pub attributes: HashMap<String, String>,
}

/// Resource type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A position vehicles can stop at.
    Point(PointType),
    /// A directed connection between two points.
    Path(PathSpec),
}

/// Role of a point in the driving course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointType {
    /// Plain halt position.
    Halt,
    /// Position idle vehicles may park at.
    Park,
    /// Position where vehicles recharge.
    Recharge,
}

/// Endpoints and length of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSpec {
    /// Source point name.
    pub source: String,
    /// Destination point name.
    pub destination: String,
    /// Travel cost along the path.
    pub length: u64,
}

impl Resource {
    /// Creates a point resource.
    pub fn point(name: impl Into<String>, point_type: PointType) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Point(point_type),
            parking_priority: None,
            attributes: HashMap::new(),
        }
    }

    /// Creates a halt position.
    pub fn halt(name: impl Into<String>) -> Self {
        Self::point(name, PointType::Halt)
    }

    /// Creates a parking position.
    pub fn park(name: impl Into<String>) -> Self {
        Self::point(name, PointType::Park)
    }

    /// Creates a recharge position.
    pub fn recharge(name: impl Into<String>) -> Self {
        Self::point(name, PointType::Recharge)
    }

    /// Creates a path resource from `source` to `destination`.
    pub fn path(
        name: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        length: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Path(PathSpec {
                source: source.into(),
                destination: destination.into(),
                length,
            }),
            parking_priority: None,
            attributes: HashMap::new(),
        }
    }

    /// Sets the parking priority.
    pub fn with_parking_priority(mut self, priority: i32) -> Self {
        self.parking_priority = Some(priority);
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether this resource is a point.
    pub fn is_point(&self) -> bool {
        matches!(self.kind, ResourceKind::Point(_))
    }

    /// Whether this resource is a parking position.
    pub fn is_parking_position(&self) -> bool {
        self.kind == ResourceKind::Point(PointType::Park)
    }

    /// Whether this resource is a recharge position.
    pub fn is_recharge_position(&self) -> bool {
        self.kind == ResourceKind::Point(PointType::Recharge)
    }

    /// Path endpoints, if this resource is a path.
    pub fn path_spec(&self) -> Option<&PathSpec> {
        match &self.kind {
            ResourceKind::Path(spec) => Some(spec),
            ResourceKind::Point(_) => None,
        }
    }
}

/// Orders parking positions by priority, most desirable first.
///
/// Positions with an explicit priority rank before unprioritized ones;
/// among prioritized positions the lower number wins. Positions of equal
/// priority compare equal so stable sorts keep their input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkingPriorityComparator;

impl ParkingPriorityComparator {
    /// Compares two positions. `Less` means `a` is the better position.
    pub fn compare(&self, a: &Resource, b: &Resource) -> Ordering {
        compare_priorities(a.parking_priority, b.parking_priority)
    }
}

/// Compares two optional parking priorities, better first.
pub fn compare_priorities(a: Option<i32>, b: Option<i32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_builders() {
        let p = Resource::park("P1")
            .with_parking_priority(2)
            .with_attribute("zone", "north");

        assert_eq!(p.name, "P1");
        assert!(p.is_point());
        assert!(p.is_parking_position());
        assert!(!p.is_recharge_position());
        assert_eq!(p.parking_priority, Some(2));
        assert_eq!(p.attributes.get("zone"), Some(&"north".to_string()));
        assert!(p.path_spec().is_none());
    }

    #[test]
    fn test_path_spec() {
        let path = Resource::path("A--B", "A", "B", 1500);
        let spec = path.path_spec().unwrap();
        assert!(!path.is_point());
        assert_eq!(spec.source, "A");
        assert_eq!(spec.destination, "B");
        assert_eq!(spec.length, 1500);
    }

    #[test]
    fn test_priority_comparator() {
        let cmp = ParkingPriorityComparator;
        let best = Resource::park("P1").with_parking_priority(1);
        let worse = Resource::park("P3").with_parking_priority(3);
        let none = Resource::park("PX");

        assert_eq!(cmp.compare(&best, &worse), Ordering::Less);
        assert_eq!(cmp.compare(&worse, &best), Ordering::Greater);
        assert_eq!(cmp.compare(&worse, &none), Ordering::Less);
        assert_eq!(cmp.compare(&none, &none), Ordering::Equal);
    }

    #[test]
    fn test_stable_sort_keeps_ties_in_input_order() {
        let mut positions = vec![
            Resource::park("B").with_parking_priority(2),
            Resource::park("A").with_parking_priority(2),
            Resource::park("C").with_parking_priority(1),
        ];
        let cmp = ParkingPriorityComparator;
        positions.sort_by(|a, b| cmp.compare(a, b));

        let names: Vec<&str> = positions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }
}
