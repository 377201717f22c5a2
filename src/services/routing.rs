//! Routing.
//!
//! The router turns a (source, destination) pair into a cost and a
//! resource sequence. `GraphRouter` computes shortest paths over the
//! topology's directed paths.
//!
//! # Algorithm
//! Dijkstra with a binary heap; ties between equal-cost frontiers are
//! broken by point name so routes are deterministic.
//!
//! # Reference
//! Dijkstra (1959), "A note on two problems in connexion with graphs"

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::models::{Route, Topology, Vehicle};

/// Routing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("No route from {from} to {to}")]
    NoRouteFound { from: String, to: String },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Resource is not a point: {0}")]
    NotAPoint(String),
}

/// Computes routes for vehicles.
pub trait Router: Send + Sync {
    /// Computes the cheapest route from `from` to `to` for `vehicle`.
    fn compute_route(&self, vehicle: &Vehicle, from: &str, to: &str) -> Result<Route, RoutingError>;

    /// Computes a route visiting `destinations` in sequence.
    fn compute_route_through(
        &self,
        vehicle: &Vehicle,
        from: &str,
        destinations: &[String],
    ) -> Result<Route, RoutingError> {
        let mut route = Route::stay(from);
        let mut current = from;
        for dest in destinations {
            let leg = self.compute_route(vehicle, current, dest)?;
            route.extend(leg);
            current = dest.as_str();
        }
        Ok(route)
    }
}

/// Shortest-path router over a topology.
#[derive(Debug, Clone)]
pub struct GraphRouter {
    topology: Arc<Topology>,
    locked_paths: HashSet<String>,
}

impl GraphRouter {
    /// Creates a router over `topology`.
    pub fn new(topology: Arc<Topology>) -> Self {
        Self {
            topology,
            locked_paths: HashSet::new(),
        }
    }

    /// Excludes a path from routing.
    pub fn with_locked_path(mut self, path: impl Into<String>) -> Self {
        self.locked_paths.insert(path.into());
        self
    }

    fn check_point(&self, name: &str) -> Result<(), RoutingError> {
        match self.topology.resource(name) {
            None => Err(RoutingError::UnknownResource(name.to_string())),
            Some(r) if !r.is_point() => Err(RoutingError::NotAPoint(name.to_string())),
            Some(_) => Ok(()),
        }
    }
}

impl Router for GraphRouter {
    fn compute_route(&self, _vehicle: &Vehicle, from: &str, to: &str) -> Result<Route, RoutingError> {
        self.check_point(from)?;
        self.check_point(to)?;
        if from == to {
            return Ok(Route::stay(from));
        }

        let mut dist: HashMap<&str, u64> = HashMap::new();
        // point -> (previous point, path taken)
        let mut prev: HashMap<&str, (&str, &str)> = HashMap::new();
        let mut heap = BinaryHeap::new();

        dist.insert(from, 0);
        heap.push(Reverse((0u64, from)));

        while let Some(Reverse((cost, point))) = heap.pop() {
            if point == to {
                break;
            }
            if dist.get(point).is_some_and(|&d| cost > d) {
                continue;
            }
            for path in self.topology.outgoing_paths(point) {
                if self.locked_paths.contains(&path.name) {
                    continue;
                }
                let Some(spec) = path.path_spec() else {
                    continue;
                };
                let next_cost = cost + spec.length;
                let next = spec.destination.as_str();
                if dist.get(next).map_or(true, |&d| next_cost < d) {
                    dist.insert(next, next_cost);
                    prev.insert(next, (point, path.name.as_str()));
                    heap.push(Reverse((next_cost, next)));
                }
            }
        }

        let Some(&cost) = dist.get(to) else {
            return Err(RoutingError::NoRouteFound {
                from: from.to_string(),
                to: to.to_string(),
            });
        };

        let mut steps = vec![to.to_string()];
        let mut cursor = to;
        while let Some(&(before, path)) = prev.get(cursor) {
            steps.push(path.to_string());
            steps.push(before.to_string());
            cursor = before;
            if cursor == from {
                break;
            }
        }
        steps.reverse();
        Ok(Route { cost, steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resource;

    fn topology() -> Arc<Topology> {
        Arc::new(
            Topology::new()
                .with_resource(Resource::halt("A"))
                .with_resource(Resource::halt("B"))
                .with_resource(Resource::halt("C"))
                .with_resource(Resource::halt("D"))
                .with_resource(Resource::halt("island"))
                .with_bidirectional_path("A", "B", 10)
                .with_bidirectional_path("B", "C", 10)
                .with_resource(Resource::path("A--C", "A", "C", 25))
                .with_resource(Resource::path("C--D", "C", "D", 5)),
        )
    }

    #[test]
    fn test_shortest_route() {
        let router = GraphRouter::new(topology());
        let v = Vehicle::new("V1");
        let route = router.compute_route(&v, "A", "C").unwrap();
        assert_eq!(route.cost, 20);
        assert_eq!(route.steps, vec!["A", "A--B", "B", "B--C", "C"]);
    }

    #[test]
    fn test_locked_path_forces_detour() {
        let router = GraphRouter::new(topology()).with_locked_path("A--B");
        let v = Vehicle::new("V1");
        let route = router.compute_route(&v, "A", "C").unwrap();
        assert_eq!(route.cost, 25);
        assert_eq!(route.steps, vec!["A", "A--C", "C"]);
    }

    #[test]
    fn test_same_point() {
        let router = GraphRouter::new(topology());
        let route = router.compute_route(&Vehicle::new("V1"), "B", "B").unwrap();
        assert_eq!(route.cost, 0);
        assert_eq!(route.steps, vec!["B"]);
    }

    #[test]
    fn test_unreachable() {
        let router = GraphRouter::new(topology());
        let err = router
            .compute_route(&Vehicle::new("V1"), "D", "A")
            .unwrap_err();
        assert_eq!(
            err,
            RoutingError::NoRouteFound {
                from: "D".into(),
                to: "A".into()
            }
        );
        assert!(router
            .compute_route(&Vehicle::new("V1"), "A", "island")
            .is_err());
    }

    #[test]
    fn test_unknown_and_non_point() {
        let router = GraphRouter::new(topology());
        let v = Vehicle::new("V1");
        assert_eq!(
            router.compute_route(&v, "ghost", "A").unwrap_err(),
            RoutingError::UnknownResource("ghost".into())
        );
        assert_eq!(
            router.compute_route(&v, "A", "A--B").unwrap_err(),
            RoutingError::NotAPoint("A--B".into())
        );
    }

    #[test]
    fn test_route_through_destinations() {
        let router = GraphRouter::new(topology());
        let v = Vehicle::new("V1");
        let route = router
            .compute_route_through(&v, "A", &["B".to_string(), "D".to_string()])
            .unwrap();
        assert_eq!(route.cost, 25);
        assert_eq!(route.steps, vec!["A", "A--B", "B", "B--C", "C", "C--D", "D"]);
    }
}
