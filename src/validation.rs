//! Input validation for fleet layouts.
//!
//! Checks structural integrity of the driving course and the fleet
//! snapshot before dispatching. Detects:
//! - Duplicate names/IDs
//! - Block members that reference unknown resources
//! - Paths with unknown or non-point endpoints
//! - Vehicles standing on unknown resources
//! - Orders with no or unknown destinations

use crate::models::{Block, Order, Resource, Topology, Vehicle};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same name or ID.
    DuplicateId,
    /// A block or vehicle references a resource that doesn't exist.
    InvalidResourceReference,
    /// A path endpoint is missing or not a point.
    InvalidPathEndpoint,
    /// An order has no destinations.
    EmptyOrder,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates resources and blocks of a driving course.
///
/// Checks:
/// 1. No duplicate resource names
/// 2. No duplicate block names
/// 3. All block members point to existing resources
/// 4. All path endpoints point to existing points
///
/// Empty blocks are legal.
pub fn validate_layout(resources: &[Resource], blocks: &[Block]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for r in resources {
        if !names.insert(r.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate resource name: {}", r.name),
            ));
        }
    }

    let mut block_names = HashSet::new();
    for b in blocks {
        if !block_names.insert(b.name()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate block name: {}", b.name()),
            ));
        }
        for member in b.members() {
            if !names.contains(member.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidResourceReference,
                    format!("Block '{}' references unknown resource '{}'", b.name(), member),
                ));
            }
        }
    }

    let points: HashSet<&str> = resources
        .iter()
        .filter(|r| r.is_point())
        .map(|r| r.name.as_str())
        .collect();
    for r in resources {
        if let Some(spec) = r.path_spec() {
            for endpoint in [&spec.source, &spec.destination] {
                if !points.contains(endpoint.as_str()) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidPathEndpoint,
                        format!("Path '{}' has invalid endpoint '{}'", r.name, endpoint),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates an assembled [`Topology`].
///
/// Names are unique by construction, so this reports dangling block
/// members and path endpoints only.
pub fn validate_topology(topology: &Topology) -> ValidationResult {
    let resources: Vec<Resource> = topology.resources().cloned().collect();
    let blocks: Vec<Block> = topology.blocks().cloned().collect();
    validate_layout(&resources, &blocks)
}

/// Validates the layout and builds a [`Topology`] from it.
pub fn build_topology(
    resources: Vec<Resource>,
    blocks: Vec<Block>,
) -> Result<Topology, Vec<ValidationError>> {
    validate_layout(&resources, &blocks)?;
    let topology = resources
        .into_iter()
        .fold(Topology::new(), Topology::with_resource);
    Ok(blocks.into_iter().fold(topology, Topology::with_block))
}

/// Validates a fleet snapshot against a topology.
///
/// Checks:
/// 1. No duplicate vehicle IDs
/// 2. No duplicate order IDs
/// 3. Known vehicle positions reference existing resources
/// 4. Every order has at least one destination
/// 5. All order destinations reference existing resources
pub fn validate_fleet(topology: &Topology, vehicles: &[Vehicle], orders: &[Order]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut vehicle_ids = HashSet::new();
    for v in vehicles {
        if !vehicle_ids.insert(v.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate vehicle ID: {}", v.id),
            ));
        }
        if let Some(position) = &v.position {
            if topology.resource(position).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidResourceReference,
                    format!("Vehicle '{}' stands on unknown resource '{}'", v.id, position),
                ));
            }
        }
    }

    let mut order_ids = HashSet::new();
    for o in orders {
        if !order_ids.insert(o.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate order ID: {}", o.id),
            ));
        }
        if o.destinations.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyOrder,
                format!("Order '{}' has no destinations", o.id),
            ));
        }
        for dest in &o.destinations {
            if topology.resource(dest).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidResourceReference,
                    format!("Order '{}' references unknown destination '{}'", o.id, dest),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
