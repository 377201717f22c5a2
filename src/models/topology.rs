//! Driving-course topology.
//!
//! Holds the resources and blocks loaded at startup. Resource identity is
//! fixed once the topology is built; blocks are replaced wholesale rather
//! than edited.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Block, Resource};

/// Resources and blocks of a driving course.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    resources: BTreeMap<String, Resource>,
    blocks: BTreeMap<String, Block>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.insert(resource.name.clone(), resource);
        self
    }

    /// Adds (or replaces) a block.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.insert(block.name().to_string(), block);
        self
    }

    /// Adds a pair of opposing paths `a -> b` and `b -> a`.
    pub fn with_bidirectional_path(self, a: &str, b: &str, length: u64) -> Self {
        self.with_resource(Resource::path(format!("{a}--{b}"), a, b, length))
            .with_resource(Resource::path(format!("{b}--{a}"), b, a, length))
    }

    /// Looks up a resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Looks up a block by name.
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    /// All resources, ordered by name.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// All blocks, ordered by name.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Blocks containing `resource`.
    pub fn blocks_of<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.values().filter(move |b| b.contains(resource))
    }

    /// Paths leaving `point`.
    pub fn outgoing_paths<'a>(&'a self, point: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.values().filter(move |r| {
            r.path_spec()
                .map(|spec| spec.source == point)
                .unwrap_or(false)
        })
    }

    /// All parking positions.
    pub fn parking_positions(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(|r| r.is_parking_position())
    }

    /// All recharge positions.
    pub fn recharge_positions(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(|r| r.is_recharge_position())
    }

    /// Number of resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}
