//! Block model.
//!
//! A block aggregates resources under one exclusivity rule. Blocks are
//! immutable values: every `with_*` call returns a new block and the
//! original stays untouched, so a block referenced by an allocation in
//! progress can never change underneath it.
//!
//! Enforcement of the rule lives in the claim service
//! ([`crate::services::BlockClaimLedger`]); this type only describes
//! what a block is and which rule governs it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A named aggregation of resources sharing one exclusivity rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    name: String,
    block_type: BlockType,
    members: BTreeSet<String>,
    attributes: HashMap<String, String>,
}

/// Exclusivity rule of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockType {
    /// At most one vehicle may occupy any member at a time.
    #[default]
    SingleVehicleOnly,
    /// Several vehicles may occupy members only while travelling the same direction.
    SameDirectionOnly,
}

impl Block {
    /// Creates an empty `SingleVehicleOnly` block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_type: BlockType::SingleVehicleOnly,
            members: BTreeSet::new(),
            attributes: HashMap::new(),
        }
    }

    /// Returns a copy with the given type.
    #[must_use]
    pub fn with_type(&self, block_type: BlockType) -> Self {
        Self {
            block_type,
            ..self.clone()
        }
    }

    /// Returns a copy with the given member set.
    #[must_use]
    pub fn with_members<I, S>(&self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    /// Returns a copy with one additional member.
    #[must_use]
    pub fn with_member(&self, member: impl Into<String>) -> Self {
        let mut members = self.members.clone();
        members.insert(member.into());
        Self {
            members,
            ..self.clone()
        }
    }

    /// Returns a copy with an additional attribute.
    #[must_use]
    pub fn with_attribute(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.insert(key.into(), value.into());
        Self {
            attributes,
            ..self.clone()
        }
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exclusivity rule.
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Read-only view of the member resource names.
    pub fn members(&self) -> &BTreeSet<String> {
        &self.members
    }

    /// Domain-specific metadata.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Whether `resource` belongs to this block.
    pub fn contains(&self, resource: &str) -> bool {
        self.members.contains(resource)
    }

    /// Whether the block has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
