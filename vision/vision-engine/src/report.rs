//! Plain-data summaries of what is visible, for the perception consumer.
//!
//! Reports hold only names, counts, and integer coordinates so they can be
//! handed across an API boundary (or serialized, with the `serde` feature)
//! without dragging engine state along.

use std::collections::{BTreeMap, BTreeSet};

use crate::vicinity::Direction;

/// What is visible in the immediate vicinity, in full coordinate detail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImmediateReport {
    /// Block name to the world coordinates of every visible voxel holding
    /// that block, nearest first.
    pub visible_blocks: BTreeMap<String, Vec<[i32; 3]>>,
    /// Distinct biome names read off the visible blocks.
    pub visible_biomes: BTreeSet<String>,
}

impl ImmediateReport {
    /// The nearest visible coordinates of a block name, if any.
    #[must_use]
    pub fn closest(&self, block_name: &str) -> Option<[i32; 3]> {
        self.visible_blocks
            .get(block_name)
            .and_then(|coords| coords.first().copied())
    }

    /// True when nothing is visible here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible_blocks.is_empty()
    }
}

/// What is visible in one distant directional vicinity, summarized to
/// per-kind counts and the nearest coordinates of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistantReport {
    /// Block name to how many visible voxels hold that block.
    pub visible_block_counts: BTreeMap<String, usize>,
    /// Block name to the world coordinates of the nearest visible voxel
    /// holding that block.
    pub closest_coords: BTreeMap<String, [i32; 3]>,
    /// Distinct biome names read off the visible blocks.
    pub visible_biomes: BTreeSet<String>,
}

impl DistantReport {
    /// The nearest visible coordinates of a block name, if any.
    #[must_use]
    pub fn closest(&self, block_name: &str) -> Option<[i32; 3]> {
        self.closest_coords.get(block_name).copied()
    }

    /// True when nothing is visible in this direction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible_block_counts.is_empty()
    }
}

/// The full snapshot across all eleven vicinities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurroundingsReport {
    /// The immediate vicinity around the observer.
    pub immediate: ImmediateReport,
    /// One summary per distant direction.
    pub distant: BTreeMap<Direction, DistantReport>,
}
