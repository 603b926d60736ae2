//! [![Crates.io](https://img.shields.io/crates/v/orthtree.svg)](https://crates.io/crates/orthtree)
//! [![Docs.rs](https://docs.rs/orthtree/badge.svg)](https://docs.rs/orthtree)
//!
//! Orthogonal multi-level trees for spatial indexing over the unit cube.
//!
//! An [`Orthtree`] recursively subdivides `[0, 1]^DIM` with a constant
//! refinement factor `r` along each axis, so every internal cell has `r^DIM`
//! children. [`Quadtree`] and [`Octree`] are the familiar `r = 2` instances;
//! any dimension and factor pair works through the same generic machinery.
//! Cells are addressed by bare integer keys under the recurrence
//! `child(k, s) = k * r^DIM + 1 + s`, which packs each level into a contiguous
//! key range and makes parents, siblings, lattice offsets, and axis neighbors
//! pure arithmetic; see [`KeyCodec`] and [`LinearCodec`].
//!
//! # Design Advantages
//!
//! - The key algebra is stateless: spatial relationships (parent, child,
//!   neighbor, cell box) are computed from the key alone, with no pointers to
//!   chase and nothing to rebalance.
//! - Storage is a slab per level behind a hash index, so lookups at a known
//!   level are O(1), handles stay stable across unrelated mutations, and
//!   whole-tree iteration walks levels coarse to fine.
//! - Construction is collaborator-driven: a [`PrototypeMap`] supplies values,
//!   a [`RefineOracle`] decides where subdivision stops, and an [`Inserter`]
//!   observes every published node, so one depth-first driver serves uniform
//!   grids and adaptively refined trees alike.
//!
//! # Example
//!
//! ```
//! use orthtree::{DirectInserter, Point, Quadtree};
//!
//! // Refine everywhere until level 2: a 4x4 grid of leaves.
//! let mut tree = Quadtree::new(4);
//! tree.build_tree(0, 2, &|key: u64| key, &|_| false, &mut DirectInserter)
//!     .unwrap();
//! assert_eq!(tree.leaves().count(), 16);
//!
//! // The leaves nearest a query point, sorted by distance.
//! let support = tree.interpolate_to(Point([0.4, 0.6]), Point::ZERO).unwrap();
//! assert!(!support.is_empty());
//! ```

mod bounds;
mod codec;
mod error;
mod iter;
mod point;
mod storage;
mod tree;

pub use bounds::*;
pub use codec::*;
pub use error::*;
pub use iter::*;
pub use point::*;
pub use storage::*;
pub use tree::*;

#[cfg(feature = "glam")]
mod impl_glam;

#[cfg(feature = "glam")]
pub use glam;

/// A subdivision depth in an [`Orthtree`]. The root cell is at level 0.
pub type Level = u8;

/// An [`Orthtree`] over the unit square with the default binary codec.
pub type Quadtree<V, K = u64> = Orthtree<V, LinearCodec<K, 2, 2>, 2>;

/// An [`Orthtree`] over the unit cube with the default binary codec.
pub type Octree<V, K = u64> = Orthtree<V, LinearCodec<K, 3, 2>, 3>;

impl<V, K: TreeKey, const DIM: usize, const R: usize> Orthtree<V, LinearCodec<K, DIM, R>, DIM> {
    /// An empty tree with the default codec and levels `0..=max_level`.
    pub fn new(max_level: Level) -> Self {
        Self::with_codec(LinearCodec::new(max_level))
    }
}

use ahash::AHashMap;

type SmallKeyHashMap<K, V> = AHashMap<K, V>;
