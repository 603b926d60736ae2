use crate::iter::{LevelNodes, Nodes};
use crate::{Level, SmallKeyHashMap, TreeKey};

use slab::Slab;
use std::collections::hash_map::Entry;

/// A stored cell: the user's value plus the leaf flag.
///
/// The flag is read-only from outside the crate because it is coupled to the
/// child cells: a non-leaf must have all of its children present in the
/// storage and a leaf none. Tree operations keep the two in sync.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node<V> {
    value: V,
    leaf: bool,
}

impl<V> Node<V> {
    /// A new leaf holding `value`.
    #[inline]
    pub fn new_leaf(value: V) -> Self {
        Self { value, leaf: true }
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[inline]
    pub(crate) fn set_leaf(&mut self, leaf: bool) {
        self.leaf = leaf;
    }
}

/// Uniquely and stably identifies an occupied cell in a [`LevelStorage`]
/// (until that cell is erased; its slot may then be reused).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId {
    pub(crate) level: Level,
    pub(crate) slot: u32,
}

impl NodeId {
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }
}

/// One level's cells: a slab of `(key, node)` entries and a key index.
#[derive(Clone, Debug)]
pub(crate) struct LevelCells<K, V> {
    pub(crate) cells: Slab<(K, Node<V>)>,
    index: SmallKeyHashMap<K, u32>,
}

impl<K, V> Default for LevelCells<K, V> {
    fn default() -> Self {
        Self {
            cells: Slab::new(),
            index: SmallKeyHashMap::default(),
        }
    }
}

/// A per-level map from key to [`Node`].
///
/// Iteration visits levels in ascending order; within one level the order is
/// slab order, unspecified but stable between mutations. Keys produced by a
/// [`KeyCodec`](crate::KeyCodec) are unique across levels, but the storage
/// does not enforce that: [`find`](Self::find) scans levels from the root
/// down and the first hit wins.
#[derive(Clone, Debug)]
pub struct LevelStorage<K, V> {
    levels: Vec<LevelCells<K, V>>,
    len: usize,
}

impl<K, V> Default for LevelStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LevelStorage<K, V> {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            len: 0,
        }
    }

    /// A storage with `count` level maps preallocated.
    pub fn with_levels(count: usize) -> Self {
        let mut levels = Vec::new();
        levels.resize_with(count, LevelCells::default);
        Self { levels, len: 0 }
    }

    /// The total number of cells across all levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of level maps allocated; trailing ones may be empty.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }
}

impl<K: TreeKey, V> LevelStorage<K, V> {
    /// Inserts `node` for `key` at `level`.
    ///
    /// If the key is already present at that level the existing cell is kept
    /// untouched and returned with `false`, like a hash map insertion that
    /// does not overwrite.
    pub fn insert(&mut self, key: K, level: Level, node: Node<V>) -> (NodeId, bool) {
        let lvl = level as usize;
        if self.levels.len() <= lvl {
            self.levels.resize_with(lvl + 1, LevelCells::default);
        }
        let cells = &mut self.levels[lvl];
        match cells.index.entry(key) {
            Entry::Occupied(entry) => (
                NodeId {
                    level,
                    slot: *entry.get(),
                },
                false,
            ),
            Entry::Vacant(entry) => {
                let slot = cells.cells.insert((key, node)) as u32;
                entry.insert(slot);
                self.len += 1;
                (NodeId { level, slot }, true)
            }
        }
    }

    /// Removes the cell for `key` at `level`, returning its node.
    pub fn remove(&mut self, key: K, level: Level) -> Option<Node<V>> {
        let cells = self.levels.get_mut(level as usize)?;
        let slot = cells.index.remove(&key)?;
        let (_, node) = cells.cells.remove(slot as usize);
        self.len -= 1;
        Some(node)
    }

    /// Finds `key` anywhere in the tree, scanning levels from the root down.
    pub fn find(&self, key: K) -> Option<NodeId> {
        for (lvl, cells) in self.levels.iter().enumerate() {
            if let Some(&slot) = cells.index.get(&key) {
                return Some(NodeId {
                    level: lvl as Level,
                    slot,
                });
            }
        }
        None
    }

    /// Finds `key` at exactly `level`.
    #[inline]
    pub fn find_at(&self, key: K, level: Level) -> Option<NodeId> {
        let cells = self.levels.get(level as usize)?;
        cells.index.get(&key).map(|&slot| NodeId { level, slot })
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.find(key).is_some()
    }

    #[inline]
    pub fn get(&self, key: K) -> Option<&Node<V>> {
        self.node(self.find(key)?)
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut Node<V>> {
        let id = self.find(key)?;
        self.node_mut(id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node<V>> {
        let (_, node) = self.levels.get(id.level as usize)?.cells.get(id.slot as usize)?;
        Some(node)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<V>> {
        let (_, node) = self
            .levels
            .get_mut(id.level as usize)?
            .cells
            .get_mut(id.slot as usize)?;
        Some(node)
    }

    /// The key stored at `id`.
    #[inline]
    pub fn key_of(&self, id: NodeId) -> Option<K> {
        let (key, _) = self.levels.get(id.level as usize)?.cells.get(id.slot as usize)?;
        Some(*key)
    }

    /// All cells, levels ascending.
    pub fn iter(&self) -> Nodes<'_, K, V> {
        Nodes::new(&self.levels)
    }

    /// All cells from `level` through the last populated level.
    pub fn iter_from(&self, level: Level) -> Nodes<'_, K, V> {
        let start = (level as usize).min(self.levels.len());
        Nodes::new(&self.levels[start..])
    }

    /// The cells of a single level.
    pub fn iter_level(&self, level: Level) -> LevelNodes<'_, K, V> {
        LevelNodes::new(self.levels.get(level as usize))
    }
}
