use crate::iter::{BoundaryCells, InteriorCells, Leaves, LevelNodes, Nodes};
use crate::{
    IntPoint, KeyCodec, Level, LevelStorage, Node, NodeId, Point, Result, TreeError, TreeKey,
};

use ahash::AHashSet;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Supplies the initial value of each cell during bulk construction.
///
/// Implemented for any `Fn(K) -> V` closure.
pub trait PrototypeMap<K, V> {
    fn value_for(&self, key: K) -> V;
}

impl<K, V, F: Fn(K) -> V> PrototypeMap<K, V> for F {
    #[inline]
    fn value_for(&self, key: K) -> V {
        self(key)
    }
}

/// Decides whether a subtree needs further subdivision during bulk
/// construction. `true` means the subtree is uniform and can stay a leaf.
///
/// Implemented for any `Fn(K) -> bool` closure.
pub trait RefineOracle<K> {
    fn is_uniform(&self, key: K) -> bool;
}

impl<K, F: Fn(K) -> bool> RefineOracle<K> for F {
    #[inline]
    fn is_uniform(&self, key: K) -> bool {
        self(key)
    }
}

/// Publishes nodes into the storage during bulk construction.
///
/// The `(id, inserted)` return mirrors a non-overwriting map insertion; an
/// inserter may decorate the operation (counting, observing, sharding) as
/// long as the node ends up findable under `key` at `level`.
pub trait Inserter<K, V> {
    fn insert(
        &mut self,
        store: &mut LevelStorage<K, V>,
        key: K,
        level: Level,
        node: Node<V>,
    ) -> (NodeId, bool);
}

/// The default [`Inserter`]: a straight pass-through to the storage.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectInserter;

impl<K: TreeKey, V> Inserter<K, V> for DirectInserter {
    #[inline]
    fn insert(
        &mut self,
        store: &mut LevelStorage<K, V>,
        key: K,
        level: Level,
        node: Node<V>,
    ) -> (NodeId, bool) {
        store.insert(key, level, node)
    }
}

/// An orthogonal multi-level tree over the unit cube `[0, 1]^DIM`.
///
/// Every internal cell is subdivided by the codec's refinement factor `r`
/// along each axis into `r^DIM` children. The tree composes a [`KeyCodec`]
/// (the pure key algebra) with a [`LevelStorage`] (the per-level node
/// container) and maintains the structural invariant coupling the two: a
/// non-leaf cell has all `r^DIM` children present, a leaf has none.
///
/// See [`Quadtree`](crate::Quadtree) and [`Octree`](crate::Octree) for the
/// common instances.
#[derive(Clone, Debug)]
pub struct Orthtree<V, C: KeyCodec<DIM>, const DIM: usize> {
    codec: C,
    store: LevelStorage<C::Key, V>,
}

impl<V, C: KeyCodec<DIM>, const DIM: usize> Orthtree<V, C, DIM> {
    /// An empty tree driven by `codec`.
    pub fn with_codec(codec: C) -> Self {
        let store = LevelStorage::with_levels(codec.max_level() as usize + 1);
        Self { codec, store }
    }

    #[inline]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Read access to the backing storage.
    #[inline]
    pub fn storage(&self) -> &LevelStorage<C::Key, V> {
        &self.store
    }

    /// The total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Finds `key` anywhere in the tree.
    #[inline]
    pub fn find(&self, key: C::Key) -> Option<NodeId> {
        self.store.find(key)
    }

    /// Finds `key` at exactly `level`.
    #[inline]
    pub fn find_at(&self, key: C::Key, level: Level) -> Option<NodeId> {
        self.store.find_at(key, level)
    }

    #[inline]
    pub fn get(&self, key: C::Key) -> Option<&Node<V>> {
        self.store.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: C::Key) -> Option<&mut Node<V>> {
        self.store.get_mut(key)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node<V>> {
        self.store.node(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<V>> {
        self.store.node_mut(id)
    }

    /// Low-level container insertion. The caller is responsible for keeping
    /// the leaf flags coupled to the child cells; prefer
    /// [`build_tree`](Self::build_tree) and [`refine_cell`](Self::refine_cell).
    #[inline]
    pub fn insert(&mut self, key: C::Key, level: Level, node: Node<V>) -> (NodeId, bool) {
        self.store.insert(key, level, node)
    }

    /// Low-level container removal; see [`insert`](Self::insert).
    #[inline]
    pub fn remove(&mut self, key: C::Key, level: Level) -> Option<Node<V>> {
        self.store.remove(key, level)
    }

    /// Depth-first bulk construction from the root.
    ///
    /// At every visited cell a leaf node is created from `proto` and
    /// published through `inserter`. The recursion then stops at
    /// `stop_level`, or wherever `oracle` reports a uniform subtree at or
    /// past `min_level`; otherwise the cell becomes internal and all children
    /// are visited in sibling order `0..r^DIM`.
    pub fn build_tree<P, O, I>(
        &mut self,
        min_level: Level,
        stop_level: Level,
        proto: &P,
        oracle: &O,
        inserter: &mut I,
    ) -> Result<()>
    where
        P: PrototypeMap<C::Key, V>,
        O: RefineOracle<C::Key>,
        I: Inserter<C::Key, V>,
    {
        let root = self.codec.root();
        self.build_subtree(min_level, stop_level, proto, oracle, inserter, root, 0)
    }

    /// [`build_tree`](Self::build_tree) starting from an arbitrary
    /// `(key, level)` cell instead of the root.
    ///
    /// Fails with [`TreeError::StartPastStop`] when `level` is already
    /// deeper than `stop_level`.
    #[allow(clippy::too_many_arguments)]
    pub fn build_subtree<P, O, I>(
        &mut self,
        min_level: Level,
        stop_level: Level,
        proto: &P,
        oracle: &O,
        inserter: &mut I,
        key: C::Key,
        level: Level,
    ) -> Result<()>
    where
        P: PrototypeMap<C::Key, V>,
        O: RefineOracle<C::Key>,
        I: Inserter<C::Key, V>,
    {
        let max = self.codec.max_level();
        if stop_level > max {
            return Err(TreeError::LevelExceeded {
                level: stop_level,
                max,
            });
        }
        if level > stop_level {
            return Err(TreeError::StartPastStop {
                start: level,
                stop: stop_level,
            });
        }
        self.build_recursive(min_level, stop_level, proto, oracle, inserter, key, level)
    }

    fn build_recursive<P, O, I>(
        &mut self,
        min_level: Level,
        stop_level: Level,
        proto: &P,
        oracle: &O,
        inserter: &mut I,
        key: C::Key,
        level: Level,
    ) -> Result<()>
    where
        P: PrototypeMap<C::Key, V>,
        O: RefineOracle<C::Key>,
        I: Inserter<C::Key, V>,
    {
        let node = Node::new_leaf(proto.value_for(key));
        let (id, _inserted) = inserter.insert(&mut self.store, key, level, node);

        if level == stop_level {
            return Ok(());
        }
        if level >= min_level && oracle.is_uniform(key) {
            return Ok(());
        }

        self.store
            .node_mut(id)
            .ok_or(TreeError::InvalidKey)?
            .set_leaf(false);
        for sibling in 0..self.codec.children_per_node() {
            let child = self.codec.child(key, sibling);
            self.build_recursive(min_level, stop_level, proto, oracle, inserter, child, level + 1)?;
        }
        Ok(())
    }

    /// Splits the leaf at `key`, endowing all `r^DIM` children with a copy of
    /// its value. A no-op when the cell is already internal.
    pub fn refine_cell(&mut self, key: C::Key) -> Result<()>
    where
        V: Clone,
    {
        let level = self.codec.level(key);
        let id = self.store.find_at(key, level).ok_or(TreeError::InvalidKey)?;

        let child_level = level as usize + 1;
        let max = self.codec.max_level();
        if child_level > max as usize {
            return Err(TreeError::LevelExceeded {
                level: level.saturating_add(1),
                max,
            });
        }
        let child_level = child_level as Level;

        let node = self.store.node(id).ok_or(TreeError::InvalidKey)?;
        if !node.is_leaf() {
            return Ok(());
        }
        let value = node.value().clone();

        for sibling in 0..self.codec.children_per_node() {
            let child = self.codec.child(key, sibling);
            self.store
                .insert(child, child_level, Node::new_leaf(value.clone()));
        }
        if let Some(node) = self.store.node_mut(id) {
            node.set_leaf(false);
        }
        Ok(())
    }

    /// Erases the whole subtree under `key` and turns it back into a leaf,
    /// keeping its value.
    ///
    /// Fails with [`TreeError::NotInternal`] when the cell is already a leaf
    /// and with [`TreeError::MissingChild`] when the subtree turns out to be
    /// structurally broken; in the latter case the cells walked before the
    /// hole are already gone.
    pub fn prune_children(&mut self, key: C::Key) -> Result<()> {
        let level = self.codec.level(key);
        let id = self.store.find_at(key, level).ok_or(TreeError::InvalidKey)?;
        if self.store.node(id).ok_or(TreeError::InvalidKey)?.is_leaf() {
            return Err(TreeError::NotInternal);
        }

        let mut stack = SmallVec::<[(C::Key, Level); 32]>::new();
        for sibling in 0..self.codec.children_per_node() {
            stack.push((self.codec.child(key, sibling), level + 1));
        }
        while let Some((cell, cell_level)) = stack.pop() {
            let node = self
                .store
                .remove(cell, cell_level)
                .ok_or(TreeError::MissingChild)?;
            if !node.is_leaf() {
                for sibling in 0..self.codec.children_per_node() {
                    stack.push((self.codec.child(cell, sibling), cell_level + 1));
                }
            }
        }

        if let Some(node) = self.store.node_mut(id) {
            node.set_leaf(true);
        }
        Ok(())
    }

    /// Whether `key`'s cell touches a domain face or misses a same-level
    /// neighbor in the tree (a depth change next door).
    pub fn is_boundary_cell(&self, key: C::Key) -> bool {
        if self.codec.is_boundary(key) {
            return true;
        }
        let level = self.codec.level(key);
        let absent = |neighbor: Option<C::Key>| match neighbor {
            Some(n) => self.store.find_at(n, level).is_none(),
            None => true,
        };
        (0..DIM).any(|axis| {
            absent(self.codec.neighbor_min(key, axis)) || absent(self.codec.neighbor_max(key, axis))
        })
    }

    /// The cells that should contribute to interpolation at `p` in
    /// `[0, 1]^DIM`, each paired with the displacement from `p` to the cell's
    /// sampling point (its center shifted by `offset` cell widths).
    ///
    /// The list refers only to present leaves, is duplicate-free, and is
    /// sorted by ascending displacement norm. Leaves coarser or finer than
    /// the one containing `p` substitute for absent same-level neighbors, so
    /// the result adapts across depth changes. Fails with
    /// [`TreeError::InvalidKey`] on an empty tree.
    pub fn interpolate_to(
        &self,
        p: Point<DIM>,
        offset: Point<DIM>,
    ) -> Result<Vec<(C::Key, Point<DIM>)>> {
        // Locate the leaf containing p, lattice-stepping one level at a time.
        let mut key = self.codec.root();
        let mut node = self.store.get(key).ok_or(TreeError::InvalidKey)?;
        let mut level: Level = 0;
        while !node.is_leaf() {
            level += 1;
            let cells = self.codec.level_size(level) as i64;
            let mut off = IntPoint::ZERO;
            for axis in 0..DIM {
                let cell = (p[axis] * cells as f64).floor() as i64;
                off[axis] = cell.clamp(0, cells - 1);
            }
            key = self.codec.key_from_level_offset(level, off)?;
            let id = self
                .store
                .find_at(key, level)
                .ok_or(TreeError::MissingChild)?;
            node = self.store.node(id).ok_or(TreeError::MissingChild)?;
        }

        // Same-level neighborhood, with absent cells replaced by their
        // nearest present ancestor.
        let mut queue = VecDeque::new();
        for neighbor in self.codec.equal_sized_neighbors(key) {
            let mut cell = neighbor;
            while !self.store.contains(cell) {
                cell = self.codec.parent(cell)?;
            }
            queue.push_back(cell);
        }

        // Expand internal entries into their children until only leaves
        // remain. The visited set both deduplicates (coarser substitutes can
        // collide) and keeps the loop finite; the support of a point query
        // cannot exceed the (2r)^DIM cube around it.
        let cap = (2 * self.codec.refinement_factor()).pow(DIM as u32) - 1;
        let mut seen: AHashSet<C::Key> = AHashSet::default();
        let mut cells = Vec::new();
        while let Some(cell) = queue.pop_front() {
            if cells.len() >= cap {
                break;
            }
            if !seen.insert(cell) {
                continue;
            }
            let node = self.store.get(cell).ok_or(TreeError::MissingChild)?;
            if node.is_leaf() {
                cells.push(cell);
            } else {
                for sibling in 0..self.codec.children_per_node() {
                    queue.push_back(self.codec.child(cell, sibling));
                }
            }
        }

        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            let center = self.codec.cell_box(cell).center();
            let sample = center + offset * self.codec.cell_size(cell);
            out.push((cell, sample - p));
        }
        out.sort_by(|a, b| a.1.norm().total_cmp(&b.1.norm()));
        Ok(out)
    }

    /// Every cell, levels ascending.
    pub fn iter(&self) -> Nodes<'_, C::Key, V> {
        self.store.iter()
    }

    /// Every cell from `level` through the last populated level.
    pub fn iter_from(&self, level: Level) -> Nodes<'_, C::Key, V> {
        self.store.iter_from(level)
    }

    /// The cells of a single level.
    pub fn iter_level(&self, level: Level) -> LevelNodes<'_, C::Key, V> {
        self.store.iter_level(level)
    }

    /// The leaf cells, levels ascending.
    pub fn leaves(&self) -> Leaves<'_, C::Key, V> {
        Leaves::new(self.store.iter())
    }

    /// The leaf cells from `level` onward.
    pub fn leaves_from(&self, level: Level) -> Leaves<'_, C::Key, V> {
        Leaves::new(self.store.iter_from(level))
    }

    /// The cells classified as boundary by
    /// [`is_boundary_cell`](Self::is_boundary_cell).
    pub fn boundary(&self) -> BoundaryCells<'_, V, C, DIM> {
        BoundaryCells::new(self, self.store.iter())
    }

    /// Boundary cells from `level` onward.
    pub fn boundary_from(&self, level: Level) -> BoundaryCells<'_, V, C, DIM> {
        BoundaryCells::new(self, self.store.iter_from(level))
    }

    /// The cells not classified as boundary.
    pub fn interior(&self) -> InteriorCells<'_, V, C, DIM> {
        InteriorCells::new(self, self.store.iter())
    }

    /// Interior cells from `level` onward.
    pub fn interior_from(&self, level: Level) -> InteriorCells<'_, V, C, DIM> {
        InteriorCells::new(self, self.store.iter_from(level))
    }
}
