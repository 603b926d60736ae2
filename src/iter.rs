use crate::storage::LevelCells;
use crate::{KeyCodec, Node, Orthtree, TreeKey};

/// Iterates every cell of a [`LevelStorage`](crate::LevelStorage), levels
/// ascending.
pub struct Nodes<'a, K, V> {
    levels: &'a [LevelCells<K, V>],
    inner: Option<slab::Iter<'a, (K, Node<V>)>>,
}

impl<'a, K, V> Nodes<'a, K, V> {
    pub(crate) fn new(levels: &'a [LevelCells<K, V>]) -> Self {
        Self {
            levels,
            inner: None,
        }
    }
}

impl<'a, K: TreeKey, V> Iterator for Nodes<'a, K, V> {
    type Item = (K, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(iter) = self.inner.as_mut() {
                if let Some((_, (key, node))) = iter.next() {
                    return Some((*key, node));
                }
            }
            let (head, rest) = self.levels.split_first()?;
            self.levels = rest;
            self.inner = Some(head.cells.iter());
        }
    }
}

/// Iterates the cells of a single level.
pub struct LevelNodes<'a, K, V> {
    inner: Option<slab::Iter<'a, (K, Node<V>)>>,
}

impl<'a, K, V> LevelNodes<'a, K, V> {
    pub(crate) fn new(cells: Option<&'a LevelCells<K, V>>) -> Self {
        Self {
            inner: cells.map(|c| c.cells.iter()),
        }
    }
}

impl<'a, K: TreeKey, V> Iterator for LevelNodes<'a, K, V> {
    type Item = (K, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let (_, (key, node)) = self.inner.as_mut()?.next()?;
        Some((*key, node))
    }
}

/// Iterates only leaf cells.
pub struct Leaves<'a, K, V> {
    inner: Nodes<'a, K, V>,
}

impl<'a, K, V> Leaves<'a, K, V> {
    pub(crate) fn new(inner: Nodes<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K: TreeKey, V> Iterator for Leaves<'a, K, V> {
    type Item = (K, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find(|(_, node)| node.is_leaf())
    }
}

/// Iterates cells on the domain face or next to a depth change; see
/// [`Orthtree::is_boundary_cell`].
pub struct BoundaryCells<'a, V, C: KeyCodec<DIM>, const DIM: usize> {
    tree: &'a Orthtree<V, C, DIM>,
    inner: Nodes<'a, C::Key, V>,
}

impl<'a, V, C: KeyCodec<DIM>, const DIM: usize> BoundaryCells<'a, V, C, DIM> {
    pub(crate) fn new(tree: &'a Orthtree<V, C, DIM>, inner: Nodes<'a, C::Key, V>) -> Self {
        Self { tree, inner }
    }
}

impl<'a, V, C: KeyCodec<DIM>, const DIM: usize> Iterator for BoundaryCells<'a, V, C, DIM> {
    type Item = (C::Key, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.inner.find(|(key, _)| tree.is_boundary_cell(*key))
    }
}

/// Iterates the complement of [`BoundaryCells`].
pub struct InteriorCells<'a, V, C: KeyCodec<DIM>, const DIM: usize> {
    tree: &'a Orthtree<V, C, DIM>,
    inner: Nodes<'a, C::Key, V>,
}

impl<'a, V, C: KeyCodec<DIM>, const DIM: usize> InteriorCells<'a, V, C, DIM> {
    pub(crate) fn new(tree: &'a Orthtree<V, C, DIM>, inner: Nodes<'a, C::Key, V>) -> Self {
        Self { tree, inner }
    }
}

impl<'a, V, C: KeyCodec<DIM>, const DIM: usize> Iterator for InteriorCells<'a, V, C, DIM> {
    type Item = (C::Key, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.inner.find(|(key, _)| !tree.is_boundary_cell(*key))
    }
}

#[cfg(test)]
mod test {
    use crate::{DirectInserter, IntPoint, KeyCodec, Level, Quadtree};

    fn uniform_quadtree(depth: Level) -> Quadtree<i32> {
        let mut tree = Quadtree::new(4);
        tree.build_tree(0, depth, &|k: u64| k as i32, &|_| false, &mut DirectInserter)
            .unwrap();
        tree
    }

    #[test]
    fn perimeter_cells_are_boundary() {
        let tree = uniform_quadtree(2);

        // 12 of the 16 level-2 cells sit on the perimeter of the 4x4 grid.
        assert_eq!(tree.boundary_from(2).count(), 12);
        for (key, _) in tree.boundary_from(2) {
            assert!(tree.codec().is_boundary(key));
        }

        // The root and every level-1 cell touch the domain face too.
        assert_eq!(tree.boundary().count(), 1 + 4 + 12);
    }

    #[test]
    fn interior_is_the_complement() {
        let tree = uniform_quadtree(2);
        let interior: Vec<u64> = tree.interior().map(|(k, _)| k).collect();
        assert_eq!(interior.len(), 4);
        let mut offsets: Vec<[i64; 2]> = interior
            .iter()
            .map(|&k| tree.codec().offset_within_level(k).0)
            .collect();
        offsets.sort();
        assert_eq!(offsets, [[1, 1], [1, 2], [2, 1], [2, 2]]);

        assert_eq!(tree.interior().count() + tree.boundary().count(), tree.len());
    }

    #[test]
    fn depth_change_marks_boundary() {
        let mut tree = uniform_quadtree(2);
        let refined = tree
            .codec()
            .key_from_level_offset(2, IntPoint([1, 1]))
            .unwrap();
        tree.refine_cell(refined).unwrap();

        // The new level-3 leaves are interior to the domain but miss all
        // same-level neighbors outside their parent.
        for sibling in 0..4 {
            let child = tree.codec().child(refined, sibling);
            assert!(!tree.codec().is_boundary(child));
            assert!(tree.is_boundary_cell(child));
        }
        // Their parent still has its full level-2 neighborhood.
        assert!(!tree.is_boundary_cell(refined));

        let interior_leaves = tree
            .leaves()
            .filter(|(k, _)| !tree.is_boundary_cell(*k))
            .count();
        assert_eq!(interior_leaves, 3);
    }

    #[test]
    fn cursors_respect_the_starting_level() {
        let tree = uniform_quadtree(2);
        assert_eq!(tree.iter().count(), 21);
        assert_eq!(tree.iter_from(1).count(), 20);
        assert_eq!(tree.iter_from(2).count(), 16);
        assert_eq!(tree.leaves().count(), 16);
        assert_eq!(tree.leaves_from(1).count(), 16);
        assert_eq!(tree.iter_level(1).count(), 4);
        assert!(tree.iter_level(3).next().is_none());

        // Levels come out ascending.
        let levels: Vec<Level> = tree.iter().map(|(k, _)| tree.codec().level(k)).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);
    }
}
