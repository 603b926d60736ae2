use crate::{Aabb, IntPoint, Level, Point, Result, TreeError};

use core::fmt::Debug;
use core::hash::Hash;
use core::marker::PhantomData;
use smallvec::SmallVec;

/// An integral type that can be used as a cell key.
///
/// Key arithmetic runs on the `usize` index; the trait only carries the
/// conversions, in the spirit of a minimal capability bound.
pub trait TreeKey: Copy + Eq + Ord + Hash + Debug {
    /// The largest index representable in this key type.
    const MAX_INDEX: usize;

    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! impl_tree_key {
    ($t:ty) => {
        impl TreeKey for $t {
            const MAX_INDEX: usize = <$t>::MAX as usize;

            #[inline]
            fn from_index(index: usize) -> Self {
                index as $t
            }

            #[inline]
            fn index(self) -> usize {
                self as usize
            }
        }
    };
}

impl_tree_key!(u32);
impl_tree_key!(u64);
impl_tree_key!(usize);

/// The key algebra of an orthtree over `[0, 1]^DIM`.
///
/// A codec is pure and stateless apart from whatever tables it precomputes at
/// construction. It translates between a key and the `(level, lattice offset)`
/// pair identifying a cell, and derives parents, children, neighbors, and
/// cell geometry from that translation. [`LinearCodec`] is the default
/// implementation; the generic operations below are defined in terms of the
/// required ones, so custom codecs only supply the core bijection.
///
/// Neighbor queries return `None` when the stepped offset would leave the
/// domain; such cells do not exist at any level, so there is no key to hand
/// back.
pub trait KeyCodec<const DIM: usize> {
    type Key: TreeKey;

    /// The key of the whole-domain cell.
    fn root(&self) -> Self::Key;

    /// The per-axis branching factor `r`.
    fn refinement_factor(&self) -> usize;

    /// `r^DIM`, the child count of every internal cell.
    fn children_per_node(&self) -> usize;

    /// The deepest level this codec can address.
    fn max_level(&self) -> Level;

    /// The depth of `key`'s cell; the root is at level 0.
    fn level(&self, key: Self::Key) -> Level;

    /// Which of its parent's children `key` is, in `[0, r^DIM)`.
    ///
    /// The root has no siblings; passing it is [`TreeError::InvalidKey`].
    fn sibling_index(&self, key: Self::Key) -> Result<usize>;

    /// The key one level up. The root has no parent.
    fn parent(&self, key: Self::Key) -> Result<Self::Key>;

    /// The key of child `sibling` of `key`. Requires `sibling < r^DIM` and
    /// `level(key) < max_level()`.
    fn child(&self, key: Self::Key, sibling: usize) -> Self::Key;

    /// The first key at `level`.
    fn level_start(&self, level: Level) -> Result<Self::Key>;

    /// The last key at `level`.
    fn level_end(&self, level: Level) -> Result<Self::Key>;

    /// The number of cells per axis at `level`, `r^level`.
    fn level_size(&self, level: Level) -> usize;

    /// `key`'s lattice offset relative to its parent, each coordinate in
    /// `[0, r)`. Zero for the root.
    fn offset_within_parent(&self, key: Self::Key) -> IntPoint<DIM>;

    /// `key`'s lattice offset within its whole level, each coordinate in
    /// `[0, r^level)`.
    fn offset_within_level(&self, key: Self::Key) -> IntPoint<DIM>;

    /// The key at `level` whose lattice offset is `offset`; the inverse of
    /// [`offset_within_level`](Self::offset_within_level).
    fn key_from_level_offset(&self, level: Level, offset: IntPoint<DIM>) -> Result<Self::Key>;

    /// The same-level neighbor one step down `axis`, or `None` at the domain
    /// face.
    fn neighbor_min(&self, key: Self::Key, axis: usize) -> Option<Self::Key> {
        let level = self.level(key);
        let mut off = self.offset_within_level(key);
        if off[axis] == 0 {
            return None;
        }
        off[axis] -= 1;
        self.key_from_level_offset(level, off).ok()
    }

    /// The same-level neighbor one step up `axis`, or `None` at the domain
    /// face.
    fn neighbor_max(&self, key: Self::Key, axis: usize) -> Option<Self::Key> {
        let level = self.level(key);
        let mut off = self.offset_within_level(key);
        if off[axis] + 1 >= self.level_size(level) as i64 {
            return None;
        }
        off[axis] += 1;
        self.key_from_level_offset(level, off).ok()
    }

    /// The same-level cells in the axis-aligned `3^DIM` cube around `key`,
    /// `key` itself included. Cells beyond a domain face are skipped, so each
    /// in-domain neighbor appears exactly once.
    fn equal_sized_neighbors(&self, key: Self::Key) -> SmallVec<[Self::Key; 27]> {
        let level = self.level(key);
        let n = self.level_size(level) as i64;
        let center = self.offset_within_level(key);
        let mut out = SmallVec::new();
        'corners: for code in 0..3usize.pow(DIM as u32) {
            let mut code = code;
            let mut off = center;
            for axis in 0..DIM {
                let stepped = off[axis] + (code % 3) as i64 - 1;
                code /= 3;
                if stepped < 0 || stepped >= n {
                    continue 'corners;
                }
                off[axis] = stepped;
            }
            if let Ok(neighbor) = self.key_from_level_offset(level, off) {
                out.push(neighbor);
            }
        }
        out
    }

    /// Whether `key`'s cell touches a face of the domain.
    fn is_boundary(&self, key: Self::Key) -> bool {
        let level = self.level(key);
        let max = self.level_size(level) as i64 - 1;
        let off = self.offset_within_level(key);
        (0..DIM).any(|axis| off[axis] == 0 || off[axis] == max)
    }

    /// The cell of `key` as a box in `[0, 1]^DIM`.
    fn cell_box(&self, key: Self::Key) -> Aabb<DIM> {
        let size = self.cell_size(key);
        let off = self.offset_within_level(key);
        let mut lo = Point::ZERO;
        for axis in 0..DIM {
            lo[axis] = off[axis] as f64 * size;
        }
        Aabb::new(lo, lo + Point::splat(size))
    }

    /// The side length of `key`'s cell, `r^-level`.
    fn cell_size(&self, key: Self::Key) -> f64 {
        1.0 / self.level_size(self.level(key)) as f64
    }
}

/// The default codec: keys are bare integers under the recurrence
/// `child(k, s) = k * r^DIM + 1 + s`.
///
/// Level `ℓ` then occupies the contiguous key range `[S(ℓ), E(ℓ)]` with
/// `S(0) = 0` and `S(ℓ+1) = S(ℓ) + (r^DIM)^ℓ`; both tables are computed once
/// at construction, up to the requested maximum level.
#[derive(Clone, Debug)]
pub struct LinearCodec<K, const DIM: usize, const R: usize> {
    level_start: Vec<usize>,
    level_end: Vec<usize>,
    marker: PhantomData<K>,
}

impl<K: TreeKey, const DIM: usize, const R: usize> LinearCodec<K, DIM, R> {
    /// The number of children of every internal cell, `R^DIM`.
    pub const CHILDREN: usize = R.pow(DIM as u32);

    /// Builds the codec with level tables for `0..=max_level`.
    ///
    /// # Panics
    ///
    /// Panics if `DIM` is zero, `R` is less than 2, or the key range of some
    /// level in `0..=max_level` does not fit in `K`.
    pub fn new(max_level: Level) -> Self {
        assert!(DIM > 0, "orthtree: dimension must be at least 1");
        assert!(R > 1, "orthtree: refinement factor must be at least 2");

        let mut level_start = Vec::with_capacity(max_level as usize + 1);
        let mut level_end = Vec::with_capacity(max_level as usize + 1);
        let mut start = 0usize;
        let mut cells = 1usize;
        for level in 0..=(max_level as usize) {
            let end = match start.checked_add(cells - 1) {
                Some(end) if end <= K::MAX_INDEX => end,
                _ => panic!("orthtree: keys at level {level} do not fit in the key type"),
            };
            level_start.push(start);
            level_end.push(end);
            if level < max_level as usize {
                start = end + 1;
                cells = match cells.checked_mul(Self::CHILDREN) {
                    Some(cells) => cells,
                    None => panic!("orthtree: keys at level {} do not fit in the key type", level + 1),
                };
            }
        }

        Self {
            level_start,
            level_end,
            marker: PhantomData,
        }
    }
}

impl<K: TreeKey, const DIM: usize, const R: usize> KeyCodec<DIM> for LinearCodec<K, DIM, R> {
    type Key = K;

    #[inline]
    fn root(&self) -> K {
        K::from_index(0)
    }

    #[inline]
    fn refinement_factor(&self) -> usize {
        R
    }

    #[inline]
    fn children_per_node(&self) -> usize {
        Self::CHILDREN
    }

    #[inline]
    fn max_level(&self) -> Level {
        (self.level_start.len() - 1) as Level
    }

    fn level(&self, key: K) -> Level {
        let mut k = key.index();
        let mut level = 0;
        while k > 0 {
            k = (k - 1) / Self::CHILDREN;
            level += 1;
        }
        level
    }

    #[inline]
    fn sibling_index(&self, key: K) -> Result<usize> {
        let k = key.index();
        if k == 0 {
            return Err(TreeError::InvalidKey);
        }
        Ok((k - 1) % Self::CHILDREN)
    }

    #[inline]
    fn parent(&self, key: K) -> Result<K> {
        let k = key.index();
        if k == 0 {
            return Err(TreeError::InvalidKey);
        }
        Ok(K::from_index((k - 1) / Self::CHILDREN))
    }

    #[inline]
    fn child(&self, key: K, sibling: usize) -> K {
        debug_assert!(sibling < Self::CHILDREN);
        K::from_index(key.index() * Self::CHILDREN + 1 + sibling)
    }

    #[inline]
    fn level_start(&self, level: Level) -> Result<K> {
        match self.level_start.get(level as usize) {
            Some(&start) => Ok(K::from_index(start)),
            None => Err(TreeError::LevelExceeded {
                level,
                max: self.max_level(),
            }),
        }
    }

    #[inline]
    fn level_end(&self, level: Level) -> Result<K> {
        match self.level_end.get(level as usize) {
            Some(&end) => Ok(K::from_index(end)),
            None => Err(TreeError::LevelExceeded {
                level,
                max: self.max_level(),
            }),
        }
    }

    #[inline]
    fn level_size(&self, level: Level) -> usize {
        R.pow(level as u32)
    }

    fn offset_within_parent(&self, key: K) -> IntPoint<DIM> {
        let mut off = IntPoint::ZERO;
        let Ok(mut sibling) = self.sibling_index(key) else {
            return off;
        };
        for axis in 0..DIM {
            off[axis] = (sibling % R) as i64;
            sibling /= R;
        }
        off
    }

    fn offset_within_level(&self, key: K) -> IntPoint<DIM> {
        let mut off = IntPoint::ZERO;
        let mut k = key.index();
        let mut scale = 1;
        while k > 0 {
            let mut sibling = (k - 1) % Self::CHILDREN;
            for axis in 0..DIM {
                off[axis] += (sibling % R) as i64 * scale;
                sibling /= R;
            }
            k = (k - 1) / Self::CHILDREN;
            scale *= R as i64;
        }
        off
    }

    fn key_from_level_offset(&self, level: Level, offset: IntPoint<DIM>) -> Result<K> {
        let start = self.level_start(level)?.index();
        let cells = self.level_size(level) as i64;
        for axis in 0..DIM {
            if offset[axis] < 0 || offset[axis] >= cells {
                return Err(TreeError::InvalidKey);
            }
        }

        // Peel one base-R digit per coordinate at each level, interleave the
        // digits into a sibling index, and accumulate down the ancestor chain.
        let mut rem = offset;
        let mut total = 0;
        let mut stride = 1;
        for _ in 0..level {
            let mut sibling = 0;
            let mut axis_scale = 1;
            for axis in 0..DIM {
                sibling += (rem[axis] as usize % R) * axis_scale;
                rem[axis] /= R as i64;
                axis_scale *= R;
            }
            total += stride * sibling;
            stride *= Self::CHILDREN;
        }
        Ok(K::from_index(start + total))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Quad = LinearCodec<u64, 2, 2>;
    type Oct = LinearCodec<u64, 3, 2>;
    type Tri = LinearCodec<u64, 2, 3>;

    fn level_keys<C: KeyCodec<DIM>, const DIM: usize>(codec: &C, level: Level) -> Vec<C::Key> {
        let start = codec.level_start(level).unwrap().index();
        let end = codec.level_end(level).unwrap().index();
        (start..=end).map(C::Key::from_index).collect()
    }

    #[test]
    fn level_tables() {
        let quad = Quad::new(4);
        assert_eq!(quad.max_level(), 4);
        let starts: Vec<u64> = (0..=4).map(|l| quad.level_start(l).unwrap()).collect();
        let ends: Vec<u64> = (0..=4).map(|l| quad.level_end(l).unwrap()).collect();
        assert_eq!(starts, [0, 1, 5, 21, 85]);
        assert_eq!(ends, [0, 4, 20, 84, 340]);
        assert_eq!(
            quad.level_start(5),
            Err(TreeError::LevelExceeded { level: 5, max: 4 })
        );

        let oct = Oct::new(2);
        assert_eq!(Oct::CHILDREN, 8);
        assert_eq!(oct.level_start(2).unwrap(), 9);
        assert_eq!(oct.level_end(2).unwrap(), 72);
    }

    #[test]
    fn parent_child_round_trip() {
        let quad = Quad::new(4);
        for level in 0..4 {
            for key in level_keys(&quad, level) {
                for sibling in 0..Quad::CHILDREN {
                    let child = quad.child(key, sibling);
                    assert_eq!(quad.parent(child), Ok(key));
                    assert_eq!(quad.sibling_index(child), Ok(sibling));
                    assert_eq!(quad.level(child), level + 1);
                }
            }
        }
    }

    #[test]
    fn root_is_special() {
        let quad = Quad::new(2);
        assert_eq!(quad.root(), 0);
        assert_eq!(quad.level(0), 0);
        assert_eq!(quad.parent(0), Err(TreeError::InvalidKey));
        assert_eq!(quad.sibling_index(0), Err(TreeError::InvalidKey));
        assert_eq!(quad.offset_within_parent(0), IntPoint::ZERO);
    }

    fn assert_offset_bijection<C: KeyCodec<2>>(codec: &C, top: Level) {
        for level in 0..=top {
            let cells = codec.level_size(level) as i64;
            for x in 0..cells {
                for y in 0..cells {
                    let off = IntPoint([x, y]);
                    let key = codec.key_from_level_offset(level, off).unwrap();
                    assert_eq!(codec.level(key), level);
                    assert_eq!(codec.offset_within_level(key), off);
                    assert!(key >= codec.level_start(level).unwrap());
                    assert!(key <= codec.level_end(level).unwrap());
                }
            }
        }
    }

    #[test]
    fn offset_bijection() {
        assert_offset_bijection(&Quad::new(3), 3);
        assert_offset_bijection(&Tri::new(2), 2);

        let oct = Oct::new(2);
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    let off = IntPoint([x, y, z]);
                    let key = oct.key_from_level_offset(2, off).unwrap();
                    assert_eq!(oct.level(key), 2);
                    assert_eq!(oct.offset_within_level(key), off);
                }
            }
        }
    }

    #[test]
    fn offsets_out_of_range() {
        let quad = Quad::new(2);
        assert_eq!(
            quad.key_from_level_offset(1, IntPoint([-1, 0])),
            Err(TreeError::InvalidKey)
        );
        assert_eq!(
            quad.key_from_level_offset(1, IntPoint([0, 2])),
            Err(TreeError::InvalidKey)
        );
        assert_eq!(
            quad.key_from_level_offset(3, IntPoint::ZERO),
            Err(TreeError::LevelExceeded { level: 3, max: 2 })
        );
    }

    #[test]
    fn sibling_digit_order() {
        // Axis 0 is the least significant base-R digit of the sibling index.
        let tri = Tri::new(1);
        let key = tri.child(0, 5);
        assert_eq!(tri.offset_within_parent(key), IntPoint([2, 1]));
        let quad = Quad::new(1);
        assert_eq!(quad.offset_within_parent(quad.child(0, 2)), IntPoint([0, 1]));
    }

    #[test]
    fn neighbor_symmetry() {
        let quad = Quad::new(3);
        for level in 0..=3 {
            for key in level_keys(&quad, level) {
                for axis in 0..2 {
                    if let Some(next) = quad.neighbor_max(key, axis) {
                        assert_eq!(quad.neighbor_min(next, axis), Some(key));
                        assert_eq!(quad.level(next), level);
                    }
                    if let Some(prev) = quad.neighbor_min(key, axis) {
                        assert_eq!(quad.neighbor_max(prev, axis), Some(key));
                    }
                }
            }
        }
    }

    #[test]
    fn boundary_matches_missing_neighbors() {
        let quad = Quad::new(3);
        for level in 0..=3 {
            for key in level_keys(&quad, level) {
                let off_domain = (0..2).any(|axis| {
                    quad.neighbor_min(key, axis).is_none() || quad.neighbor_max(key, axis).is_none()
                });
                assert_eq!(quad.is_boundary(key), off_domain);
            }
        }
        // The root is its whole level, so it is always boundary.
        assert!(quad.is_boundary(0));
    }

    #[test]
    fn equal_sized_neighbor_cube() {
        let quad = Quad::new(2);
        let key = quad.key_from_level_offset(2, IntPoint([1, 1])).unwrap();
        let mut offsets: Vec<[i64; 2]> = quad
            .equal_sized_neighbors(key)
            .into_iter()
            .map(|k| quad.offset_within_level(k).0)
            .collect();
        offsets.sort();
        let expected: Vec<[i64; 2]> = (0..3).flat_map(|x| (0..3).map(move |y| [x, y])).collect();
        assert_eq!(offsets, expected);

        // A corner cell keeps only the in-domain quarter of its cube.
        let corner = quad.key_from_level_offset(2, IntPoint([0, 0])).unwrap();
        let mut offsets: Vec<[i64; 2]> = quad
            .equal_sized_neighbors(corner)
            .into_iter()
            .map(|k| quad.offset_within_level(k).0)
            .collect();
        offsets.sort();
        assert_eq!(offsets, [[0, 0], [0, 1], [1, 0], [1, 1]]);
    }

    #[test]
    fn cell_geometry() {
        let quad = Quad::new(2);
        assert_eq!(quad.cell_box(0), Aabb::UNIT);
        assert_eq!(quad.cell_size(0), 1.0);

        let key = quad.key_from_level_offset(2, IntPoint([1, 1])).unwrap();
        assert_eq!(key, 8);
        assert_eq!(quad.cell_size(key), 0.25);
        let bx = quad.cell_box(key);
        assert_eq!(bx.lo, Point([0.25, 0.25]));
        assert_eq!(bx.hi, Point([0.5, 0.5]));
        assert_eq!(bx.center(), Point([0.375, 0.375]));
    }
}
