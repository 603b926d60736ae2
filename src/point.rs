use core::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Rem, Sub, SubAssign};

/// A point with `DIM` real coordinates.
///
/// The tree is generic over its dimension, so coordinates are const-generic
/// arrays rather than one of the fixed-size vector types; the `glam` feature
/// provides conversions for the 2D and 3D cases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<const DIM: usize>(pub [f64; DIM]);

/// A point with `DIM` signed integer coordinates, used for lattice offsets.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct IntPoint<const DIM: usize>(pub [i64; DIM]);

impl<const DIM: usize> Default for Point<DIM> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const DIM: usize> Default for IntPoint<DIM> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const DIM: usize> Point<DIM> {
    /// The origin.
    pub const ZERO: Self = Self([0.0; DIM]);

    /// A point with every coordinate equal to `value`.
    #[inline]
    pub fn splat(value: f64) -> Self {
        Self([value; DIM])
    }

    #[inline]
    pub fn dot(self, rhs: Self) -> f64 {
        let mut total = 0.0;
        for i in 0..DIM {
            total += self.0[i] * rhs.0[i];
        }
        total
    }

    #[inline]
    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    /// The Euclidean length.
    #[inline]
    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }
}

impl<const DIM: usize> IntPoint<DIM> {
    /// The origin.
    pub const ZERO: Self = Self([0; DIM]);

    /// A point with every coordinate equal to `value`.
    #[inline]
    pub fn splat(value: i64) -> Self {
        Self([value; DIM])
    }

    #[inline]
    pub fn dot(self, rhs: Self) -> i64 {
        let mut total = 0;
        for i in 0..DIM {
            total += self.0[i] * rhs.0[i];
        }
        total
    }

    /// The same coordinates as real values.
    #[inline]
    pub fn as_point(self) -> Point<DIM> {
        let mut out = Point::ZERO;
        for i in 0..DIM {
            out.0[i] = self.0[i] as f64;
        }
        out
    }
}

impl<const DIM: usize> From<IntPoint<DIM>> for Point<DIM> {
    #[inline]
    fn from(p: IntPoint<DIM>) -> Self {
        p.as_point()
    }
}

impl<const DIM: usize> Add for Point<DIM> {
    type Output = Self;
    #[inline]
    fn add(mut self, rhs: Self) -> Self {
        for i in 0..DIM {
            self.0[i] += rhs.0[i];
        }
        self
    }
}

impl<const DIM: usize> Sub for Point<DIM> {
    type Output = Self;
    #[inline]
    fn sub(mut self, rhs: Self) -> Self {
        for i in 0..DIM {
            self.0[i] -= rhs.0[i];
        }
        self
    }
}

impl<const DIM: usize> AddAssign for Point<DIM> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const DIM: usize> SubAssign for Point<DIM> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<const DIM: usize> Mul<f64> for Point<DIM> {
    type Output = Self;
    #[inline]
    fn mul(mut self, rhs: f64) -> Self {
        for i in 0..DIM {
            self.0[i] *= rhs;
        }
        self
    }
}

impl<const DIM: usize> Mul<Point<DIM>> for f64 {
    type Output = Point<DIM>;
    #[inline]
    fn mul(self, rhs: Point<DIM>) -> Point<DIM> {
        rhs * self
    }
}

impl<const DIM: usize> Index<usize> for Point<DIM> {
    type Output = f64;
    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl<const DIM: usize> IndexMut<usize> for Point<DIM> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

impl<const DIM: usize> Add for IntPoint<DIM> {
    type Output = Self;
    #[inline]
    fn add(mut self, rhs: Self) -> Self {
        for i in 0..DIM {
            self.0[i] += rhs.0[i];
        }
        self
    }
}

impl<const DIM: usize> Sub for IntPoint<DIM> {
    type Output = Self;
    #[inline]
    fn sub(mut self, rhs: Self) -> Self {
        for i in 0..DIM {
            self.0[i] -= rhs.0[i];
        }
        self
    }
}

impl<const DIM: usize> Mul<i64> for IntPoint<DIM> {
    type Output = Self;
    #[inline]
    fn mul(mut self, rhs: i64) -> Self {
        for i in 0..DIM {
            self.0[i] *= rhs;
        }
        self
    }
}

/// Elementwise integer division, truncating toward zero.
impl<const DIM: usize> Div<i64> for IntPoint<DIM> {
    type Output = Self;
    #[inline]
    fn div(mut self, rhs: i64) -> Self {
        for i in 0..DIM {
            self.0[i] /= rhs;
        }
        self
    }
}

/// Elementwise modulus by a positive integer.
impl<const DIM: usize> Rem<i64> for IntPoint<DIM> {
    type Output = Self;
    #[inline]
    fn rem(mut self, rhs: i64) -> Self {
        for i in 0..DIM {
            self.0[i] %= rhs;
        }
        self
    }
}

impl<const DIM: usize> Index<usize> for IntPoint<DIM> {
    type Output = i64;
    #[inline]
    fn index(&self, i: usize) -> &i64 {
        &self.0[i]
    }
}

impl<const DIM: usize> IndexMut<usize> for IntPoint<DIM> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut i64 {
        &mut self.0[i]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn real_algebra() {
        let a = Point([1.0, 2.0]);
        let b = Point([3.0, -1.0]);
        assert_eq!(a + b, Point([4.0, 1.0]));
        assert_eq!(a - b, Point([-2.0, 3.0]));
        assert_eq!(a * 2.0, Point([2.0, 4.0]));
        assert_eq!(2.0 * a, Point([2.0, 4.0]));
        assert_eq!(a.dot(b), 1.0);
        assert_eq!(Point([3.0, 4.0]).norm(), 5.0);
    }

    #[test]
    fn integer_algebra() {
        let a = IntPoint([5, 7, 2]);
        assert_eq!(a % 3, IntPoint([2, 1, 2]));
        assert_eq!(a / 2, IntPoint([2, 3, 1]));
        assert_eq!(a * 2, IntPoint([10, 14, 4]));
        assert_eq!(a.as_point(), Point([5.0, 7.0, 2.0]));
    }
}
