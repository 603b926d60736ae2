use crate::{IntPoint, Point};

use glam::{DVec2, DVec3, I64Vec2, I64Vec3};

impl From<DVec2> for Point<2> {
    #[inline]
    fn from(v: DVec2) -> Self {
        Self([v.x, v.y])
    }
}

impl From<Point<2>> for DVec2 {
    #[inline]
    fn from(p: Point<2>) -> Self {
        Self::new(p.0[0], p.0[1])
    }
}

impl From<DVec3> for Point<3> {
    #[inline]
    fn from(v: DVec3) -> Self {
        Self([v.x, v.y, v.z])
    }
}

impl From<Point<3>> for DVec3 {
    #[inline]
    fn from(p: Point<3>) -> Self {
        Self::new(p.0[0], p.0[1], p.0[2])
    }
}

impl From<I64Vec2> for IntPoint<2> {
    #[inline]
    fn from(v: I64Vec2) -> Self {
        Self([v.x, v.y])
    }
}

impl From<IntPoint<2>> for I64Vec2 {
    #[inline]
    fn from(p: IntPoint<2>) -> Self {
        Self::new(p.0[0], p.0[1])
    }
}

impl From<I64Vec3> for IntPoint<3> {
    #[inline]
    fn from(v: I64Vec3) -> Self {
        Self([v.x, v.y, v.z])
    }
}

impl From<IntPoint<3>> for I64Vec3 {
    #[inline]
    fn from(p: IntPoint<3>) -> Self {
        Self::new(p.0[0], p.0[1], p.0[2])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips() {
        let p = Point([0.25, 0.5, 0.75]);
        assert_eq!(Point::<3>::from(DVec3::from(p)), p);
        let o = IntPoint([1, -2]);
        assert_eq!(IntPoint::<2>::from(I64Vec2::from(o)), o);
    }
}
