//! Benchmarks for orthtree construction and queries.
//!
//! Run with: `cargo bench --bench orthtree`

use divan::{black_box, Bencher};
use orthtree::{DirectInserter, KeyCodec, LinearCodec, Octree, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    divan::main();
}

fn random_points(n: usize) -> Vec<Point<3>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|_| Point([rng.gen(), rng.gen(), rng.gen()]))
        .collect()
}

fn uniform_octree(depth: u8) -> Octree<u32> {
    let mut tree = Octree::new(6);
    tree.build_tree(0, depth, &|_: u64| 0, &|_: u64| false, &mut DirectInserter)
        .unwrap();
    tree
}

#[divan::bench(args = [2, 3, 4])]
fn build_uniform(bencher: Bencher, depth: u8) {
    bencher.bench_local(|| black_box(uniform_octree(depth).len()));
}

/// Adaptive refinement along a spherical shell, the shape a CSG boundary
/// oracle produces.
#[divan::bench]
fn build_adaptive(bencher: Bencher) {
    let codec = LinearCodec::<u64, 3, 2>::new(6);
    let center = Point([0.5; 3]);
    let uniform = move |key: u64| {
        let bx = codec.cell_box(key);
        let radius = (bx.center() - center).norm();
        (radius - 0.4).abs() > bx.extent()[0]
    };
    bencher.bench_local(|| {
        let mut tree = Octree::<u32>::new(6);
        tree.build_tree(2, 5, &|_: u64| 0, &uniform, &mut DirectInserter)
            .unwrap();
        black_box(tree.len())
    });
}

#[divan::bench]
fn find_leaf_keys(bencher: Bencher) {
    let tree = uniform_octree(4);
    let keys: Vec<u64> = tree.leaves().map(|(k, _)| k).collect();
    bencher.bench_local(|| {
        let mut found = 0;
        for &key in &keys {
            found += usize::from(tree.find(black_box(key)).is_some());
        }
        black_box(found)
    });
}

#[divan::bench]
fn interpolate(bencher: Bencher) {
    let tree = uniform_octree(4);
    let points = random_points(256);
    bencher.bench_local(|| {
        let mut support = 0;
        for &p in &points {
            support += tree.interpolate_to(p, Point::ZERO).unwrap().len();
        }
        black_box(support)
    });
}
