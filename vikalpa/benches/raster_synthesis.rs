//! Benchmark path synthesis performance.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use vikalpa::config::SynthesisLimits;
use vikalpa::map::ClearanceMask;
use vikalpa::synthesis::{
    RandomPathParams, RandomPathSynthesizer, RasterPathParams, RasterPathSynthesizer,
};
use vikalpa::{OccupancyMap, Pose2D, WorldPoint};

/// Square room of `size` meters with walls and a partition along the middle.
fn room(size: f32) -> OccupancyMap {
    let cells = (size / 0.05) as usize;
    let mid = size * 0.5;
    OccupancyMap::empty(cells, cells, 0.05, Pose2D::default())
        .unwrap()
        .with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(size, 0.15), 1.0)
        .with_rect(WorldPoint::new(0.0, size - 0.15), WorldPoint::new(size, size), 1.0)
        .with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(0.15, size), 1.0)
        .with_rect(WorldPoint::new(size - 0.15, 0.0), WorldPoint::new(size, size), 1.0)
        .with_rect(
            WorldPoint::new(mid - 0.05, 0.0),
            WorldPoint::new(mid + 0.05, size * 0.75),
            1.0,
        )
}

fn raster_params(num_goal_poses: usize) -> RasterPathParams {
    RasterPathParams {
        raster_size: 1.0,
        raster_offset_x: 0.5,
        raster_offset_y: 0.5,
        path_length: 6.0,
        path_length_tolerance: 0.5,
        num_goal_poses,
        robot_diameter: 0.4,
    }
}

fn bench_clearance_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("clearance_mask");

    for size in [10.0f32, 20.0, 40.0].iter() {
        let map = room(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(ClearanceMask::new(black_box(&map), 0.2)))
        });
    }

    group.finish();
}

fn bench_raster_single_goal(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster_single_goal");

    for size in [10.0f32, 20.0].iter() {
        let map = room(*size);
        let synthesizer = RasterPathSynthesizer::new(&map, raster_params(1)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(synthesizer.synthesize(None).unwrap()))
        });
    }

    group.finish();
}

fn bench_raster_multi_goal(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster_multi_goal");
    let map = room(20.0);

    for goals in [2usize, 4].iter() {
        let synthesizer = RasterPathSynthesizer::new(&map, raster_params(*goals)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(goals), goals, |b, _| {
            b.iter(|| black_box(synthesizer.synthesize(None).unwrap()))
        });
    }

    group.finish();
}

fn bench_random_path(c: &mut Criterion) {
    let map = room(20.0);
    let params = RandomPathParams {
        path_length: 8.0,
        path_length_tolerance: 0.5,
        min_distance: 1.0,
        num_goal_poses: 3,
        robot_diameter: 0.4,
        seed: 42,
    };
    let synthesizer = RandomPathSynthesizer::new(&map, params, SynthesisLimits::default()).unwrap();

    c.bench_function("random_path_three_goals", |b| {
        let mut index = 0;
        b.iter(|| {
            index += 1;
            black_box(synthesizer.synthesize(None, index).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_clearance_mask,
    bench_raster_single_goal,
    bench_raster_multi_goal,
    bench_random_path
);
criterion_main!(benches);
