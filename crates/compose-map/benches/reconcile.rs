use std::sync::Arc;

use compose_map::renderer::{Coordinate, Geometry, HeadlessMapRenderer};
use compose_map::{
    annotations, Annotation, AnnotationGroup, AnnotationKind, ContentNode, CoordinatorOptions,
    MapCoordinator, MapDeclaration,
};
use compose_map_core::{DefaultScheduler, Runtime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const GROUP_COUNT: usize = 8;
const ITEM_SAMPLES: &[usize] = &[16, 64, 256, 1024];

fn declaration(groups: usize, items: usize, shift: f64) -> MapDeclaration {
    let content = ContentNode::for_each(
        0..groups,
        |group| *group,
        |group| {
            annotations(AnnotationGroup::from_data(
                AnnotationKind::Circle,
                0..items,
                |item| {
                    let lat = (group * items + item) as f64 * 0.001 + shift;
                    Annotation::new(item, Geometry::Point(Coordinate::new(lat, 0.0)))
                },
            ))
        },
    );
    MapDeclaration::new(content)
}

struct ReconcileFixture {
    _runtime: Runtime,
    renderer: HeadlessMapRenderer,
    coordinator: MapCoordinator,
}

impl ReconcileFixture {
    fn new() -> Self {
        let runtime = Runtime::new(Arc::new(DefaultScheduler));
        let coordinator = MapCoordinator::new(
            runtime.handle(),
            CoordinatorOptions {
                log_cycle_summary: false,
                ..CoordinatorOptions::default()
            },
        );
        Self {
            _runtime: runtime,
            renderer: HeadlessMapRenderer::new(),
            coordinator,
        }
    }

    fn update(&mut self, declaration: &MapDeclaration) {
        let report = self
            .coordinator
            .update(&mut self.renderer, declaration)
            .expect("valid content");
        black_box(report);
        self.renderer.clear_calls();
    }
}

fn bench_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_steady_state");
    for &items in ITEM_SAMPLES {
        group.bench_with_input(BenchmarkId::new("items", items), &items, |b, &items| {
            let mut fixture = ReconcileFixture::new();
            let declaration = declaration(GROUP_COUNT, items, 0.0);
            // Warm up so only the no-op diff is measured.
            fixture.update(&declaration);

            b.iter(|| fixture.update(&declaration));
        });
    }
    group.finish();
}

fn bench_moving_items(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_moving_items");
    for &items in ITEM_SAMPLES {
        group.bench_with_input(BenchmarkId::new("items", items), &items, |b, &items| {
            let mut fixture = ReconcileFixture::new();
            let frames = [
                declaration(GROUP_COUNT, items, 0.0),
                declaration(GROUP_COUNT, items, 0.5),
            ];
            let mut frame = 0;

            b.iter(|| {
                fixture.update(&frames[frame % 2]);
                frame += 1;
            });
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let declaration = declaration(64, 4, 0.0);
    c.bench_function("resolve_content", |b| {
        b.iter(|| {
            let leaves = declaration.content().resolve().expect("valid content");
            black_box(leaves.len());
        });
    });
}

criterion_group!(reconcile, bench_steady_state, bench_moving_items, bench_resolve);
criterion_main!(reconcile);
