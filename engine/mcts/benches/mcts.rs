//! Planner benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p mcts`
//!
//! These benchmarks measure:
//! - Budget cycles on generated grid worlds with varying iteration caps
//! - Suspend/resume overhead when the budget cuts rollouts short
//! - Tree operations (expansion, selection, backpropagation, re-rooting)

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_world::{GridActions, GridRollout, GridState, GridWorld, Position, RolloutParams};
use mcts::{Planner, PlannerConfig, ResumeInstruction, SearchTree, TickClock};

const START: Position = Position { x: 0, y: 0, z: 0 };

fn world(edge: i32, density: f64) -> Arc<GridWorld> {
    let size = Position::new(edge, 3, edge);
    let goal = Position::new(edge - 1, 0, edge - 1);
    Arc::new(GridWorld::generate(size, START, goal, density, 42).unwrap())
}

fn planner(
    world: &Arc<GridWorld>,
    config: PlannerConfig,
    tick: Duration,
) -> Planner<GridState, GridActions, GridRollout, TickClock> {
    Planner::with_clock(
        GridState::start(world, START),
        GridActions::new(world.clone(), 7),
        GridRollout::new(world.clone(), RolloutParams::default(), 11),
        config,
        TickClock::new(tick),
    )
    .unwrap()
}

// =============================================================================
// Budget Cycle Benchmarks
// =============================================================================

fn bench_planner_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner_iterations");
    let world = world(16, 0.2);

    for iterations in [50u32, 100, 200, 400, 800] {
        group.throughput(Throughput::Elements(iterations as u64));
        group.bench_with_input(
            BenchmarkId::new("grid_16", iterations),
            &iterations,
            |b, &iterations| {
                let config = PlannerConfig::default()
                    .with_time_budget_ms(u64::MAX / 2)
                    .with_max_iterations_per_cycle(Some(iterations));

                b.iter(|| {
                    let mut planner = planner(&world, config.clone(), Duration::from_nanos(1));
                    black_box(planner.advance().iterations)
                });
            },
        );
    }

    group.finish();
}

fn bench_world_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_sizes");
    let config = PlannerConfig::default()
        .with_time_budget_ms(u64::MAX / 2)
        .with_max_iterations_per_cycle(Some(200));

    for edge in [8, 16, 32, 64] {
        let world = world(edge, 0.25);
        group.bench_with_input(BenchmarkId::new("edge", edge), &edge, |b, _| {
            b.iter(|| {
                let mut planner = planner(&world, config.clone(), Duration::from_nanos(1));
                black_box(planner.advance().iterations)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Suspend/Resume Benchmarks
// =============================================================================

fn bench_resumable_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("resumable_cycles");
    let world = world(32, 0.25);

    // A 100ms budget with a 1ms tick allows ~100 micro-steps per cycle, so
    // most cycles end mid-rollout.
    group.bench_function("short_cycles_100", |b| {
        let config = PlannerConfig::default().with_time_budget_ms(100);

        b.iter(|| {
            let mut planner = planner(&world, config.clone(), Duration::from_millis(1));
            for _ in 0..100 {
                planner.advance();
            }
            black_box(planner.total_iterations())
        });
    });

    group.bench_function("walk_with_reroot", |b| {
        let config = PlannerConfig::default()
            .with_time_budget_ms(u64::MAX / 2)
            .with_max_iterations_per_cycle(Some(50));

        b.iter(|| {
            let mut planner = planner(&world, config.clone(), Duration::from_nanos(1));
            for _ in 0..20 {
                planner.advance();
                planner.control(ResumeInstruction::re_root());
            }
            black_box(planner.tree().len())
        });
    });

    group.finish();
}

// =============================================================================
// Tree Operation Benchmarks
// =============================================================================

fn wide_tree(children: u32) -> SearchTree<u32, u32> {
    let mut tree = SearchTree::new(0u32);
    let root = tree.root();
    for i in 0..children {
        let child = tree.add_child(root, i, i + 1).unwrap();
        for _ in 0..=i {
            tree.backpropagate(child, f64::from(i) / f64::from(children));
        }
    }
    tree
}

fn bench_tree_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_tree_ops");

    group.bench_function("add_child_100", |b| {
        b.iter(|| {
            let mut tree = SearchTree::new(0u32);
            let root = tree.root();
            for i in 0..100u32 {
                tree.add_child(root, i, i + 1);
            }
            black_box(tree.len())
        });
    });

    group.bench_function("best_child_26", |b| {
        // 26 neighbours is the widest a lattice cell can branch
        let tree = wide_tree(26);
        b.iter(|| black_box(tree.best_child(tree.root(), 0.75, 0.1)));
    });

    group.bench_function("backpropagate_depth_64", |b| {
        b.iter_batched(
            || {
                let mut tree = SearchTree::new(0u32);
                let mut parent = tree.root();
                for i in 0..64u32 {
                    parent = tree.add_child(parent, i, i + 1).unwrap();
                }
                (tree, parent)
            },
            |(mut tree, leaf)| {
                tree.backpropagate(leaf, 0.5);
                black_box(tree)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("promote_wide", |b| {
        b.iter_batched(
            || {
                let tree = wide_tree(26);
                let best = tree.best_child(tree.root(), 1.0, 0.0).unwrap();
                (tree, best)
            },
            |(mut tree, best)| black_box(tree.promote(best)),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_planner_iterations,
    bench_world_sizes,
    bench_resumable_cycles,
    bench_tree_operations,
);

criterion_main!(benches);
