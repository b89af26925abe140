//! Checker throughput benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench checker
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tctl_rs::atom::RelOp;
use tctl_rs::checker::{Checker, CheckerConfig};
use tctl_rs::formula::Formula;
use tctl_rs::graph::{KripkeGraph, Node};
use tctl_rs::quantity::{Cost, Quantity};
use tctl_rs::store::{MemoryStore, PendingOrder, StoreConfig};
use tctl_rs::window::Statement;

// ============================================================================
// Helper: counter ring with shortcuts
// ============================================================================

/// `n` nodes in a ring, every third node also jumping two ahead; `tick` holds on
/// every fourth node.
fn ring(n: usize) -> KripkeGraph {
    let mut builder = KripkeGraph::builder();
    let ids: Vec<_> = (0..n)
        .map(|i| {
            builder.add_node(
                Node::new(format!("s{}", i))
                    .with_var("i", i as i64)
                    .with_var("tick", i % 4 == 0),
            )
        })
        .collect();
    for i in 0..n {
        builder.add_edge(ids[i], ids[(i + 1) % n], Cost::of_time(Quantity::ns(1)));
        if i % 3 == 0 {
            builder.add_edge(ids[i], ids[(i + 2) % n], Cost::of_time(Quantity::ns(3)));
        }
    }
    builder.mark_initial(ids[0]);
    builder.build().expect("ring is total")
}

fn bench_universal(c: &mut Criterion) {
    let mut group = c.benchmark_group("universal");
    let formula = Formula::flag("tick").af().ag();
    for n in [16, 64, 256] {
        let graph = ring(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("AG AF tick", n), &graph, |b, graph| {
            b.iter(|| Checker::in_memory(graph).check_formula(&formula).is_ok())
        });
    }
    group.finish();
}

fn bench_existential(c: &mut Criterion) {
    let mut group = c.benchmark_group("existential");
    let formula = Formula::flag("tick").ef().ag();
    for n in [16, 64, 256] {
        let graph = ring(n);
        group.throughput(Throughput::Elements(n as u64));
        for order in [PendingOrder::DepthFirst, PendingOrder::BreadthFirst] {
            let id = BenchmarkId::new(format!("AG EF tick/{:?}", order), n);
            group.bench_with_input(id, &graph, |b, graph| {
                b.iter(|| {
                    let store = MemoryStore::new(StoreConfig {
                        order,
                        ..StoreConfig::default()
                    });
                    Checker::new(graph, store, CheckerConfig::default())
                        .check_formula(&formula)
                        .is_ok()
                })
            });
        }
    }
    group.finish();
}

fn bench_timed(c: &mut Criterion) {
    let mut group = c.benchmark_group("timed");
    let window = [Statement::time(RelOp::Le, Quantity::ns(8))];
    let formula = Formula::flag("tick").af().within(window).ag();
    for n in [16, 64] {
        let graph = ring(n);
        group.bench_with_input(BenchmarkId::new("AG {AF tick}_{t <= 8ns}", n), &graph, |b, graph| {
            b.iter(|| Checker::in_memory(graph).check_formula(&formula).is_ok())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_universal, bench_existential, bench_timed);
criterion_main!(benches);
