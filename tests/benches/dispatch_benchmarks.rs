//! # Fanout Dispatch Benchmarks
//!
//! | Path | Expected cost |
//! |------|---------------|
//! | Registry broadcast | O(subscribers) |
//! | Subtree broadcast | O(nodes in subtree) |
//! | Find-and-broadcast | O(all objects in the world) |
//!
//! The find-and-broadcast group exists to show the gap to registry delivery.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fanout_core::{InMemoryScene, Messenger, MessagingApi, NodeId};
use std::cell::Cell;
use std::rc::Rc;

trait Tick {
    fn tick(&self);
}

#[derive(Default)]
struct Counter(Cell<u64>);

impl Tick for Counter {
    fn tick(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// A flat scene of `size` nodes under one root, one `Counter` each, all
/// registered globally.
fn populated(size: usize) -> (Messenger<InMemoryScene>, NodeId) {
    let scene = Rc::new(InMemoryScene::new());
    let root = scene.spawn("root", None).expect("spawn");
    let messenger = Messenger::new(scene.clone());
    for i in 0..size {
        let node = scene.spawn(&format!("n{i}"), Some(root)).expect("spawn");
        let counter = Rc::new(Counter::default());
        let key = scene.attach(node, counter.clone()).expect("attach");
        scene
            .expose::<dyn Tick>(key, counter.clone())
            .expect("same allocation");
        messenger
            .register_global::<dyn Tick>(counter)
            .expect("live");
    }
    (messenger, root)
}

fn bench_registry_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry-broadcast");
    for size in [10, 100, 1_000] {
        let (messenger, _) = populated(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    messenger
                        .broadcast_global::<dyn Tick, _>(|r| {
                            r.tick();
                            Ok(())
                        })
                        .expect("idle"),
                )
            })
        });
    }
    group.finish();
}

fn bench_subtree_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("subtree-broadcast");
    for size in [10, 100, 1_000] {
        let (messenger, root) = populated(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    messenger
                        .broadcast::<dyn Tick, _>(root, false, false, |r| {
                            r.tick();
                            Ok(())
                        })
                        .expect("ok"),
                )
            })
        });
    }
    group.finish();
}

fn bench_find_and_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("find-and-broadcast");
    for size in [10, 100, 1_000] {
        let (messenger, _) = populated(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    messenger
                        .find_and_broadcast::<dyn Tick, _>(false, |r| {
                            r.tick();
                            Ok(())
                        })
                        .expect("ok"),
                )
            })
        });
    }
    group.finish();
}

fn bench_token_capture(c: &mut Criterion) {
    let (messenger, root) = populated(100);
    c.bench_function("token-capture-broadcast-100", |b| {
        b.iter(|| black_box(messenger.create_broadcast_token::<dyn Tick>(root, false, false)))
    });
}

criterion_group!(
    benches,
    bench_registry_broadcast,
    bench_subtree_broadcast,
    bench_find_and_broadcast,
    bench_token_capture
);
criterion_main!(benches);
