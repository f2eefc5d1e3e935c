use std::hint::black_box;
use std::time::Instant;

use glam::Vec2;
use stagecraft_common::NodeId;
use stagecraft_events::{Event, EventBus, EventSource};
use stagecraft_scene::{Node, SceneGraph};

/// `roots` top-level nodes, each with a chain of `chain` descendants.
fn make_graph(roots: u32, chain: u32) -> SceneGraph {
    let mut graph = SceneGraph::new();
    let mut next = 0;
    for r in 0..roots {
        let id = NodeId(next);
        next += 1;
        let node = Node::create(id, "root", Vec2::new(r as f32, 0.0), r as f32, Vec2::ONE, 0.1);
        graph.add_child(node).expect("unique ids");
        let mut parent = id;
        for _ in 0..chain {
            let child = NodeId(next);
            next += 1;
            let node = Node::create(child, "child", Vec2::new(1.0, 1.0), 0.0, Vec2::ONE, 0.05);
            graph.add_child_to(parent, node).expect("unique ids");
            parent = child;
        }
    }
    graph
}

fn bench_update(roots: u32, chain: u32, iterations: usize) {
    let mut graph = make_graph(roots, chain);
    let start = Instant::now();
    for _ in 0..iterations {
        graph.update(black_box(1.0 / 60.0));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  update ({} nodes, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}",
        graph.len()
    );
}

fn bench_drain(events: usize, budget: usize) {
    let mut bus = EventBus::new();
    bus.subscribe("tick", std::rc::Rc::new(|e: &Event| {
        black_box(e.code());
    }));
    for _ in 0..events {
        bus.post(Event::new("tick", EventSource::Input));
    }
    let start = Instant::now();
    let mut drains = 0;
    while bus.drain(budget) > 0 {
        drains += 1;
    }
    let elapsed = start.elapsed();
    println!("  drain ({events} events, budget {budget}): {drains} drains, total {elapsed:?}");
}

fn main() {
    println!("=== Scene Benchmarks ===\n");

    println!("World transform update:");
    bench_update(100, 0, 10000);
    bench_update(100, 10, 1000);
    bench_update(1000, 10, 100);

    println!("\nDeferred event drain:");
    bench_drain(1000, 10);
    bench_drain(100000, 10);
    bench_drain(100000, 1000);

    println!("\n=== Done ===");
}
