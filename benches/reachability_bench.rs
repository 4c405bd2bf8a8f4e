// Visibility engine benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use codeintel_commitgraph::graph::{
    attach_uploads, calculate_reachability, calculate_visible_uploads, reverse_graph, topological_sort,
};

mod common;

fn bench_reverse_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_graph");
    for size in [1_000, 10_000, 100_000] {
        let graph = common::generate_history(size);
        group.bench_with_input(BenchmarkId::new("commits", size), &graph, |b, graph| {
            b.iter(|| black_box(reverse_graph(graph)));
        });
    }
    group.finish();
}

fn bench_topological_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological_sort");
    for size in [1_000, 10_000, 100_000] {
        let graph = common::generate_history(size);
        group.bench_with_input(BenchmarkId::new("commits", size), &graph, |b, graph| {
            b.iter(|| black_box(topological_sort(graph).unwrap()));
        });
    }
    group.finish();
}

fn bench_reachability(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_reachability");
    group.sample_size(20);
    for size in [1_000, 10_000, 50_000] {
        let graph = common::generate_history(size);
        let uploads = common::generate_uploads(size, 25);
        let commits = attach_uploads(&graph, &uploads);

        group.bench_with_input(BenchmarkId::new("commits", size), &commits, |b, commits| {
            b.iter(|| black_box(calculate_reachability(commits).unwrap()));
        });
    }
    group.finish();
}

fn bench_upload_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible_uploads_density");
    group.sample_size(20);
    let size = 10_000;
    let graph = common::generate_history(size);
    let tip = common::commit_name(size - 1);

    // Dense uploads shorten every search, sparse ones make them long
    for stride in [1, 10, 100, 1_000] {
        let uploads = common::generate_uploads(size, stride);
        group.bench_with_input(BenchmarkId::new("stride", stride), &uploads, |b, uploads| {
            b.iter(|| black_box(calculate_visible_uploads(&graph, uploads, &tip).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_reverse_graph,
    bench_topological_sort,
    bench_reachability,
    bench_upload_density,
);
criterion_main!(benches);
