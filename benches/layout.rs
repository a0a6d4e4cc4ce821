#![allow(unused)]
extern crate revgraph;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use revgraph::{GraphConfig, ObjectId, RevisionGraph};
use std::hint::black_box;

fn commit_id(n: usize) -> ObjectId {
    let mut bytes = [0xC3; 20];
    bytes[..8].copy_from_slice(&(n as u64).to_be_bytes());
    ObjectId::new(bytes)
}

/// A history of `count` commits with a merge every few commits, newest first
fn history(count: usize) -> Vec<(ObjectId, Vec<ObjectId>)> {
    let mut rng = SmallRng::seed_from_u64(0xB1F);
    (0..count)
        .map(|n| {
            let remaining = count - n - 1;
            let mut parents = Vec::new();
            if remaining > 0 {
                parents.push(commit_id(n + 1));
                if remaining > 1 && rng.gen_ratio(1, 8) {
                    parents.push(commit_id(n + 1 + rng.gen_range(1..remaining.min(40))));
                }
            }
            (commit_id(n), parents)
        })
        .collect()
}

fn load(config: GraphConfig, commits: &[(ObjectId, Vec<ObjectId>)]) -> RevisionGraph {
    let graph = RevisionGraph::with_config(config).unwrap();
    for (id, parents) in commits {
        graph.add(*id, parents);
    }
    graph.loading_completed();
    graph
}

/// Benchmark streaming commits into the node store
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    for count in [1_000, 10_000] {
        let commits = history(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &commits, |b, commits| {
            b.iter(|| black_box(load(GraphConfig::default(), commits)));
        });
    }
    group.finish();
}

/// Benchmark building all rows, with and without the visual passes
fn bench_build_rows(c: &mut Criterion) {
    let commits = history(5_000);
    let mut group = c.benchmark_group("build_rows");
    group.throughput(Throughput::Elements(commits.len() as u64));
    for (name, config) in [
        ("minimal", GraphConfig::minimal()),
        ("comprehensive", GraphConfig::comprehensive()),
    ] {
        group.bench_function(name, |b| {
            b.iter_with_setup(
                || load(config, &commits),
                |graph| {
                    graph.ensure_rows_built(commits.len());
                    black_box(graph.cached_count())
                },
            );
        });
    }
    group.finish();
}

/// Benchmark scrolling through a graph which is built page by page
fn bench_scroll(c: &mut Criterion) {
    let commits = history(5_000);
    c.bench_function("scroll_pages", |b| {
        b.iter_with_setup(
            || load(GraphConfig::default(), &commits),
            |graph| {
                for page in (0..commits.len()).step_by(50) {
                    graph.cache_to(page, page + 49);
                }
                black_box(graph.rows())
            },
        );
    });
}

criterion_group!(benches, bench_add, bench_build_rows, bench_scroll);
criterion_main!(benches);
