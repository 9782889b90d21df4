// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Parser throughput benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench -p psxc-core --bench parser_bench
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use psxc_core::{lexer, parser};
use std::hint::black_box;

fn generate_classes(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            "class Widget{i}:\n    def __init__(self, value):\n        self.value = value\n\n    def render(self, data):\n        items = [x * 2 for x in data if x % 2 == 0]\n        return self.value + len(items)\n\n"
        ));
    }
    source
}

fn bench_parse_classes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_classes");
    for size in [10, 50, 100].iter() {
        let source = generate_classes(*size);
        let tokens = lexer::scan(&source).tokens;
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &tokens, |b, tokens| {
            b.iter(|| black_box(parser::parse(tokens)));
        });
    }
    group.finish();
}

fn bench_scan_then_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_then_parse");
    for size in [10, 50, 100].iter() {
        let source = generate_classes(*size);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| {
                let tokens = lexer::scan(source).tokens;
                black_box(parser::parse(&tokens))
            });
        });
    }
    group.finish();
}

criterion_group!(parsing, bench_parse_classes, bench_scan_then_parse);
criterion_main!(parsing);
