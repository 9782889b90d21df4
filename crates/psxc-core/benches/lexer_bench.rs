// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Lexer throughput benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench -p psxc-core --bench lexer_bench
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use psxc_core::lexer;
use std::hint::black_box;

fn generate_functions(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            "def func_{i}(arg1, arg2, arg3=None):\n    result = arg1 + arg2\n    if arg3:\n        result *= arg3\n    return result\n\n"
        ));
    }
    source
}

fn generate_views(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            "view Card{i}(title, items):\n    <div class=\"card\">\n        <h2>{{title}}</h2>\n        <ul>\n            {{[<li>{{item}}</li> for item in items]}}\n        </ul>\n    </div>\n\n"
        ));
    }
    source
}

fn bench_scan_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_functions");
    for size in [10, 50, 100, 200].iter() {
        let source = generate_functions(*size);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| black_box(lexer::scan(source)));
        });
    }
    group.finish();
}

fn bench_scan_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_views");
    for size in [10, 50, 100].iter() {
        let source = generate_views(*size);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| black_box(lexer::scan(source)));
        });
    }
    group.finish();
}

criterion_group!(lexing, bench_scan_functions, bench_scan_views);
criterion_main!(lexing);
