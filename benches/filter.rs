//! 文件过滤与路径规范化的性能测试
//!
//! 运行: `cargo bench --bench filter`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ftpsync::core::{path, FileFilter};

/// 生成不同深度的相对路径
fn relative_paths(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let depth = i % 4;
            let dirs: Vec<String> = (0..depth).map(|d| format!("dir_{}", (i + d) % 50)).collect();
            let ext = ["csv", "txt", "xml", "json"][i % 4];
            if dirs.is_empty() {
                format!("file_{i}.{ext}")
            } else {
                format!("{}/file_{i}.{ext}", dirs.join("/"))
            }
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let paths = relative_paths(10_000);
    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Elements(paths.len() as u64));

    for pattern in ["*.*", "*.csv", "*.csv;*.txt;dir_1?/*.xml", "[!d]*#.json"] {
        let filter = FileFilter::new(pattern).unwrap();
        group.bench_with_input(BenchmarkId::new("matches", pattern), &paths, |b, paths| {
            b.iter(|| paths.iter().filter(|p| filter.matches(black_box(p))).count())
        });
    }

    group.bench_function("compile", |b| {
        b.iter(|| FileFilter::new(black_box("*.csv;*.txt;report_####.xml;[a-c]*.json")).unwrap())
    });
    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let full: Vec<String> = relative_paths(10_000)
        .iter()
        .map(|p| path::combine("/data/export", p))
        .collect();

    c.bench_function("strip_root", |b| {
        b.iter(|| {
            full.iter()
                .map(|p| path::strip_root(black_box(p), "/data/export").len())
                .sum::<usize>()
        })
    });
}

criterion_group!(benches, bench_filter, bench_normalize);
criterion_main!(benches);
