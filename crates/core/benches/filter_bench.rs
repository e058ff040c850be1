use codesieve_core::{evaluate, filter_corpus, CodeRecord, FilterConfig};
use codesieve_filters::CommentRatio;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::Map;

fn record(i: usize) -> CodeRecord {
    let content = format!(
        "# helper {i}\ndef f_{i}(x):\n    \"\"\"Return x plus {i}.\"\"\"\n    return x + {i}\n"
    );
    CodeRecord {
        size: Some(content.len() as u64),
        content,
        language: "Python".to_string(),
        max_line_length: 40,
        avg_line_length: 20.0,
        alphanum_fraction: 0.6,
        max_stars_count: if i % 3 == 0 { None } else { Some(i as i64) },
        extra: Map::new(),
        position: i,
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let config = FilterConfig::default();
    let oracle = CommentRatio::new();
    let sample = record(7);

    group.throughput(Throughput::Elements(1));
    group.bench_function("single_record", |b| {
        b.iter(|| black_box(evaluate(black_box(&sample), &config, &oracle)));
    });

    group.finish();
}

fn bench_filter_corpus(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_corpus");
    let oracle = CommentRatio::new();
    let corpus: Vec<CodeRecord> = (0..10_000).map(record).collect();

    for workers in [1, 4] {
        let config = FilterConfig {
            num_workers: workers,
            ..Default::default()
        };
        group.throughput(Throughput::Elements(corpus.len() as u64));
        group.bench_function(format!("10k_{}_workers", workers), |b| {
            b.iter(|| black_box(filter_corpus(corpus.clone(), &config, &oracle, None).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_filter_corpus);
criterion_main!(benches);
