use bindery::query_builder::{bind_fragment, placeholder_list, Builder, Dialect, Param, Value};
use bindery::{args, dynamic_where};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// col0 = ? AND col1 = ? ...
fn fragment_with_markers(n: usize) -> String {
    (0..n)
        .map(|i| format!("col{} = ?", i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn bench_bind_fragment(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/bind_fragment");

    for n in [1, 5, 10, 50, 100] {
        let fragment = fragment_with_markers(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &fragment, |b, fragment| {
            b.iter(|| {
                let mut counter = 0;
                black_box(bind_fragment(fragment, n, Dialect::Postgres, &mut counter));
            });
        });
    }

    group.finish();
}

fn bench_dynamic_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/dynamic_where");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let builder = dynamic_where(
                    "SELECT * FROM t",
                    || (0..n).map(|i| Param::new(format!("col{}", i), i as i64)),
                    Dialect::Postgres,
                )
                .expect("Success building SQL");
                black_box(builder.into_parts());
            });
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<Value> = (0..n).map(Value::from).collect();
        group.bench_with_input(BenchmarkId::new("append_in", n), &values, |b, values| {
            b.iter(|| {
                let mut builder = Builder::new(Dialect::Postgres, "SELECT * FROM t WHERE", args![])
                    .expect("Success building SQL");
                builder
                    .append_in("id", values.iter().cloned())
                    .expect("Success building SQL");
                black_box(builder.sql().len());
            });
        });
        group.bench_with_input(BenchmarkId::new("placeholder_list", n), &n, |b, &n| {
            b.iter(|| black_box(placeholder_list(n as usize, Dialect::Postgres)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bind_fragment, bench_dynamic_where, bench_in_list);
criterion_main!(benches);
