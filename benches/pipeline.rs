use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};

#[path = "../tests/support/mod.rs"]
mod support;

use f1db::config::default_pipeline;
use f1db::context::{SessionContext, Verbosity};
use f1db::extensions::ExtensionRegistry;
use f1db::pipeline::Pipeline;
use f1db::rebuild::rebuild_database;
use f1db::Store;

use support::{fixture_config, fixture_ctx, write_generated_season};

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    let tmp = tempfile::tempdir().expect("tempdir");
    let ctx = fixture_ctx(tmp.path());

    group.bench_function("fixture_full_rebuild", |b| {
        b.iter(|| rebuild_database(&ctx).expect("rebuild"));
    });

    // Pipeline only, over an already-loaded store
    rebuild_database(&ctx).expect("rebuild");
    let store = Store::open(&ctx).expect("open");
    let pipeline = Pipeline::new(default_pipeline()).expect("pipeline");
    group.bench_function("fixture_pipeline_rerun", |b| {
        b.iter(|| pipeline.run(&store).expect("pipeline run"));
    });
    group.finish();
}

// Derived tables over generated seasons; time should grow with the row count.
fn bench_generated_seasons(c: &mut Criterion) {
    let mut group = c.benchmark_group("generated_seasons");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);

    for races in [10usize, 40usize] {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut cfg = fixture_config(tmp.path());
        cfg.csv_dir = write_generated_season(tmp.path(), races, 20, 60);
        let ctx = SessionContext::new(cfg, Verbosity::Quiet);
        rebuild_database(&ctx).expect("rebuild");
        let store = Store::open(&ctx).expect("open");
        let pipeline = Pipeline::new(default_pipeline()).expect("pipeline");
        let laps = store.row_count("lap_times").expect("count");

        group.throughput(Throughput::Elements(laps as u64));
        group.bench_with_input(BenchmarkId::new("pipeline_rerun", races.to_string()), &races, |b, _| {
            b.iter(|| pipeline.run(&store).expect("pipeline run"));
        });
    }
    group.finish();
}

fn bench_aggregates(c: &mut Criterion) {
    let ns = [1_000usize, 100_000usize];
    let mut group = c.benchmark_group("aggregates");
    let tmp = tempfile::tempdir().expect("tempdir");
    let ctx = fixture_ctx(tmp.path());
    let conn = rusqlite::Connection::open_in_memory().expect("conn");
    let store = Store::with_connection(&ctx, conn, &ExtensionRegistry::builtin()).expect("store");

    for &n in &ns {
        let sql = format!(
            "WITH RECURSIVE seq(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM seq WHERE x < {n}) \
             SELECT STDEV(x), STDEV_POP(x), SQRT(AVG(POWER(x, 2))) FROM seq"
        );
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("stdev_over_series", n.to_string()), &n, |b, _| {
            b.iter(|| store.query(&sql).expect("query"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_generated_seasons, bench_aggregates);
criterion_main!(benches);
