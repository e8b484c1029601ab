//! Flush planning and reconciliation cost against an in-memory table

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use sheet_sync::{Coord, EditableRange, MemoryTable, RemoteError, SyncEngine};
use std::time::Duration;

fn grid(rows: usize) -> Vec<Vec<String>> {
    (0..rows)
        .map(|r| {
            let mut row = vec![format!("w{}", r)];
            row.extend((0..4).map(|c| format!("{}", r * 4 + c)));
            row
        })
        .collect()
}

fn engine(rows: usize) -> SyncEngine<MemoryTable> {
    SyncEngine::with_snapshot(MemoryTable::with_rows(grid(rows)), EditableRange::default(), grid(rows))
}

fn bench_flush_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("FlushUpdates");
    group.measurement_time(Duration::from_secs(5));

    for edits in [10, 100, 1_000] {
        group.throughput(Throughput::Elements(edits as u64));
        group.bench_with_input(BenchmarkId::from_parameter(edits), &edits, |b, &edits| {
            b.iter_batched(
                || {
                    let engine = engine(edits);
                    for row in 0..edits {
                        engine.update_cell(Coord::new(row, 1 + row % 4), "8").unwrap();
                    }
                    engine
                },
                |engine| black_box(engine.flush()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_flush_appends(c: &mut Criterion) {
    let mut group = c.benchmark_group("FlushAppends");
    group.measurement_time(Duration::from_secs(5));

    for rows in [10, 100, 1_000] {
        group.throughput(Throughput::Elements((rows * 4) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter_batched(
                || {
                    let engine = engine(100);
                    for _ in 0..rows {
                        engine.append_row([(1, "8"), (2, "7.5"), (3, "8"), (4, "6")]).unwrap();
                    }
                    engine
                },
                |engine| black_box(engine.flush()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

/// Every call fails, so each flush walks the whole batch and requeues it.
fn bench_flush_all_failing(c: &mut Criterion) {
    let mut group = c.benchmark_group("FlushAllFailing");
    group.measurement_time(Duration::from_secs(5));

    let edits = 500;
    group.throughput(Throughput::Elements(edits as u64));
    group.bench_function("requeue", |b| {
        let engine = engine(edits);
        for row in 0..edits {
            let coord = Coord::new(row, 2);
            engine.update_cell(coord, "x").unwrap();
            engine.remote().fail_at(coord, RemoteError::RateLimited);
        }
        b.iter(|| {
            engine.remote().clear_calls();
            black_box(engine.flush())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_flush_updates, bench_flush_appends, bench_flush_all_failing);
criterion_main!(benches);
