use std::rc::Rc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use deferral::prelude::*;

fn bench_settle_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle_dispatch");
    group.measurement_time(Duration::from_secs(5));

    // 1. Benchmark: settle + one reaction, full turn.
    group.bench_function("single_reaction_turn", |b| {
        let q = TaskQueue::new();
        let sched: Rc<dyn Scheduler> = Rc::new(q.clone());
        b.iter(|| {
            let d = Deferred::with_scheduler(sched.clone(), |s| {
                s.resolve(Value::of(1u64));
                Ok(())
            });
            let down = d.chain(Some(Box::new(Ok)), None);
            q.run_until_idle();
            std::hint::black_box(down.status());
        });
    });

    // 2. Benchmark: fan-out width sweep.
    for width in [1usize, 4, 16, 64] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("fan_out", width), &width, |b, &width| {
            let q = TaskQueue::new();
            let sched: Rc<dyn Scheduler> = Rc::new(q.clone());
            b.iter(|| {
                let d = Deferred::with_scheduler(sched.clone(), |s| {
                    s.resolve(Value::of(0u64));
                    Ok(())
                });
                let downs: Vec<_> = (0..width)
                    .map(|_| d.chain(Some(Box::new(Ok)), None))
                    .collect();
                q.run_until_idle();
                std::hint::black_box(downs.len());
            });
        });
    }

    group.finish();
}

fn bench_chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_depth");

    for depth in [8usize, 64, 512] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("links", depth), &depth, |b, &depth| {
            let q = TaskQueue::new();
            let sched: Rc<dyn Scheduler> = Rc::new(q.clone());
            b.iter(|| {
                let (head, settler) = Deferred::open_on(sched.clone());
                let mut tail = head;
                for _ in 0..depth {
                    tail = tail.chain(Some(Box::new(Ok)), None);
                }
                settler.resolve(Value::of(1u64));
                q.run_until_idle();
                std::hint::black_box(tail.status());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_settle_dispatch, bench_chain_depth);
criterion_main!(benches);
