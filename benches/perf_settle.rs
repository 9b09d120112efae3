use std::env;
use std::rc::Rc;
use std::time::Instant;

use deferral::prelude::*;

#[inline(never)]
fn touch<T: Copy>(v: T) {
    std::hint::black_box(v);
}

fn main() {
    let iterations: usize = env::var("ITER")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50_000);

    let q = TaskQueue::new();
    let sched: Rc<dyn Scheduler> = Rc::new(q.clone());

    // Warmup to stabilize allocator state.
    for _ in 0..(iterations / 10).max(1) {
        let d = Deferred::with_scheduler(sched.clone(), |s| {
            s.resolve(Value::of(1u64));
            Ok(())
        });
        let _down = d.chain(Some(Box::new(Ok)), None);
        q.run_until_idle();
    }

    let start = Instant::now();
    let mut fulfilled = 0usize;
    for _ in 0..iterations {
        let d = Deferred::with_scheduler(sched.clone(), |s| {
            s.resolve(Value::of(1u64));
            Ok(())
        });
        let down = d.chain(Some(Box::new(Ok)), None);
        q.run_until_idle();
        if down.status() == Status::Fulfilled {
            fulfilled += 1;
        }
    }
    let elapsed = start.elapsed();

    touch(fulfilled);
    println!(
        "settle_turns={fulfilled} elapsed={elapsed:?} per_turn={:?}",
        elapsed / iterations as u32
    );
}
