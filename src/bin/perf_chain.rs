use std::env;
use std::rc::Rc;

use deferral::prelude::*;

fn main() {
    let iterations: usize = env::var("ITER")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50_000);

    let q = TaskQueue::new();
    let sched: Rc<dyn Scheduler> = Rc::new(q.clone());

    let mut sum = 0u64;
    for i in 0..iterations {
        let d = Deferred::with_scheduler(sched.clone(), move |s| {
            s.resolve(Value::of(i as u64));
            Ok(())
        });
        let down = d.chain(
            Some(Box::new(|v| {
                Ok(Value::of(v.downcast_ref::<u64>().copied().unwrap() + 1))
            })),
            None,
        );
        q.run_until_idle();
        if let Some(Ok(v)) = down.settlement() {
            sum += v.downcast_ref::<u64>().copied().unwrap();
        }
    }

    println!("chain_sum={sum}");
}
