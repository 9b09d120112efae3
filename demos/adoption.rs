use std::rc::Rc;

use deferral::prelude::*;

fn main() {
    let q = TaskQueue::new();
    let sched: Rc<dyn Scheduler> = Rc::new(q.clone());

    // An outer value that adopts an inner one: the outer stays pending until
    // the inner settles, then takes its terminal value as its own.
    let (inner, inner_settler) = Deferred::open_on(sched.clone());
    let outer = Deferred::with_scheduler(sched, |settler| {
        settler.resolve(Value::adopting(inner));
        Ok(())
    });
    let report = outer.chain(
        Some(Box::new(|v| {
            println!("outer settled with {v:?}");
            Ok(v)
        })),
        None,
    );

    q.run_until_idle();
    assert_eq!(outer.status(), Status::Pending);

    inner_settler.resolve(Value::of("done"));
    q.run_until_idle();
    assert_eq!(report.status(), Status::Fulfilled);
}
