use std::rc::Rc;

use deferral::prelude::*;

fn main() {
    let q = TaskQueue::new();
    let sched: Rc<dyn Scheduler> = Rc::new(q.clone());

    // Settle from inside the executor; the chain callback runs on the next
    // turn, never inline.
    let d = Deferred::with_scheduler(sched.clone(), |settler| {
        settler.resolve(Value::of(42u32));
        Ok(())
    });
    let doubled = d.chain(
        Some(Box::new(|v| {
            let n = v.downcast_ref::<u32>().copied().unwrap();
            Ok(Value::of(n * 2))
        })),
        None,
    );

    // Settle from outside the executor via an escaped settler.
    let (greeting, settler) = Deferred::open_on(sched);
    let upper = greeting.chain(
        Some(Box::new(|v| {
            let s = v.downcast_ref::<String>().cloned().unwrap();
            Ok(Value::of(s.to_uppercase()))
        })),
        None,
    );
    settler.resolve(Value::of("hello".to_string()));

    q.run_until_idle();

    let out = doubled.settlement().unwrap().unwrap();
    assert_eq!(out.downcast_ref::<u32>(), Some(&84));
    let out = upper.settlement().unwrap().unwrap();
    assert_eq!(out.downcast_ref::<String>().unwrap(), "HELLO");
    println!("doubled=84 upper=HELLO");
}
