//! The deferred-value state machine and its reaction registry.
//!
//! One entity, [`Deferred`]: a write-once container that settles exactly
//! once (Pending -> Fulfilled or Pending -> Rejected) and dispatches its
//! registered reactions through the scheduler boundary, never inline.
//! Each `chain` call owns a fresh downstream, so N consumers fan out into
//! N independent settlements.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::diag;
use crate::error::CycleError;
use crate::scheduler::{self, Scheduler};
use crate::value::{Callback, Outcome, SettleFn, Thenable, Value};

/// Settlement state. Write-once: leaves `Pending` at most once and never
/// transitions again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a rejection reason.
    Rejected,
}

/// One registration, drained exactly once by a scheduled dispatch pass.
enum Reaction {
    /// A `chain` call: optional callbacks plus the downstream they settle.
    Chain {
        on_fulfilled: Option<Callback>,
        on_reject: Option<Callback>,
        downstream: Deferred,
    },
    /// A thenable-adoption subscription: callbacks only, no downstream.
    Subscribe {
        on_fulfilled: SettleFn,
        on_reject: SettleFn,
    },
}

struct Inner {
    status: Status,
    payload: Option<Value>,
    // Registration order is dispatch order. Inline capacity covers the
    // common one- or two-consumer case without a heap hit.
    reactions: SmallVec<[Reaction; 2]>,
    // True once any reaction was ever registered; gates the
    // unhandled-rejection report.
    saw_reaction: bool,
    reported: bool,
    sched: Rc<dyn Scheduler>,
}

/// A deferred value: the eventual result of an asynchronous operation.
///
/// Cloning yields another handle to the same underlying state.
#[derive(Clone)]
pub struct Deferred {
    inner: Rc<RefCell<Inner>>,
}

/// Settlement capability bound to one [`Deferred`].
///
/// Valid in any later invocation context; holding one past the executor's
/// return is the normal way asynchronous producers settle.
#[derive(Clone)]
pub struct Settler {
    target: Deferred,
}

impl Settler {
    /// Fulfill the target with `value`, or begin adoption if `value` is a
    /// thenable. No-op once the target has settled.
    #[inline]
    pub fn resolve(&self, value: Value) {
        self.target.resolve(value);
    }

    /// Reject the target with `reason`. Never inspects `reason` for
    /// thenable-ness. No-op once the target has settled.
    #[inline]
    pub fn reject(&self, reason: Value) {
        self.target.reject(reason);
    }
}

impl Deferred {
    fn pending_on(sched: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                status: Status::Pending,
                payload: None,
                reactions: SmallVec::new(),
                saw_reaction: false,
                reported: false,
                sched,
            })),
        }
    }

    /// Construct on the thread's current scheduler and run `executor`
    /// synchronously. `Err` from the executor rejects the instance exactly
    /// as an explicit [`Settler::reject`] would.
    pub fn new(executor: impl FnOnce(Settler) -> Result<(), Value>) -> Self {
        Self::with_scheduler(scheduler::current(), executor)
    }

    /// Construct on an explicit scheduler; see [`Deferred::new`].
    pub fn with_scheduler(
        sched: Rc<dyn Scheduler>,
        executor: impl FnOnce(Settler) -> Result<(), Value>,
    ) -> Self {
        let deferred = Self::pending_on(sched);
        let settler = Settler {
            target: deferred.clone(),
        };
        if let Err(reason) = executor(settler) {
            deferred.reject(reason);
        }
        deferred
    }

    /// A pending instance paired with its settlement capability, on the
    /// thread's current scheduler.
    pub fn open() -> (Self, Settler) {
        Self::open_on(scheduler::current())
    }

    /// A pending instance paired with its settlement capability.
    pub fn open_on(sched: Rc<dyn Scheduler>) -> (Self, Settler) {
        let deferred = Self::pending_on(sched);
        let settler = Settler {
            target: deferred.clone(),
        };
        (deferred, settler)
    }

    /// An already-fulfilled instance. Reactions still dispatch
    /// asynchronously.
    pub fn fulfilled(value: Value) -> Self {
        let deferred = Self::pending_on(scheduler::current());
        deferred.resolve(value);
        deferred
    }

    /// An already-rejected instance. Reactions still dispatch
    /// asynchronously; with none registered, the rejection is reported to
    /// the diagnostic sink when its dispatch runs.
    pub fn rejected(reason: Value) -> Self {
        let deferred = Self::pending_on(scheduler::current());
        deferred.reject(reason);
        deferred
    }

    /// Current settlement state.
    #[inline]
    pub fn status(&self) -> Status {
        self.inner.borrow().status
    }

    /// The settled payload, if any: `Ok` when fulfilled, `Err` when
    /// rejected, `None` while pending.
    pub fn settlement(&self) -> Option<Outcome> {
        let inner = self.inner.borrow();
        inner.payload.clone().map(|payload| match inner.status {
            Status::Rejected => Err(payload),
            _ => Ok(payload),
        })
    }

    /// Register follow-up callbacks; returns the fresh downstream that this
    /// registration exclusively settles.
    ///
    /// Always synchronous and non-blocking. An absent callback passes the
    /// payload through unchanged with the matching settlement. Callbacks
    /// never run inline here, even when the instance is already settled: a
    /// dispatch is scheduled instead so ordering against other pending work
    /// is preserved.
    pub fn chain(&self, on_fulfilled: Option<Callback>, on_reject: Option<Callback>) -> Deferred {
        let downstream = Self::pending_on(self.scheduler());
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.saw_reaction = true;
            inner.reactions.push(Reaction::Chain {
                on_fulfilled,
                on_reject,
                downstream: downstream.clone(),
            });
            inner.status != Status::Pending
        };
        if settled {
            self.schedule_dispatch();
        }
        downstream
    }

    fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.inner.borrow().sched.clone()
    }

    fn schedule_dispatch(&self) {
        let sched = self.scheduler();
        let this = self.clone();
        sched.schedule(Box::new(move || this.dispatch()));
    }

    /// Raw state address; identity for cycle detection.
    #[inline]
    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }

    fn resolve(&self, value: Value) {
        if self.status() != Status::Pending {
            return;
        }
        if let Value::Thenable(source) = value {
            self.adopt(source);
            return;
        }
        self.settle(Status::Fulfilled, value);
    }

    fn reject(&self, reason: Value) {
        self.settle(Status::Rejected, reason);
    }

    /// Adopt `source`: defer this instance's settlement until the adopted
    /// value settles, then take its terminal value/error as our own. The
    /// first inner callback to fire wins; write-once absorbs the rest.
    /// Transitive adoption recurses through `resolve`, one scheduled
    /// settlement at a time, so the stack does not grow with chain length.
    fn adopt(&self, source: Rc<dyn Thenable>) {
        let settler = Settler {
            target: self.clone(),
        };
        let inner_resolve = {
            let settler = settler.clone();
            Box::new(move |value| settler.resolve(value))
        };
        let inner_reject = Box::new(move |reason| settler.reject(reason));
        source.subscribe(inner_resolve, inner_reject);
    }

    fn settle(&self, status: Status, payload: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.status != Status::Pending {
                return;
            }
            inner.status = status;
            inner.payload = Some(payload);
        }
        self.schedule_dispatch();
    }

    /// Drain and run the reactions present when this pass begins.
    ///
    /// Reactions registered during or after the pass were captured by their
    /// own scheduled dispatch and are not touched here. Runs only from
    /// scheduled tasks; no borrow is held while callbacks execute, so
    /// callbacks may freely re-enter `chain` on this same instance.
    fn dispatch(&self) {
        let (status, payload, batch, report) = {
            let mut inner = self.inner.borrow_mut();
            let Some(payload) = inner.payload.clone() else {
                debug_assert!(false, "dispatch on a pending instance");
                return;
            };
            let status = inner.status;
            let batch: SmallVec<[Reaction; 2]> = inner.reactions.drain(..).collect();
            let report = batch.is_empty()
                && status == Status::Rejected
                && !inner.saw_reaction
                && !inner.reported;
            if report {
                inner.reported = true;
            }
            (status, payload, batch, report)
        };

        if report {
            diag::report_unhandled(&payload);
            return;
        }

        for reaction in batch {
            match reaction {
                Reaction::Subscribe {
                    on_fulfilled,
                    on_reject,
                } => match status {
                    Status::Fulfilled => on_fulfilled(payload.clone()),
                    _ => on_reject(payload.clone()),
                },
                Reaction::Chain {
                    on_fulfilled,
                    on_reject,
                    downstream,
                } => {
                    let callback = match status {
                        Status::Fulfilled => on_fulfilled,
                        _ => on_reject,
                    };
                    match callback {
                        // Absent callback: propagate unchanged, matching
                        // settlement kind.
                        None => match status {
                            Status::Fulfilled => downstream.resolve(payload.clone()),
                            _ => downstream.reject(payload.clone()),
                        },
                        Some(callback) => match callback(payload.clone()) {
                            Err(reason) => downstream.reject(reason),
                            Ok(value) => {
                                if let Value::Thenable(source) = &value {
                                    if source.state_ptr() == downstream.addr() {
                                        downstream.reject(Value::of(CycleError));
                                        continue;
                                    }
                                }
                                downstream.resolve(value);
                            }
                        },
                    }
                }
            }
        }
    }
}

impl Thenable for Deferred {
    fn subscribe(&self, on_fulfilled: SettleFn, on_reject: SettleFn) {
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.saw_reaction = true;
            inner.reactions.push(Reaction::Subscribe {
                on_fulfilled,
                on_reject,
            });
            inner.status != Status::Pending
        };
        if settled {
            self.schedule_dispatch();
        }
    }

    fn state_ptr(&self) -> *const () {
        self.addr()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Deferred")
            .field("status", &inner.status)
            .field("payload", &inner.payload)
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}
