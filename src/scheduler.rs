//! Scheduler boundary: deferred execution of reaction dispatch.
//!
//! The contract is FIFO order plus non-reentrancy: a scheduled task runs
//! after the current synchronous segment completes, never inline in the
//! caller's stack. [`TaskQueue`] is the concrete single-threaded mechanism;
//! hosts with their own event loop can install any [`Scheduler`] instead.
//! The selection is per-thread, made once, and immutable afterwards.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

use crossbeam_queue::SegQueue;

use crate::error::InstallError;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Deferred-execution capability consumed by the deferred-value core.
pub trait Scheduler {
    /// Enqueue `task` to run after the current synchronous segment.
    ///
    /// Must preserve FIFO order across calls and must not invoke `task`
    /// inline.
    fn schedule(&self, task: Task);
}

struct QueueInner {
    tasks: SegQueue<Task>,
    draining: Cell<bool>,
}

/// FIFO task queue driven by [`TaskQueue::run_until_idle`].
///
/// Cloning yields another handle to the same queue. Tasks pushed while a
/// drain is in progress are picked up by the same drain, in push order.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Rc<QueueInner>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(QueueInner {
                tasks: SegQueue::new(),
                draining: Cell::new(false),
            }),
        }
    }

    /// Run queued tasks in FIFO order until the queue is empty.
    ///
    /// Reentrant calls (from inside a running task) return immediately; the
    /// outer drain picks up whatever that task scheduled.
    pub fn run_until_idle(&self) {
        if self.inner.draining.get() {
            return;
        }
        self.inner.draining.set(true);
        while let Some(task) = self.inner.tasks.pop() {
            task();
        }
        self.inner.draining.set(false);
    }

    /// Number of tasks currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Is the queue empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.tasks.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TaskQueue {
    #[inline]
    fn schedule(&self, task: Task) {
        self.inner.tasks.push(task);
    }
}

thread_local! {
    static INSTALLED: RefCell<Option<Rc<dyn Scheduler>>> = const { RefCell::new(None) };
    static DEFAULT: OnceCell<TaskQueue> = const { OnceCell::new() };
}

/// Select the scheduler for this thread. Errors if one was already selected,
/// including implicitly by a prior [`current`] call.
pub fn install(sched: Rc<dyn Scheduler>) -> Result<(), InstallError> {
    INSTALLED.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(InstallError);
        }
        *slot = Some(sched);
        Ok(())
    })
}

/// The scheduler in effect on this thread. Selects the thread's default
/// [`TaskQueue`] on first use if none was installed.
pub fn current() -> Rc<dyn Scheduler> {
    INSTALLED.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.get_or_insert_with(|| Rc::new(default_queue()) as Rc<dyn Scheduler>)
            .clone()
    })
}

/// The thread's default [`TaskQueue`], shared by every deferred value
/// constructed without an explicit scheduler.
pub fn default_queue() -> TaskQueue {
    DEFAULT.with(|cell| cell.get_or_init(TaskQueue::new).clone())
}

/// Drain the thread's default queue. Hosts with an installed scheduler
/// drive their own mechanism instead.
pub fn run_until_idle() {
    default_queue().run_until_idle();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn fifo_order_preserved() {
        let q = TaskQueue::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for i in 0..4 {
            let seen = seen.clone();
            q.schedule(Box::new(move || seen.borrow_mut().push(i)));
        }
        q.run_until_idle();
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn tasks_scheduled_mid_drain_run_in_same_drain() {
        let q = TaskQueue::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (q2, seen2) = (q.clone(), seen.clone());
        q.schedule(Box::new(move || {
            seen2.borrow_mut().push("outer");
            let seen3 = seen2.clone();
            q2.schedule(Box::new(move || seen3.borrow_mut().push("inner")));
        }));
        q.run_until_idle();
        assert_eq!(*seen.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn reentrant_drain_returns_immediately() {
        let q = TaskQueue::new();
        let hits = Rc::new(Cell::new(0u32));
        let (q2, hits2) = (q.clone(), hits.clone());
        q.schedule(Box::new(move || {
            let hits3 = hits2.clone();
            q2.schedule(Box::new(move || hits3.set(hits3.get() + 1)));
            // Must not run the just-scheduled task inline.
            q2.run_until_idle();
            assert_eq!(hits2.get(), 0);
        }));
        q.run_until_idle();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn second_install_is_rejected() {
        // Fresh thread so the per-test thread-local state is untouched.
        std::thread::spawn(|| {
            assert!(install(Rc::new(TaskQueue::new())).is_ok());
            assert_eq!(install(Rc::new(TaskQueue::new())), Err(InstallError));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn current_defaults_then_locks_selection() {
        std::thread::spawn(|| {
            let _ = current();
            assert_eq!(install(Rc::new(TaskQueue::new())), Err(InstallError));
        })
        .join()
        .unwrap();
    }
}
