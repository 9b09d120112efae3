//! Unhandled-rejection diagnostics.
//!
//! A rejected value with no registered reaction at dispatch time is reported
//! through a per-thread hook. Observability only: the hook never alters
//! settlement, and a reaction registered later still receives the payload.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

type Hook = Rc<dyn Fn(&Value)>;

fn default_hook(reason: &Value) {
    tracing::warn!(?reason, "unhandled rejection");
}

thread_local! {
    static HOOK: RefCell<Hook> = RefCell::new(Rc::new(default_hook));
}

/// Replace this thread's unhandled-rejection hook. The default logs the
/// reason at `warn` level.
pub fn set_rejection_hook(hook: impl Fn(&Value) + 'static) {
    HOOK.with(|slot| *slot.borrow_mut() = Rc::new(hook));
}

pub(crate) fn report_unhandled(reason: &Value) {
    let hook = HOOK.with(|slot| slot.borrow().clone());
    hook(reason);
}
