#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Deferred-value primitive with: write-once settlement, per-registration
//! downstream fan-out, scheduled (never inline) reaction dispatch, thenable
//! adoption, and an injected FIFO scheduler. Single-threaded cooperative;
//! no atomics and no cross-thread machinery.

mod deferred;
mod diag;
mod error;
pub mod scheduler;
mod value;

pub use deferred::{Deferred, Settler, Status};
pub use diag::set_rejection_hook;
pub use error::{CycleError, InstallError};
pub use scheduler::{Scheduler, Task, TaskQueue};
pub use value::{Callback, Outcome, Payload, SettleFn, Thenable, Value};

/// Common imports for consumers and tests.
pub mod prelude {
    pub use crate::deferred::{Deferred, Settler, Status};
    pub use crate::error::CycleError;
    pub use crate::scheduler::{Scheduler, TaskQueue};
    pub use crate::value::{Outcome, Thenable, Value};
}
