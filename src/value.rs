//! Dynamically shaped settlement payloads and the thenable contract.
//!
//! A settled payload has no static shape at this layer. `Value` carries
//! either plain data (any `Debug` type, downcastable by the consumer) or a
//! handle to another asynchronous source to adopt.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Data that can travel through a settlement: any type, `Debug` so the
/// diagnostic sink can render it.
pub trait Payload: Any + fmt::Debug {
    /// Upcast for downcasting by consumers.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug> Payload for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Result of a reaction callback: `Ok` continues the chain fulfilled,
/// `Err` rejects the downstream (the port of a thrown error).
pub type Outcome = Result<Value, Value>;

/// Reaction callback: consumes the upstream payload, produces an [`Outcome`].
pub type Callback = Box<dyn FnOnce(Value) -> Outcome>;

/// One-shot settlement callback handed to a thenable during adoption.
pub type SettleFn = Box<dyn FnOnce(Value)>;

/// An asynchronous source whose terminal settlement can be adopted.
///
/// [`crate::Deferred`] implements this, so the primitive interoperates with
/// any other implementation of the same contract.
pub trait Thenable {
    /// Register settlement callbacks. Whichever fires first wins; the
    /// one-shot callback types make repeated firing unrepresentable.
    fn subscribe(&self, on_fulfilled: SettleFn, on_reject: SettleFn);

    /// Stable address of the underlying state, used only for chaining-cycle
    /// detection. Foreign thenables may keep the null default; they can
    /// never be a reaction's own downstream.
    fn state_ptr(&self) -> *const () {
        std::ptr::null()
    }
}

/// A settlement payload: plain data or a thenable to adopt.
#[derive(Clone)]
pub enum Value {
    /// Plain data; terminal for resolution.
    Data(Rc<dyn Payload>),
    /// An asynchronous source; `resolve` adopts it instead of settling.
    Thenable(Rc<dyn Thenable>),
}

impl Value {
    /// Wrap plain data.
    #[inline]
    pub fn of<T: Any + fmt::Debug>(data: T) -> Self {
        Value::Data(Rc::new(data))
    }

    /// Wrap an asynchronous source for adoption.
    #[inline]
    pub fn adopting<T: Thenable + 'static>(source: T) -> Self {
        Value::Thenable(Rc::new(source))
    }

    /// Borrow the payload as `T`, if this is data of that type.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Data(data) => (**data).as_any().downcast_ref::<T>(),
            Value::Thenable(_) => None,
        }
    }

    /// Is this payload a thenable?
    #[inline]
    pub fn is_thenable(&self) -> bool {
        matches!(self, Value::Thenable(_))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => fmt::Debug::fmt(data, f),
            Value::Thenable(source) => write!(f, "<thenable {:p}>", source.state_ptr()),
        }
    }
}
