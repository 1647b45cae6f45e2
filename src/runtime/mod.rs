//! Library the generated bindings call into.
//!
//! Generated code only sees `Environment`, `ModuleHandle` and the marshaling
//! traits. The interpreter itself sits behind the `Runtime` trait so the
//! lifecycle and locking rules can be exercised without one.

mod args;
mod environment;
mod error;
mod lock;
mod marshal;
mod module;
#[cfg(feature = "python")]
pub mod python;
mod value;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use args::{Arguments, CallArgs};
pub use environment::Environment;
pub use error::RuntimeError;
pub use lock::{RuntimeLock, Section};
pub use marshal::{Bytes, FromValue, Pairs, ToValue};
pub use module::{LifecycleState, ModuleHandle};
pub use value::{OpaqueObject, Value};

/// An embedded interpreter.
///
/// Every method takes the `Section` of the lock the caller holds, so an
/// implementation never runs outside it.
pub trait Runtime: Send + Sync {
    fn import(&self, section: &Section<'_>, module: &str) -> Result<ModuleRef, RuntimeError>;

    fn invoke(
        &self,
        section: &Section<'_>,
        module: &ModuleRef,
        function: &str,
        args: Arguments,
    ) -> Result<Value, RuntimeError>;

    /// Drops the runtime's reference to an imported module.
    fn release(&self, section: &Section<'_>, module: ModuleRef);
}

/// Opaque handle to an imported module, owned by the runtime that made it.
#[derive(Clone)]
pub struct ModuleRef(Arc<dyn Any + Send + Sync>);

impl ModuleRef {
    pub fn new<T: Any + Send + Sync>(handle: T) -> Self {
        ModuleRef(Arc::new(handle))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleRef({:p})", Arc::as_ptr(&self.0))
    }
}
