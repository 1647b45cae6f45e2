use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::Runtime;
use super::lock::RuntimeLock;
use super::module::ModuleHandle;

type Wrapper = Arc<dyn Any + Send + Sync>;

/// Entry point for generated bindings.
///
/// Owns the runtime and the section every call runs in, and hands out one
/// wrapper per module for its whole lifetime. The generated `<Module>Ext`
/// traits are implemented on this type.
pub struct Environment {
    runtime: Arc<dyn Runtime>,
    lock: RuntimeLock,
    wrappers: Mutex<HashMap<String, Wrapper>>,
}

impl Environment {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self::with_lock(runtime, RuntimeLock::new())
    }

    /// Shares an existing section, e.g. with another environment over the
    /// same interpreter.
    pub fn with_lock(runtime: Arc<dyn Runtime>, lock: RuntimeLock) -> Self {
        Self {
            runtime,
            lock,
            wrappers: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock(&self) -> &RuntimeLock {
        &self.lock
    }

    /// A fresh, unimported handle for `module`.
    pub fn module(&self, module: &str) -> ModuleHandle {
        ModuleHandle::new(module, Arc::clone(&self.runtime), self.lock.clone())
    }

    /// The cached wrapper for `module`, built with `build` on first request.
    ///
    /// A wrapper stays cached after disposal, so every accessor keeps
    /// returning the same disposed instance.
    pub fn wrapper<W, F>(&self, module: &str, build: F) -> Arc<W>
    where
        W: Any + Send + Sync,
        F: FnOnce(ModuleHandle) -> W,
    {
        let mut wrappers = self
            .wrappers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let cached = wrappers
            .get(module)
            .and_then(|existing| Arc::clone(existing).downcast::<W>().ok());
        if let Some(wrapper) = cached {
            return wrapper;
        }

        let wrapper = Arc::new(build(self.module(module)));
        wrappers.insert(module.to_string(), wrapper.clone());
        wrapper
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}
