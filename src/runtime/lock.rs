use std::sync::{Arc, Mutex, MutexGuard};

/// The process-wide section only one thread may execute Python code in.
///
/// Cloning shares the section. Every module handle created from the same
/// `Environment` holds a clone, so calls across modules are serialized too.
#[derive(Debug, Clone, Default)]
pub struct RuntimeLock(Arc<Mutex<()>>);

impl RuntimeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the section is free. There is no timeout.
    pub fn acquire(&self) -> Section<'_> {
        // The mutex guards no data, so a panic in another holder leaves
        // nothing inconsistent behind.
        let guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Section { _guard: guard }
    }

    pub fn same_section(&self, other: &RuntimeLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Proof that the current thread holds the runtime section.
///
/// `Runtime` methods take one, so backend code can't run outside the section.
#[derive(Debug)]
pub struct Section<'a> {
    _guard: MutexGuard<'a, ()>,
}
