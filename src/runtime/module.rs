use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use super::args::CallArgs;
use super::error::RuntimeError;
use super::lock::RuntimeLock;
use super::marshal::FromValue;
use super::{ModuleRef, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unimported,
    Imported,
    Disposed,
}

enum ModuleState {
    Unimported,
    Imported(ModuleRef),
    Disposed,
}

impl ModuleState {
    fn lifecycle(&self) -> LifecycleState {
        match self {
            ModuleState::Unimported => LifecycleState::Unimported,
            ModuleState::Imported(_) => LifecycleState::Imported,
            ModuleState::Disposed => LifecycleState::Disposed,
        }
    }
}

/// One Python module as seen by a generated wrapper.
///
/// The module is imported on first call and kept until `dispose`. Every
/// transition and every call runs inside the runtime section, so an import
/// can never race a disposal.
pub struct ModuleHandle {
    name: String,
    runtime: Arc<dyn Runtime>,
    lock: RuntimeLock,
    state: Mutex<ModuleState>,
}

impl ModuleHandle {
    pub fn new(name: impl Into<String>, runtime: Arc<dyn Runtime>, lock: RuntimeLock) -> Self {
        Self {
            name: name.into(),
            runtime,
            lock,
            state: Mutex::new(ModuleState::Unimported),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.lock_state().lifecycle()
    }

    /// Calls `function` with the arguments `marshal` adds, converting the
    /// result to `R`.
    pub fn call<R: FromValue>(
        &self,
        function: &str,
        marshal: impl FnOnce(&mut CallArgs),
    ) -> Result<R, RuntimeError> {
        let section = self.lock.acquire();
        let mut state = self.lock_state();

        let imported = match &*state {
            ModuleState::Disposed => {
                return Err(RuntimeError::Disposed {
                    module: self.name.clone(),
                });
            }
            ModuleState::Imported(module) => Some(module.clone()),
            ModuleState::Unimported => None,
        };
        let module = match imported {
            Some(module) => module,
            None => {
                info!(module = %self.name, "importing module");
                let module = self.runtime.import(&section, &self.name)?;
                *state = ModuleState::Imported(module.clone());
                module
            }
        };
        drop(state);

        let mut call = CallArgs::new();
        marshal(&mut call);
        let args = call.finish()?;

        debug!(module = %self.name, function, "invoking");
        let result = self.runtime.invoke(&section, &module, function, args)?;
        R::from_value(result)
    }

    /// Releases the module. Later calls fail with `RuntimeError::Disposed`.
    pub fn dispose(&self) -> Result<(), RuntimeError> {
        let section = self.lock.acquire();
        let mut state = self.lock_state();

        match std::mem::replace(&mut *state, ModuleState::Disposed) {
            ModuleState::Imported(module) => {
                info!(module = %self.name, "disposing module");
                self.runtime.release(&section, module);
            }
            ModuleState::Unimported => debug!(module = %self.name, "disposed before import"),
            ModuleState::Disposed => {}
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, ModuleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
