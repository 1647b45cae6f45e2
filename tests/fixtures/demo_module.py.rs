// <auto-generated/>
// Generated by snakebind from `demo_module.py`. Do not edit.

#[allow(non_snake_case, dead_code, unused_imports, clippy::all)]
pub mod demo_module {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use ::snakebind::runtime::{Bytes, Environment, ModuleHandle, Pairs, RuntimeError, ToValue, Value};

    /// Typed interface to the Python module `demo_module`, mounted at `bindings::demo_module`.
    pub trait IDemoModule: Send + Sync {
        /// Calls `add_numbers(a: int, b: int = 2) -> int`.
        ///
        /// Passing `None` leaves an argument to its Python default:
        /// - `b` defaults to `2`
        fn AddNumbers(&self, a: i64, b: Option<i64>) -> Result<i64, RuntimeError>;

        /// Calls `greet(name: str, *, shout: bool = False) -> str`.
        ///
        /// Passing `None` leaves an argument to its Python default:
        /// - `shout` defaults to `False`
        fn Greet(&self, name: String, shout: Option<bool>) -> Result<String, RuntimeError>;

        /// Calls `fail(message: str) -> None`.
        fn Fail(&self, message: String) -> Result<(), RuntimeError>;

        /// Calls `echo(value: Any) -> Any`.
        fn Echo(&self, value: Value) -> Result<Value, RuntimeError>;

        /// Releases the module. Later calls fail with `RuntimeError::Disposed`.
        fn dispose(&self) -> Result<(), RuntimeError>;
    }

    /// Access to the shared `demo_module` wrapper.
    pub trait DemoModuleExt {
        fn DemoModule(&self) -> Arc<dyn IDemoModule>;
    }

    impl DemoModuleExt for Environment {
        fn DemoModule(&self) -> Arc<dyn IDemoModule> {
            self.wrapper("demo_module", DemoModuleInternal::new)
        }
    }

    struct DemoModuleInternal {
        module: ModuleHandle,
    }

    impl DemoModuleInternal {
        fn new(module: ModuleHandle) -> Self {
            Self { module }
        }
    }

    impl IDemoModule for DemoModuleInternal {
        fn AddNumbers(&self, a: i64, b: Option<i64>) -> Result<i64, RuntimeError> {
            self.module.call("add_numbers", |call| {
                call.positional("a", Some(a.to_value()));
                call.positional("b", b.map(ToValue::to_value));
            })
        }

        fn Greet(&self, name: String, shout: Option<bool>) -> Result<String, RuntimeError> {
            self.module.call("greet", |call| {
                call.positional("name", Some(name.to_value()));
                call.keyword("shout", shout.map(ToValue::to_value));
            })
        }

        fn Fail(&self, message: String) -> Result<(), RuntimeError> {
            self.module.call("fail", |call| {
                call.positional("message", Some(message.to_value()));
            })
        }

        fn Echo(&self, value: Value) -> Result<Value, RuntimeError> {
            self.module.call("echo", |call| {
                call.positional("value", Some(value));
            })
        }

        fn dispose(&self) -> Result<(), RuntimeError> {
            self.module.dispose()
        }
    }
}
