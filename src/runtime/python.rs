//! `Runtime` backed by an embedded CPython via pyo3.

use std::path::PathBuf;

use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyFloat, PyFrozenSet, PyInt, PyList, PySet, PyString, PyTuple};

use super::{Arguments, ModuleRef, OpaqueObject, Runtime, RuntimeError, Section, Value};

/// Imports modules with the interpreter's normal import machinery.
#[derive(Debug, Default)]
pub struct PythonRuntime {
    search_path: Option<PathBuf>,
}

impl PythonRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends `path` to `sys.path` before each import.
    pub fn with_search_path(path: impl Into<PathBuf>) -> Self {
        Self {
            search_path: Some(path.into()),
        }
    }

    fn extend_path(&self, py: Python<'_>) -> PyResult<()> {
        let Some(path) = &self.search_path else {
            return Ok(());
        };
        let sys = PyModule::import(py, "sys")?;
        let sys_path = sys.getattr("path")?.downcast_into::<PyList>()?;
        let entry = path.to_string_lossy();
        if !sys_path.contains(entry.as_ref())? {
            sys_path.insert(0, entry.as_ref())?;
        }
        Ok(())
    }
}

impl Runtime for PythonRuntime {
    fn import(&self, _section: &Section<'_>, module: &str) -> Result<ModuleRef, RuntimeError> {
        Python::with_gil(|py| {
            self.extend_path(py)
                .and_then(|()| PyModule::import(py, module))
                .map(|imported| ModuleRef::new(imported.unbind()))
                .map_err(|err| RuntimeError::Import {
                    module: module.to_string(),
                    message: err.to_string(),
                })
        })
    }

    fn invoke(
        &self,
        _section: &Section<'_>,
        module: &ModuleRef,
        function: &str,
        args: Arguments,
    ) -> Result<Value, RuntimeError> {
        let Some(module) = module.downcast_ref::<Py<PyModule>>() else {
            return Err(RuntimeError::Invocation {
                function: function.to_string(),
                message: "module was not imported by this runtime".to_string(),
                traceback: None,
            });
        };

        Python::with_gil(|py| {
            let outcome = (|| -> PyResult<Value> {
                let callee = module.bind(py).getattr(function)?;
                let positional = args
                    .positional
                    .iter()
                    .map(|v| to_python(py, v))
                    .collect::<PyResult<Vec<_>>>()?;
                let positional = PyTuple::new(py, positional)?;
                let keywords = PyDict::new(py);
                for (name, value) in &args.keywords {
                    keywords.set_item(name, to_python(py, value)?)?;
                }
                let result = callee.call(positional, Some(&keywords))?;
                from_python(&result)
            })();

            outcome.map_err(|err| invocation_error(py, function, err))
        })
    }

    fn release(&self, _section: &Section<'_>, module: ModuleRef) {
        // Dropping the last `Py` reference needs the GIL to take effect now.
        Python::with_gil(|_py| drop(module));
    }
}

fn invocation_error(py: Python<'_>, function: &str, err: PyErr) -> RuntimeError {
    let traceback = err
        .traceback(py)
        .and_then(|tb| tb.format().ok())
        .filter(|text| !text.is_empty());
    RuntimeError::Invocation {
        function: function.to_string(),
        message: err.to_string(),
        traceback,
    }
}

fn to_python<'py>(py: Python<'py>, value: &Value) -> PyResult<Bound<'py, PyAny>> {
    Ok(match value {
        Value::None => py.None().into_bound(py),
        Value::Bool(b) => PyBool::new(py, *b).to_owned().into_any(),
        Value::Int(i) => i.into_pyobject(py)?.into_any(),
        Value::Float(f) => PyFloat::new(py, *f).into_any(),
        Value::Str(s) => PyString::new(py, s).into_any(),
        Value::Bytes(b) => PyBytes::new(py, b).into_any(),
        Value::List(items) => {
            let items = items.iter().map(|v| to_python(py, v)).collect::<PyResult<Vec<_>>>()?;
            PyList::new(py, items)?.into_any()
        }
        Value::Tuple(items) => {
            let items = items.iter().map(|v| to_python(py, v)).collect::<PyResult<Vec<_>>>()?;
            PyTuple::new(py, items)?.into_any()
        }
        Value::Dict(entries) => {
            let dict = PyDict::new(py);
            for (k, v) in entries {
                dict.set_item(to_python(py, k)?, to_python(py, v)?)?;
            }
            dict.into_any()
        }
        Value::Set(items) => {
            let items = items.iter().map(|v| to_python(py, v)).collect::<PyResult<Vec<_>>>()?;
            PySet::new(py, &items)?.into_any()
        }
        Value::Object(object) => match object.downcast_ref::<Py<PyAny>>() {
            Some(object) => object.bind(py).clone(),
            None => return Err(PyTypeError::new_err("object does not belong to this runtime")),
        },
    })
}

fn from_python(object: &Bound<'_, PyAny>) -> PyResult<Value> {
    fn items(object: &Bound<'_, PyAny>) -> PyResult<Vec<Value>> {
        object.try_iter()?.map(|item| from_python(&item?)).collect()
    }

    // bool before int: Python's bool is an int subclass.
    if object.is_none() {
        Ok(Value::None)
    } else if let Ok(b) = object.downcast::<PyBool>() {
        Ok(Value::Bool(b.is_true()))
    } else if object.is_instance_of::<PyInt>() {
        match object.extract::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => Ok(Value::Object(OpaqueObject::new(object.clone().unbind()))),
        }
    } else if let Ok(f) = object.downcast::<PyFloat>() {
        Ok(Value::Float(f.value()))
    } else if let Ok(s) = object.downcast::<PyString>() {
        Ok(Value::Str(s.to_cow()?.into_owned()))
    } else if let Ok(b) = object.downcast::<PyBytes>() {
        Ok(Value::Bytes(b.as_bytes().to_vec()))
    } else if object.is_instance_of::<PyList>() {
        Ok(Value::List(items(object)?))
    } else if object.is_instance_of::<PyTuple>() {
        Ok(Value::Tuple(items(object)?))
    } else if let Ok(dict) = object.downcast::<PyDict>() {
        dict.iter()
            .map(|(k, v)| Ok((from_python(&k)?, from_python(&v)?)))
            .collect::<PyResult<_>>()
            .map(Value::Dict)
    } else if object.is_instance_of::<PySet>() || object.is_instance_of::<PyFrozenSet>() {
        Ok(Value::Set(items(object)?))
    } else {
        Ok(Value::Object(OpaqueObject::new(object.clone().unbind())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeLock;

    const MODULE_SOURCE: &str = r#"
def add(a, b=2):
    return a + b

def echo(x):
    return x

def samples():
    return [True, 1, 2 ** 70, frozenset({4}), {3}]

def is_big(x):
    return x == 2 ** 70

def boom():
    raise ValueError("boom")
"#;

    /// Writes the module under a fresh directory and points a runtime at it.
    fn runtime_for(module: &str) -> (tempfile::TempDir, PythonRuntime) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{module}.py")), MODULE_SOURCE).unwrap();
        let runtime = PythonRuntime::with_search_path(dir.path());
        (dir, runtime)
    }

    fn call(
        runtime: &PythonRuntime,
        module: &str,
        function: &str,
        args: Arguments,
    ) -> Result<Value, RuntimeError> {
        let lock = RuntimeLock::new();
        let section = lock.acquire();
        let imported = runtime.import(&section, module)?;
        let result = runtime.invoke(&section, &imported, function, args);
        runtime.release(&section, imported);
        result
    }

    fn positional(values: Vec<Value>) -> Arguments {
        Arguments {
            positional: values,
            keywords: Vec::new(),
        }
    }

    #[test]
    fn values_survive_the_interpreter() {
        let test_cases = vec![
            Value::None,
            Value::Bool(true),
            Value::Int(-3),
            Value::Float(0.5),
            Value::Str("héllo".to_string()),
            Value::Bytes(vec![0, 255]),
            Value::List(vec![Value::Int(1), Value::Bool(false)]),
            Value::Tuple(vec![Value::Str("a".to_string()), Value::None]),
            Value::Dict(vec![(Value::Str("k".to_string()), Value::Int(1))]),
            Value::Set(vec![Value::Int(7)]),
        ];

        Python::with_gil(|py| {
            for value in test_cases {
                let object = to_python(py, &value).unwrap();
                assert_eq!(from_python(&object).unwrap(), value);
            }
        });
    }

    #[test]
    fn python_results_keep_their_kinds() {
        let (_dir, runtime) = runtime_for("snakebind_kinds");
        let result = call(&runtime, "snakebind_kinds", "samples", Arguments::default()).unwrap();

        let Value::List(items) = result else {
            panic!("expected a list, got {result:?}");
        };
        assert_eq!(items[0], Value::Bool(true));
        assert_eq!(items[1], Value::Int(1));
        assert!(matches!(&items[2], Value::Object(o) if o.downcast_ref::<Py<PyAny>>().is_some()));
        assert_eq!(items[3], Value::Set(vec![Value::Int(4)]));
        assert_eq!(items[4], Value::Set(vec![Value::Int(3)]));
    }

    #[test]
    fn big_ints_pass_back_as_the_same_object() {
        let (_dir, runtime) = runtime_for("snakebind_big");
        let Value::List(items) =
            call(&runtime, "snakebind_big", "samples", Arguments::default()).unwrap()
        else {
            panic!("expected a list");
        };

        let result = call(&runtime, "snakebind_big", "is_big", positional(vec![items[2].clone()]));
        assert_eq!(result.unwrap(), Value::Bool(true));
    }

    #[test]
    fn positional_and_keyword_arguments() {
        let (_dir, runtime) = runtime_for("snakebind_args");
        let test_cases = vec![
            (positional(vec![Value::Int(1)]), Value::Int(3)),
            (positional(vec![Value::Int(1), Value::Int(5)]), Value::Int(6)),
            (
                Arguments {
                    positional: vec![Value::Int(1)],
                    keywords: vec![("b".to_string(), Value::Int(10))],
                },
                Value::Int(11),
            ),
        ];

        for (args, expected) in test_cases {
            assert_eq!(call(&runtime, "snakebind_args", "add", args).unwrap(), expected);
        }
    }

    #[test]
    fn exceptions_carry_message_and_traceback() {
        let (_dir, runtime) = runtime_for("snakebind_boom");
        let err = call(&runtime, "snakebind_boom", "boom", Arguments::default()).unwrap_err();

        match err {
            RuntimeError::Invocation {
                function,
                message,
                traceback,
            } => {
                assert_eq!(function, "boom");
                assert_eq!(message, "ValueError: boom");
                let traceback = traceback.expect("a traceback");
                assert!(traceback.contains("in boom"), "{traceback}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_attribute_is_an_invocation_error() {
        let (_dir, runtime) = runtime_for("snakebind_missing");
        let err = call(&runtime, "snakebind_missing", "nope", Arguments::default()).unwrap_err();
        assert!(
            matches!(&err, RuntimeError::Invocation { message, .. } if message.contains("AttributeError")),
            "{err:?}"
        );
    }

    #[test]
    fn unknown_modules_fail_to_import() {
        let runtime = PythonRuntime::new();
        let lock = RuntimeLock::new();
        let section = lock.acquire();

        match runtime.import(&section, "snakebind_no_such_module") {
            Err(RuntimeError::Import { module, message }) => {
                assert_eq!(module, "snakebind_no_such_module");
                assert!(message.contains("ModuleNotFoundError"), "{message}");
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}
