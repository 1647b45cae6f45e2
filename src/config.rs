//! Generator settings, read from JSON and overridden on the command line.

use serde::Deserialize;

use crate::processor::naming;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Rust path the generated modules are documented under, e.g. `app::bindings`.
    pub namespace: String,
    /// Crate that provides `runtime` to the generated code.
    pub runtime_crate: String,
    /// Emit a wrapper for the valid definitions even when a file has parse errors.
    pub emit_on_parse_error: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: "bindings".to_string(),
            runtime_crate: "snakebind".to_string(),
            emit_on_parse_error: false,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Checks that every name ends up as a valid Rust path in the output.
    pub fn validate(&self) -> Result<(), String> {
        let valid_path = |path: &str| path.split("::").all(naming::is_module_name);

        if !valid_path(&self.namespace) {
            return Err(format!(
                "namespace `{}` is not a `::`-separated Rust path",
                self.namespace
            ));
        }
        if !naming::is_module_name(&self.runtime_crate) {
            return Err(format!(
                "runtime crate `{}` is not a valid crate name",
                self.runtime_crate
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = GeneratorConfig::from_json(r#"{ "namespace": "app::py" }"#).unwrap();
        assert_eq!(config.namespace, "app::py");
        assert_eq!(config.runtime_crate, "snakebind");
        assert!(!config.emit_on_parse_error);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(GeneratorConfig::from_json(r#"{ "namespaces": "x" }"#).is_err());
    }

    #[test]
    fn test_validate() {
        let test_cases = vec![
            ("bindings", "snakebind", true),
            ("app::python::bindings", "snakebind", true),
            ("app::", "snakebind", false),
            ("app.bindings", "snakebind", false),
            ("", "snakebind", false),
            ("bindings", "my-runtime", false),
            ("bindings", "my_runtime", true),
        ];

        for (namespace, runtime_crate, ok) in test_cases {
            let config = GeneratorConfig {
                namespace: namespace.to_string(),
                runtime_crate: runtime_crate.to_string(),
                emit_on_parse_error: false,
            };
            assert_eq!(config.validate().is_ok(), ok, "{namespace} / {runtime_crate}");
        }
    }
}
