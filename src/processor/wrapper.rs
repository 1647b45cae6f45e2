//! Groups one module's methods with the names the emitter needs.

use crate::config::GeneratorConfig;
use crate::model::{MethodModel, ModuleWrapper};
use crate::processor::naming;

pub fn assemble(module: &str, methods: Vec<MethodModel>, config: &GeneratorConfig) -> ModuleWrapper {
    ModuleWrapper {
        module: module.to_string(),
        pascal_name: naming::convert(module),
        namespace: config.namespace.clone(),
        runtime_crate: config.runtime_crate.clone(),
        methods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_follow_the_module() {
        let wrapper = assemble("demo_module", Vec::new(), &GeneratorConfig::default());
        assert_eq!(wrapper.pascal_name, "DemoModule");
        assert_eq!(wrapper.interface_name(), "IDemoModule");
        assert_eq!(wrapper.extension_name(), "DemoModuleExt");
        assert_eq!(wrapper.internal_name(), "DemoModuleInternal");
        assert_eq!(wrapper.runtime_crate, "snakebind");
    }
}
