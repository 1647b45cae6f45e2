//! The functional core: source text in, method models out.
//!
//! Every pass here is pure, so files can be processed in parallel without
//! any shared state.
pub mod lexer;
pub mod method_builder;
pub mod naming;
pub mod signature_parser;
pub mod type_mapper;
pub mod wrapper;

use std::collections::HashMap;

use crate::model::{FunctionDefinition, GeneratorError, MethodModel};

/// Result of running every processing pass over one module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessedModule {
    pub definitions: Vec<FunctionDefinition>,
    pub methods: Vec<MethodModel>,
    /// Parse errors and mapping warnings, ordered by position.
    pub errors: Vec<GeneratorError>,
}

impl ProcessedModule {
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(GeneratorError::is_error)
    }
}

/// Runs every processing pass over one module's source text.
pub fn run(src: &str) -> ProcessedModule {
    let parsed = signature_parser::parse(src);
    let mut errors = parsed.errors;

    // Python binds the last definition of a name, so earlier ones are shadowed.
    let mut last: HashMap<&str, usize> = HashMap::new();
    for (i, def) in parsed.definitions.iter().enumerate() {
        last.insert(def.name.as_str(), i);
    }

    let mut methods = Vec::new();
    let mut claimed: HashMap<String, &str> = HashMap::new();
    for (i, def) in parsed.definitions.iter().enumerate() {
        let winner = last[def.name.as_str()];
        if winner != i {
            let line = parsed.definitions[winner].span.start.line + 1;
            errors.push(GeneratorError::warning(
                format!("`{}` is redefined on line {line}; this definition is ignored", def.name),
                def.span,
            ));
            continue;
        }

        let built = method_builder::build(def);
        errors.extend(built.warnings);

        let name = built.method.name.clone();
        if name.is_empty() {
            errors.push(GeneratorError::error(
                format!("`{}` does not produce a usable method name", def.name),
                def.span,
            ));
            continue;
        }
        if let Some(first) = claimed.get(&name) {
            errors.push(GeneratorError::error(
                format!(
                    "`{}` and `{first}` both convert to method `{name}`",
                    def.name
                ),
                def.span,
            ));
            continue;
        }

        claimed.insert(name, def.name.as_str());
        methods.push(built.method);
    }

    errors.sort_by_key(|e| e.span.start);

    ProcessedModule {
        definitions: parsed.definitions,
        methods,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method_names(processed: &ProcessedModule) -> Vec<&str> {
        processed.methods.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_valid_and_malformed_definitions() {
        let src = "\
def broken(a, a):
    pass

def fine(x: int) -> int:
    return x
";
        let processed = run(src);
        assert_eq!(method_names(&processed), vec!["Fine"]);
        assert_eq!(processed.errors.len(), 1);
        assert!(processed.has_errors());
    }

    #[test]
    fn test_lexical_error_is_isolated_to_its_definition() {
        let test_cases = vec![
            (
                "def f(a='oops): pass\n\ndef g(x: int) -> int:\n    return x\n",
                "unterminated string literal",
            ),
            ("def f(a $ b): pass\n\ndef g(): pass\n", "unexpected character `$`"),
        ];

        for (src, message) in test_cases {
            let processed = run(src);
            assert_eq!(method_names(&processed), vec!["G"], "{src}");
            assert_eq!(processed.errors.len(), 1, "{src}: {:?}", processed.errors);
            assert_eq!(processed.errors[0].message, message);
            assert_eq!(processed.errors[0].span.start.line, 0);
        }
    }

    #[test]
    fn test_redefinition_keeps_last() {
        let src = "\
def f(a: int): ...
def f(a: str, b: str): ...
";
        let processed = run(src);
        assert_eq!(processed.methods.len(), 1);
        assert_eq!(processed.methods[0].parameters.len(), 2);
        assert_eq!(processed.errors.len(), 1);
        assert!(!processed.has_errors());
        assert!(processed.errors[0].message.contains("redefined on line 2"));
    }

    #[test]
    fn test_name_collisions() {
        let test_cases = vec![
            ("def foo_bar(): ...\ndef fooBar(): ...\n", vec!["FooBar"], "both convert"),
            ("def __(): ...\ndef ok(): ...\n", vec!["Ok"], "usable method name"),
        ];

        for (src, expected, message) in test_cases {
            let processed = run(src);
            assert_eq!(method_names(&processed), expected, "{src}");
            assert_eq!(processed.errors.len(), 1, "{src}");
            assert!(processed.errors[0].is_error());
            assert!(processed.errors[0].message.contains(message), "{src}");
        }
    }

    #[test]
    fn test_errors_are_ordered_by_position() {
        let src = "\
def a(x: list[int, int]): ...
def b(: ...
def c(y: dict[str]): ...
";
        let processed = run(src);
        let lines: Vec<_> = processed.errors.iter().map(|e| e.span.start.line).collect();
        assert_eq!(lines, vec![0, 1, 2]);
        assert_eq!(method_names(&processed), vec!["A", "C"]);
    }
}
