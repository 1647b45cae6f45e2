//! Renders a `ModuleWrapper` as Rust source.
//!
//! Output depends only on the wrapper, so regenerating from an unchanged
//! module is byte-identical.

use crate::model::{
    Container, Conversion, MethodModel, MethodParameter, ModuleWrapper, ParameterKind, Passing,
    Scalar, TypeDescriptor,
};
use crate::processor::naming;

/// Marks generated files; `writer::files` never overwrites a file without it.
pub const GENERATED_MARKER: &str = "// <auto-generated/>";

/// Rust spelling of a type, relative to the runtime's imports.
pub fn rust_type(ty: &TypeDescriptor) -> String {
    match ty {
        TypeDescriptor::Scalar(scalar) => match scalar {
            Scalar::Integer => "i64",
            Scalar::Float => "f64",
            Scalar::Text => "String",
            Scalar::Boolean => "bool",
            Scalar::Bytes => "Bytes",
            Scalar::None => "()",
        }
        .to_string(),
        TypeDescriptor::Generic(container, args) => match (container, args.as_slice()) {
            (Container::Sequence, [item]) => format!("Vec<{}>", rust_type(item)),
            (Container::Mapping, [key, value]) if key.is_hashable() => {
                format!("HashMap<{}, {}>", rust_type(key), rust_type(value))
            }
            (Container::Mapping, [key, value]) => {
                format!("Pairs<{}, {}>", rust_type(key), rust_type(value))
            }
            (Container::Set, [item]) if item.is_hashable() => format!("HashSet<{}>", rust_type(item)),
            (Container::Set, [item]) => format!("Vec<{}>", rust_type(item)),
            (Container::Tuple, [item]) => format!("({},)", rust_type(item)),
            (Container::Tuple, items) if !items.is_empty() => {
                let items: Vec<_> = items.iter().map(rust_type).collect();
                format!("({})", items.join(", "))
            }
            // `TypeDescriptor::generic` never builds these.
            _ => "Value".to_string(),
        },
        TypeDescriptor::Optional(inner) => format!("Option<{}>", rust_type(inner)),
        TypeDescriptor::Union(_) | TypeDescriptor::Unknown => "Value".to_string(),
    }
}

pub fn render(wrapper: &ModuleWrapper) -> String {
    let mut out = CodeWriter::default();
    let runtime = if wrapper.runtime_crate == "crate" {
        "crate::runtime".to_string()
    } else {
        format!("::{}::runtime", wrapper.runtime_crate)
    };
    let module = naming::binding(&wrapper.module);
    let interface = wrapper.interface_name();
    let extension = wrapper.extension_name();
    let internal = wrapper.internal_name();

    out.line(GENERATED_MARKER);
    out.line(format!(
        "// Generated by snakebind from `{}.py`. Do not edit.",
        wrapper.module
    ));
    out.blank();
    out.line("#[allow(non_snake_case, dead_code, unused_imports, clippy::all)]");
    out.open(format!("pub mod {module} {{"));
    out.line("use std::collections::{HashMap, HashSet};");
    out.line("use std::sync::Arc;");
    out.blank();
    out.line(format!(
        "use {runtime}::{{Bytes, Environment, ModuleHandle, Pairs, RuntimeError, ToValue, Value}};"
    ));
    out.blank();

    // 1. ── Interface ────────────────────────────────────────────────────
    out.line(format!(
        "/// Typed interface to the Python module `{}`, mounted at `{}::{module}`.",
        wrapper.module, wrapper.namespace
    ));
    out.open(format!("pub trait {interface}: Send + Sync {{"));
    for method in &wrapper.methods {
        method_docs(&mut out, method);
        out.line(format!("{};", signature(method)));
        out.blank();
    }
    out.line("/// Releases the module. Later calls fail with `RuntimeError::Disposed`.");
    out.line("fn dispose(&self) -> Result<(), RuntimeError>;");
    out.close("}");
    out.blank();

    // 2. ── Accessor ─────────────────────────────────────────────────────
    out.line(format!("/// Access to the shared `{}` wrapper.", wrapper.module));
    out.open(format!("pub trait {extension} {{"));
    out.line(format!(
        "fn {}(&self) -> Arc<dyn {interface}>;",
        wrapper.pascal_name
    ));
    out.close("}");
    out.blank();
    out.open(format!("impl {extension} for Environment {{"));
    out.open(format!(
        "fn {}(&self) -> Arc<dyn {interface}> {{",
        wrapper.pascal_name
    ));
    out.line(format!(
        "self.wrapper({:?}, {internal}::new)",
        wrapper.module
    ));
    out.close("}");
    out.close("}");
    out.blank();

    // 3. ── Implementation ───────────────────────────────────────────────
    out.open(format!("struct {internal} {{"));
    out.line("module: ModuleHandle,");
    out.close("}");
    out.blank();
    out.open(format!("impl {internal} {{"));
    out.open("fn new(module: ModuleHandle) -> Self {");
    out.line("Self { module }");
    out.close("}");
    out.close("}");
    out.blank();
    out.open(format!("impl {interface} for {internal} {{"));
    for method in &wrapper.methods {
        out.open(format!("{} {{", signature(method)));
        method_body(&mut out, method);
        out.close("}");
        out.blank();
    }
    out.open("fn dispose(&self) -> Result<(), RuntimeError> {");
    out.line("self.module.dispose()");
    out.close("}");
    out.close("}");
    out.close("}");

    out.finish()
}

fn parameter_type(param: &MethodParameter) -> String {
    let ty = rust_type(&param.ty);
    if param.default.is_some() {
        format!("Option<{ty}>")
    } else {
        ty
    }
}

fn signature(method: &MethodModel) -> String {
    let mut params = vec!["&self".to_string()];
    params.extend(
        method
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.binding, parameter_type(p))),
    );
    format!(
        "fn {}({}) -> Result<{}, RuntimeError>",
        method.name,
        params.join(", "),
        rust_type(&method.returns)
    )
}

fn method_docs(out: &mut CodeWriter, method: &MethodModel) {
    out.line(format!("/// Calls `{}`.", python_signature(method)));
    let defaults: Vec<_> = method
        .parameters
        .iter()
        .filter_map(|p| p.default.as_ref().map(|d| (p, d)))
        .collect();
    if defaults.is_empty() {
        return;
    }
    out.line("///");
    out.line("/// Passing `None` leaves an argument to its Python default:");
    for (param, default) in defaults {
        let default = default.split_whitespace().collect::<Vec<_>>().join(" ");
        out.line(format!("/// - `{}` defaults to `{default}`", param.binding));
    }
}

/// The Python signature as the wrapper sees it, e.g. `f(a: int, *, b: str = 'x') -> None`.
fn python_signature(method: &MethodModel) -> String {
    let mut parts = Vec::new();
    let mut keyword_marker = false;
    let params = &method.parameters;

    for (i, param) in params.iter().enumerate() {
        let element = match (&param.kind, &param.ty) {
            (ParameterKind::VariadicPositional, TypeDescriptor::Generic(_, args)) => &args[0],
            (ParameterKind::VariadicKeyword, TypeDescriptor::Generic(_, args)) => &args[1],
            _ => &param.ty,
        };
        let prefix = match param.kind {
            ParameterKind::VariadicPositional => {
                keyword_marker = true;
                "*"
            }
            ParameterKind::VariadicKeyword => "**",
            ParameterKind::KeywordOnly if !keyword_marker => {
                keyword_marker = true;
                parts.push("*".to_string());
                ""
            }
            _ => "",
        };

        let mut part = format!("{prefix}{}: {element}", param.name);
        if let Some(default) = &param.default {
            let default = default.split_whitespace().collect::<Vec<_>>().join(" ");
            part.push_str(&format!(" = {default}"));
        }
        parts.push(part);

        let next_is_positional_only = params
            .get(i + 1)
            .is_some_and(|p| p.kind == ParameterKind::PositionalOnly);
        if param.kind == ParameterKind::PositionalOnly && !next_is_positional_only {
            parts.push("/".to_string());
        }
    }

    format!(
        "{}({}) -> {}",
        method.source_name,
        parts.join(", "),
        method.returns
    )
}

fn method_body(out: &mut CodeWriter, method: &MethodModel) {
    let arguments = &method.plan.arguments;
    if arguments.is_empty() {
        out.line(format!(
            "self.module.call({:?}, |_| {{}})",
            method.source_name
        ));
        return;
    }

    // The closure argument must not shadow a parameter.
    let mut call = "call".to_string();
    while arguments.iter().any(|a| a.binding == call) {
        call.push('_');
    }

    out.open(format!(
        "self.module.call({:?}, |{call}| {{",
        method.source_name
    ));
    for arg in arguments {
        let binding = &arg.binding;
        let typed = matches!(arg.conversion, Conversion::Typed(_));
        let statement = match arg.passing {
            Passing::Variadic if typed => {
                format!("{call}.variadic({binding}.into_iter().map(ToValue::to_value));")
            }
            Passing::Variadic => format!("{call}.variadic({binding});"),
            Passing::VariadicKeyword if typed => format!(
                "{call}.variadic_keywords({binding}.into_iter().map(|(k, v)| (k, v.to_value())));"
            ),
            Passing::VariadicKeyword => format!("{call}.variadic_keywords({binding});"),
            passing => {
                let method = match passing {
                    Passing::PositionalOnly => "positional_only",
                    Passing::Keyword => "keyword",
                    _ => "positional",
                };
                let value = match (arg.optional, typed) {
                    (false, true) => format!("Some({binding}.to_value())"),
                    (false, false) => format!("Some({binding})"),
                    (true, true) => format!("{binding}.map(ToValue::to_value)"),
                    (true, false) => binding.clone(),
                };
                format!("{call}.{method}({:?}, {value});", arg.source_name)
            }
        };
        out.line(statement);
    }
    out.close("})");
}

/// Line-oriented buffer with four-space indentation.
#[derive(Default)]
struct CodeWriter {
    buf: String,
    depth: usize,
}

impl CodeWriter {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.buf.push_str("    ");
        }
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: impl AsRef<str>) {
        // Drop a blank line left before the closing brace.
        if self.buf.ends_with("\n\n") {
            self.buf.pop();
        }
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::processor::{self, wrapper};

    fn render_source(src: &str) -> String {
        let processed = processor::run(src);
        assert!(!processed.has_errors(), "{:?}", processed.errors);
        let wrapper = wrapper::assemble("demo_module", processed.methods, &GeneratorConfig::default());
        render(&wrapper)
    }

    fn int() -> TypeDescriptor {
        TypeDescriptor::Scalar(Scalar::Integer)
    }

    fn float() -> TypeDescriptor {
        TypeDescriptor::Scalar(Scalar::Float)
    }

    #[test]
    fn test_rust_types() {
        let text = TypeDescriptor::Scalar(Scalar::Text);
        let test_cases = vec![
            (int(), "i64"),
            (TypeDescriptor::Scalar(Scalar::None), "()"),
            (TypeDescriptor::sequence_of(int()), "Vec<i64>"),
            (TypeDescriptor::mapping_of(text.clone(), float()), "HashMap<String, f64>"),
            (TypeDescriptor::mapping_of(float(), int()), "Pairs<f64, i64>"),
            (TypeDescriptor::mapping_of(TypeDescriptor::Unknown, TypeDescriptor::Unknown), "Pairs<Value, Value>"),
            (TypeDescriptor::Generic(Container::Set, vec![text.clone()]), "HashSet<String>"),
            (TypeDescriptor::Generic(Container::Set, vec![float()]), "Vec<f64>"),
            (TypeDescriptor::Generic(Container::Tuple, vec![int()]), "(i64,)"),
            (TypeDescriptor::Generic(Container::Tuple, vec![int(), text.clone()]), "(i64, String)"),
            (TypeDescriptor::optional(TypeDescriptor::sequence_of(float())), "Option<Vec<f64>>"),
            (TypeDescriptor::Union(vec![int(), text]), "Value"),
            (TypeDescriptor::Unknown, "Value"),
        ];

        for (ty, expected) in test_cases {
            assert_eq!(rust_type(&ty), expected, "{ty}");
        }
    }

    #[test]
    fn test_render_names() {
        let out = render_source("def add_numbers(a: int, b: int = 2) -> int: ...\n");

        assert!(out.starts_with(GENERATED_MARKER));
        assert!(out.contains("pub mod demo_module {"));
        assert!(out.contains("pub trait IDemoModule: Send + Sync {"));
        assert!(out.contains("pub trait DemoModuleExt {"));
        assert!(out.contains("fn DemoModule(&self) -> Arc<dyn IDemoModule>;"));
        assert!(out.contains("self.wrapper(\"demo_module\", DemoModuleInternal::new)"));
        assert!(out.contains("struct DemoModuleInternal {"));
        assert!(!out.contains("pub struct DemoModuleInternal"));
        assert!(out.contains("use ::snakebind::runtime::{"));
    }

    #[test]
    fn test_render_method() {
        let out = render_source("def add_numbers(a: int, b: int = 2) -> int: ...\n");

        assert!(out.contains(
            "fn AddNumbers(&self, a: i64, b: Option<i64>) -> Result<i64, RuntimeError>;"
        ));
        assert!(out.contains("/// Calls `add_numbers(a: int, b: int = 2) -> int`."));
        assert!(out.contains("/// - `b` defaults to `2`"));
        assert!(out.contains("self.module.call(\"add_numbers\", |call| {"));
        assert!(out.contains("call.positional(\"a\", Some(a.to_value()));"));
        assert!(out.contains("call.positional(\"b\", b.map(ToValue::to_value));"));
    }

    #[test]
    fn test_marshal_statements() {
        let test_cases = vec![
            ("def f(): ...\n", "self.module.call(\"f\", |_| {})"),
            ("def f(x): ...\n", "call.positional(\"x\", Some(x));"),
            ("def f(x=None): ...\n", "call.positional(\"x\", x);"),
            ("def f(a, /, b): ...\n", "call.positional_only(\"a\", Some(a));"),
            ("def f(*, k: str): ...\n", "call.keyword(\"k\", Some(k.to_value()));"),
            ("def f(*args: int): ...\n", "call.variadic(args.into_iter().map(ToValue::to_value));"),
            ("def f(*args): ...\n", "call.variadic(args);"),
            (
                "def f(**kw: str): ...\n",
                "call.variadic_keywords(kw.into_iter().map(|(k, v)| (k, v.to_value())));",
            ),
            ("def f(**kw): ...\n", "call.variadic_keywords(kw);"),
            ("def f(call: int): ...\n", "call_.positional(\"call\", Some(call.to_value()));"),
            ("def f(type: str): ...\n", "call.positional(\"type\", Some(r#type.to_value()));"),
            ("def f(Ok: int): ...\n", "call.positional(\"Ok\", Some(Ok_.to_value()));"),
            ("def f(Bytes: bytes): ...\n", "fn F(&self, Bytes_: Bytes) -> Result<Value, RuntimeError>;"),
        ];

        for (src, expected) in test_cases {
            let out = render_source(src);
            assert!(out.contains(expected), "{src}\n{out}");
        }
    }

    #[test]
    fn test_python_signature_markers() {
        let test_cases = vec![
            ("def f(a, /, b, *, c=1): ...\n", "f(a: Any, /, b: Any, *, c: Any = 1) -> Any"),
            ("def f(*args: int, k, **kw: str): ...\n", "f(*args: int, k: Any, **kw: str) -> Any"),
            ("def f() -> None: ...\n", "f() -> None"),
        ];

        for (src, expected) in test_cases {
            let method = &processor::run(src).methods[0];
            assert_eq!(python_signature(method), expected);
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let src = "def a(x: dict[str, int]) -> list[str]: ...\ndef b(*args, **kwargs): ...\n";
        assert_eq!(render_source(src), render_source(src));
    }

    #[test]
    fn test_keyword_module_name() {
        let wrapper = wrapper::assemble("type", Vec::new(), &GeneratorConfig::default());
        let out = render(&wrapper);
        assert!(out.contains("pub mod r#type {"));
        assert!(out.contains("pub trait IType: Send + Sync {"));
    }
}
