//! Data handed from one pipeline stage to the next.
//!
//! Everything here is an immutable value: the parser produces
//! `FunctionDefinition`s, the builder turns them into `MethodModel`s and the
//! emitter renders a `ModuleWrapper`. No stage keeps a reference back into
//! an earlier one.

pub mod types;

use std::fmt;

use serde::Serialize;

pub use types::{Container, Scalar, TypeDescriptor};

/// Zero-based line / column pair. Columns count chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A located problem found while reading a module.
///
/// Errors are reported next to whatever was parsed successfully, never in
/// place of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorError {
    pub message: String,
    pub span: Span,
    pub severity: Severity,
}

impl GeneratorError {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            severity: Severity::Error,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {}: {}", self.span.start, kind, self.message)
    }
}

impl std::error::Error for GeneratorError {}

// ─────────────────────────────────────────────────────
// Parser output
// ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// Declared before a `/` marker.
    PositionalOnly,
    Positional,
    /// Declared after `*` or `*args`.
    KeywordOnly,
    /// `*args`
    VariadicPositional,
    /// `**kwargs`
    VariadicKeyword,
}

impl ParameterKind {
    pub fn is_variadic(self) -> bool {
        matches!(
            self,
            ParameterKind::VariadicPositional | ParameterKind::VariadicKeyword
        )
    }
}

/// Syntactic shape of an annotation, before any meaning is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// `int`, `typing.List`
    Name(Vec<String>),
    /// `dict[str, int]`
    Subscript { base: Vec<String>, args: Vec<TypeExpr> },
    /// `a | b | c`, flattened left to right.
    BitOr(Vec<TypeExpr>),
    NoneLiteral,
    /// `...`
    Ellipsis,
    /// `[int, str]`, only meaningful inside a subscript.
    List(Vec<TypeExpr>),
    /// `(int, str)` or `()`
    Tuple(Vec<TypeExpr>),
    /// A string annotation whose content could not be read as a type.
    Str(String),
    /// Well-bracketed tokens outside the supported grammar.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub expr: TypeExpr,
    /// Source text exactly as written.
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<Annotation>,
    /// Source text of the default expression.
    pub default: Option<String>,
    pub kind: ParameterKind,
}

/// One top-level `def` recovered from a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub returns: Option<Annotation>,
    /// Decorator expressions without the leading `@`. Kept, never interpreted.
    pub decorators: Vec<String>,
    pub span: Span,
}

/// Everything the signature parser found in one module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSource {
    pub definitions: Vec<FunctionDefinition>,
    pub errors: Vec<GeneratorError>,
}

// ─────────────────────────────────────────────────────
// Builder output
// ─────────────────────────────────────────────────────

/// How a single argument reaches the callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Passing {
    Positional,
    PositionalOnly,
    Keyword,
    Variadic,
    VariadicKeyword,
}

impl From<ParameterKind> for Passing {
    fn from(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::PositionalOnly => Passing::PositionalOnly,
            ParameterKind::Positional => Passing::Positional,
            ParameterKind::KeywordOnly => Passing::Keyword,
            ParameterKind::VariadicPositional => Passing::Variadic,
            ParameterKind::VariadicKeyword => Passing::VariadicKeyword,
        }
    }
}

/// Conversion applied at the call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Converted to / from the described static type.
    Typed(TypeDescriptor),
    /// Travels as a dynamic `Value`, uninterpreted.
    PassThrough,
}

impl Conversion {
    pub fn for_type(ty: &TypeDescriptor) -> Self {
        match ty {
            TypeDescriptor::Unknown | TypeDescriptor::Union(_) => Conversion::PassThrough,
            other => Conversion::Typed(other.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgumentPlan {
    pub source_name: String,
    pub binding: String,
    pub passing: Passing,
    /// The callee declares a default, so the argument may be left out.
    pub optional: bool,
    pub conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarshalPlan {
    pub arguments: Vec<ArgumentPlan>,
    pub result: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodParameter {
    pub name: String,
    /// Rust identifier used in the generated signature.
    pub binding: String,
    pub ty: TypeDescriptor,
    pub default: Option<String>,
    pub kind: ParameterKind,
}

/// A callable ready for emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodModel {
    /// PascalCase name of the generated method.
    pub name: String,
    /// Name looked up on the imported module.
    pub source_name: String,
    pub parameters: Vec<MethodParameter>,
    pub returns: TypeDescriptor,
    pub plan: MarshalPlan,
}

/// All methods of one source module plus the names the emitter needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleWrapper {
    /// Importable module name (the file stem).
    pub module: String,
    pub pascal_name: String,
    pub namespace: String,
    /// Path of the crate providing `runtime` in the generated code.
    pub runtime_crate: String,
    pub methods: Vec<MethodModel>,
}

impl ModuleWrapper {
    pub fn interface_name(&self) -> String {
        format!("I{}", self.pascal_name)
    }

    pub fn extension_name(&self) -> String {
        format!("{}Ext", self.pascal_name)
    }

    pub fn internal_name(&self) -> String {
        format!("{}Internal", self.pascal_name)
    }
}
