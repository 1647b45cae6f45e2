//! The boundary a build driver talks to: source files in, Rust text and
//! diagnostics out.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::model::{GeneratorError, Span};
use crate::processor::{self, naming, wrapper};
use crate::writer;

/// One module handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    /// Change token; files with the same path and token are not regenerated.
    pub modification: Option<SystemTime>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            modification: None,
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let modification = fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Self {
            path: path.to_path_buf(),
            text,
            modification,
        })
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    #[serde(rename = "PSG002")]
    Generated,
    #[serde(rename = "PSG004")]
    ParseFailure,
    #[serde(rename = "PSG005")]
    MappingDegraded,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::Generated => "PSG002",
            DiagnosticCode::ParseFailure => "PSG004",
            DiagnosticCode::MappingDegraded => "PSG005",
        }
    }

    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticCode::Generated => DiagnosticSeverity::Info,
            DiagnosticCode::ParseFailure => DiagnosticSeverity::Error,
            DiagnosticCode::MappingDegraded => DiagnosticSeverity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: DiagnosticSeverity,
    pub message: String,
    /// Zero-based; `None` for problems with the file as a whole.
    pub span: Option<Span>,
    pub path: PathBuf,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Option<Span>, path: &Path) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            span,
            path: path.to_path_buf(),
        }
    }

    fn from_error(error: GeneratorError, path: &Path) -> Self {
        let code = if error.is_error() {
            DiagnosticCode::ParseFailure
        } else {
            DiagnosticCode::MappingDegraded
        };
        Self::new(code, error.message, Some(error.span), path)
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// `path:line:col: severity[code]: message`, one-based like a compiler.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(span) = self.span {
            write!(f, ":{}", span.start)?;
        }
        write!(f, ": {}[{}]: {}", self.severity, self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    pub path: PathBuf,
    pub module: String,
    /// `<Pascal>.py.rs`
    pub file_name: String,
    /// `None` when the file produced errors only.
    pub source: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid configuration: {0}")]
    Config(String),
}

struct CacheEntry {
    modification: SystemTime,
    output: FileOutput,
}

/// Generates bindings for one file at a time.
///
/// Generation itself is pure; the only state is a cache of results keyed by
/// path and modification token.
pub struct Generator {
    config: GeneratorConfig,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        config.validate().map_err(GenerateError::Config)?;
        Ok(Self {
            config,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate(&self, file: &SourceFile) -> FileOutput {
        if let Some(modification) = file.modification {
            let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            let cached = cache
                .get(&file.path)
                .filter(|entry| entry.modification == modification);
            if let Some(entry) = cached {
                debug!(path = %file.path.display(), "unchanged, using cached output");
                return entry.output.clone();
            }
        }

        let output = self.generate_uncached(file);

        if let Some(modification) = file.modification {
            let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            cache.insert(
                file.path.clone(),
                CacheEntry {
                    modification,
                    output: output.clone(),
                },
            );
        }
        output
    }

    /// Generates every file, spreading the work over scoped threads.
    /// Outputs come back in input order.
    ///
    /// Two files mapping to the same output name are reported as errors on
    /// the later one.
    pub fn generate_all(&self, files: &[SourceFile]) -> Vec<FileOutput> {
        if files.is_empty() {
            return Vec::new();
        }
        let workers = thread::available_parallelism().map_or(1, |n| n.get());
        let chunk = files.len().div_ceil(workers);

        let mut outputs: Vec<FileOutput> = thread::scope(|s| {
            let handles: Vec<_> = files
                .chunks(chunk)
                .map(|chunk| s.spawn(move || chunk.iter().map(|f| self.generate(f)).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for output in &mut outputs {
            if output.source.is_none() {
                continue;
            }
            match seen.get(&output.file_name) {
                Some(first) => {
                    let message = format!(
                        "module `{}` is also generated from {}",
                        output.module,
                        first.display()
                    );
                    output.source = None;
                    output
                        .diagnostics
                        .push(Diagnostic::new(DiagnosticCode::ParseFailure, message, None, &output.path));
                }
                None => {
                    seen.insert(output.file_name.clone(), output.path.clone());
                }
            }
        }
        outputs
    }

    fn generate_uncached(&self, file: &SourceFile) -> FileOutput {
        let module = module_name(&file.path);
        let pascal = naming::convert(&module);
        let mut output = FileOutput {
            path: file.path.clone(),
            module: module.clone(),
            file_name: format!("{pascal}.py.rs"),
            source: None,
            diagnostics: Vec::new(),
        };

        if !naming::is_module_name(&module) || pascal.is_empty() {
            output.diagnostics.push(Diagnostic::new(
                DiagnosticCode::ParseFailure,
                format!("`{module}` is not an importable Python module name"),
                None,
                &file.path,
            ));
            return output;
        }

        let processed = processor::run(&file.text);
        let has_errors = processed.has_errors();
        let methods = processed.methods.len();
        output.diagnostics.extend(
            processed
                .errors
                .into_iter()
                .map(|e| Diagnostic::from_error(e, &file.path)),
        );

        if has_errors && !self.config.emit_on_parse_error {
            debug!(path = %file.path.display(), "parse errors, no wrapper emitted");
            return output;
        }

        let wrapper = wrapper::assemble(&module, processed.methods, &self.config);
        output.source = Some(writer::rust::render(&wrapper));
        output.diagnostics.push(Diagnostic::new(
            DiagnosticCode::Generated,
            format!("generated {} with {methods} method(s)", output.file_name),
            None,
            &file.path,
        ));
        info!(module = %module, methods, "generated bindings");
        output
    }
}

/// The importable name of a source file: its stem without `.py`.
fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> Generator {
        Generator::new(GeneratorConfig::default()).unwrap()
    }

    fn codes(output: &FileOutput) -> Vec<DiagnosticCode> {
        output.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GeneratorConfig {
            namespace: "not a path".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(matches!(Generator::new(config), Err(GenerateError::Config(_))));
    }

    #[test]
    fn test_successful_generation() {
        let file = SourceFile::new("scripts/demo_module.py", "def add(a: int) -> int: ...\n");
        let output = generator().generate(&file);

        assert_eq!(output.module, "demo_module");
        assert_eq!(output.file_name, "DemoModule.py.rs");
        assert!(output.source.is_some());
        assert_eq!(codes(&output), vec![DiagnosticCode::Generated]);
        assert_eq!(output.diagnostics[0].severity, DiagnosticSeverity::Info);
    }

    #[test]
    fn test_outcomes_by_content() {
        let test_cases = vec![
            (
                "def ok(): ...\ndef bad(: ...\n",
                false,
                vec![DiagnosticCode::ParseFailure],
            ),
            (
                "def ok(x: list[int, int]): ...\n",
                true,
                vec![DiagnosticCode::MappingDegraded, DiagnosticCode::Generated],
            ),
            ("", true, vec![DiagnosticCode::Generated]),
        ];

        for (text, has_source, expected) in test_cases {
            let output = generator().generate(&SourceFile::new("m.py", text));
            assert_eq!(output.source.is_some(), has_source, "{text}");
            assert_eq!(codes(&output), expected, "{text}");
        }
    }

    #[test]
    fn test_emit_on_parse_error() {
        let config = GeneratorConfig {
            emit_on_parse_error: true,
            ..GeneratorConfig::default()
        };
        let output = Generator::new(config)
            .unwrap()
            .generate(&SourceFile::new("m.py", "def fine(): ...\ndef bad(: ...\n"));

        assert!(output.has_errors());
        let source = output.source.unwrap();
        assert!(source.contains("fn Fine(&self)"));
        assert!(!source.contains("Bad"));
    }

    #[test]
    fn test_invalid_module_names() {
        for path in ["my-module.py", "1st.py", "__.py"] {
            let output = generator().generate(&SourceFile::new(path, "def f(): ...\n"));
            assert!(output.source.is_none(), "{path}");
            assert_eq!(codes(&output), vec![DiagnosticCode::ParseFailure]);
            assert_eq!(output.diagnostics[0].span, None);
        }
    }

    #[test]
    fn test_cache_follows_modification_token() {
        let generator = generator();
        let stamp = SystemTime::UNIX_EPOCH;
        let mut file = SourceFile::new("m.py", "def a(): ...\n");
        file.modification = Some(stamp);
        let first = generator.generate(&file);

        // Same token: the cached output is returned even though the text moved on.
        file.text = "def b(): ...\n".to_string();
        assert_eq!(generator.generate(&file), first);

        file.modification = Some(stamp + std::time::Duration::from_secs(1));
        let second = generator.generate(&file);
        assert!(second.source.unwrap().contains("fn B(&self)"));
    }

    #[test]
    fn test_generate_all_keeps_order_and_flags_clashes() {
        let files = vec![
            SourceFile::new("a/shared.py", "def x(): ...\n"),
            SourceFile::new("other.py", "def y(): ...\n"),
            SourceFile::new("b/shared.py", "def z(): ...\n"),
        ];
        let outputs = generator().generate_all(&files);

        let paths: Vec<_> = outputs.iter().map(|o| o.path.clone()).collect();
        let expected: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, expected);
        assert!(outputs[0].source.is_some());
        assert!(outputs[2].source.is_none());
        assert!(outputs[2].has_errors());
        assert!(outputs[2].diagnostics.iter().any(|d| d.message.contains("a/shared.py")));
    }

    #[test]
    fn test_diagnostic_display() {
        let span = Span::new(crate::model::Position::new(2, 4), crate::model::Position::new(2, 9));
        let diagnostic = Diagnostic::new(
            DiagnosticCode::ParseFailure,
            "expected `)`",
            Some(span),
            Path::new("m.py"),
        );
        assert_eq!(diagnostic.to_string(), "m.py:3:5: error[PSG004]: expected `)`");

        let json = serde_json::to_string(&diagnostic).unwrap();
        assert!(json.contains("\"code\":\"PSG004\""));
        assert!(json.contains("\"severity\":\"error\""));
    }
}
