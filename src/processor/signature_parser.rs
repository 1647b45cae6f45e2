//! Parser that consumes the lexer and recovers top-level `def` signatures.
//!
//! A statement starts at a token in column 0 that is the first on its line
//! and sits outside any bracket. `def`, `class`, `async` and `@` in column 0
//! always start a statement, even when an earlier header left a bracket
//! open, so one broken signature never hides the definitions after it.

use crate::model::{
    Annotation, FunctionDefinition, GeneratorError, Parameter, ParameterKind, ParsedSource, Span,
    TypeExpr,
};

use super::lexer::{Token, TokenKind, tokenize};

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parses module source into its top-level function definitions.
///
/// Identical input always produces identical output.
pub fn parse(src: &str) -> ParsedSource {
    let tokens = tokenize(src);
    let mut parser = Parser::new(src, tokens);
    let mut parsed = parser.parse();
    parsed.errors.sort_by_key(|e| e.span.start);
    parsed
}

fn is_statement_start(token: &Token) -> bool {
    if !token.first_on_line || token.span.start.column != 0 {
        return false;
    }
    let forced = token.is_op("@")
        || token.is_name("def")
        || token.is_name("class")
        || token.is_name("async");
    token.depth == 0 || forced
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self { src, tokens, pos: 0 }
    }

    fn parse(&mut self) -> ParsedSource {
        let mut definitions = Vec::new();
        let mut errors = Vec::new();
        let mut decorators: Vec<String> = Vec::new();

        while self.pos < self.tokens.len() {
            let token = &self.tokens[self.pos];
            let statement = is_statement_start(token);

            if statement && token.is_op("@") {
                decorators.push(self.read_decorator(&mut errors));
                continue;
            }

            if statement && token.is_name("def") {
                let end = self.next_statement(self.pos + 1);
                let header = &self.tokens[self.pos..end];
                let mut sig = SignatureParser::new(self.src, header);
                match sig.parse_header(std::mem::take(&mut decorators)) {
                    Ok(definition) => {
                        definitions.push(definition);
                        // The body is skipped, but unreadable input in it still counts.
                        errors.extend(header[sig.pos..].iter().filter_map(Token::lexical_error));
                    }
                    Err(e) => errors.push(e),
                }
                self.pos = end;
                continue;
            }

            // `class`, `async def` and anything else: decorators don't carry over.
            if statement {
                decorators.clear();
            }
            errors.extend(self.tokens[self.pos].lexical_error());
            self.pos += 1;
        }

        ParsedSource {
            definitions,
            errors,
        }
    }

    fn next_statement(&self, from: usize) -> usize {
        (from..self.tokens.len())
            .find(|&i| is_statement_start(&self.tokens[i]))
            .unwrap_or(self.tokens.len())
    }

    fn read_decorator(&mut self, errors: &mut Vec<GeneratorError>) -> String {
        let end = self.next_statement(self.pos + 1);
        let body = &self.tokens[self.pos + 1..end];
        errors.extend(body.iter().filter_map(Token::lexical_error));
        let text = match (body.first(), body.last()) {
            (Some(first), Some(last)) => self.src[first.range.start..last.range.end].trim(),
            _ => "",
        };
        self.pos = end;
        text.to_string()
    }
}

/// Parses one `def` header from a bounded token slice.
struct SignatureParser<'a, 't> {
    src: &'a str,
    tokens: &'t [Token],
    pos: usize,
}

type ParseResult<T> = Result<T, GeneratorError>;

impl<'a, 't> SignatureParser<'a, 't> {
    fn new(src: &'a str, tokens: &'t [Token]) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn at_op(&self, op: &str) -> bool {
        self.peek().is_some_and(|t| t.is_op(op))
    }

    fn eat_op(&mut self, op: &str) -> Option<&'t Token> {
        if self.at_op(op) { self.next() } else { None }
    }

    /// Error spanning from the start of the header to the current token.
    fn error(&self, message: impl Into<String>) -> GeneratorError {
        let start = self.tokens.first().map(|t| t.span).unwrap_or_default();
        let end = self
            .peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(start);
        GeneratorError::error(message, start.to(end))
    }

    fn unexpected(&self, context: &str) -> GeneratorError {
        match self.peek() {
            Some(token) => self.error(format!("unexpected {} {context}", token.describe())),
            None => self.error(format!("unexpected end of definition {context}")),
        }
    }

    fn expect_op(&mut self, op: &str, context: &str) -> ParseResult<&'t Token> {
        match self.eat_op(op) {
            Some(token) => Ok(token),
            None => Err(self.unexpected(&format!("(expected `{op}` {context})"))),
        }
    }

    fn expect_name(&mut self, context: &str) -> ParseResult<String> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Name(n)) if !is_keyword(n) => {
                let n = n.clone();
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.unexpected(&format!("(expected {context})"))),
        }
    }

    fn text(&self, from: usize, to: usize) -> (String, Span) {
        let first = &self.tokens[from];
        let last = &self.tokens[to - 1];
        (
            self.src[first.range.start..last.range.end].to_string(),
            first.span.to(last.span),
        )
    }

    /// Parses the header, failing on the first unreadable token it covers.
    ///
    /// Whether the grammar accepted the tokens or stopped at the bad one, a
    /// definition containing unreadable input is reported once and dropped.
    fn parse_header(&mut self, decorators: Vec<String>) -> ParseResult<FunctionDefinition> {
        let result = self.parse_definition(decorators);
        let reached = match &result {
            Ok(_) => self.pos,
            Err(_) => (self.pos + 1).min(self.tokens.len()),
        };
        let invalid = self.tokens[..reached]
            .iter()
            .find_map(|t| t.lexical_error().map(|e| (t, e)));
        match invalid {
            Some((token, e)) => Err(GeneratorError::error(
                e.message,
                self.tokens[0].span.to(token.span),
            )),
            None => result,
        }
    }

    fn parse_definition(&mut self, decorators: Vec<String>) -> ParseResult<FunctionDefinition> {
        let def = self
            .next()
            .ok_or_else(|| self.error("expected `def`"))?;
        let name = self.expect_name("a function name after `def`")?;
        self.expect_op("(", &format!("after `{name}`"))?;
        let parameters = self.parse_parameters(&name)?;
        let returns = match self.eat_op("->") {
            Some(_) => Some(self.parse_annotation(&[":"])?),
            None => None,
        };
        let colon = self.expect_op(":", &format!("to end the signature of `{name}`"))?;

        Ok(FunctionDefinition {
            name,
            parameters,
            returns,
            decorators,
            span: def.span.to(colon.span),
        })
    }

    fn parse_parameters(&mut self, function: &str) -> ParseResult<Vec<Parameter>> {
        let mut params: Vec<Parameter> = Vec::new();
        let mut seen_slash = false;
        let mut seen_star = false;
        let mut bare_star_open = false;
        let mut seen_default = false;
        let mut seen_kwargs = false;

        loop {
            if self.eat_op(")").is_some() {
                break;
            }
            if seen_kwargs {
                return Err(self.error(format!(
                    "the `**` parameter must be the last parameter of `{function}`"
                )));
            }

            let Some(token) = self.peek() else {
                return Err(self.unexpected("in parameter list (missing `)`?)"));
            };

            if token.is_op("/") {
                if params.is_empty() {
                    return Err(self.error("`/` must follow at least one parameter"));
                }
                if seen_slash {
                    return Err(self.error("`/` may appear only once"));
                }
                if seen_star {
                    return Err(self.error("`/` must come before `*`"));
                }
                self.pos += 1;
                for p in &mut params {
                    p.kind = ParameterKind::PositionalOnly;
                }
                seen_slash = true;
            } else if token.is_op("*") {
                self.pos += 1;
                if seen_star {
                    return Err(self.error(format!("`{function}` may declare only one `*`")));
                }
                seen_star = true;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Name(_))) {
                    let name = self.expect_name("a parameter name after `*`")?;
                    let param = self.parse_variadic(name, ParameterKind::VariadicPositional)?;
                    self.push_param(&mut params, param, function)?;
                } else {
                    bare_star_open = true;
                }
            } else if token.is_op("**") {
                self.pos += 1;
                let name = self.expect_name("a parameter name after `**`")?;
                let param = self.parse_variadic(name, ParameterKind::VariadicKeyword)?;
                self.push_param(&mut params, param, function)?;
                seen_kwargs = true;
            } else if matches!(&token.kind, TokenKind::Name(_)) {
                let name = self.expect_name("a parameter name")?;
                let annotation = match self.eat_op(":") {
                    Some(_) => Some(self.parse_annotation(&[",", ")", "="])?),
                    None => None,
                };
                let default = match self.eat_op("=") {
                    Some(_) => Some(self.parse_default(&name)?),
                    None => None,
                };

                let kind = if seen_star {
                    bare_star_open = false;
                    ParameterKind::KeywordOnly
                } else {
                    if default.is_some() {
                        seen_default = true;
                    } else if seen_default {
                        return Err(self.error(format!(
                            "parameter `{name}` without a default follows a parameter with a default"
                        )));
                    }
                    ParameterKind::Positional
                };

                let param = Parameter {
                    name,
                    annotation,
                    default,
                    kind,
                };
                self.push_param(&mut params, param, function)?;
            } else {
                return Err(self.unexpected(&format!("in parameter list of `{function}`")));
            }

            if self.eat_op(",").is_none() && !self.at_op(")") {
                return Err(self.unexpected("(expected `,` or `)`)"));
            }
        }

        if bare_star_open {
            return Err(self.error(format!(
                "named parameters must follow bare `*` in `{function}`"
            )));
        }
        Ok(params)
    }

    fn parse_variadic(&mut self, name: String, kind: ParameterKind) -> ParseResult<Parameter> {
        let annotation = match self.eat_op(":") {
            Some(_) => Some(self.parse_annotation(&[",", ")", "="])?),
            None => None,
        };
        if self.at_op("=") {
            return Err(self.error(format!(
                "variadic parameter `{name}` cannot have a default value"
            )));
        }
        Ok(Parameter {
            name,
            annotation,
            default: None,
            kind,
        })
    }

    fn push_param(
        &self,
        params: &mut Vec<Parameter>,
        param: Parameter,
        function: &str,
    ) -> ParseResult<()> {
        if params.iter().any(|p| p.name == param.name) {
            return Err(self.error(format!(
                "duplicate parameter `{}` in `{function}`",
                param.name
            )));
        }
        params.push(param);
        Ok(())
    }

    /// Index just past a balanced token run ending before one of `stops`.
    fn scan_balanced(&self, stops: &[&str]) -> ParseResult<usize> {
        let mut stack: Vec<&str> = Vec::new();
        let mut i = self.pos;
        while let Some(token) = self.tokens.get(i) {
            if stack.is_empty() && stops.iter().any(|s| token.is_op(s)) {
                return Ok(i);
            }
            if let TokenKind::Op(op) = token.kind {
                match op {
                    "(" => stack.push(")"),
                    "[" => stack.push("]"),
                    "{" => stack.push("}"),
                    ")" | "]" | "}" => {
                        if stack.pop() != Some(op) {
                            return Err(GeneratorError::error(
                                format!("unbalanced `{op}`"),
                                self.tokens[0].span.to(token.span),
                            ));
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        Err(self.error("unexpected end of definition (unclosed bracket?)"))
    }

    fn parse_default(&mut self, name: &str) -> ParseResult<String> {
        let end = self.scan_balanced(&[",", ")"])?;
        if end == self.pos {
            return Err(self.unexpected(&format!("(expected a default value for `{name}`)")));
        }
        let (text, _) = self.text(self.pos, end);
        self.pos = end;
        Ok(text)
    }

    fn parse_annotation(&mut self, stops: &[&str]) -> ParseResult<Annotation> {
        let start = self.pos;
        let structured = self.parse_type_expr().ok();
        let at_stop = self.peek().is_some_and(|t| stops.iter().any(|s| t.is_op(s)));

        let expr = match structured {
            Some(expr) if at_stop && self.pos > start => expr,
            _ => {
                self.pos = start;
                let end = self.scan_balanced(stops)?;
                if end == start {
                    return Err(self.unexpected("(expected an annotation)"));
                }
                let (text, _) = self.text(start, end);
                self.pos = end;
                TypeExpr::Opaque(text)
            }
        };

        let (text, span) = self.text(start, self.pos);
        Ok(Annotation { expr, text, span })
    }

    // ─────────────────────────────────────────────────────
    // Annotation grammar
    //
    //   expr    ::= primary ('|' primary)*
    //   primary ::= NAME ('.' NAME)* ['[' list ']'] | 'None' | '...'
    //             | STRING | '[' list ']' | '(' [list] ')'
    // ─────────────────────────────────────────────────────

    fn parse_type_expr(&mut self) -> Result<TypeExpr, ()> {
        let first = self.parse_primary()?;
        if !self.at_op("|") {
            return Ok(first);
        }
        let mut members = Vec::new();
        push_flat(&mut members, first);
        while self.eat_op("|").is_some() {
            let next = self.parse_primary()?;
            push_flat(&mut members, next);
        }
        Ok(TypeExpr::BitOr(members))
    }

    fn parse_primary(&mut self) -> Result<TypeExpr, ()> {
        let token = self.next().ok_or(())?;
        match &token.kind {
            TokenKind::Name(n) if n == "None" => Ok(TypeExpr::NoneLiteral),
            TokenKind::Name(n) if !is_keyword(n) => {
                let mut path = vec![n.clone()];
                while self.eat_op(".").is_some() {
                    match self.next().map(|t| &t.kind) {
                        Some(TokenKind::Name(part)) => path.push(part.clone()),
                        _ => return Err(()),
                    }
                }
                if self.eat_op("[").is_some() {
                    let args = self.parse_list("]")?;
                    Ok(TypeExpr::Subscript { base: path, args })
                } else {
                    Ok(TypeExpr::Name(path))
                }
            }
            TokenKind::Op("...") => Ok(TypeExpr::Ellipsis),
            TokenKind::Op("[") => Ok(TypeExpr::List(self.parse_list("]")?)),
            TokenKind::Op("(") => {
                if self.eat_op(")").is_some() {
                    return Ok(TypeExpr::Tuple(Vec::new()));
                }
                let inner = self.parse_type_expr()?;
                if self.eat_op(")").is_some() {
                    return Ok(inner);
                }
                if self.eat_op(",").is_none() {
                    return Err(());
                }
                let mut items = vec![inner];
                items.extend(self.parse_list(")")?);
                Ok(TypeExpr::Tuple(items))
            }
            TokenKind::Str(literal) => Ok(forward_reference(literal)),
            _ => Err(()),
        }
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: &str) -> Result<Vec<TypeExpr>, ()> {
        let mut items = Vec::new();
        loop {
            if self.eat_op(close).is_some() {
                return Ok(items);
            }
            items.push(self.parse_type_expr()?);
            if self.eat_op(",").is_none() {
                return match self.eat_op(close) {
                    Some(_) => Ok(items),
                    None => Err(()),
                };
            }
        }
    }
}

fn push_flat(members: &mut Vec<TypeExpr>, expr: TypeExpr) {
    match expr {
        TypeExpr::BitOr(inner) => members.extend(inner),
        other => members.push(other),
    }
}

/// Reads a string annotation such as `"list[Node]"` as the type it names.
fn forward_reference(literal: &str) -> TypeExpr {
    let prefix_len = literal.find(['\'', '"']).unwrap_or(0);
    let prefix = literal[..prefix_len].to_ascii_lowercase();
    let body = &literal[prefix_len..];
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    if body.len() < quote_len * 2 {
        return TypeExpr::Str(String::new());
    }
    let content = &body[quote_len..body.len() - quote_len];
    if prefix.contains('b') || prefix.contains('f') {
        return TypeExpr::Str(content.to_string());
    }

    let tokens = tokenize(content);
    if tokens.is_empty() || tokens.iter().any(|t| t.lexical_error().is_some()) {
        return TypeExpr::Str(content.to_string());
    }
    let mut inner = SignatureParser::new(content, &tokens);
    match inner.parse_type_expr() {
        Ok(expr) if inner.peek().is_none() => expr,
        _ => TypeExpr::Str(content.to_string()),
    }
}
