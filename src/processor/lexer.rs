//! Small hand-written lexer for Python source.
//!
//! Only what the signature parser needs is recognised: names, numbers,
//! string literals (so that their contents are never mistaken for code) and
//! operators. Keywords come out as `Name("def")`, `Name("class")`, ... and
//! are interpreted by the parser.
//!
//! Lexical problems never stop the lexer. They come out as `Invalid` tokens
//! in the stream so the parser can pin them on the definition they break.
//
//  Lexical items:
//
//      Name     ::= (letter | '_') (letter | digit | '_')*
//      Number   ::= digit (alnum | '_' | '.' | exponent sign)*
//      Str      ::= prefix? (''' … ''' | """ … """ | ' … ' | " … ")
//      Op       ::= longest match from OPERATORS
//
//  Whitespace, comments (# until end-of-line) and backslash continuations
//  are discarded. A single-quoted string missing its closing quote ends at
//  the end of its line. Every token records the bracket depth it was read at
//  and whether it is the first token on its physical line, which is all the
//  parser needs to find statements.

use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use crate::model::{GeneratorError, Position, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number(String),
    /// Full literal text, prefix and quotes included.
    Str(String),
    Op(&'static str),
    /// Unreadable input, carrying the lexical error message.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Byte range in the source text.
    pub range: Range<usize>,
    /// Open brackets enclosing the token.
    pub depth: usize,
    /// First token on its physical line (continuations excluded).
    pub first_on_line: bool,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Op(o) if o == op)
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Name(n) | TokenKind::Number(n) => format!("`{n}`"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Op(o) => format!("`{o}`"),
            TokenKind::Invalid(_) => "invalid input".to_string(),
        }
    }

    /// The error an `Invalid` token stands for.
    pub fn lexical_error(&self) -> Option<GeneratorError> {
        match &self.kind {
            TokenKind::Invalid(message) => Some(GeneratorError::error(message.clone(), self.span)),
            _ => None,
        }
    }
}

const OPERATORS: &[&str] = &[
    "...", "**=", "//=", ">>=", "<<=", //
    "->", "**", "//", "==", "!=", "<=", ">=", ":=", "<<", ">>", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=", //
    "(", ")", "[", "]", "{", "}", ":", ",", ";", ".", "+", "-", "*", "/", "%", "@", "=", "<",
    ">", "&", "|", "^", "~", "!",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

#[derive(Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    depth: usize,
    new_line: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 0,
            column: 0,
            depth: 0,
            new_line: true,
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |&(i, _)| i)
    }

    fn rest(&mut self) -> &'a str {
        let offset = self.offset();
        &self.src[offset..]
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn next_char(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Skips blanks, comments, newlines and line continuations.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\x0c' | '\r' => {
                    self.next_char();
                }
                '\n' => {
                    self.next_char();
                    self.new_line = true;
                }
                '#' => self.consume_while(|c| c != '\n'),
                '\\' if self.rest()[1..].starts_with('\n') || self.rest()[1..].starts_with("\r\n") => {
                    self.next_char();
                    self.consume_while(|c| c == '\r');
                    self.next_char();
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) {
        self.consume_while(|c| c.is_alphanumeric() || c == '_');
    }

    fn read_number(&mut self) {
        let mut prev = '\0';
        while let Some(c) = self.peek_char() {
            let exponent_sign = (c == '+' || c == '-') && (prev == 'e' || prev == 'E');
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                prev = c;
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Reads a string body; the opening quote has not been consumed yet.
    /// Returns false when the closing quote is missing.
    fn read_string(&mut self) -> bool {
        let Some(quote) = self.next_char() else {
            return false;
        };
        let triple = if self.rest().starts_with(&format!("{quote}{quote}")) {
            self.next_char();
            self.next_char();
            true
        } else {
            false
        };

        loop {
            if !triple && self.peek_char() == Some('\n') {
                return false;
            }
            let Some(c) = self.next_char() else {
                return false;
            };
            match c {
                // Escapes, including a backslash-newline inside a single-quoted string.
                '\\' => {
                    self.next_char();
                }
                c if c == quote && !triple => return true,
                c if c == quote && self.rest().starts_with(&format!("{quote}{quote}")) => {
                    self.next_char();
                    self.next_char();
                    return true;
                }
                _ => {}
            }
        }
    }

    fn string_kind(&mut self, begin: usize) -> TokenKind {
        if self.read_string() {
            TokenKind::Str(self.src[begin..self.offset()].to_string())
        } else {
            TokenKind::Invalid("unterminated string literal".to_string())
        }
    }

    fn read_operator(&mut self) -> Option<&'static str> {
        let rest = self.rest();
        let op = OPERATORS.iter().copied().find(|op| rest.starts_with(op))?;
        for _ in 0..op.len() {
            self.next_char();
        }
        Some(op)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();

        let begin = self.offset();
        let start = self.here();
        let ch = self.peek_char()?;
        let first_on_line = std::mem::replace(&mut self.new_line, false);
        let depth = self.depth;

        let kind = match ch {
            '\'' | '"' => self.string_kind(begin),
            c if c.is_alphabetic() || c == '_' => {
                self.read_identifier();
                let word = &self.src[begin..self.offset()];
                let is_prefix = STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str());
                if is_prefix && matches!(self.peek_char(), Some('\'' | '"')) {
                    self.string_kind(begin)
                } else {
                    TokenKind::Name(word.to_string())
                }
            }
            c if c.is_ascii_digit() => {
                self.read_number();
                TokenKind::Number(self.src[begin..self.offset()].to_string())
            }
            '.' if self.rest()[1..].starts_with(|c: char| c.is_ascii_digit()) => {
                self.read_number();
                TokenKind::Number(self.src[begin..self.offset()].to_string())
            }
            c => match self.read_operator() {
                Some(op) => {
                    match op {
                        "(" | "[" | "{" => self.depth += 1,
                        ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
                        _ => {}
                    }
                    TokenKind::Op(op)
                }
                None => {
                    self.next_char();
                    TokenKind::Invalid(format!("unexpected character `{c}`"))
                }
            },
        };

        Some(Token {
            kind,
            span: Span::new(start, self.here()),
            range: begin..self.offset(),
            depth,
            first_on_line,
        })
    }
}

/// Runs the lexer to completion.
pub fn tokenize(src: &str) -> Vec<Token> {
    Lexer::new(src).collect()
}
