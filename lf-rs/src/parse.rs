//! Command-language parser.
//!
//! A [`Parser`] is a cursor over one piece of command text.  Each call to
//! [`Parser::parse`] yields at most one [`Expr`]:
//!
//! ```rust
//! use lf::parse::Parser;
//!
//! let mut p = Parser::new("set number; echo hi");
//! let mut n = 0;
//! while p.parse() {
//!     n += 1;
//! }
//! assert_eq!(n, 2);
//! assert!(p.err().is_none());
//! ```
//!
//! ## Syntax
//!
//! - Statements end at `;` or newline; `#` at the start of a token begins a
//!   comment that runs to end of line.
//! - `"…"` quotes with `\"`/`\\` escapes, `'…'` quotes literally, and a bare
//!   `\` escapes the next character.
//! - `$ % ! &` start a shell statement that runs to end of line (semicolons
//!   belong to the shell) or spans a `{{ … }}` block.
//! - `set opt [value]` is a `Set`.
//! - `map key body`, `cmap key body`, `cmd name body` keep the body as raw
//!   text; the builtin parses it with [`parse_body`] when it runs.
//! - `lua code` takes the rest of the line (or a `{{ … }}` block) verbatim as
//!   its single argument.
//! - Anything else is a `Call` of the first word with the rest as arguments.

use thiserror::Error;

use crate::expr::{Body, CallSource, Expr};
use crate::shell::ShellMode;

// ── Errors ────────────────────────────────────────────────────────────────────

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated quote {0:?}")]
    UnterminatedQuote(char),
    #[error("unterminated '{{{{' block")]
    UnterminatedBlock,
    #[error("missing shell command after '{0}'")]
    MissingShellCommand(char),
    #[error("set: missing option name")]
    MissingOption,
    #[error("set: too many arguments")]
    TooManyArgs,
    #[error("{0}: missing name")]
    MissingName(String),
    #[error("empty command name")]
    EmptyName,
}

/// A syntax error with the 1-based position where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{col}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub kind: ParseErrorKind,
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Restartable cursor producing one [`Expr`] per successful [`Parser::parse`].
///
/// `parse` returns `false` both at end of input and on a syntax error;
/// [`Parser::err`] tells the two apart.  After an error the parser stays
/// stopped.
#[derive(Debug)]
pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    expr: Option<Expr>,
    err: Option<ParseError>,
    err_yielded: bool,
}

impl Parser {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            expr: None,
            err: None,
            err_yielded: false,
        }
    }

    /// Advance to the next expression.
    pub fn parse(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.next_expr() {
            Ok(Some(e)) => {
                self.expr = Some(e);
                true
            }
            Ok(None) => {
                self.expr = None;
                false
            }
            Err(e) => {
                self.expr = None;
                self.err = Some(e);
                false
            }
        }
    }

    /// The expression produced by the last successful [`Parser::parse`].
    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// Move the current expression out of the parser.
    pub fn take_expr(&mut self) -> Option<Expr> {
        self.expr.take()
    }

    /// The syntax error that stopped the parser, if any.
    pub fn err(&self) -> Option<&ParseError> {
        self.err.as_ref()
    }

    // ── Cursor primitives ─────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn starts_with_at(&self, n: usize, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(n + i) == Some(c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error_at(&self, line: usize, col: usize, kind: ParseErrorKind) -> ParseError {
        ParseError { line, col, kind }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Skip whitespace, statement separators and comments.
    fn skip_separators(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '#' => self.skip_line(),
                c if c.is_whitespace() || c == ';' => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// Skip blanks within a statement, honouring `\`-newline continuation.
    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
    }

    // ── Statements ────────────────────────────────────────────────────────

    fn next_expr(&mut self) -> Result<Option<Expr>, ParseError> {
        self.skip_separators();
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let (line, col) = (self.line, self.col);

        if let Some(mode) = ShellMode::from_prefix(c) {
            self.bump();
            let value = self.shell_text()?;
            if value.is_empty() {
                return Err(self.error_at(line, col, ParseErrorKind::MissingShellCommand(c)));
            }
            return Ok(Some(Expr::Exec { mode, value }));
        }

        let name = self.word()?.unwrap_or_default();
        if name.is_empty() {
            return Err(self.error_at(line, col, ParseErrorKind::EmptyName));
        }

        let expr = match name.as_str() {
            "set" => {
                let opt = self
                    .word()?
                    .ok_or_else(|| self.error_at(self.line, self.col, ParseErrorKind::MissingOption))?;
                let val = self.word()?.unwrap_or_default();
                if self.word()?.is_some() {
                    return Err(self.error_at(line, col, ParseErrorKind::TooManyArgs));
                }
                Expr::Set { opt, val }
            }
            "map" | "cmap" | "cmd" => {
                let key = self.word()?.ok_or_else(|| {
                    self.error_at(self.line, self.col, ParseErrorKind::MissingName(name.clone()))
                })?;
                let mut args = vec![key];
                self.skip_blanks();
                if let Some(body) = self.raw_body()? {
                    args.push(body);
                }
                Expr::Call { name, args, source: CallSource::Text }
            }
            "lua" => {
                self.skip_blanks();
                let code = self.shell_text()?;
                let args = if code.is_empty() { Vec::new() } else { vec![code] };
                Expr::Call { name, args, source: CallSource::Text }
            }
            _ => {
                let mut args = Vec::new();
                while let Some(w) = self.word()? {
                    args.push(w);
                }
                Expr::Call { name, args, source: CallSource::Text }
            }
        };
        Ok(Some(expr))
    }

    /// Read one word, or `None` at the end of the statement.
    fn word(&mut self) -> Result<Option<String>, ParseError> {
        self.skip_blanks();
        match self.peek() {
            None | Some(';' | '\n' | '#') => return Ok(None),
            _ => {}
        }

        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ';' {
                break;
            }
            let (line, col) = (self.line, self.col);
            match c {
                '"' => {
                    self.bump();
                    loop {
                        match self.bump() {
                            None => {
                                return Err(self.error_at(line, col, ParseErrorKind::UnterminatedQuote('"')))
                            }
                            Some('"') => break,
                            Some('\\') => match self.bump() {
                                Some(e @ ('"' | '\\')) => out.push(e),
                                Some(other) => {
                                    out.push('\\');
                                    out.push(other);
                                }
                                None => {
                                    return Err(self.error_at(line, col, ParseErrorKind::UnterminatedQuote('"')))
                                }
                            },
                            Some(ch) => out.push(ch),
                        }
                    }
                }
                '\'' => {
                    self.bump();
                    loop {
                        match self.bump() {
                            None => {
                                return Err(self.error_at(line, col, ParseErrorKind::UnterminatedQuote('\'')))
                            }
                            Some('\'') => break,
                            Some(ch) => out.push(ch),
                        }
                    }
                }
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some('\n') => {}
                        Some(ch) => out.push(ch),
                        None => out.push('\\'),
                    }
                }
                ch => {
                    out.push(ch);
                    self.bump();
                }
            }
        }
        Ok(Some(out))
    }

    /// Shell text after a prefix: a `{{ … }}` block or the rest of the line.
    fn shell_text(&mut self) -> Result<String, ParseError> {
        if self.starts_with_at(0, "{{") {
            let (line, col) = (self.line, self.col);
            self.bump();
            self.bump();
            let text = self.block_contents(line, col)?;
            return Ok(text.trim().to_owned());
        }
        let start = self.pos;
        self.skip_line();
        Ok(self.chars[start..self.pos].iter().collect::<String>().trim().to_owned())
    }

    /// Consume up to and including the closing `}}`, returning what was inside.
    fn block_contents(&mut self, line: usize, col: usize) -> Result<String, ParseError> {
        let start = self.pos;
        while self.peek().is_some() {
            if self.starts_with_at(0, "}}") {
                let inner: String = self.chars[start..self.pos].iter().collect();
                self.bump();
                self.bump();
                return Ok(inner);
            }
            self.bump();
        }
        Err(self.error_at(line, col, ParseErrorKind::UnterminatedBlock))
    }

    /// The body of a `map`/`cmap`/`cmd` statement as raw source text.
    fn raw_body(&mut self) -> Result<Option<String>, ParseError> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        if matches!(c, ';' | '\n' | '#') {
            return Ok(None);
        }
        let start = self.pos;
        let (line, col) = (self.line, self.col);

        let mut lead = usize::from(c == ':');
        if self.peek_at(lead).and_then(ShellMode::from_prefix).is_some() {
            lead += 1;
        }
        if lead > 0 {
            if self.starts_with_at(lead, "{{") {
                for _ in 0..lead + 2 {
                    self.bump();
                }
                self.block_contents(line, col)?;
            } else {
                self.skip_line();
            }
            let raw: String = self.chars[start..self.pos].iter().collect();
            return Ok(Some(raw.trim_end().to_owned()));
        }

        let mut quote: Option<char> = None;
        while let Some(ch) = self.peek() {
            match (quote, ch) {
                (None, ';' | '\n') => break,
                (None, '"' | '\'') => quote = Some(ch),
                (Some(q), ch) if ch == q => quote = None,
                (Some('\''), _) => {}
                (_, '\\') => {
                    self.bump();
                }
                _ => {}
            }
            self.bump();
        }
        if let Some(q) = quote {
            return Err(self.error_at(line, col, ParseErrorKind::UnterminatedQuote(q)));
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        Ok(Some(raw.trim_end().to_owned()))
    }
}

impl Iterator for Parser {
    type Item = Result<Expr, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.parse() {
            return self.take_expr().map(Ok);
        }
        if self.err_yielded {
            return None;
        }
        self.err_yielded = true;
        self.err.clone().map(Err)
    }
}

// ── Convenience entry points ──────────────────────────────────────────────────

/// Parse every statement in `text`, stopping at the first syntax error.
pub fn parse_all(text: &str) -> Result<Vec<Expr>, ParseError> {
    Parser::new(text).collect()
}

/// Parse the body of a binding or user command.
///
/// Accepts a plain statement (`echo hi`), a shell statement (`$ls`), or a
/// `:` list (`:a; b` or `:{{ … }}`).
pub fn parse_body(text: &str) -> Result<Body, ParseError> {
    let t = text.trim();
    let t = t.strip_prefix(':').map_or(t, str::trim_start);
    let t = t
        .strip_prefix("{{")
        .and_then(|r| r.strip_suffix("}}"))
        .unwrap_or(t);
    Ok(Body(parse_all(t)?))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
