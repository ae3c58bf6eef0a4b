//! Message and error surfaces.
//!
//! The terminal front end is not part of this crate; [`Ui`] collects the
//! lines that would be shown on the status line so the binary (or a test)
//! can drain and print them.  Every evaluation failure in the crate ends up
//! here instead of propagating to the caller.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

// ── UiLine ────────────────────────────────────────────────────────────────────

/// One line written to the status area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiLine {
    /// Plain output (`echo`, `echomsg`, `%` capture).
    Msg(String),
    /// Error output (`echoerr`, parse and evaluation failures).
    Err(String),
}

impl UiLine {
    pub fn text(&self) -> &str {
        match self {
            UiLine::Msg(s) | UiLine::Err(s) => s,
        }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, UiLine::Err(_))
    }
}

impl fmt::Display for UiLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

// ── Ui ────────────────────────────────────────────────────────────────────────

/// Shared, cloneable handle to the status-line buffer.
#[derive(Debug, Clone, Default)]
pub struct Ui {
    lines: Arc<Mutex<Vec<UiLine>>>,
}

impl Ui {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: UiLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Show a plain message.
    pub fn echo(&self, msg: impl Into<String>) {
        self.push(UiLine::Msg(msg.into()));
    }

    /// Show an error message.
    pub fn echoerr(&self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::debug!(target: "lf::ui", "echoerr: {msg}");
        self.push(UiLine::Err(msg));
    }

    /// Formatted variant of [`Ui::echoerr`]; use with `format_args!`.
    pub fn echoerrf(&self, args: fmt::Arguments<'_>) {
        self.echoerr(args.to_string());
    }

    /// Remove and return everything written so far.
    pub fn drain(&self) -> Vec<UiLine> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Copy of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<UiLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Buffered error texts only.
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|l| match l {
                UiLine::Err(s) => Some(s),
                UiLine::Msg(_) => None,
            })
            .collect()
    }

    /// Buffered message texts only.
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|l| match l {
                UiLine::Msg(s) => Some(s),
                UiLine::Err(_) => None,
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
