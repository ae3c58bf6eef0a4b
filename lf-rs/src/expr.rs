//! Evaluable statements of the command language.
//!
//! [`Expr`] is closed over three variants.  Values are immutable once built;
//! [`Expr::eval`] borrows the [`App`] and an optional [`EvalContext`] and
//! reports every failure through the app's error channel, so a caller
//! evaluating a sequence never has to stop early.

use thiserror::Error;

use crate::app::App;
use crate::builtin;
use crate::opts::OptionError;
use crate::shell::{ShellConfig, ShellError, ShellMode};

/// Deepest nesting of user commands and key bindings before evaluation is
/// refused.
pub const MAX_DEPTH: usize = 32;

// ── CallSource ────────────────────────────────────────────────────────────────

/// Where a `Call` came from, used to attribute errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSource {
    /// Parsed from command text.
    Text,
    /// Built directly by `lf.eval_call`.
    Script,
    /// Dispatched from a key binding by `push`.
    Key,
}

// ── Expr ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `$cmd`, `%cmd`, `!cmd`, `&cmd`.
    Exec { mode: ShellMode, value: String },
    /// `name arg…`: a builtin or a user command from `cmds`.
    Call { name: String, args: Vec<String>, source: CallSource },
    /// `set opt value`.
    Set { opt: String, val: String },
}

/// A parsed binding or user-command body: one or more statements run in
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body(pub Vec<Expr>);

impl Body {
    pub fn eval(&self, app: &App, ctx: Option<&EvalContext>) {
        for e in &self.0 {
            e.eval(app, ctx);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── EvalContext ───────────────────────────────────────────────────────────────

/// State carried into nested evaluation: the positional arguments of the
/// user command being run and how deep the nesting is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalContext {
    pub args: Vec<String>,
    pub depth: usize,
}

impl EvalContext {
    pub fn with_args(args: Vec<String>) -> Self {
        Self { args, depth: 0 }
    }

    /// Context for evaluating a body one level below `parent`.
    pub fn nested(parent: Option<&EvalContext>, what: &str, args: Vec<String>) -> Result<Self, EvalError> {
        let depth = parent.map_or(0, |c| c.depth) + 1;
        if depth > MAX_DEPTH {
            return Err(EvalError::Recursion(what.to_owned()));
        }
        Ok(Self { args, depth })
    }
}

// ── EvalError ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("command not found: {0}")]
    UnknownCommand(String),
    #[error("{0}: recursion limit reached")]
    Recursion(String),
    #[error("{cmd}: {msg}")]
    Usage { cmd: &'static str, msg: String },
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error("lua: {0}")]
    Lua(String),
    #[error("{0}")]
    Other(String),
}

// ── Evaluation ────────────────────────────────────────────────────────────────

impl Expr {
    /// Evaluate for side effects.  Errors go to `app.ui`.
    pub fn eval(&self, app: &App, ctx: Option<&EvalContext>) {
        if let Err(e) = self.try_eval(app, ctx) {
            match (self, &e) {
                (_, EvalError::Lua(_)) => app.ui.echoerrf(format_args!("{e}")),
                (Expr::Call { source: CallSource::Script, .. }, _) => {
                    app.ui.echoerrf(format_args!("lua: {e}"))
                }
                _ => app.ui.echoerrf(format_args!("{e}")),
            }
        }
    }

    /// Evaluate, returning the failure instead of reporting it.
    pub fn try_eval(&self, app: &App, ctx: Option<&EvalContext>) -> Result<(), EvalError> {
        match self {
            Expr::Exec { mode, value } => {
                let cfg = ShellConfig::from_options(&app.opts());
                let args = ctx.map_or(&[][..], |c| c.args.as_slice());
                app.shell.run(*mode, value, args, &cfg, &app.ui)?;
                Ok(())
            }
            Expr::Call { name, args, .. } => eval_call(app, name, args, ctx),
            Expr::Set { opt, val } => {
                app.opts().set(opt, val)?;
                tracing::debug!(target: "lf::opts", "set {opt} {val:?}");
                Ok(())
            }
        }
    }
}

fn eval_call(app: &App, name: &str, args: &[String], ctx: Option<&EvalContext>) -> Result<(), EvalError> {
    if builtin::is_builtin(name) {
        builtin::run(app, name, args, ctx)?;
    } else {
        let body = app
            .opts()
            .cmds
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownCommand(name.to_owned()))?;
        let inner = EvalContext::nested(ctx, name, args.to_vec())?;
        body.eval(app, Some(&inner));
    }
    app.run_command_hook(name, args);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opts::OptValue;
    use crate::parse::parse_body;

    fn call(name: &str, args: &[&str]) -> Expr {
        Expr::Call {
            name: name.into(),
            args: args.iter().map(|&s| s.to_owned()).collect(),
            source: CallSource::Text,
        }
    }

    #[test]
    fn set_mutates_registry() {
        let app = App::new();
        Expr::Set { opt: "tabstop".into(), val: "4".into() }.eval(&app, None);
        assert_eq!(app.opts().get("tabstop"), Some(OptValue::Int(4)));
        assert!(app.ui.errors().is_empty());
    }

    #[test]
    fn bad_set_reports_and_leaves_value() {
        let app = App::new();
        Expr::Set { opt: "tabstop".into(), val: "x".into() }.eval(&app, None);
        assert_eq!(app.opts().tabstop, 8);
        assert_eq!(app.ui.errors(), vec!["tabstop: value should be an integer"]);
    }

    #[test]
    fn unknown_command_is_reported_not_fatal() {
        let app = App::new();
        call("frobnicate", &[]).eval(&app, None);
        call("echo", &["after"]).eval(&app, None);
        assert_eq!(app.ui.errors(), vec!["command not found: frobnicate"]);
        assert_eq!(app.ui.messages(), vec!["after"]);
    }

    #[test]
    fn script_calls_are_attributed() {
        let app = App::new();
        Expr::Call { name: "nope".into(), args: vec![], source: CallSource::Script }.eval(&app, None);
        assert_eq!(app.ui.errors(), vec!["lua: command not found: nope"]);
    }

    #[test]
    fn user_command_runs_its_body() {
        let app = App::new();
        app.opts()
            .cmds
            .insert("greet".into(), parse_body(":echo hello; echo world").unwrap());
        call("greet", &[]).eval(&app, None);
        assert_eq!(app.ui.messages(), vec!["hello", "world"]);
    }

    #[test]
    fn builtins_shadow_user_commands() {
        let app = App::new();
        app.opts().cmds.insert("echo".into(), parse_body("echoerr shadowed").unwrap());
        call("echo", &["builtin"]).eval(&app, None);
        assert_eq!(app.ui.messages(), vec!["builtin"]);
        assert!(app.ui.errors().is_empty());
    }

    #[test]
    fn self_recursive_command_is_bounded() {
        let app = App::new();
        app.opts().cmds.insert("loop".into(), parse_body("loop").unwrap());
        call("loop", &[]).eval(&app, None);
        assert_eq!(app.ui.errors(), vec!["loop: recursion limit reached"]);
    }

    #[cfg(unix)]
    #[test]
    fn user_command_args_reach_shell_body() {
        let app = App::new();
        app.opts()
            .cmds
            .insert("show".into(), parse_body(r#"%echo "got $1""#).unwrap());
        call("show", &["x"]).eval(&app, None);
        assert_eq!(app.ui.messages(), vec!["got x"]);
    }

    #[test]
    fn nested_context_depth() {
        let a = EvalContext::nested(None, "a", vec![]).unwrap();
        assert_eq!(a.depth, 1);
        let b = EvalContext::nested(Some(&a), "b", vec!["x".into()]).unwrap();
        assert_eq!(b.depth, 2);
        assert_eq!(b.args, vec!["x"]);
        let deep = EvalContext { args: vec![], depth: MAX_DEPTH };
        assert!(matches!(
            EvalContext::nested(Some(&deep), "c", vec![]),
            Err(EvalError::Recursion(_))
        ));
    }
}
