//! The lf command language and its Lua scripting bridge.
//!
//! Command text is parsed by [`parse::Parser`] into [`expr::Expr`] values
//! which evaluate against an [`app::App`]: the option registry, the status
//! line and the shell runner.  [`lua::ScriptBridge`] embeds a Lua 5.4
//! interpreter that can drive the same evaluator, and [`hook`] runs script
//! listeners after each command.

pub mod app;
pub mod builtin;
pub mod cli;
pub mod config;
pub mod expr;
pub mod hook;
pub mod lua;
pub mod marshal;
pub mod opts;
pub mod parse;
pub mod shell;
pub mod ui;

pub use app::App;
pub use expr::{Body, CallSource, EvalContext, EvalError, Expr};
pub use lua::ScriptBridge;
pub use opts::{OptValue, OptionError, Options};
pub use parse::{ParseError, Parser};
