//! The host application handle.
//!
//! [`App`] is a cheap, cloneable handle over the shared host state: the
//! option registry (locked as a whole), the status-line [`Ui`], the
//! [`Shell`] runner and, once [`App::init_script`] has run, the Lua
//! [`ScriptBridge`].  Expressions borrow an `App` to evaluate; the bridge's
//! Lua callbacks hold a copy without the bridge so the interpreter never
//! owns itself.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mlua::Lua;

use crate::hook;
use crate::lua::{self, ScriptBridge};
use crate::opts::Options;
use crate::parse::Parser;
use crate::shell::Shell;
use crate::ui::Ui;

#[derive(Clone, Default)]
pub struct App {
    opts: Arc<Mutex<Options>>,
    pub ui: Ui,
    pub shell: Shell,
    quit: Arc<AtomicBool>,
    script: Option<ScriptBridge>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the option registry.  Do not hold the guard across evaluation.
    pub fn opts(&self) -> MutexGuard<'_, Options> {
        self.opts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Script bridge lifecycle ───────────────────────────────────────────

    /// Create the Lua interpreter and install the `lf` library.  Calling it
    /// again replaces the interpreter, dropping every registered hook.
    pub fn init_script(&mut self) {
        match ScriptBridge::new(self) {
            Ok(bridge) => self.script = Some(bridge),
            Err(e) => {
                self.script = None;
                self.ui.echoerrf(format_args!("lua: {}", lua::error_line(&e)));
            }
        }
    }

    /// Tear the interpreter down.
    pub fn close_script(&mut self) {
        self.script = None;
    }

    pub fn script(&self) -> Option<&ScriptBridge> {
        self.script.as_ref()
    }

    /// Copy of this handle without the bridge, for capture by Lua callbacks.
    pub(crate) fn detached(&self) -> App {
        App { script: None, ..self.clone() }
    }

    /// Copy of this handle bound to the interpreter currently calling back.
    pub(crate) fn attached(&self, lua: &Lua) -> App {
        App {
            script: Some(ScriptBridge::from_lua(lua.clone())),
            ..self.clone()
        }
    }

    // ── Entry points ──────────────────────────────────────────────────────

    /// Parse `text` and evaluate every statement in order.  A syntax error
    /// stops the loop and is reported; statements before it have already run.
    pub fn eval_text(&self, text: &str) {
        let mut p = Parser::new(text);
        while p.parse() {
            if let Some(e) = p.take_expr() {
                e.eval(self, None);
            }
        }
        if let Some(err) = p.err() {
            self.ui.echoerrf(format_args!("{err}"));
        }
    }

    /// Run Lua source with `args` bound to the global `argv`.
    pub fn run_lua(&self, text: &str, args: &[String]) {
        let Some(script) = &self.script else {
            self.ui.echoerr("lua: scripting is not initialised");
            return;
        };
        if let Err(e) = script.run(text, args) {
            self.ui.echoerrf(format_args!("lua: {}", lua::error_line(&e)));
        }
    }

    /// Load and run a Lua file.
    pub fn source_lua(&self, path: &Path) {
        let Some(script) = &self.script else {
            self.ui.echoerr("lua: scripting is not initialised");
            return;
        };
        if let Err(e) = script.source(path) {
            self.ui.echoerrf(format_args!("lua: {}", lua::error_line(&e)));
        }
    }

    /// Run the script listeners registered for `cmd`.  A no-op without a
    /// bridge or without listeners; each failing listener is reported.
    pub fn run_command_hook(&self, cmd: &str, args: &[String]) {
        let Some(script) = &self.script else {
            return;
        };
        match hook::run_command_hook(script.lua(), cmd, args) {
            Ok(errors) => {
                for e in errors {
                    self.ui.echoerrf(format_args!("hook {cmd}: {e}"));
                }
            }
            Err(e) => self.ui.echoerrf(format_args!("hook {cmd}: {}", lua::error_line(&e))),
        }
    }

    /// Ask the script's `complete` function for matches.  Returns no matches
    /// when it is undefined or fails.
    pub fn complete(&self, tokens: &[String]) -> (Vec<String>, String) {
        let Some(script) = &self.script else {
            return (Vec::new(), String::new());
        };
        script.complete(tokens).unwrap_or_else(|e| {
            self.ui.echoerrf(format_args!("lua: {}", lua::error_line(&e)));
            (Vec::new(), String::new())
        })
    }

    // ── Quit flag ─────────────────────────────────────────────────────────

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Relaxed);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
