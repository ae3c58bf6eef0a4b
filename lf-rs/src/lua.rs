//! Lua 5.4 scripting via the `mlua` crate.
//!
//! One [`ScriptBridge`] wraps one interpreter.  Creating it registers the
//! native `lf` library, makes it `require`-able, then runs the bundled
//! helpers from `lua/lf.lua`.  Clones share the interpreter.
//!
//! # Commands
//!
//! | lf command        | Rust method                          |
//! |-------------------|--------------------------------------|
//! | `lua code…`       | [`ScriptBridge::run`]                |
//! | `luasource path`  | [`ScriptBridge::source`]             |
//!
//! # Lua API
//!
//! | Lua function                         | Effect                                     |
//! |--------------------------------------|--------------------------------------------|
//! | `lf.eval(text)`                      | parse and evaluate command text            |
//! | `lf.eval_exec(prefix, cmd, args…)`   | run a shell statement (`$ % ! &`)          |
//! | `lf.eval_call(name, args…)`          | call a command; blank name does nothing    |
//! | `lf.set(opt, value)`                 | `set opt value`                            |
//! | `lf.unmap(key)`                      | remove a normal-mode binding               |
//! | `lf.log(msg)`                        | write to the log                           |
//! | `lf.get(opt)`                        | option value(s), or `nil, message`         |
//! | `lf.register_command_hook(cmd, f)`   | run `f(args…)` after every `cmd`           |
//! | `stringsplit(s, sep)`                | split `s` on `sep` into multiple returns   |
//!
//! Helpers from the bundled library: `lf.echo`, `lf.echomsg`, `lf.echoerr`,
//! `lf.shell`, `lf.shell_pipe`, `lf.shell_wait`, `lf.shell_async`, `lf.push`,
//! `lf.cmd`, `lf.map`, `lf.cmap`.

use std::path::Path;

use mlua::prelude::*;
use mlua::{FromLuaMulti, Variadic};

use crate::app::App;
use crate::expr::{CallSource, EvalContext, Expr};
use crate::marshal;
use crate::shell::ShellMode;

const HELPERS: &str = include_str!("lua/lf.lua");

/// A Lua interpreter with the `lf` library installed.
#[derive(Clone)]
pub struct ScriptBridge {
    lua: Lua,
}

impl ScriptBridge {
    /// Create a new interpreter bound to `app`.  A failure in the bundled
    /// helpers is reported through `app.ui`; the native library still works.
    pub fn new(app: &App) -> LuaResult<Self> {
        let lua = Lua::new();
        register_api(&lua, app.detached())?;
        if let Err(e) = lua.load(HELPERS).set_name("=lf.lua").exec() {
            app.ui.echoerrf(format_args!("lua: {}", error_line(&e)));
        }
        tracing::debug!(target: "lf::lua", "interpreter ready");
        Ok(Self { lua })
    }

    pub(crate) fn from_lua(lua: Lua) -> Self {
        Self { lua }
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    // ── Running code ──────────────────────────────────────────────────────

    /// Run a chunk with `args` in the global `argv` (1-indexed).  The
    /// previous `argv` is put back afterwards, so a script that runs `lua`
    /// through a command keeps its own arguments.
    pub fn run(&self, text: &str, args: &[String]) -> LuaResult<()> {
        let globals = self.lua.globals();
        let outer: LuaValue = globals.get("argv")?;
        let argv = self.lua.create_sequence_from(args.iter().map(String::as_str))?;
        globals.set("argv", argv)?;
        let result = self.lua.load(text).set_name("=lua").exec();
        globals.set("argv", outer)?;
        result
    }

    /// Load and execute a Lua source file.
    pub fn source(&self, path: &Path) -> LuaResult<()> {
        tracing::info!(target: "lf::lua", "luasource: {}", path.display());
        self.lua.load(path).exec()
    }

    /// Execute a chunk without touching `argv`.
    pub fn exec(&self, chunk: &str) -> LuaResult<()> {
        self.lua.load(chunk).set_name("=lua").exec()
    }

    /// Evaluate a Lua expression and return its value.
    pub fn eval<R: FromLuaMulti>(&self, expr: &str) -> LuaResult<R> {
        self.lua.load(expr).set_name("=lua").eval()
    }

    // ── Completion ────────────────────────────────────────────────────────

    /// Call the global `complete(tokens…)`.  The last returned value, when it
    /// is a string or number, is the longest common prefix; the others are
    /// the matches, in reverse of the order they were returned.  Values that
    /// are neither strings nor numbers are skipped.
    pub fn complete(&self, tokens: &[String]) -> LuaResult<(Vec<String>, String)> {
        let LuaValue::Function(f) = self.lua.globals().get::<LuaValue>("complete")? else {
            return Ok((Vec::new(), String::new()));
        };
        let args: Variadic<&str> = tokens.iter().map(String::as_str).collect();
        let mut values: Vec<LuaValue> = f.call::<Variadic<LuaValue>>(args)?.iter().cloned().collect();

        let longest = match values.last() {
            Some(v) if marshal::is_text(v) => {
                let s = marshal::to_host_string(v);
                values.pop();
                s
            }
            _ => String::new(),
        };
        let matches = values
            .iter()
            .rev()
            .filter(|v| marshal::is_text(v))
            .map(marshal::to_host_string)
            .collect();
        Ok((matches, longest))
    }
}

/// The first line of a Lua error.  Runtime errors carry a traceback that
/// does not belong on the status line; it goes to the log instead.
pub(crate) fn error_line(e: &LuaError) -> String {
    let text = e.to_string();
    tracing::debug!(target: "lf::lua", "{text}");
    text.lines().next().unwrap_or_default().to_owned()
}

// ── lf library registration ───────────────────────────────────────────────────

fn register_api(lua: &Lua, host: App) -> LuaResult<()> {
    let lf = lua.create_table()?;

    // lf.eval(text)
    {
        let host = host.clone();
        lf.set(
            "eval",
            lua.create_function(move |lua, text: LuaValue| {
                host.attached(lua).eval_text(&marshal::to_host_string(&text));
                Ok(())
            })?,
        )?;
    }

    // lf.eval_exec(prefix, cmd, args…)
    {
        let host = host.clone();
        lf.set(
            "eval_exec",
            lua.create_function(move |lua, args: Variadic<LuaValue>| {
                let app = host.attached(lua);
                match marshal::arg(&args, 0).parse::<ShellMode>() {
                    Ok(mode) => {
                        let ctx = EvalContext::with_args(marshal::rest(&args, 2));
                        Expr::Exec { mode, value: marshal::arg(&args, 1) }.eval(&app, Some(&ctx));
                    }
                    Err(e) => app.ui.echoerrf(format_args!("lua: {e}")),
                }
                Ok(())
            })?,
        )?;
    }

    // lf.eval_call(name, args…)
    {
        let host = host.clone();
        lf.set(
            "eval_call",
            lua.create_function(move |lua, args: Variadic<LuaValue>| {
                let name = marshal::arg(&args, 0);
                if name.trim().is_empty() {
                    return Ok(());
                }
                let call = Expr::Call {
                    name,
                    args: marshal::rest(&args, 1),
                    source: CallSource::Script,
                };
                call.eval(&host.attached(lua), None);
                Ok(())
            })?,
        )?;
    }

    // lf.set(opt, value)
    {
        let host = host.clone();
        lf.set(
            "set",
            lua.create_function(move |lua, (opt, val): (LuaValue, LuaValue)| {
                let set = Expr::Set {
                    opt: marshal::to_host_string(&opt),
                    val: marshal::to_host_string(&val),
                };
                set.eval(&host.attached(lua), None);
                Ok(())
            })?,
        )?;
    }

    // lf.unmap(key)
    {
        let host = host.clone();
        lf.set(
            "unmap",
            lua.create_function(move |_, key: LuaValue| {
                host.opts().keys.remove(&marshal::to_host_string(&key));
                Ok(())
            })?,
        )?;
    }

    // lf.log(msg)
    lf.set(
        "log",
        lua.create_function(|_, msg: LuaValue| {
            tracing::info!(target: "lf::lua", "{}", marshal::to_host_string(&msg));
            Ok(())
        })?,
    )?;

    // lf.get(opt) → value… | nil, message
    {
        let host = host.clone();
        lf.set(
            "get",
            lua.create_function(move |lua, name: LuaValue| {
                let name = marshal::to_host_string(&name);
                let value = host.opts().get(&name);
                marshal::opt_to_lua(lua, &name, value)
            })?,
        )?;
    }

    let globals = lua.globals();
    globals.set("lf", lf.clone())?;
    let loaded: LuaTable = globals.get::<LuaTable>("package")?.get("loaded")?;
    loaded.set("lf", lf)?;

    // stringsplit(s, sep) → piece…
    globals.set(
        "stringsplit",
        lua.create_function(|_, (s, sep): (LuaValue, LuaValue)| {
            let s = marshal::to_host_string(&s);
            let sep = marshal::to_host_string(&sep);
            let pieces: Variadic<String> = if sep.is_empty() {
                s.chars().map(String::from).collect()
            } else {
                s.split(sep.as_str()).map(str::to_owned).collect()
            };
            Ok(pieces)
        })?,
    )?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opts::OptValue;

    fn make_app() -> App {
        let mut app = App::new();
        app.init_script();
        assert!(app.ui.errors().is_empty(), "{:?}", app.ui.errors());
        app
    }

    fn run(app: &App, code: &str) {
        app.script().unwrap().exec(code).unwrap();
    }

    // ── lf.get ────────────────────────────────────────────────────────────

    #[test]
    fn get_scalar_options() {
        let app = make_app();
        let eng = app.script().unwrap();
        assert_eq!(eng.eval::<i64>("lf.get('tabstop')").unwrap(), 8);
        assert!(!eng.eval::<bool>("lf.get('number')").unwrap());
        assert_eq!(eng.eval::<String>("lf.get('shellflag')").unwrap(), "-c");
    }

    #[test]
    fn get_list_spreads() {
        let app = make_app();
        let v: (i64, i64, i64) = app.script().unwrap().eval("lf.get('ratios')").unwrap();
        assert_eq!(v, (1, 2, 3));
    }

    #[test]
    fn get_empty_list_returns_nothing() {
        let app = make_app();
        app.opts().hiddenfiles.clear();
        let n: i64 = app.script().unwrap().eval("select('#', lf.get('hiddenfiles'))").unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn get_unknown_option() {
        let app = make_app();
        let (v, msg): (LuaValue, String) = app.script().unwrap().eval("lf.get('nonexistent')").unwrap();
        assert!(v.is_nil());
        assert_eq!(msg, "unknown option: nonexistent");
    }

    // ── lf.set / lf.eval / lf.eval_call ───────────────────────────────────

    #[test]
    fn set_then_get() {
        let app = make_app();
        run(&app, "lf.set('tabstop', 4)");
        assert_eq!(app.opts().get("tabstop"), Some(OptValue::Int(4)));
        let v: i64 = app.script().unwrap().eval("lf.get('tabstop')").unwrap();
        assert_eq!(v, 4);
    }

    #[test]
    fn set_boolean_value() {
        let app = make_app();
        run(&app, "lf.set('number', true)");
        assert!(app.opts().number);
        run(&app, "lf.set('number', false)");
        assert!(!app.opts().number);
    }

    #[test]
    fn set_error_is_reported_not_raised() {
        let app = make_app();
        run(&app, "lf.set('tabstop', 'wide')");
        assert_eq!(app.ui.errors(), vec!["tabstop: value should be an integer"]);
    }

    #[test]
    fn eval_runs_command_text() {
        let app = make_app();
        run(&app, "lf.eval('set tabstop 2; echo ok')");
        assert_eq!(app.opts().tabstop, 2);
        assert_eq!(app.ui.messages(), vec!["ok"]);
    }

    #[test]
    fn eval_call_blank_name_does_nothing() {
        let app = make_app();
        run(&app, "lf.eval_call('')");
        run(&app, "lf.eval_call('  ', 'x')");
        assert!(app.ui.lines().is_empty());
    }

    #[test]
    fn eval_call_unknown_is_attributed() {
        let app = make_app();
        run(&app, "lf.eval_call('nope')");
        assert_eq!(app.ui.errors(), vec!["lua: command not found: nope"]);
    }

    #[test]
    fn eval_exec_bad_prefix() {
        let app = make_app();
        run(&app, "lf.eval_exec('?', 'true')");
        assert_eq!(app.ui.errors().len(), 1);
        assert!(app.ui.errors()[0].starts_with("lua: invalid shell prefix"));
    }

    #[cfg(unix)]
    #[test]
    fn shell_pipe_with_args() {
        let app = make_app();
        run(&app, r#"lf.shell_pipe('echo "$1-$2"', 'a', 'b')"#);
        assert_eq!(app.ui.messages(), vec!["a-b"]);
    }

    // ── helpers ───────────────────────────────────────────────────────────

    #[test]
    fn echo_helpers() {
        let app = make_app();
        run(&app, "lf.echo('hi', 'there'); lf.echoerr('bad')");
        assert_eq!(app.ui.messages(), vec!["hi there"]);
        assert_eq!(app.ui.errors(), vec!["bad"]);
    }

    #[test]
    fn map_unmap_and_push() {
        let app = make_app();
        run(&app, "lf.map('x', 'echo pressed')");
        run(&app, "lf.push('x')");
        assert_eq!(app.ui.messages(), vec!["pressed"]);
        run(&app, "lf.unmap('x')");
        assert!(!app.opts().keys.contains_key("x"));
    }

    #[test]
    fn cmd_helper_defines_command() {
        let app = make_app();
        run(&app, "lf.cmd('greet', 'echo hello')");
        app.eval_text("greet");
        assert_eq!(app.ui.messages(), vec!["hello"]);
    }

    #[test]
    fn require_returns_library() {
        let app = make_app();
        let same: bool = app.script().unwrap().eval("require('lf') == lf").unwrap();
        assert!(same);
    }

    #[test]
    fn stringsplit_multiple_returns() {
        let app = make_app();
        let v: (String, String, String) = app.script().unwrap().eval("stringsplit('a:b:c', ':')").unwrap();
        assert_eq!(v, ("a".into(), "b".into(), "c".into()));
        let n: i64 = app.script().unwrap().eval("select('#', stringsplit('abc', ','))").unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn log_does_not_fail() {
        let app = make_app();
        run(&app, "lf.log('from script')");
    }

    // ── run / source ──────────────────────────────────────────────────────

    #[test]
    fn run_sets_argv() {
        let app = make_app();
        let eng = app.script().unwrap();
        eng.run("n = #argv; first = argv[1]", &["a".into(), "b".into()]).unwrap();
        assert_eq!(eng.eval::<i64>("n").unwrap(), 2);
        assert_eq!(eng.eval::<String>("first").unwrap(), "a");
    }

    #[test]
    fn run_restores_outer_argv() {
        let app = make_app();
        let eng = app.script().unwrap();
        eng.run(
            "before = #argv; lf.eval('lua inner = rawlen(argv)'); lf.eval_call('lua', 'x = 1'); after = #argv",
            &["a".into(), "b".into()],
        )
        .unwrap();
        assert_eq!(eng.eval::<i64>("before").unwrap(), 2);
        assert_eq!(eng.eval::<i64>("inner").unwrap(), 0);
        assert_eq!(eng.eval::<i64>("after").unwrap(), 2);
        assert!(app.ui.errors().is_empty(), "{:?}", app.ui.errors());
    }

    #[test]
    fn lua_error_from_script_is_prefixed_once() {
        let app = make_app();
        run(&app, r#"lf.eval_call('lua', 'error("boom", 0)')"#);
        assert_eq!(app.ui.errors(), vec!["lua: runtime error: boom"]);
    }

    #[test]
    fn errors_are_one_line_and_name_the_chunk() {
        let app = make_app();
        app.run_lua("local t = nil; return t.x", &[]);
        let errors = app.ui.errors();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].contains('\n'), "{errors:?}");
        assert!(errors[0].contains("lua:1:"), "{errors:?}");
        assert!(!errors[0].contains(".rs"), "{errors:?}");

        let err = app.script().unwrap().exec("error('x')").unwrap_err();
        assert!(err.to_string().contains("lua:1: x"), "{err}");
    }

    #[test]
    fn lua_command_reaches_interpreter() {
        let app = make_app();
        app.eval_text("lua lf.set('scrolloff', 3)");
        assert_eq!(app.opts().scrolloff, 3);
    }

    #[test]
    fn lua_syntax_error_is_reported() {
        let app = make_app();
        app.eval_text("lua this is not lua");
        assert_eq!(app.ui.errors().len(), 1);
        assert!(app.ui.errors()[0].starts_with("lua: "));
    }

    #[test]
    fn source_executes_file() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "loaded = true").unwrap();
        let app = make_app();
        app.source_lua(f.path());
        assert!(app.script().unwrap().eval::<bool>("loaded").unwrap());
    }

    #[test]
    fn source_missing_file_is_reported() {
        let app = make_app();
        app.source_lua(Path::new("/nonexistent/init.lua"));
        assert_eq!(app.ui.errors().len(), 1);
    }

    // ── complete ──────────────────────────────────────────────────────────

    #[test]
    fn complete_without_function() {
        let app = make_app();
        assert_eq!(app.complete(&["x".into()]), (vec![], String::new()));
    }

    #[test]
    fn complete_reverses_matches_and_takes_longest() {
        let app = make_app();
        run(&app, "function complete(...) return 'foo', 'fob', 'fo' end");
        let (matches, longest) = app.complete(&["f".into()]);
        assert_eq!(matches, vec!["fob", "foo"]);
        assert_eq!(longest, "fo");
    }

    #[test]
    fn complete_skips_non_text() {
        let app = make_app();
        run(&app, "function complete(...) return 'a', {}, 7, nil end");
        let (matches, longest) = app.complete(&[]);
        assert_eq!(matches, vec!["7", "a"]);
        assert_eq!(longest, "");
    }

    #[test]
    fn complete_receives_tokens() {
        let app = make_app();
        run(&app, "function complete(...) return select('#', ...), (...) end");
        let (matches, longest) = app.complete(&["set".into(), "tab".into()]);
        assert_eq!(matches, vec!["2"]);
        assert_eq!(longest, "set");
    }

    #[test]
    fn complete_error_reports_and_returns_nothing() {
        let app = make_app();
        run(&app, "function complete() error('nope') end");
        assert_eq!(app.complete(&[]), (vec![], String::new()));
        assert_eq!(app.ui.errors().len(), 1);
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn reinit_drops_state() {
        let mut app = make_app();
        run(&app, "marker = 1");
        app.init_script();
        let v: LuaValue = app.script().unwrap().eval("marker").unwrap();
        assert!(v.is_nil());
    }
}
