//! Command hooks.
//!
//! After every `Call` completes, the host runs the script listeners
//! registered for that command name, in registration order, passing the
//! call's arguments.  The registry is the Lua table `lf.command_hooks`
//! (command name → list of functions) maintained by the bundled helpers, so
//! scripts that poke at it directly stay in sync with the host.
//!
//! Listeners may themselves run commands, which fire hooks again.  Nesting is
//! bounded by [`MAX_HOOK_DEPTH`].

use mlua::prelude::*;
use mlua::Variadic;

use crate::marshal;

/// Deepest nesting of hook dispatch before it is refused.
pub const MAX_HOOK_DEPTH: usize = 16;

/// Current dispatch nesting, kept in the interpreter's app data.
struct HookDepth(usize);

fn depth(lua: &Lua) -> usize {
    lua.app_data_ref::<HookDepth>().map_or(0, |d| d.0)
}

fn set_depth(lua: &Lua, n: usize) {
    lua.set_app_data(HookDepth(n));
}

/// Run the listeners for `cmd` with `args`.  Returns the error message of
/// every listener that failed; the others still ran.  A missing dispatcher
/// (the global `run_command_hook` removed by a script) is a no-op.
pub fn run_command_hook(lua: &Lua, cmd: &str, args: &[String]) -> LuaResult<Vec<String>> {
    let LuaValue::Function(dispatch) = lua.globals().get::<LuaValue>("run_command_hook")? else {
        return Ok(Vec::new());
    };

    let level = depth(lua);
    if level >= MAX_HOOK_DEPTH {
        return Err(LuaError::RuntimeError(format!("{cmd}: hook recursion limit reached")));
    }

    let call_args: Variadic<&str> = std::iter::once(cmd)
        .chain(args.iter().map(String::as_str))
        .collect();

    set_depth(lua, level + 1);
    let result = dispatch.call::<Variadic<LuaValue>>(call_args);
    set_depth(lua, level);

    Ok(result?.iter().map(marshal::to_host_string).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
