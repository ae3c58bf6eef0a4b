//! Builtin commands resolved by `Call` before user commands.
//!
//! | Command               | Effect                                           |
//! |-----------------------|--------------------------------------------------|
//! | `echo args…`          | show a message                                   |
//! | `echomsg args…`       | show a message and log it                        |
//! | `echoerr args…`       | show an error                                    |
//! | `push keys`           | evaluate the bindings of each key in turn        |
//! | `map key [body]`      | bind (or unbind) a normal-mode key               |
//! | `cmap key [body]`     | bind (or unbind) a command-line key              |
//! | `cmd name [body]`     | define (or delete) a user command                |
//! | `delcmd name`         | delete a user command                            |
//! | `source path`         | evaluate a command file                          |
//! | `lua code…`           | run Lua source through the script bridge         |
//! | `luasource path`      | run a Lua file through the script bridge         |
//! | `quit`                | ask the host loop to stop                        |

use std::path::Path;

use crate::app::App;
use crate::config;
use crate::lua;
use crate::expr::{CallSource, EvalContext, EvalError, Expr};
use crate::parse::parse_body;

const BUILTINS: &[&str] = &[
    "echo", "echomsg", "echoerr", "push", "map", "cmap", "cmd", "delcmd",
    "source", "lua", "luasource", "quit",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Which binding table `map`/`cmap`/`cmd` write to.
#[derive(Clone, Copy)]
enum Table {
    Keys,
    CmdKeys,
    Cmds,
}

pub fn run(app: &App, name: &str, args: &[String], ctx: Option<&EvalContext>) -> Result<(), EvalError> {
    match name {
        "echo" => app.ui.echo(args.join(" ")),
        "echomsg" => {
            let msg = args.join(" ");
            tracing::info!(target: "lf::msg", "{msg}");
            app.ui.echo(msg);
        }
        "echoerr" => app.ui.echoerr(args.join(" ")),
        "push" => push(app, &args.join(" "), ctx)?,
        "map" => bind(app, Table::Keys, "map", args)?,
        "cmap" => bind(app, Table::CmdKeys, "cmap", args)?,
        "cmd" => bind(app, Table::Cmds, "cmd", args)?,
        "delcmd" => {
            let name = first(args, "delcmd", "missing command name")?;
            app.opts().cmds.remove(name);
        }
        "source" => {
            let path = first(args, "source", "missing file name")?;
            config::source_rc(app, Path::new(path)).map_err(|e| EvalError::Other(e.to_string()))?;
        }
        "lua" => {
            let script = app
                .script()
                .ok_or_else(|| EvalError::Lua("scripting is not initialised".into()))?;
            script
                .run(&args.join(" "), &[])
                .map_err(|e| EvalError::Lua(lua::error_line(&e)))?;
        }
        "luasource" => {
            let path = first(args, "luasource", "missing file name")?;
            let script = app
                .script()
                .ok_or_else(|| EvalError::Lua("scripting is not initialised".into()))?;
            script
                .source(Path::new(path))
                .map_err(|e| EvalError::Lua(lua::error_line(&e)))?;
        }
        "quit" => app.request_quit(),
        _ => return Err(EvalError::UnknownCommand(name.to_owned())),
    }
    Ok(())
}

fn first<'a>(args: &'a [String], cmd: &'static str, msg: &str) -> Result<&'a str, EvalError> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| EvalError::Usage { cmd, msg: msg.to_owned() })
}

/// `map key body` stores a parsed body; `map key` removes the binding.
fn bind(app: &App, table: Table, cmd: &'static str, args: &[String]) -> Result<(), EvalError> {
    let key = first(args, cmd, "missing name")?;
    let body = match args.get(1..) {
        Some(rest) if !rest.is_empty() => {
            let text = rest.join(" ");
            Some(parse_body(&text).map_err(|e| EvalError::Usage { cmd, msg: e.to_string() })?)
        }
        _ => None,
    };

    let mut opts = app.opts();
    let map = match table {
        Table::Keys => &mut opts.keys,
        Table::CmdKeys => &mut opts.cmdkeys,
        Table::Cmds => &mut opts.cmds,
    };
    match body {
        Some(b) if !b.is_empty() => {
            map.insert(key.to_owned(), b);
        }
        _ => {
            map.remove(key);
        }
    }
    Ok(())
}

/// Feed keys through the normal-mode bindings.  Unbound keys are ignored.
fn push(app: &App, keys: &str, ctx: Option<&EvalContext>) -> Result<(), EvalError> {
    for key in split_keys(keys) {
        let body = app.opts().keys.get(&key).cloned();
        let Some(body) = body else {
            tracing::debug!(target: "lf::keys", "push: unbound key {key:?}");
            continue;
        };
        let inner = EvalContext::nested(ctx, "push", Vec::new())?;
        for e in &body.0 {
            match e {
                Expr::Call { name, args, .. } => Expr::Call {
                    name: name.clone(),
                    args: args.clone(),
                    source: CallSource::Key,
                }
                .eval(app, Some(&inner)),
                other => other.eval(app, Some(&inner)),
            }
        }
    }
    Ok(())
}

/// Split key notation into individual keys: `<c-a>`, `<enter>` and single
/// characters.  An unclosed `<` is a literal key.
pub fn split_keys(s: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(end) = rest.find('>') {
                if end > 1 {
                    keys.push(rest[..=end].to_owned());
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        keys.push(c.to_string());
        rest = &rest[c.len_utf8()..];
    }
    keys
}

// ── Tests ─────────────────────────────────────────────────────────────────────
