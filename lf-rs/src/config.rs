//! Configuration files.
//!
//! | File       | Loaded as                        |
//! |------------|----------------------------------|
//! | `lfrc`     | command text, one statement at a time |
//! | `init.lua` | Lua, through the script bridge   |
//!
//! Both live in the config directory: `$LF_CONFIG_HOME` when set, otherwise
//! the platform config dir for `lf` (e.g. `~/.config/lf`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

use crate::app::App;
use crate::cli::ConfigFile;
use crate::parse::{ParseError, Parser};

pub const RC_FILE: &str = "lfrc";
pub const INIT_LUA: &str = "init.lua";

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{err}", path.display())]
    Parse { path: PathBuf, err: ParseError },
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("LF_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("", "", "lf").map(|d| d.config_dir().to_path_buf())
}

pub fn rc_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(RC_FILE))
}

pub fn init_lua_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(INIT_LUA))
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Evaluate a command file.  Statements before a syntax error have already
/// run when the error is returned; runtime errors go to `app.ui` as usual.
pub fn source_rc(app: &App, path: &Path) -> Result<(), ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(target: "lf::config", "source: {}", path.display());

    let mut p = Parser::new(&text);
    while p.parse() {
        if let Some(e) = p.take_expr() {
            e.eval(app, None);
        }
    }
    match p.err() {
        Some(err) => Err(ConfigError::Parse {
            path: path.to_owned(),
            err: err.clone(),
        }),
        None => Ok(()),
    }
}

/// Load the user's `lfrc` and `init.lua`.
///
/// `Search` quietly skips files that do not exist; an `Explicit` rc file
/// must exist.  `Skip` loads neither.  Errors are reported through `app.ui`.
pub fn load_user_config(app: &App, which: &ConfigFile) {
    let rc = match which {
        ConfigFile::Skip => return,
        ConfigFile::Explicit(path) => Some(path.clone()),
        ConfigFile::Search => rc_path().filter(|p| p.exists()),
    };
    if let Some(rc) = rc {
        if let Err(e) = source_rc(app, &rc) {
            app.ui.echoerrf(format_args!("{e}"));
        }
    }
    if app.script().is_none() {
        return;
    }
    if let Some(init) = init_lua_path().filter(|p| p.exists()) {
        app.source_lua(&init);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn rc_file(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    // -- source_rc ------------------------------------------------------------

    #[test]
    fn source_applies_settings() {
        let f = rc_file("# settings\nset tabstop 4\nmap gh cd ~\n");
        let app = App::new();
        source_rc(&app, f.path()).unwrap();
        assert_eq!(app.opts().tabstop, 4);
        assert!(app.opts().keys.contains_key("gh"));
    }

    #[test]
    fn source_stops_at_syntax_error() {
        let f = rc_file("set tabstop 2\necho 'open\nset tabstop 9\n");
        let app = App::new();
        let err = source_rc(&app, f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("unterminated quote"));
        assert_eq!(app.opts().tabstop, 2);
    }

    #[test]
    fn source_runtime_errors_do_not_stop() {
        let f = rc_file("set bogus 1\nset tabstop 5\n");
        let app = App::new();
        source_rc(&app, f.path()).unwrap();
        assert_eq!(app.opts().tabstop, 5);
        assert_eq!(app.ui.errors(), vec!["unknown option: bogus"]);
    }

    #[test]
    fn source_missing_file() {
        let app = App::new();
        let err = source_rc(&app, Path::new("/nonexistent/lfrc")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("/nonexistent/lfrc: "));
    }

    #[test]
    fn source_command_nests() {
        let inner = rc_file("set scrolloff 3\n");
        let outer = rc_file(&format!("source \"{}\"\n", inner.path().display()));
        let app = App::new();
        source_rc(&app, outer.path()).unwrap();
        assert_eq!(app.opts().scrolloff, 3);
    }

    // -- load_user_config -----------------------------------------------------

    #[test]
    fn skip_loads_nothing() {
        let app = App::new();
        load_user_config(&app, &ConfigFile::Skip);
        assert!(app.ui.lines().is_empty());
    }

    #[test]
    fn explicit_missing_is_reported() {
        let app = App::new();
        load_user_config(&app, &ConfigFile::Explicit("/nonexistent/lfrc".into()));
        assert_eq!(app.ui.errors().len(), 1);
    }

    #[test]
    fn explicit_file_is_sourced() {
        let f = rc_file("set period 7\n");
        let app = App::new();
        load_user_config(&app, &ConfigFile::Explicit(f.path().to_owned()));
        assert_eq!(app.opts().period, 7);
    }
}
