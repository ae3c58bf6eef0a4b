//! Command-line argument parsing.
//!
//! Usage:
//!   lf [-v] [-f[<file>]] [-l<log>] [-s<file.lua>]… [-c<cmd>]… [-e<lua>] [--] [<arg>…]

use std::path::PathBuf;

pub const USAGE: &str =
    "Usage: lf [-v] [-f[<file>]] [-l<log>] [-s<file.lua>]... [-c<cmd>]... [-e<lua>] [--] [<arg>...]";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Which user config to load.
    pub config: ConfigFile,
    /// Command text to evaluate after loading config (`-c<cmd>`, repeatable).
    pub commands: Vec<String>,
    /// Log file (`-l<path>`); logs go to stderr otherwise.
    pub log: Option<PathBuf>,
    /// Lua source to run instead of reading commands from stdin (`-e<code>`).
    pub lua: Option<String>,
    /// Lua files to source after config (`-s<file>`, repeatable).
    pub sources: Vec<PathBuf>,
    /// Print the version and exit (`-v`).
    pub version: bool,
    /// Positional arguments, bound to `argv` for `-e`.
    pub script_args: Vec<String>,
}

/// How to choose the user config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// `lfrc` in the config directory, if it exists (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip user config.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            args.script_args.extend(argv[i + 1..].iter().cloned());
            break;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" {
            args.script_args.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'v' => args.version = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        // -f alone → skip user config
                        args.config = ConfigFile::Skip;
                    }
                }

                c @ ('c' | 'e' | 'l' | 's') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{c} requires an argument"));
                    };
                    match c {
                        'c' => args.commands.push(value),
                        'e' => args.lua = Some(value),
                        'l' => args.log = Some(PathBuf::from(value)),
                        _ => args.sources.push(PathBuf::from(value)),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert!(!a.version);
        assert!(matches!(a.config, ConfigFile::Search));
        assert!(a.commands.is_empty() && a.script_args.is_empty());
    }

    #[test]
    fn version_flag() {
        assert!(parse_argv(&argv(&["-v"])).unwrap().version);
    }

    #[test]
    fn config_skip() {
        let a = parse_argv(&argv(&["-f"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
    }

    #[test]
    fn config_skip_before_flag() {
        let a = parse_argv(&argv(&["-f", "-v"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
        assert!(a.version);
    }

    #[test]
    fn config_explicit_embedded() {
        let a = parse_argv(&argv(&["-fmy.lfrc"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("my.lfrc")));
    }

    #[test]
    fn config_explicit_separate() {
        let a = parse_argv(&argv(&["-f", "my.lfrc"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("my.lfrc")));
    }

    #[test]
    fn commands_repeat() {
        let a = parse_argv(&argv(&["-cset tabstop 4", "-c", "echo hi"])).unwrap();
        assert_eq!(a.commands, vec!["set tabstop 4", "echo hi"]);
    }

    #[test]
    fn lua_and_sources() {
        let a = parse_argv(&argv(&["-s", "a.lua", "-sb.lua", "-e", "print(1)"])).unwrap();
        assert_eq!(a.sources, vec![PathBuf::from("a.lua"), PathBuf::from("b.lua")]);
        assert_eq!(a.lua.as_deref(), Some("print(1)"));
    }

    #[test]
    fn log_path() {
        let a = parse_argv(&argv(&["-l/tmp/lf.log"])).unwrap();
        assert_eq!(a.log, Some(PathBuf::from("/tmp/lf.log")));
    }

    #[test]
    fn positional_and_double_dash() {
        let a = parse_argv(&argv(&["x", "--", "-c", "y"])).unwrap();
        assert_eq!(a.script_args, vec!["x", "-c", "y"]);
        assert!(a.commands.is_empty());
    }

    #[test]
    fn missing_value() {
        assert!(parse_argv(&argv(&["-c"])).is_err());
        assert!(parse_argv(&argv(&["-e"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
    }
}
