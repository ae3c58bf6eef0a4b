//! The option registry.
//!
//! One typed field per named option plus the key and command maps.  Values
//! are read by name through [`Options::get`] and written by name through
//! [`Options::set`], which is the only mutation path used by `set`
//! expressions.  The registry is shared as `Arc<Mutex<Options>>` and locked
//! as a whole; no option ever changes type.

use std::collections::HashMap;

use thiserror::Error;

use crate::expr::Body;

// ── OptValue ──────────────────────────────────────────────────────────────────

/// The current value of one option, tagged by its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Str(String),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

impl OptValue {
    /// Render as the `lf_<name>` environment value handed to shell children.
    pub fn to_env(&self) -> String {
        match self {
            OptValue::Bool(b) => b.to_string(),
            OptValue::Int(n) => n.to_string(),
            OptValue::Str(s) => s.clone(),
            OptValue::IntList(v) => v.iter().map(i64::to_string).collect::<Vec<_>>().join(":"),
            OptValue::StrList(v) => v.join(":"),
        }
    }
}

// ── OptionError ───────────────────────────────────────────────────────────────

/// Why a `set` was rejected.  The registry is left untouched on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),
    #[error("{0}: value should be empty, 'true', or 'false'")]
    BadBool(String),
    #[error("{0}: unexpected value for boolean option")]
    UnexpectedValue(String),
    #[error("{0}: value should be an integer")]
    BadInt(String),
    #[error("{0}: value should be a positive number")]
    NotPositive(String),
    #[error("{0}: value should be a non-negative number")]
    Negative(String),
    #[error("{0}: value should be a single character")]
    NotOneChar(String),
    #[error("{0}: unknown item '{1}'")]
    BadItem(String, String),
    #[error("{0}: value should not be empty")]
    Empty(String),
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Every option name the registry knows, in display order.
pub const NAMES: &[&str] = &[
    "anchorfind", "dircounts", "drawbox", "globsearch", "hidden", "icons",
    "ignorecase", "ignoredia", "incsearch", "mouse", "number", "preview",
    "relativenumber", "smartcase", "smartdia", "wrapscan", "wrapscroll",
    "findlen", "period", "scrolloff", "tabstop",
    "waitmsg", "errorfmt", "filesep", "ifs", "previewer", "cleaner",
    "promptfmt", "shell", "shellflag", "timefmt", "truncatechar",
    "ratios", "hiddenfiles", "info", "shellopts",
];

/// Accepted items of the `info` list option.
const INFO_ITEMS: &[&str] = &["size", "time", "atime", "ctime"];

/// Process-wide configuration state.
#[derive(Debug, Clone)]
pub struct Options {
    pub anchorfind: bool,
    pub dircounts: bool,
    pub drawbox: bool,
    pub globsearch: bool,
    pub hidden: bool,
    pub icons: bool,
    pub ignorecase: bool,
    pub ignoredia: bool,
    pub incsearch: bool,
    pub mouse: bool,
    pub number: bool,
    pub preview: bool,
    pub relativenumber: bool,
    pub smartcase: bool,
    pub smartdia: bool,
    pub wrapscan: bool,
    pub wrapscroll: bool,

    pub findlen: i64,
    pub period: i64,
    pub scrolloff: i64,
    pub tabstop: i64,

    pub waitmsg: String,
    pub errorfmt: String,
    pub filesep: String,
    pub ifs: String,
    pub previewer: String,
    pub cleaner: String,
    pub promptfmt: String,
    pub shell: String,
    pub shellflag: String,
    pub timefmt: String,
    pub truncatechar: String,

    pub ratios: Vec<i64>,
    pub hiddenfiles: Vec<String>,
    pub info: Vec<String>,
    pub shellopts: Vec<String>,

    /// Normal-mode key bindings.
    pub keys: HashMap<String, Body>,
    /// Command-line key bindings.
    pub cmdkeys: HashMap<String, Body>,
    /// User-defined commands.
    pub cmds: HashMap<String, Body>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            anchorfind: true,
            dircounts: false,
            drawbox: false,
            globsearch: false,
            hidden: false,
            icons: false,
            ignorecase: true,
            ignoredia: true,
            incsearch: false,
            mouse: false,
            number: false,
            preview: true,
            relativenumber: false,
            smartcase: true,
            smartdia: false,
            wrapscan: true,
            wrapscroll: false,

            findlen: 1,
            period: 0,
            scrolloff: 0,
            tabstop: 8,

            waitmsg: "Press any key to continue".to_owned(),
            errorfmt: "\x1b[7;31;47m%s\x1b[0m".to_owned(),
            filesep: "\n".to_owned(),
            ifs: String::new(),
            previewer: String::new(),
            cleaner: String::new(),
            promptfmt: "\x1b[32;1m%u@%h\x1b[0m:\x1b[34;1m%d\x1b[0m\x1b[1m%f\x1b[0m".to_owned(),
            shell: "sh".to_owned(),
            shellflag: "-c".to_owned(),
            timefmt: "Mon Jan _2 15:04:05 2006".to_owned(),
            truncatechar: "~".to_owned(),

            ratios: vec![1, 2, 3],
            hiddenfiles: vec![".*".to_owned()],
            info: Vec::new(),
            shellopts: Vec::new(),

            keys: HashMap::new(),
            cmdkeys: HashMap::new(),
            cmds: HashMap::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    fn bool_mut(&mut self, name: &str) -> Option<&mut bool> {
        Some(match name {
            "anchorfind" => &mut self.anchorfind,
            "dircounts" => &mut self.dircounts,
            "drawbox" => &mut self.drawbox,
            "globsearch" => &mut self.globsearch,
            "hidden" => &mut self.hidden,
            "icons" => &mut self.icons,
            "ignorecase" => &mut self.ignorecase,
            "ignoredia" => &mut self.ignoredia,
            "incsearch" => &mut self.incsearch,
            "mouse" => &mut self.mouse,
            "number" => &mut self.number,
            "preview" => &mut self.preview,
            "relativenumber" => &mut self.relativenumber,
            "smartcase" => &mut self.smartcase,
            "smartdia" => &mut self.smartdia,
            "wrapscan" => &mut self.wrapscan,
            "wrapscroll" => &mut self.wrapscroll,
            _ => return None,
        })
    }

    fn int_mut(&mut self, name: &str) -> Option<&mut i64> {
        Some(match name {
            "findlen" => &mut self.findlen,
            "period" => &mut self.period,
            "scrolloff" => &mut self.scrolloff,
            "tabstop" => &mut self.tabstop,
            _ => return None,
        })
    }

    fn str_mut(&mut self, name: &str) -> Option<&mut String> {
        Some(match name {
            "waitmsg" => &mut self.waitmsg,
            "errorfmt" => &mut self.errorfmt,
            "filesep" => &mut self.filesep,
            "ifs" => &mut self.ifs,
            "previewer" => &mut self.previewer,
            "cleaner" => &mut self.cleaner,
            "promptfmt" => &mut self.promptfmt,
            "shell" => &mut self.shell,
            "shellflag" => &mut self.shellflag,
            "timefmt" => &mut self.timefmt,
            "truncatechar" => &mut self.truncatechar,
            _ => return None,
        })
    }

    fn str_list_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        Some(match name {
            "hiddenfiles" => &mut self.hiddenfiles,
            "info" => &mut self.info,
            "shellopts" => &mut self.shellopts,
            _ => return None,
        })
    }

    /// Read an option by name.  `None` means the name is unknown; an empty
    /// list is `Some` with zero elements.
    pub fn get(&self, name: &str) -> Option<OptValue> {
        let v = match name {
            "anchorfind" => OptValue::Bool(self.anchorfind),
            "dircounts" => OptValue::Bool(self.dircounts),
            "drawbox" => OptValue::Bool(self.drawbox),
            "globsearch" => OptValue::Bool(self.globsearch),
            "hidden" => OptValue::Bool(self.hidden),
            "icons" => OptValue::Bool(self.icons),
            "ignorecase" => OptValue::Bool(self.ignorecase),
            "ignoredia" => OptValue::Bool(self.ignoredia),
            "incsearch" => OptValue::Bool(self.incsearch),
            "mouse" => OptValue::Bool(self.mouse),
            "number" => OptValue::Bool(self.number),
            "preview" => OptValue::Bool(self.preview),
            "relativenumber" => OptValue::Bool(self.relativenumber),
            "smartcase" => OptValue::Bool(self.smartcase),
            "smartdia" => OptValue::Bool(self.smartdia),
            "wrapscan" => OptValue::Bool(self.wrapscan),
            "wrapscroll" => OptValue::Bool(self.wrapscroll),

            "findlen" => OptValue::Int(self.findlen),
            "period" => OptValue::Int(self.period),
            "scrolloff" => OptValue::Int(self.scrolloff),
            "tabstop" => OptValue::Int(self.tabstop),

            "waitmsg" => OptValue::Str(self.waitmsg.clone()),
            "errorfmt" => OptValue::Str(self.errorfmt.clone()),
            "filesep" => OptValue::Str(self.filesep.clone()),
            "ifs" => OptValue::Str(self.ifs.clone()),
            "previewer" => OptValue::Str(self.previewer.clone()),
            "cleaner" => OptValue::Str(self.cleaner.clone()),
            "promptfmt" => OptValue::Str(self.promptfmt.clone()),
            "shell" => OptValue::Str(self.shell.clone()),
            "shellflag" => OptValue::Str(self.shellflag.clone()),
            "timefmt" => OptValue::Str(self.timefmt.clone()),
            "truncatechar" => OptValue::Str(self.truncatechar.clone()),

            "ratios" => OptValue::IntList(self.ratios.clone()),
            "hiddenfiles" => OptValue::StrList(self.hiddenfiles.clone()),
            "info" => OptValue::StrList(self.info.clone()),
            "shellopts" => OptValue::StrList(self.shellopts.clone()),
            _ => return None,
        };
        Some(v)
    }

    /// Assign an option from its textual form.
    ///
    /// Boolean options also accept `noNAME` (false) and `NAME!` (toggle),
    /// both with an empty value.
    pub fn set(&mut self, opt: &str, val: &str) -> Result<(), OptionError> {
        if let Some(b) = self.bool_mut(opt) {
            *b = parse_bool(opt, val)?;
            return Ok(());
        }
        if let Some(name) = opt.strip_prefix("no") {
            if let Some(b) = self.bool_mut(name) {
                if !val.is_empty() {
                    return Err(OptionError::UnexpectedValue(opt.to_owned()));
                }
                *b = false;
                return Ok(());
            }
        }
        if let Some(name) = opt.strip_suffix('!') {
            if let Some(b) = self.bool_mut(name) {
                if !val.is_empty() {
                    return Err(OptionError::UnexpectedValue(opt.to_owned()));
                }
                *b = !*b;
                return Ok(());
            }
        }

        if self.int_mut(opt).is_some() {
            let n: i64 = val
                .trim()
                .parse()
                .map_err(|_| OptionError::BadInt(opt.to_owned()))?;
            match opt {
                "tabstop" if n <= 0 => return Err(OptionError::NotPositive(opt.to_owned())),
                _ if n < 0 => return Err(OptionError::Negative(opt.to_owned())),
                _ => {}
            }
            if let Some(slot) = self.int_mut(opt) {
                *slot = n;
            }
            return Ok(());
        }

        if let Some(slot) = self.str_mut(opt) {
            if opt == "truncatechar" && val.chars().count() != 1 {
                return Err(OptionError::NotOneChar(opt.to_owned()));
            }
            *slot = val.to_owned();
            return Ok(());
        }

        if opt == "ratios" {
            self.ratios = parse_ratios(val)?;
            return Ok(());
        }
        if self.str_list_mut(opt).is_some() {
            let items = split_list(val);
            if opt == "info" {
                if let Some(bad) = items.iter().find(|i| !INFO_ITEMS.contains(&i.as_str())) {
                    return Err(OptionError::BadItem(opt.to_owned(), bad.clone()));
                }
            }
            if let Some(slot) = self.str_list_mut(opt) {
                *slot = items;
            }
            return Ok(());
        }

        Err(OptionError::Unknown(opt.to_owned()))
    }

    /// `lf_<name>=<value>` pairs for every option.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        NAMES
            .iter()
            .filter_map(|&name| self.get(name).map(|v| (format!("lf_{name}"), v.to_env())))
            .collect()
    }
}

// ── Value parsing ─────────────────────────────────────────────────────────────

fn parse_bool(opt: &str, val: &str) -> Result<bool, OptionError> {
    match val {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(OptionError::BadBool(opt.to_owned())),
    }
}

fn split_list(val: &str) -> Vec<String> {
    if val.is_empty() {
        return Vec::new();
    }
    val.split(':').map(str::to_owned).collect()
}

fn parse_ratios(val: &str) -> Result<Vec<i64>, OptionError> {
    let items = split_list(val);
    if items.is_empty() {
        return Err(OptionError::Empty("ratios".to_owned()));
    }
    items
        .iter()
        .map(|s| {
            let n: i64 = s
                .trim()
                .parse()
                .map_err(|_| OptionError::BadInt("ratios".to_owned()))?;
            if n <= 0 {
                return Err(OptionError::NotPositive("ratios".to_owned()));
            }
            Ok(n)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
