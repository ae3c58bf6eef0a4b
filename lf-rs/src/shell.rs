//! Shell execution for `$`, `%`, `!` and `&` statements.
//!
//! Every mode runs `<shell> <shellopts…> <shellflag> <text> -- <args…>` with
//! the option registry exported as `lf_<name>` environment variables, so
//! `$1`… inside the shell text refer to the caller's positional arguments.
//!
//! | Prefix | [`ShellMode`] | Behaviour                                         |
//! |--------|---------------|---------------------------------------------------|
//! | `$`    | `Wait`        | inherit stdio, block until exit                   |
//! | `%`    | `Pipe`        | capture stdout, echo each line as a message       |
//! | `!`    | `Pause`       | like `$`, then show `waitmsg` and wait for a key  |
//! | `&`    | `Async`       | detach into its own process group, return at once |
//!
//! Background children are kept in the [`Shell`] so the host loop can reap
//! them with [`Shell::reap`]; nothing here waits on them.

use std::io::{self, Write};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use crossterm::tty::IsTty;
use thiserror::Error;

use crate::opts::Options;
use crate::ui::Ui;

// ── ShellMode ─────────────────────────────────────────────────────────────────

/// The four shell execution modes, identified by their prefix character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellMode {
    Wait,
    Pipe,
    Pause,
    Async,
}

impl ShellMode {
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '$' => Some(ShellMode::Wait),
            '%' => Some(ShellMode::Pipe),
            '!' => Some(ShellMode::Pause),
            '&' => Some(ShellMode::Async),
            _ => None,
        }
    }

    pub fn prefix(self) -> char {
        match self {
            ShellMode::Wait => '$',
            ShellMode::Pipe => '%',
            ShellMode::Pause => '!',
            ShellMode::Async => '&',
        }
    }
}

impl std::str::FromStr for ShellMode {
    type Err = ShellError;

    /// Exactly one prefix character.
    fn from_str(s: &str) -> Result<Self, ShellError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_prefix(c),
            _ => None,
        }
        .ok_or_else(|| ShellError::BadPrefix(s.to_owned()))
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("invalid shell prefix {0:?}")]
    BadPrefix(String),
    #[error("running shell: {0}")]
    Spawn(#[from] io::Error),
    #[error("running shell: exit status {0}")]
    Status(i32),
    #[error("running shell: terminated by signal")]
    Signaled,
}

// ── ShellConfig ───────────────────────────────────────────────────────────────

/// The parts of the option registry a shell invocation needs, copied out so
/// the registry lock is not held while a child runs.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub shell: String,
    pub shellflag: String,
    pub shellopts: Vec<String>,
    pub waitmsg: String,
    pub env: Vec<(String, String)>,
}

impl ShellConfig {
    pub fn from_options(opts: &Options) -> Self {
        Self {
            shell: opts.shell.clone(),
            shellflag: opts.shellflag.clone(),
            shellopts: opts.shellopts.clone(),
            waitmsg: opts.waitmsg.clone(),
            env: opts.env_vars(),
        }
    }

    fn command(&self, text: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.args(&self.shellopts)
            .arg(&self.shellflag)
            .arg(text)
            .arg("--")
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

// ── Shell ─────────────────────────────────────────────────────────────────────

/// Runs shell statements and tracks detached children.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    background: Arc<Mutex<Vec<Child>>>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `text` in `mode`.  Only `Async` returns before the child exits.
    pub fn run(
        &self,
        mode: ShellMode,
        text: &str,
        args: &[String],
        cfg: &ShellConfig,
        ui: &Ui,
    ) -> Result<(), ShellError> {
        tracing::debug!(target: "lf::shell", prefix = %mode.prefix(), "{text}");
        let mut cmd = cfg.command(text, args);
        match mode {
            ShellMode::Wait => check_status(cmd.status()?),
            ShellMode::Pipe => {
                let out = cmd.stdin(Stdio::null()).stderr(Stdio::inherit()).output()?;
                for line in String::from_utf8_lossy(&out.stdout).lines() {
                    ui.echo(line);
                }
                check_status(out.status)
            }
            ShellMode::Pause => {
                let status = cmd.status();
                pause(&cfg.waitmsg);
                check_status(status?)
            }
            ShellMode::Async => {
                cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
                #[cfg(unix)]
                {
                    use std::os::unix::process::CommandExt;
                    cmd.process_group(0);
                }
                let child = cmd.spawn()?;
                tracing::debug!(target: "lf::shell", pid = child.id(), "detached");
                self.background
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(child);
                Ok(())
            }
        }
    }

    /// Collect background children that have exited.  Returns how many were
    /// reaped.
    pub fn reap(&self) -> usize {
        let mut bg = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        let before = bg.len();
        bg.retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
        before - bg.len()
    }

    /// Number of background children not yet reaped.
    pub fn background_len(&self) -> usize {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn check_status(status: std::process::ExitStatus) -> Result<(), ShellError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ShellError::Status(code)),
        None => Err(ShellError::Signaled),
    }
}

/// Show `msg` and wait for one key press.  Skipped when stdin is not a
/// terminal (batch mode, tests).
fn pause(msg: &str) {
    if !io::stdin().is_tty() {
        return;
    }
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{msg}");
    let _ = stderr.flush();
    if terminal::enable_raw_mode().is_ok() {
        loop {
            match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        let _ = terminal::disable_raw_mode();
    }
    let _ = writeln!(stderr);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
