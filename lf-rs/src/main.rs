use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use lf::app::App;
use lf::cli;
use lf::config;
use lf::ui::UiLine;

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("lf: {e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    if args.version {
        println!("lf {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    init_logging(args.log.as_deref());

    let mut app = App::new();
    app.init_script();
    flush_ui(&app);

    // ── Startup: config, Lua sources, -c commands ────────────────────────────
    config::load_user_config(&app, &args.config);
    for path in &args.sources {
        app.source_lua(path);
    }
    for cmd in &args.commands {
        app.eval_text(cmd);
    }
    flush_ui(&app);

    // ── -e: run Lua and exit ──────────────────────────────────────────────────
    if let Some(code) = &args.lua {
        app.run_lua(code, &args.script_args);
        let failed = flush_ui(&app);
        std::process::exit(if failed { 1 } else { 0 });
    }

    // ── Command loop over stdin ───────────────────────────────────────────────
    let interactive = unsafe { libc::isatty(libc::STDIN_FILENO) != 0 };
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !app.quit_requested() {
        if interactive {
            print!(":");
            let _ = io::stdout().flush();
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("lf: reading input: {e}");
                break;
            }
            None => break,
        };
        app.eval_text(&line);
        flush_ui(&app);
        let reaped = app.shell.reap();
        if reaped > 0 {
            tracing::debug!(target: "lf::shell", "reaped {reaped} background job(s)");
        }
    }
    flush_ui(&app);
}

/// Print pending status lines: messages to stdout, errors to stderr.
/// Returns whether any errors were printed.
fn flush_ui(app: &App) -> bool {
    let mut failed = false;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in app.ui.drain() {
        match line {
            UiLine::Msg(s) => {
                let _ = writeln!(out, "{s}");
            }
            UiLine::Err(s) => {
                failed = true;
                eprintln!("{s}");
            }
        }
    }
    let _ = out.flush();
    failed
}

/// `LF_LOG` holds an `EnvFilter` directive (default `warn`).  Logs go to
/// stderr, or to `path` without colours.
fn init_logging(path: Option<&Path>) {
    let filter = EnvFilter::try_from_env("LF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match path.map(File::create) {
        Some(Ok(file)) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Some(Err(e)) => {
            eprintln!("lf: cannot open log file: {e}");
            builder.with_writer(io::stderr).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
}
