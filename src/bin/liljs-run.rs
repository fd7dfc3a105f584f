//! liljs-run - Run a liljs script from a file, or drop into a REPL
//!
//! # Usage
//!
//! ```bash
//! # Run a script file
//! liljs-run script.js
//!
//! # Read a script from stdin
//! cat script.js | liljs-run -
//!
//! # Start an interactive REPL
//! liljs-run
//!
//! # Tune the safety caps
//! liljs-run --max-loop-iterations 10000 --max-call-depth 64 script.js
//! ```

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use liljs::{Engine, EngineConfig};

/// Run a liljs script, or start an interactive REPL
#[derive(Parser, Debug)]
#[command(name = "liljs-run")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script file to run ('-' reads from stdin); omit for a REPL
    script: Option<PathBuf>,

    /// Maximum loop iterations before a script is aborted
    #[arg(long, default_value_t = EngineConfig::default().max_loop_iterations)]
    max_loop_iterations: u64,

    /// Maximum call depth before a script is aborted
    #[arg(long, default_value_t = EngineConfig::default().max_call_depth)]
    max_call_depth: usize,

    /// Maximum prototype-chain depth before a script is aborted
    #[arg(long, default_value_t = EngineConfig::default().max_prototype_depth)]
    max_prototype_depth: usize,

    /// Print the reachable value graph after running (debugging aid)
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = EngineConfig {
        max_loop_iterations: args.max_loop_iterations,
        max_call_depth: args.max_call_depth,
        max_prototype_depth: args.max_prototype_depth,
    };
    let mut engine = Engine::with_config(config);

    let result = match &args.script {
        Some(path) => run_file(&mut engine, path),
        None => run_repl(&mut engine),
    };

    if args.trace {
        println!("{}", engine.trace());
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_file(engine: &mut Engine, path: &PathBuf) -> Result<()> {
    let (source, label) = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading script from stdin")?;
        (buf, "<stdin>".to_string())
    } else {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading script '{}'", path.display()))?;
        (source, path.display().to_string())
    };

    engine
        .execute(&source, &label)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if let Some(result) = engine.get_variable("result") {
        println!("{}", liljs::value::to_js_string(&engine.heap, result));
    }
    Ok(())
}

fn run_repl(engine: &mut Engine) -> Result<()> {
    println!("{}", "liljs REPL - Ctrl-D to exit".bold());
    let stdin = io::stdin();
    let mut line_no = 0usize;
    loop {
        print!("{} ", "liljs>".cyan());
        io::stdout().flush().ok();

        let mut line = String::new();
        let bytes = stdin.lock().read_line(&mut line).context("reading from stdin")?;
        if bytes == 0 {
            println!();
            return Ok(());
        }
        line_no += 1;
        let label = format!("<repl:{line_no}>");

        match engine.evaluate(&line, &label) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
    }
}
