//! `rcalc` command-line front end.
//!
//! Three modes:
//! - no arguments: an interactive REPL (prompt `>> `), one line per program;
//! - `-e`/`--execute <expr>`: evaluate a single expression and print it;
//! - `-s`/`--script <file>`: evaluate an entire `.calc` file as one program.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{debug, error, info};

use rcalc::error::render_diagnostic;
use rcalc::Interpreter;

#[derive(Parser, Debug)]
#[command(name = "rcalc", version, about = "A calculator language interpreter")]
struct Cli {
    /// Evaluate a single expression and print its result.
    #[arg(short, long, value_name = "EXPR")]
    execute: Option<String>,

    /// Evaluate a `.calc` script file as one program.
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    verbosity: LogLevel,
}

impl Cli {
    fn init() -> Self {
        Self::parse()
    }
}

#[derive(ValueEnum, Clone, Debug, Default)]
enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(level: &LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::init();
    simple_logger::init_with_level(log::Level::from(&args.verbosity))
        .expect("logger can only be initialized once");

    if let Some(expr) = &args.execute {
        return run_once(expr);
    }

    if let Some(path) = &args.script {
        return run_script(path);
    }

    run_repl();
    ExitCode::SUCCESS
}

fn run_script(path: &PathBuf) -> ExitCode {
    if path.extension().and_then(|e| e.to_str()) != Some("calc") {
        error!("refusing to run a script without a .calc extension: {}", path.display());
        eprintln!("rcalc: scripts must have a .calc extension");
        return ExitCode::FAILURE;
    }

    info!("loading script {}", path.display());
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to read {}: {e}", path.display());
            eprintln!("rcalc: could not read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    run_once(&source)
}

fn run_once(source: &str) -> ExitCode {
    let mut interpreter = Interpreter::new();
    match interpreter.interpret(source) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(source, &err);
            ExitCode::FAILURE
        }
    }
}

fn run_repl() {
    use io::BufRead;

    info!("starting REPL");
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut lock = stdin.lock();

    loop {
        print!(">> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match lock.read_line(&mut line) {
            Ok(0) => {
                debug!("REPL received EOF, exiting");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("failed to read from stdin: {e}");
                break;
            }
        }

        match interpreter.interpret(&line) {
            Ok(value) => println!("{value}"),
            Err(err) => print_error(&line, &err),
        }
    }
}

fn print_error(source: &str, err: &rcalc::CalcError) {
    eprintln!("{}", render_diagnostic(source, err));
}
