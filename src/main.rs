mod cell;
mod config;
mod env;
mod error;
mod eval;
mod reader;
mod token;

use clap::Parser;
use config::{VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use env::Environment;
use reader::read_expr;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use token::TokenStream;
use tracing::{debug, warn};

/// A small Lisp interpreter: reads forms from a file or from standard
/// input and evaluates them one at a time.
#[derive(Parser, Debug)]
#[command(name = "cell-lisp")]
#[command(version = VERSION)]
#[command(about = "A small Lisp interpreter with lexical closures and file inclusion")]
struct CliArgs {
    /// Script file to execute. With no file, starts an interactive session.
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Force result printing even in script mode (-p or -print).
    #[arg(value_name = "FLAG", allow_hyphen_values = true)]
    print_flag: Option<String>,

    /// Anything past the two positional arguments above is rejected
    /// explicitly, matching the driver's fixed argument-count contract.
    #[arg(trailing_var_arg = true, hide = true)]
    extra: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse();
    if !args.extra.is_empty() {
        eprintln!("error: too many arguments");
        return ExitCode::FAILURE;
    }

    let mut stream = TokenStream::from_stdin();
    let mut print_res;

    match (&args.script, &args.print_flag) {
        (None, None) => {
            print_res = true;
        }
        (Some(path), None) => {
            if let Err(e) = stream.set_input(path) {
                eprintln!("error: could not open {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            print_res = false;
        }
        (Some(path), Some(flag)) => {
            if flag != "-p" && flag != "-print" {
                eprintln!("error: unrecognised flag '{flag}'");
                return ExitCode::FAILURE;
            }
            if let Err(e) = stream.set_input(path) {
                eprintln!("error: could not open {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            print_res = true;
        }
        (None, Some(_)) => {
            eprintln!("error: too many arguments");
            return ExitCode::FAILURE;
        }
    }

    if print_res && args.script.is_none() {
        println!("{WELCOME_MESSAGE}");
        println!("{WELCOME_SUBTITLE}");
    }

    let global_env = Environment::new();
    let mut error_count: u32 = 0;

    loop {
        if print_res {
            print!("> ");
            if io::stdout().flush().is_err() {
                break;
            }
        }

        let form = match read_expr(&mut stream, true) {
            Ok(form) => form,
            Err(e) => {
                warn!(%e, "read error");
                println!("Bad expression: {e}");
                error_count += 1;
                stream.ignore_line();
                continue;
            }
        };

        if matches!(form.as_slice(), [cell::Cell::End]) {
            if stream.base() {
                break;
            }
            debug!("input source exhausted, falling back to the enclosing source");
            stream.reset();
            if stream.base() {
                print_res = true;
            }
            continue;
        }

        match eval::eval(&form, &global_env, &mut stream) {
            Ok(result) => {
                if print_res {
                    println!("{result}");
                }
            }
            Err(e) => {
                warn!(%e, "eval error");
                println!("Bad expression: {e}");
                error_count += 1;
            }
        }
    }

    if error_count > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
