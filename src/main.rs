use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use mani::ast_printer::AstPrinter;
use mani::diagnostics::Diagnostics;
use mani::error::ManiError;
use mani::host::{load_script, read_source, Script, StdHost};
use mani::parser::Parser;
use mani::scanner::{scan, Scanner};
use mani::session::{RunStatus, RuntimePolicy, Session};

#[derive(ClapParser, Debug)]
#[command(version, about = "Mani language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to mani.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a .mni script
    Run { filename: PathBuf },

    /// Starts an interactive session (the default)
    Repl,
}

/// Loads `filename` with `loader`. Path problems are user errors, not
/// crashes: they are printed and yield `None`.
fn load(
    filename: &Path,
    loader: fn(&Path) -> mani::error::Result<Script>,
) -> Result<Option<Script>> {
    match loader(filename) {
        Ok(script) => Ok(Some(script)),

        Err(e @ ManiError::Script(_)) => {
            eprintln!("{}", e);
            Ok(None)
        }

        Err(e) => anyhow::bail!("Failed to load {:?}: {}", filename, e),
    }
}

fn init_logger() -> Result<()> {
    let log_file = File::create("mani.log").context("Failed to create mani.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("mani::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to mani.log");
    Ok(())
}

fn report_all(diagnostics: &mut Diagnostics) {
    for e in diagnostics.take_errors() {
        debug!("Reporting: {}", e);
        eprintln!("{}", e);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let Some(script) = load(filename, read_source)? else {
        return Ok(65);
    };

    let mut tokens = Vec::new();
    let mut tokenized = true;

    for token in Scanner::new(&script.source, &script.file_name) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;

                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", out);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        return Ok(65);
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

fn parse(filename: &Path) -> Result<i32> {
    let Some(script) = load(filename, read_source)? else {
        return Ok(65);
    };
    let mut diagnostics = Diagnostics::new();

    let tokens = scan(&script.source, &script.file_name, &mut diagnostics);
    if diagnostics.had_error() {
        report_all(&mut diagnostics);
        return Ok(65);
    }

    match Parser::new(&tokens).parse_expression(&mut diagnostics) {
        Some(expr) => {
            let ast_str = AstPrinter::print(&expr);

            debug!("AST: {}", ast_str);
            println!("{}", ast_str);

            info!("Parse subcommand completed");
            Ok(0)
        }

        None => {
            report_all(&mut diagnostics);
            Ok(65)
        }
    }
}

fn evaluate(filename: &Path) -> Result<i32> {
    let Some(script) = load(filename, read_source)? else {
        return Ok(65);
    };
    let mut session = Session::new();

    match session.evaluate_expression(&script.source, &script.file_name) {
        Some(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
            Ok(0)
        }

        None => {
            let code = if session.diagnostics().had_runtime_error() {
                70
            } else {
                65
            };
            report_all(session.diagnostics_mut());
            Ok(code)
        }
    }
}

fn run(filename: &Path) -> Result<i32> {
    let Some(script) = load(filename, load_script)? else {
        return Ok(65);
    };

    let mut session = Session::new();
    let status = session.run(&script.source, &script.file_name);

    report_all(session.diagnostics_mut());

    if status != RunStatus::Ok {
        debug!("Run finished with {:?}", status);
    }

    Ok(status.exit_code())
}

fn repl() -> Result<i32> {
    let mut session = Session::with_host(Box::new(StdHost), RuntimePolicy::Continue);
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!(">> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        let status = session.run(&line, "REPL");
        debug!("Line finished with {:?}", status);

        report_all(session.diagnostics_mut());
        session.reset_errors();
    }

    info!("REPL session ended");
    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code = match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => tokenize(&filename, json)?,
        Commands::Parse { filename } => parse(&filename)?,
        Commands::Evaluate { filename } => evaluate(&filename)?,
        Commands::Run { filename } => run(&filename)?,
        Commands::Repl => repl()?,
    };

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}
