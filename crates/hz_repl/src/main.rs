mod repl;

use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use clap::{error::ErrorKind, Parser};
use hz_interpreter::{
    runner::{EXIT_NO_INPUT, EXIT_USAGE},
    ConsoleReporter, Hezarfen,
};
use hz_parser::{printer::AstPrinter, Lexer, Parser as SourceParser};
use tracing::{debug, level_filters::LevelFilter};

/// Hezarfen is a small dynamically-typed scripting language.
///
/// Runs SCRIPT if one is given, otherwise starts an interactive session.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the script to run
    script: Option<PathBuf>,

    /// Print the token stream before running
    #[arg(long)]
    tokens: bool,

    /// Print the syntax tree before running
    #[arg(long)]
    ast: bool,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version are not usage errors
        Err(error) if !matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            eprint!("{}", error);
            process::exit(EXIT_USAGE);
        }
        Err(error) => error.exit(),
    };

    init_tracing();
    debug!(?args, "starting");

    match &args.script {
        Some(path) => run_file(path, &args),
        None => repl::repl(&args),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    // Program output owns stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_file(path: &Path, args: &Args) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read '{}': {}", path.display(), error);
            process::exit(EXIT_NO_INPUT);
        }
    };

    dump(&source, args);

    let mut hezarfen = Hezarfen::new(ConsoleReporter);
    let code = hezarfen.run(&source).exit_code();
    if code != 0 {
        process::exit(code);
    }
}

/// Print the tokens and/or syntax tree of `source` as requested on the command line.
fn dump(source: &str, args: &Args) {
    if !args.tokens && !args.ast {
        return;
    }

    let (tokens, _) = Lexer::new(source).scan_tokens();
    if args.tokens {
        for token in &tokens {
            println!("{}", token);
        }
    }

    // Syntax errors are reported when the source runs
    if args.ast {
        if let Ok(program) = SourceParser::new(tokens).parse_program() {
            for stmt in &program.statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }
    }
}
