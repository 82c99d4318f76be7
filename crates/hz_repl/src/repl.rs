use rustyline::error::ReadlineError;
use rustyline::Editor;

use hz_interpreter::{ConsoleReporter, Hezarfen};

use crate::{dump, Args};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn repl(args: &Args) {
    println!("Hezarfen v{}. Type 'exit' or press Ctrl + C to leave.", VERSION);

    // One session for every line, so declarations carry over
    let mut hezarfen = Hezarfen::new(ConsoleReporter);

    // `()` can be used when no completer is required
    let mut rl = Editor::<()>::new();
    loop {
        let readline = rl.readline("-> ");
        match readline {
            Ok(line) => {
                let source = line.trim();
                if source == "exit" || source == "quit" {
                    break;
                }
                // Skip empty lines
                else if source.is_empty() {
                    continue;
                }

                rl.add_history_entry(source);

                dump(source, args);
                hezarfen.run_line(source);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }
}
