use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use lush_core::Cell;
use lush_reader::read_program;

#[derive(Parser)]
#[command(name = "lush", about = "Lush: a Lisp-flavored Unix shell (reader)", version)]
struct Cli {
    /// Script to parse
    file: Option<String>,

    /// Parse the given text instead of a file
    #[arg(short, long)]
    command: Option<String>,

    /// Print re-parseable literal forms instead of display forms
    #[arg(short, long)]
    literal: bool,

    /// Suppress the REPL banner
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Some(text) = &cli.command {
        if !run("command", text, cli.literal) {
            std::process::exit(1);
        }
        return;
    }

    if let Some(file) = &cli.file {
        match std::fs::read_to_string(file) {
            Ok(text) => {
                if !run(file, &text, cli.literal) {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("Error reading {file}: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    repl(cli.literal, cli.quiet);
}

fn run(label: &str, text: &str, literal: bool) -> bool {
    match read_program(label, text) {
        Ok(forms) => {
            for form in &forms {
                print_form(form, literal);
            }
            true
        }
        Err(e) => {
            eprintln!("{e}");
            false
        }
    }
}

fn print_form(form: &Cell, literal: bool) {
    if literal {
        match form.literal() {
            Some(s) => println!("{s}"),
            None => println!("{form}"),
        }
        return;
    }

    // Top-level lists display without their outer parentheses; add them
    // back so the structure reads as written.
    if form.is_pair() && !form.is_null() {
        println!("({form})");
    } else {
        println!("{form}");
    }
}

fn repl(literal: bool, quiet: bool) {
    let mut rl = DefaultEditor::new().expect("failed to create editor");
    let history_path = dirs_path().join("history.txt");
    let _ = rl.load_history(&history_path);

    if !quiet {
        println!("Lush v{} — reader", env!("CARGO_PKG_VERSION"));
        println!("Forms are parsed and printed, not evaluated. Ctrl-D exits.\n");
    }

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "lush> " } else { "  ... " };
        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                match read_program("stdin", &buffer) {
                    Ok(forms) => {
                        let _ = rl.add_history_entry(buffer.trim_end());
                        buffer.clear();
                        for form in &forms {
                            print_form(form, literal);
                        }
                    }
                    Err(e) if e.is_incomplete() => {
                        // Wait for the rest of the construct.
                    }
                    Err(e) => {
                        buffer.clear();
                        eprintln!("{e}");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if !buffer.is_empty() {
                    buffer.clear();
                    println!("^C");
                    continue;
                }
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(dirs_path());
    let _ = rl.save_history(&history_path);
}

fn dirs_path() -> std::path::PathBuf {
    std::env::var("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join(".lush")
}
