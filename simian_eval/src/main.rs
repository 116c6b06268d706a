use simian_eval::{interpret::Interpreter, run, types::Type};
use simian_syntax::error::Error;
use std::{
    env, fs,
    io::{self, Write},
    process,
};

const PROMPT: &str = ">> ";

fn main() {
    pretty_env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() > 1 {
        eprintln!("Usage: simian [script]");
        process::exit(64);
    }
    let res = match args.first() {
        Some(path) => run_file(path),
        None => run_repl(),
    };
    if let Err(e) = res {
        eprintln!("{e}");
        process::exit(74);
    }
}

fn run_repl() -> io::Result<()> {
    let (stdin, mut stdout) = (io::stdin(), io::stdout());
    let mut interpreter = Interpreter::default();
    loop {
        let mut line = String::default();
        print!("{PROMPT}");
        stdout.flush()?;
        // If zero bytes are read, then exit (usually triggered by Ctrl-D)
        if stdin.read_line(&mut line)? == 0 {
            println!();
            break;
        }
        report(run(&line, &mut interpreter));
    }
    Ok(())
}

fn run_file(file_path: &str) -> io::Result<()> {
    let source = fs::read_to_string(file_path)?;
    let mut interpreter = Interpreter::default();
    if !report(run(&source, &mut interpreter)) {
        process::exit(65);
    }
    Ok(())
}

/// Prints the outcome of a run, returning false if it failed
fn report(res: Result<Option<Type>, Vec<Error>>) -> bool {
    match res {
        Ok(Some(value @ Type::Error(_))) => {
            println!("{value}");
            false
        }
        Ok(Some(value)) => {
            println!("{value}");
            true
        }
        Ok(None) => true,
        Err(errors) => {
            errors.iter().for_each(|e| eprintln!("{e}"));
            false
        }
    }
}
