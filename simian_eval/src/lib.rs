pub mod environment;
pub mod error;
pub mod interpret;
pub mod stdlib;
pub mod types;

use interpret::Interpreter;
use log::trace;
use simian_syntax::{error::Error, lex::Lexer, parse::Parser};
use types::Type;

/// Runs `source` through the whole pipeline. Parse errors are returned
/// together, while a failed evaluation yields a `Type::Error` value.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<Option<Type>, Vec<Error>> {
    let lexer = Lexer::new(source);
    trace!("Lexing {source}");
    let tokens = lexer.lex_all();
    trace!("Parsing {tokens:#?}");
    let parser = Parser::new(&tokens);
    let root = parser.parse_all()?;
    trace!("Interpreting {root:#?}");
    Ok(interpreter.interpret_all(&root))
}
