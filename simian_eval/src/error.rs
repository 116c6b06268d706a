use std::fmt::Display;

use crate::types::Type;

/// Unwinds evaluation. `Return` carries the value of a `return`
/// statement up to the enclosing call, and is never seen by scripts.
#[derive(Debug)]
pub enum Exception {
    Error(String),
    Return(Type),
}

#[derive(Debug)]
pub enum ErrorMsg {
    TypeMismatch,
    UnknownOperator,
    NotCallable,
    UnsupportedIndex,
    DivisionByZero,
    IntegerOverflow,
    StackOverflow,
    // Memory errors
    UndefinedVar,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::TypeMismatch => "type mismatch",
            Self::UnknownOperator => "unknown operator",
            Self::NotCallable => "not a function",
            Self::UnsupportedIndex => "index operator not supported",
            Self::DivisionByZero => "division by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::StackOverflow => "stack overflow",
            Self::UndefinedVar => "identifier not found",
        })
    }
}

pub fn runtime_error(msg: ErrorMsg, ctx: impl Display) -> Exception {
    Exception::Error(format!("{msg}: {ctx}"))
}

pub fn arity_error(got: usize, want: usize) -> Exception {
    Exception::Error(format!("wrong number of arguments. got={got}, want={want}"))
}

pub fn unsupported_arg(name: &str, arg: &Type) -> Exception {
    Exception::Error(format!(
        "argument to `{name}` not supported, got {}",
        arg.type_name()
    ))
}
