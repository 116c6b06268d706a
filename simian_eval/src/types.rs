use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use simian_syntax::ast::Item;

use crate::{environment::Env, error::Exception, interpret::Interpreter};

pub const TRUE: Type = Type::Boolean(true);
pub const FALSE: Type = Type::Boolean(false);
pub const NULL: Type = Type::Null;

#[derive(Clone, Debug)]
pub enum Type {
    Integer(i64),
    Str(String),
    Boolean(bool),
    Null,
    Array(Rc<Vec<Type>>),
    Func(Func),
    NativeFunc(NativeFunc),
    Error(String),
}

impl Type {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::Str(_) => "STRING",
            Self::Boolean(_) => "BOOLEAN",
            Self::Null => "NULL",
            Self::Array(_) => "ARRAY",
            Self::Func(_) => "FUNCTION",
            Self::NativeFunc(_) => "BUILTIN",
            Self::Error(_) => "ERROR",
        }
    }
}

impl From<bool> for Type {
    fn from(b: bool) -> Self {
        if b { TRUE } else { FALSE }
    }
}

/// Structural equality, used by tests and by the interpreter for
/// integers and strings. Script-level `==` on other values goes
/// through `Interpreter::is_identical`.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(m), Self::Integer(n)) => m == n,
            (Self::Str(m), Self::Str(n)) => m == n,
            (Self::Boolean(m), Self::Boolean(n)) => m == n,
            (Self::Null, Self::Null) => true,
            (Self::Array(m), Self::Array(n)) => m == n,
            (Self::Func(m), Self::Func(n)) => m == n,
            (Self::NativeFunc(m), Self::NativeFunc(n)) => m == n,
            (Self::Error(m), Self::Error(n)) => m == n,
            _ => false,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::Array(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>();
                write!(f, "[{}]", elements.join(", "))
            }
            Self::Func(func) => write!(f, "{func}"),
            Self::NativeFunc(func) => write!(f, "{func}"),
            Self::Error(msg) => write!(f, "ERROR: {msg}"),
        }
    }
}

pub trait Callable {
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Type>) -> Result<Type, Exception>;
}

#[derive(Clone)]
pub struct Func {
    pub args: Vec<String>,
    pub body: Rc<Vec<Item>>,
    pub env: Rc<RefCell<Env>>,
}

/// Two function values are the same function only if they come
/// from the same literal evaluated in the same scope.
impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && Rc::ptr_eq(&self.env, &other.env)
    }
}

// The captured env is skipped as it usually contains the function itself
impl Debug for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Func")
            .field("args", &self.args)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn({}) {{", self.args.join(", "))?;
        for item in self.body.iter() {
            write!(f, " {item}")?;
        }
        f.write_str(" }")
    }
}

impl Callable for Func {
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Type>) -> Result<Type, Exception> {
        interpreter.call_func(self, args)
    }
}

pub type NativeBody = fn(&[Type]) -> Result<Type, Exception>;

#[derive(Clone)]
pub struct NativeFunc {
    pub name: String,
    pub body: NativeBody,
}

impl PartialEq for NativeFunc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Debug for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .finish()
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "native fn {}", self.name)
    }
}

impl Callable for NativeFunc {
    fn call(&self, _: &mut Interpreter, args: Vec<Type>) -> Result<Type, Exception> {
        (self.body)(&args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Type::Integer(1).type_name(), "INTEGER");
        assert_eq!(Type::Str(String::default()).type_name(), "STRING");
        assert_eq!(TRUE.type_name(), "BOOLEAN");
        assert_eq!(NULL.type_name(), "NULL");
        assert_eq!(Type::Array(Rc::default()).type_name(), "ARRAY");
        assert_eq!(Type::Error("oops".to_string()).type_name(), "ERROR");
    }

    #[test]
    fn booleans_come_from_constants() {
        assert_eq!(Type::from(true), TRUE);
        assert_eq!(Type::from(false), FALSE);
        assert_ne!(TRUE, FALSE);
        assert_ne!(FALSE, NULL);
    }

    #[test]
    fn display() {
        let array = Type::Array(Rc::new(vec![
            Type::Integer(1),
            Type::Str("two".to_string()),
            TRUE,
            NULL,
        ]));
        assert_eq!(array.to_string(), "[1, two, true, null]");
        assert_eq!(
            Type::Error("identifier not found: x".to_string()).to_string(),
            "ERROR: identifier not found: x"
        );
    }
}
