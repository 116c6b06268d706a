use std::{collections::HashMap, rc::Rc};

use crate::{
    error::{arity_error, unsupported_arg, Exception},
    types::{NativeBody, NativeFunc, Type, NULL},
};

/// Table of native functions that scripts can call by name. It is
/// filled before the interpreter is built and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct Builtins {
    table: HashMap<String, NativeFunc>,
}

impl Builtins {
    /// The standard set of builtins available to every script
    pub fn standard() -> Self {
        let mut builtins = Self::default();
        init_collections(&mut builtins);
        init_io(&mut builtins);
        builtins
    }

    pub fn register(&mut self, name: &str, body: NativeBody) -> &mut Self {
        self.table.insert(
            name.to_string(),
            NativeFunc {
                name: name.to_string(),
                body,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<NativeFunc> {
        self.table.get(name).cloned()
    }
}

pub fn init_collections(builtins: &mut Builtins) {
    builtins
        .register("len", len)
        .register("first", first)
        .register("last", last)
        .register("rest", rest)
        .register("push", push);
}

pub fn init_io(builtins: &mut Builtins) {
    builtins.register("puts", puts);
}

fn check_arity(args: &[Type], want: usize) -> Result<(), Exception> {
    if args.len() != want {
        return Err(arity_error(args.len(), want));
    }
    Ok(())
}

fn len(args: &[Type]) -> Result<Type, Exception> {
    check_arity(args, 1)?;
    let n = match &args[0] {
        Type::Str(s) => s.chars().count(),
        Type::Array(elements) => elements.len(),
        arg => return Err(unsupported_arg("len", arg)),
    };
    // Lengths are bounded by memory, so they always fit
    Ok(Type::Integer(n as i64))
}

fn first(args: &[Type]) -> Result<Type, Exception> {
    check_arity(args, 1)?;
    match &args[0] {
        Type::Array(elements) => Ok(elements.first().cloned().unwrap_or(NULL)),
        arg => Err(unsupported_arg("first", arg)),
    }
}

fn last(args: &[Type]) -> Result<Type, Exception> {
    check_arity(args, 1)?;
    match &args[0] {
        Type::Array(elements) => Ok(elements.last().cloned().unwrap_or(NULL)),
        arg => Err(unsupported_arg("last", arg)),
    }
}

fn rest(args: &[Type]) -> Result<Type, Exception> {
    check_arity(args, 1)?;
    match &args[0] {
        Type::Array(elements) if elements.is_empty() => Ok(NULL),
        Type::Array(elements) => Ok(Type::Array(Rc::new(elements[1..].to_vec()))),
        arg => Err(unsupported_arg("rest", arg)),
    }
}

fn push(args: &[Type]) -> Result<Type, Exception> {
    check_arity(args, 2)?;
    match &args[0] {
        Type::Array(elements) => {
            let mut pushed = Vec::with_capacity(elements.len() + 1);
            pushed.extend(elements.iter().cloned());
            pushed.push(args[1].clone());
            Ok(Type::Array(Rc::new(pushed)))
        }
        arg => Err(unsupported_arg("push", arg)),
    }
}

fn puts(args: &[Type]) -> Result<Type, Exception> {
    for arg in args {
        println!("{arg}");
    }
    Ok(NULL)
}
