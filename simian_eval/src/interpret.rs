use std::{cell::RefCell, mem, rc::Rc};

use log::debug;

use crate::{
    environment::Env,
    error::{arity_error, runtime_error, ErrorMsg, Exception},
    stdlib::Builtins,
    types::{Callable, Func, Type, NULL},
};
use simian_syntax::{
    ast::{BinOp, Expr, Ident, Item, Literal, Source, UnaryOp},
    stack::ensure_sufficient_stack,
};

/// Maximum number of nested function calls
const MAX_CALL_DEPTH: usize = 4096;

#[derive(Debug)]
pub struct Interpreter {
    pub env: Rc<RefCell<Env>>,
    builtins: Builtins,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Builtins::standard())
    }
}

impl Interpreter {
    pub fn new(builtins: Builtins) -> Self {
        Self {
            env: Env::new(),
            builtins,
            depth: 0,
        }
    }

    /// Evaluates a whole program in the global scope. Returns the value
    /// of the last item, `None` if that item produced no value, or an
    /// `Error` value if evaluation failed.
    pub fn interpret_all(&mut self, source: &Source) -> Option<Type> {
        match self.interpret_items(&source.items) {
            Ok(value) => value,
            // A top-level `return` ends the program with its value
            Err(Exception::Return(value)) => Some(value),
            Err(Exception::Error(msg)) => Some(Type::Error(msg)),
        }
    }

    fn interpret_items(&mut self, items: &[Item]) -> Result<Option<Type>, Exception> {
        let mut value = None;
        for item in items {
            value = self.interpret_item(item)?;
        }
        Ok(value)
    }

    fn interpret_item(&mut self, item: &Item) -> Result<Option<Type>, Exception> {
        match item {
            Item::ExprStmt(expr) => self.interpret_expr(expr).map(Some),
            Item::LetStmt { ident, init } => {
                self.interpret_let_stmt(ident, init)?;
                Ok(None)
            }
            Item::ReturnStmt(expr) => Err(Exception::Return(self.interpret_expr(expr)?)),
            // Blocks share the enclosing scope, only calls open a new one
            Item::Block(items) => self.interpret_items(items),
        }
    }

    fn interpret_let_stmt(&mut self, ident: &Ident, init: &Expr) -> Result<(), Exception> {
        let value = self.interpret_expr(init)?;
        self.env.borrow_mut().set(&ident.name, value);
        Ok(())
    }

    fn interpret_expr(&mut self, expr: &Expr) -> Result<Type, Exception> {
        ensure_sufficient_stack(|| self.interpret_expr_kind(expr))
    }

    fn interpret_expr_kind(&mut self, expr: &Expr) -> Result<Type, Exception> {
        match expr {
            Expr::Ident(ident) => self.interpret_ident(ident),
            Expr::Literal(lit) => Ok(Self::interpret_literal(lit)),
            Expr::Unary { op, expr } => self.interpret_unary(op, expr),
            Expr::Binary { lhs, op, rhs } => self.interpret_binary(lhs, op, rhs),
            Expr::If {
                condition,
                if_block,
                else_block,
            } => self.interpret_if(condition, if_block, else_block.as_deref()),
            Expr::Function { args, body } => Ok(Type::Func(Func {
                args: args.iter().map(|arg| arg.name.clone()).collect(),
                body: Rc::clone(body),
                env: Rc::clone(&self.env),
            })),
            Expr::Call { func, args } => self.interpret_func_call(func, args),
            Expr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.interpret_expr(element)?);
                }
                Ok(Type::Array(Rc::new(values)))
            }
            Expr::Index { expr, index } => self.interpret_index(expr, index),
        }
    }

    fn interpret_literal(lit: &Literal) -> Type {
        match lit {
            Literal::Int(n) => Type::Integer(*n),
            Literal::Str(s) => Type::Str(s.clone()),
            Literal::Boolean(b) => Type::from(*b),
        }
    }

    fn interpret_ident(&self, ident: &Ident) -> Result<Type, Exception> {
        if let Some(value) = self.env.borrow().get(&ident.name) {
            return Ok(value);
        }
        self.builtins
            .get(&ident.name)
            .map(Type::NativeFunc)
            .ok_or_else(|| runtime_error(ErrorMsg::UndefinedVar, &ident.name))
    }

    fn interpret_if(
        &mut self,
        condition: &Expr,
        if_block: &[Item],
        else_block: Option<&[Item]>,
    ) -> Result<Type, Exception> {
        let value = self.interpret_expr(condition)?;
        let block = if self.to_bool(&value) {
            if_block
        } else if let Some(items) = else_block {
            items
        } else {
            return Ok(NULL);
        };
        Ok(self.interpret_items(block)?.unwrap_or(NULL))
    }

    fn interpret_unary(&mut self, op: &UnaryOp, expr: &Expr) -> Result<Type, Exception> {
        let value = self.interpret_expr(expr)?;
        match op {
            UnaryOp::Bang => Ok(Type::from(!self.to_bool(&value))),
            UnaryOp::Minus => match value {
                Type::Integer(n) => n
                    .checked_neg()
                    .map(Type::Integer)
                    .ok_or_else(|| runtime_error(ErrorMsg::IntegerOverflow, format!("-{n}"))),
                _ => Err(runtime_error(
                    ErrorMsg::UnknownOperator,
                    format!("-{}", value.type_name()),
                )),
            },
        }
    }

    fn to_bool(&self, value: &Type) -> bool {
        match value {
            Type::Null => false,
            Type::Boolean(b) => *b,
            _ => true,
        }
    }

    fn interpret_binary(&mut self, lhs: &Expr, op: &BinOp, rhs: &Expr) -> Result<Type, Exception> {
        let left = self.interpret_expr(lhs)?;
        let right = self.interpret_expr(rhs)?;

        match (&left, &right) {
            (Type::Integer(m), Type::Integer(n)) => Self::interpret_int_binary(*m, op, *n),
            (Type::Str(m), Type::Str(n)) => match op {
                BinOp::Plus => Ok(Type::Str(format!("{m}{n}"))),
                BinOp::EqualEqual => Ok(Type::from(m == n)),
                BinOp::BangEqual => Ok(Type::from(m != n)),
                _ => Err(runtime_error(
                    ErrorMsg::UnknownOperator,
                    format!("STRING {op} STRING"),
                )),
            },
            _ => match op {
                BinOp::EqualEqual => Ok(Type::from(self.is_identical(&left, &right))),
                BinOp::BangEqual => Ok(Type::from(!self.is_identical(&left, &right))),
                _ => {
                    let msg = if left.type_name() == right.type_name() {
                        ErrorMsg::UnknownOperator
                    } else {
                        ErrorMsg::TypeMismatch
                    };
                    Err(runtime_error(
                        msg,
                        format!("{} {op} {}", left.type_name(), right.type_name()),
                    ))
                }
            },
        }
    }

    fn interpret_int_binary(m: i64, op: &BinOp, n: i64) -> Result<Type, Exception> {
        let res = match op {
            BinOp::Plus => m.checked_add(n),
            BinOp::Minus => m.checked_sub(n),
            BinOp::Star => m.checked_mul(n),
            BinOp::Slash if n == 0 => {
                return Err(runtime_error(ErrorMsg::DivisionByZero, format!("{m} / {n}")))
            }
            // Rust's integer division truncates toward zero
            BinOp::Slash => m.checked_div(n),
            BinOp::Greater => return Ok(Type::from(m > n)),
            BinOp::Less => return Ok(Type::from(m < n)),
            BinOp::EqualEqual => return Ok(Type::from(m == n)),
            BinOp::BangEqual => return Ok(Type::from(m != n)),
        };
        res.map(Type::Integer)
            .ok_or_else(|| runtime_error(ErrorMsg::IntegerOverflow, format!("{m} {op} {n}")))
    }

    /// Script-level equality for values other than integers and strings.
    /// Booleans and null are compared as the shared constants they are,
    /// while arrays and functions must be the very same value.
    fn is_identical(&self, left: &Type, right: &Type) -> bool {
        match (left, right) {
            (Type::Boolean(m), Type::Boolean(n)) => m == n,
            (Type::Null, Type::Null) => true,
            (Type::Array(m), Type::Array(n)) => Rc::ptr_eq(m, n),
            (Type::Func(m), Type::Func(n)) => m == n,
            (Type::NativeFunc(m), Type::NativeFunc(n)) => m == n,
            _ => false,
        }
    }

    fn interpret_index(&mut self, expr: &Expr, index: &Expr) -> Result<Type, Exception> {
        let value = self.interpret_expr(expr)?;
        let index = self.interpret_expr(index)?;
        match (&value, &index) {
            (Type::Array(elements), Type::Integer(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| elements.get(i))
                .cloned()
                .unwrap_or(NULL)),
            _ => Err(runtime_error(
                ErrorMsg::UnsupportedIndex,
                format!("{}[{}]", value.type_name(), index.type_name()),
            )),
        }
    }

    fn interpret_func_call(
        &mut self,
        fn_expr: &Expr,
        arg_exprs: &[Expr],
    ) -> Result<Type, Exception> {
        let ty = self.interpret_expr(fn_expr)?;
        let func: &dyn Callable = match &ty {
            Type::Func(f) => f,
            Type::NativeFunc(f) => f,
            _ => return Err(runtime_error(ErrorMsg::NotCallable, ty.type_name())),
        };
        let mut args = Vec::with_capacity(arg_exprs.len());
        for arg in arg_exprs {
            args.push(self.interpret_expr(arg)?);
        }

        func.call(self, args)
    }

    pub(crate) fn call_func(&mut self, func: &Func, args: Vec<Type>) -> Result<Type, Exception> {
        // Ensure the number of arguments matches the function definition
        if func.args.len() != args.len() {
            return Err(arity_error(args.len(), func.args.len()));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(runtime_error(
                ErrorMsg::StackOverflow,
                format!("more than {MAX_CALL_DEPTH} nested calls"),
            ));
        }
        let func_env = Env::with_parent(Rc::clone(&func.env));
        for (ident, value) in func.args.iter().zip(args) {
            func_env.borrow_mut().set(ident, value);
        }
        debug!("Call fn({})", func.args.join(", "));

        let old_env = mem::replace(&mut self.env, func_env);
        self.depth += 1;
        let res = self.interpret_items(&func.body);
        // Restore the caller's state whether or not the call failed
        self.depth -= 1;
        self.env = old_env;
        match res {
            Ok(value) => Ok(value.unwrap_or(NULL)),
            // Unwrap the return value at the call boundary
            Err(Exception::Return(value)) => Ok(value),
            Err(e) => Err(e),
        }
    }
}
