use std::{fmt::Display, rc::Rc};

use crate::token::TokenKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Bang,
    Minus,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
        })
    }
}

impl UnaryOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::BANG => Self::Bang,
            TokenKind::MINUS => Self::Minus,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Slash,
    Star,
    Plus,
    Minus,
    Greater,
    Less,
    BangEqual,
    EqualEqual,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Slash => "/",
            Self::Star => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Greater => ">",
            Self::Less => "<",
            Self::BangEqual => "!=",
            Self::EqualEqual => "==",
        })
    }
}

impl BinOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::SLASH => Self::Slash,
            TokenKind::ASTERISK => Self::Star,
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::GT => Self::Greater,
            TokenKind::LT => Self::Less,
            TokenKind::NOT_EQ => Self::BangEqual,
            TokenKind::EQ => Self::EqualEqual,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Boolean(bool),
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Ident(Ident),
    Literal(Literal),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinOp,
        rhs: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        if_block: Vec<Item>,
        else_block: Option<Vec<Item>>,
    },
    /// The body is shared with every closure created from this literal
    Function {
        args: Vec<Ident>,
        body: Rc<Vec<Item>>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(ident) => write!(f, "{ident}"),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Unary { op, expr } => write!(f, "({op}{expr})"),
            Self::Binary { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Self::If {
                condition,
                if_block,
                else_block,
            } => {
                write!(f, "if {condition} {}", Block(if_block))?;
                if let Some(items) = else_block {
                    write!(f, " else {}", Block(items))?;
                }
                Ok(())
            }
            Self::Function { args, body } => {
                write!(f, "fn({}) {}", join(args), Block(body.as_slice()))
            }
            Self::Call { func, args } => write!(f, "{func}({})", join(args)),
            Self::Array(elements) => write!(f, "[{}]", join(elements)),
            Self::Index { expr, index } => write!(f, "({expr}[{index}])"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    ExprStmt(Expr),
    LetStmt { ident: Ident, init: Expr },
    ReturnStmt(Expr),
    Block(Vec<Item>),
}

impl Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExprStmt(expr) => write!(f, "{expr}"),
            Self::LetStmt { ident, init } => write!(f, "let {ident} = {init};"),
            Self::ReturnStmt(expr) => write!(f, "return {expr};"),
            Self::Block(items) => write!(f, "{}", Block(items)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Source {
    pub items: Vec<Item>,
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self
            .items
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>();
        f.write_str(&items.join(" "))
    }
}

/// Renders a statement list as `{ a b }`, or `{}` when empty
struct Block<'a>(&'a [Item]);

impl Display for Block<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for item in self.0 {
            write!(f, "{item} ")?;
        }
        f.write_str("}")
    }
}

fn join<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
