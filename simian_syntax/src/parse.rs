use std::{iter::Peekable, rc::Rc, slice::Iter};

use crate::{
    ast::{BinOp, Expr, Ident, Item, Literal, Source, UnaryOp},
    error::{Error, ErrorMsg},
    stack::ensure_sufficient_stack,
    token::{Token, TokenKind},
};

/// Maximum nesting of expressions and blocks in a single item
const MAX_NESTING: usize = 1024;

/// Binding power of an operator, from loosest to tightest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

impl Precedence {
    pub fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::EQ | TokenKind::NOT_EQ => Self::Equals,
            TokenKind::LT | TokenKind::GT => Self::LessGreater,
            TokenKind::PLUS | TokenKind::MINUS => Self::Sum,
            TokenKind::SLASH | TokenKind::ASTERISK => Self::Product,
            TokenKind::LPAREN => Self::Call,
            TokenKind::LBRACKET => Self::Index,
            _ => Self::Lowest,
        }
    }
}

type PrefixRule<'a> = fn(&mut Parser<'a>, &'a Token) -> Result<Expr, Error>;
type InfixRule<'a> = fn(&mut Parser<'a>, Expr, &'a Token) -> Result<Expr, Error>;

#[derive(Debug)]
pub struct Parser<'a> {
    stream: Peekable<Iter<'a, Token>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a [Token]) -> Self {
        Self {
            stream: stream.iter().peekable(),
            depth: 0,
        }
    }

    /// Parses every item in the stream. The returned source holds
    /// whatever parsed successfully, even when errors were found.
    pub fn parse_program(mut self) -> (Source, Vec<Error>) {
        let mut items: Vec<Item> = Vec::default();
        let mut errors: Vec<Error> = Vec::default();
        while self.stream.peek().is_some() {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    errors.push(e);
                    self.sync();
                }
            }
        }
        (Source { items }, errors)
    }

    pub fn parse_all(self) -> Result<Source, Vec<Error>> {
        let (source, errors) = self.parse_program();
        errors.is_empty().then_some(source).ok_or(errors)
    }

    pub fn parse_item(&mut self) -> Result<Item, Error> {
        let item = match self.stream.peek() {
            Some(&t) => match t.kind {
                TokenKind::LET => self.parse_let_stmt(),
                TokenKind::RETURN => self.parse_return(),
                TokenKind::LBRACE => self.parse_block().map(Item::Block),
                _ => self.parse_expr_stmt(),
            }?,
            None => return Err(Self::eof_error(ErrorMsg::UnexpectedToken)),
        };
        // Semicolons are optional after any item
        self.advance_if(|t| t.kind == TokenKind::SEMICOLON);
        Ok(item)
    }

    fn parse_let_stmt(&mut self) -> Result<Item, Error> {
        // Consume the `let` keyword
        self.advance();
        let ident = Ident::new(
            &self
                .advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?
                .lexeme,
        );
        self.advance_or_err(TokenKind::ASSIGN, ErrorMsg::MissingAssign)?;
        let init = self.parse_expr(Precedence::Lowest)?;

        Ok(Item::LetStmt { ident, init })
    }

    fn parse_return(&mut self) -> Result<Item, Error> {
        // Consume the `return` keyword
        self.advance();
        Ok(Item::ReturnStmt(self.parse_expr(Precedence::Lowest)?))
    }

    fn parse_expr_stmt(&mut self) -> Result<Item, Error> {
        Ok(Item::ExprStmt(self.parse_expr(Precedence::Lowest)?))
    }

    fn parse_block(&mut self) -> Result<Vec<Item>, Error> {
        self.nested(Self::parse_block_items)
    }

    fn parse_block_items(&mut self) -> Result<Vec<Item>, Error> {
        self.advance_or_err(TokenKind::LBRACE, ErrorMsg::MissingOpeningBrace)?;
        let mut items = Vec::default();
        while let Some(&t) = self.stream.peek() {
            if t.kind == TokenKind::RBRACE {
                // Consume the closing brace
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_item()?);
        }

        Err(Self::eof_error(ErrorMsg::MissingClosingBrace))
    }

    pub fn parse_expr(&mut self, precedence: Precedence) -> Result<Expr, Error> {
        self.nested(|p| p.parse_pratt(precedence))
    }

    fn parse_pratt(&mut self, precedence: Precedence) -> Result<Expr, Error> {
        let token = self
            .advance()
            .ok_or_else(|| Self::eof_error(ErrorMsg::UnexpectedToken))?;
        let prefix = Self::prefix_rule(token.kind)
            .ok_or_else(|| Self::error(token, ErrorMsg::UnexpectedToken))?;
        let mut lhs = prefix(self, token)?;

        while let Some(&t) = self.stream.peek() {
            let Some(infix) = Self::infix_rule(t.kind) else {
                break;
            };
            if Precedence::of(t.kind) <= precedence {
                break;
            }
            // Consume the operator
            self.advance();
            lhs = infix(self, lhs, t)?;
        }

        Ok(lhs)
    }

    fn prefix_rule(kind: TokenKind) -> Option<PrefixRule<'a>> {
        let rule: PrefixRule<'a> = match kind {
            TokenKind::IDENT => Self::parse_ident,
            TokenKind::INT => Self::parse_int,
            TokenKind::STRING => Self::parse_str,
            TokenKind::TRUE | TokenKind::FALSE => Self::parse_bool,
            TokenKind::BANG | TokenKind::MINUS => Self::parse_unary,
            TokenKind::LPAREN => Self::parse_group,
            TokenKind::IF => Self::parse_if,
            TokenKind::FUNCTION => Self::parse_function,
            TokenKind::LBRACKET => Self::parse_array,
            _ => return None,
        };
        Some(rule)
    }

    fn infix_rule(kind: TokenKind) -> Option<InfixRule<'a>> {
        let rule: InfixRule<'a> = match kind {
            TokenKind::PLUS
            | TokenKind::MINUS
            | TokenKind::ASTERISK
            | TokenKind::SLASH
            | TokenKind::LT
            | TokenKind::GT
            | TokenKind::EQ
            | TokenKind::NOT_EQ => Self::parse_binary,
            TokenKind::LPAREN => Self::parse_call,
            TokenKind::LBRACKET => Self::parse_index,
            _ => return None,
        };
        Some(rule)
    }

    fn parse_ident(&mut self, token: &'a Token) -> Result<Expr, Error> {
        Ok(Expr::Ident(Ident::new(&token.lexeme)))
    }

    fn parse_int(&mut self, token: &'a Token) -> Result<Expr, Error> {
        token
            .lexeme
            .parse()
            .map(|n| Expr::Literal(Literal::Int(n)))
            .map_err(|_| Self::error(token, ErrorMsg::InvalidInteger))
    }

    fn parse_str(&mut self, token: &'a Token) -> Result<Expr, Error> {
        Ok(Expr::Literal(Literal::Str(token.lexeme.clone())))
    }

    fn parse_bool(&mut self, token: &'a Token) -> Result<Expr, Error> {
        Ok(Expr::Literal(Literal::Boolean(token.kind == TokenKind::TRUE)))
    }

    fn parse_unary(&mut self, token: &'a Token) -> Result<Expr, Error> {
        // Infallible unwrap as the prefix rule is only registered for unary operators
        let op = UnaryOp::from_token(token.kind)
            .expect("non-unary operators cannot be present here");
        Ok(Expr::Unary {
            op,
            expr: Box::new(self.parse_expr(Precedence::Prefix)?),
        })
    }

    fn parse_group(&mut self, _: &'a Token) -> Result<Expr, Error> {
        let expr = self.parse_expr(Precedence::Lowest)?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self, _: &'a Token) -> Result<Expr, Error> {
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingOpeningParen)?;
        let condition = self.parse_expr(Precedence::Lowest)?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        let if_block = self.parse_block()?;
        let else_block = if self.advance_if(|t| t.kind == TokenKind::ELSE).is_some() {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            if_block,
            else_block,
        })
    }

    fn parse_function(&mut self, _: &'a Token) -> Result<Expr, Error> {
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingOpeningParen)?;
        let mut args = vec![];
        if self.advance_if(|t| t.kind == TokenKind::RPAREN).is_none() {
            loop {
                args.push(Ident::new(
                    &self
                        .advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?
                        .lexeme,
                ));
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                    break;
                }
            }
            self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        }
        let body = Rc::new(self.parse_block()?);

        Ok(Expr::Function { args, body })
    }

    fn parse_array(&mut self, _: &'a Token) -> Result<Expr, Error> {
        let elements =
            self.parse_expr_list(TokenKind::RBRACKET, ErrorMsg::MissingClosingBracket)?;
        Ok(Expr::Array(elements))
    }

    fn parse_binary(&mut self, lhs: Expr, token: &'a Token) -> Result<Expr, Error> {
        // Infallible unwrap as the infix rule is only registered for binary operators
        let op = BinOp::from_token(token.kind)
            .expect("non-binary operators cannot be present here");
        // Parsing the right operand at the operator's own
        // precedence makes the operator left-associative
        let rhs = self.parse_expr(Precedence::of(token.kind))?;
        Ok(Expr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        })
    }

    fn parse_call(&mut self, func: Expr, _: &'a Token) -> Result<Expr, Error> {
        let args = self.parse_expr_list(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        Ok(Expr::Call {
            func: Box::new(func),
            args,
        })
    }

    fn parse_index(&mut self, expr: Expr, _: &'a Token) -> Result<Expr, Error> {
        let index = self.parse_expr(Precedence::Lowest)?;
        self.advance_or_err(TokenKind::RBRACKET, ErrorMsg::MissingClosingBracket)?;
        Ok(Expr::Index {
            expr: Box::new(expr),
            index: Box::new(index),
        })
    }

    /// Parses comma separated expressions up to and including `end`.
    /// The opening delimiter must already be consumed.
    fn parse_expr_list(&mut self, end: TokenKind, msg: ErrorMsg) -> Result<Vec<Expr>, Error> {
        let mut exprs = vec![];
        if self.advance_if(|t| t.kind == end).is_some() {
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_expr(Precedence::Lowest)?);
            if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                break;
            }
        }
        self.advance_or_err(end, msg)?;
        Ok(exprs)
    }

    /// Runs a recursive parse one level deeper, failing once the
    /// nesting limit is reached.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.depth >= MAX_NESTING {
            return Err(match self.stream.peek() {
                Some(&t) => Self::error(t, ErrorMsg::TooDeeplyNested),
                None => Self::eof_error(ErrorMsg::TooDeeplyNested),
            });
        }
        self.depth += 1;
        let res = ensure_sufficient_stack(|| parse(self));
        self.depth -= 1;
        res
    }

    fn advance(&mut self) -> Option<&'a Token> {
        self.stream.next()
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if self.stream.peek().filter(|&&t| cond(t)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_or_err(&mut self, kind: TokenKind, msg: ErrorMsg) -> Result<&'a Token, Error> {
        if let Some(&t) = self.stream.peek() {
            if t.kind == kind {
                self.advance();
                Ok(t)
            } else {
                Err(Self::error(t, msg))
            }
        } else {
            Err(Self::eof_error(msg))
        }
    }

    /// Skips to the start of the next item after an error
    fn sync(&mut self) {
        while let Some(t) =
            self.advance_if(|t| !matches!(t.kind, TokenKind::LET | TokenKind::RETURN))
        {
            if t.kind == TokenKind::SEMICOLON {
                return;
            }
        }
    }

    fn error(token: &Token, msg: ErrorMsg) -> Error {
        format!("Parse error at line {}: {} {}", token.line + 1, msg, token)
    }

    fn eof_error(msg: ErrorMsg) -> Error {
        format!("Parse error: {} {}", msg, ErrorMsg::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;

    fn parse_test(input: &str, expected: Source) {
        let tokens = Lexer::new(input).lex_all();
        let source = Parser::new(&tokens).parse_all().unwrap();
        assert_eq!(source, expected);
    }

    fn render_test(input: &str, expected: &str) {
        let tokens = Lexer::new(input).lex_all();
        let source = Parser::new(&tokens).parse_all().unwrap();
        assert_eq!(source.to_string(), expected);
    }

    fn parse_err_test(input: &str, expected: &[&str]) {
        let tokens = Lexer::new(input).lex_all();
        let errors = Parser::new(&tokens).parse_all().unwrap_err();
        assert_eq!(errors, expected);
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Int(n))
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(Ident::new(name))
    }

    #[test]
    fn let_stmt() {
        parse_test(
            "let x = 5; let y = 10; let foobar = 838383;",
            Source {
                items: vec![
                    Item::LetStmt {
                        ident: Ident::new("x"),
                        init: int(5),
                    },
                    Item::LetStmt {
                        ident: Ident::new("y"),
                        init: int(10),
                    },
                    Item::LetStmt {
                        ident: Ident::new("foobar"),
                        init: int(838383),
                    },
                ],
            },
        );
    }

    #[test]
    fn let_ident_lexeme() {
        let tokens = Lexer::new("let x = 5;").lex_all();
        assert_eq!(tokens[1].lexeme, "x");
        let source = Parser::new(&tokens).parse_all().unwrap();
        assert_eq!(source.items.len(), 1);
        let Item::LetStmt { ident, .. } = &source.items[0] else {
            panic!("expected a let statement, found {:?}", source.items[0]);
        };
        assert_eq!(ident.name, "x");
    }

    #[test]
    fn return_stmt() {
        parse_test(
            "return 5; return add(x)",
            Source {
                items: vec![
                    Item::ReturnStmt(int(5)),
                    Item::ReturnStmt(Expr::Call {
                        func: Box::new(ident("add")),
                        args: vec![ident("x")],
                    }),
                ],
            },
        );
    }

    #[test]
    fn block() {
        parse_test(
            "{ let x = 1; x }",
            Source {
                items: vec![Item::Block(vec![
                    Item::LetStmt {
                        ident: Ident::new("x"),
                        init: int(1),
                    },
                    Item::ExprStmt(ident("x")),
                ])],
            },
        );
    }

    #[test]
    fn unary() {
        parse_test(
            "!true; -15;",
            Source {
                items: vec![
                    Item::ExprStmt(Expr::Unary {
                        op: UnaryOp::Bang,
                        expr: Box::new(Expr::Literal(Literal::Boolean(true))),
                    }),
                    Item::ExprStmt(Expr::Unary {
                        op: UnaryOp::Minus,
                        expr: Box::new(int(15)),
                    }),
                ],
            },
        );
    }

    #[test]
    fn if_expr() {
        parse_test(
            "if (x < y) { x } else { y }",
            Source {
                items: vec![Item::ExprStmt(Expr::If {
                    condition: Box::new(Expr::Binary {
                        lhs: Box::new(ident("x")),
                        op: BinOp::Less,
                        rhs: Box::new(ident("y")),
                    }),
                    if_block: vec![Item::ExprStmt(ident("x"))],
                    else_block: Some(vec![Item::ExprStmt(ident("y"))]),
                })],
            },
        );
    }

    #[test]
    fn function() {
        parse_test(
            "fn(x, y) { x + y; }; fn() {}",
            Source {
                items: vec![
                    Item::ExprStmt(Expr::Function {
                        args: vec![Ident::new("x"), Ident::new("y")],
                        body: Rc::new(vec![Item::ExprStmt(Expr::Binary {
                            lhs: Box::new(ident("x")),
                            op: BinOp::Plus,
                            rhs: Box::new(ident("y")),
                        })]),
                    }),
                    Item::ExprStmt(Expr::Function {
                        args: vec![],
                        body: Rc::default(),
                    }),
                ],
            },
        );
    }

    #[test]
    fn string_and_array() {
        parse_test(
            r#"["hello", 1][0]"#,
            Source {
                items: vec![Item::ExprStmt(Expr::Index {
                    expr: Box::new(Expr::Array(vec![
                        Expr::Literal(Literal::Str("hello".to_string())),
                        int(1),
                    ])),
                    index: Box::new(int(0)),
                })],
            },
        );
    }

    #[test]
    fn precedence() {
        let cases = [
            ("-a * b", "((-a) * b)"),
            ("!-a", "(!(-a))"),
            ("a + b + c", "((a + b) + c)"),
            ("a + b - c", "((a + b) - c)"),
            ("a * b / c", "((a * b) / c)"),
            ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
            ("1 + 2 * 3", "(1 + (2 * 3))"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
            (
                "3 + 4 * 5 == 3 * 1 + 4 * 5",
                "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))",
            ),
            ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4)"),
            ("-(5 + 5)", "(-(5 + 5))"),
            ("!(true == true)", "(!(true == true))"),
            ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
            (
                "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
                "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)))",
            ),
            (
                "a * [1, 2, 3, 4][b * c] * d",
                "((a * ([1, 2, 3, 4][(b * c)])) * d)",
            ),
            (
                "add(a * b[2], b[1], 2 * [1, 2][1])",
                "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))",
            ),
        ];
        for (input, expected) in cases {
            render_test(input, expected);
        }
    }

    #[test]
    fn render_items() {
        render_test(
            r#"let f = fn(x) { if (x > 1) { return "big"; } else { x } }; f(2)"#,
            r#"let f = fn(x) { if (x > 1) { return "big"; } else { x } }; f(2)"#,
        );
    }

    #[test]
    fn missing_assign() {
        parse_err_test(
            "let x 5;",
            &[format!("Parse error at line 1: {} 5", ErrorMsg::MissingAssign).as_str()],
        );
    }

    #[test]
    fn missing_closing_paren() {
        parse_err_test(
            "(1 + 2 * 3;",
            &[format!(
                "Parse error at line 1: {} ;",
                ErrorMsg::MissingClosingParen
            )
            .as_str()],
        );
    }

    #[test]
    fn missing_closing_brace() {
        parse_err_test(
            "fn(x) { x",
            &[format!(
                "Parse error: {} end of stream",
                ErrorMsg::MissingClosingBrace
            )
            .as_str()],
        );
    }

    #[test]
    fn no_prefix_rule() {
        parse_err_test(
            "let y = ) + 1;",
            &[format!(
                "Parse error at line 1: {} )",
                ErrorMsg::UnexpectedToken
            )
            .as_str()],
        );
    }

    #[test]
    fn integer_out_of_range() {
        parse_err_test(
            "99999999999999999999",
            &[format!(
                "Parse error at line 1: {} 99999999999999999999",
                ErrorMsg::InvalidInteger
            )
            .as_str()],
        );
    }

    #[test]
    fn deep_nesting() {
        let parens = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        render_test(&parens(1000), "1");
        render_test(
            &format!("{}1", "-".repeat(500)),
            &format!("{}1{}", "(-".repeat(500), ")".repeat(500)),
        );
        parse_err_test(
            &parens(100_000),
            &[format!("Parse error at line 1: {} (", ErrorMsg::TooDeeplyNested).as_str()],
        );
        parse_err_test(
            &"{".repeat(100_000),
            &[format!("Parse error at line 1: {} {{", ErrorMsg::TooDeeplyNested).as_str()],
        );
    }

    #[test]
    fn collects_errors_and_partial_source() {
        let tokens = Lexer::new("let = 1;\nlet y = 2;\nlet 3;\n\"a\\qb\";\ny").lex_all();
        let (source, errors) = Parser::new(&tokens).parse_program();
        assert_eq!(
            errors,
            vec![
                format!("Parse error at line 1: {} =", ErrorMsg::InvalidIdent),
                format!("Parse error at line 3: {} 3", ErrorMsg::InvalidIdent),
                format!("Parse error at line 4: {} \"a\\qb\"", ErrorMsg::UnexpectedToken),
            ]
        );
        assert_eq!(
            source,
            Source {
                items: vec![
                    Item::LetStmt {
                        ident: Ident::new("y"),
                        init: int(2),
                    },
                    Item::ExprStmt(ident("y")),
                ],
            }
        );
    }
}
