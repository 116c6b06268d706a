use crate::token::{Token, TokenKind};
use std::{iter::Peekable, str::Chars};

#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    stream: Peekable<Chars<'a>>,
    line: usize,
    start: usize,
    current: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            stream: source.chars().peekable(),
            line: 0,
            start: 0,
            current: 0,
        }
    }

    /// Lexes the whole source, stopping before the EOF token.
    /// Illegal input shows up as `ILLEGAL` tokens, so this never fails.
    pub fn lex_all(mut self) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::default();
        loop {
            let t = self.next_token();
            if t.kind == TokenKind::EOF {
                break;
            }
            tokens.push(t);
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.current;
        let Some(c) = self.advance() else {
            return Token::new(TokenKind::EOF, self.line, "end of file".to_string());
        };
        match c {
            '=' => self.lookahead_for_token('=', TokenKind::EQ, TokenKind::ASSIGN),
            '!' => self.lookahead_for_token('=', TokenKind::NOT_EQ, TokenKind::BANG),
            '"' => self.lex_string(),
            _ => {
                if let Some(t) = TokenKind::from_char(c) {
                    self.make_token(t)
                } else if is_ident_char(c) {
                    self.lex_ident()
                } else if c.is_ascii_digit() {
                    self.lex_int()
                } else {
                    self.make_token(TokenKind::ILLEGAL)
                }
            }
        }
    }

    fn lex_ident(&mut self) -> Token {
        self.advance_while(is_ident_char);
        if let Some(t) = TokenKind::from_keyword(self.lexeme_from_range()) {
            self.make_token(t)
        } else {
            self.make_token(TokenKind::IDENT)
        }
    }

    fn lex_int(&mut self) -> Token {
        self.advance_while(|c| c.is_ascii_digit());
        self.make_token(TokenKind::INT)
    }

    fn lex_string(&mut self) -> Token {
        let line = self.line;
        let mut value = String::default();
        let mut valid = true;
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('"') => value.push('"'),
                    Some('t') => value.push('\t'),
                    Some('n') => value.push('\n'),
                    Some('\\') => value.push('\\'),
                    // Keep scanning so the rest of the
                    // literal is not lexed as code
                    Some(c) => {
                        self.count_line(c);
                        valid = false;
                    }
                    None => {
                        valid = false;
                        break;
                    }
                },
                Some(c) => {
                    self.count_line(c);
                    value.push(c);
                }
                // Unterminated string
                None => {
                    valid = false;
                    break;
                }
            }
        }

        if valid {
            Token::new(TokenKind::STRING, line, value)
        } else {
            Token::new(TokenKind::ILLEGAL, line, self.lexeme_from_range().to_string())
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.advance_if(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            self.count_line(c);
        }
    }

    fn count_line(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.line, self.lexeme_from_range().to_string())
    }

    fn lexeme_from_range(&self) -> &'a str {
        &self.source[self.start..self.current]
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.stream.next()?;
        self.current += c.len_utf8();
        Some(c)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.stream.peek().filter(|&&c| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_while<F>(&mut self, cond: F)
    where
        F: Fn(char) -> bool,
    {
        while self.stream.peek().filter(|&&c| cond(c)).is_some() {
            self.advance();
        }
    }

    fn lookahead_for_token(
        &mut self,
        match_char: char,
        if_match: TokenKind,
        no_match: TokenKind,
    ) -> Token {
        if self.advance_if(|c| c == match_char).is_some() {
            self.make_token(if_match)
        } else {
            self.make_token(no_match)
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
