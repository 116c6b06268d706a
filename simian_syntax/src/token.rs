use std::fmt::Display;

/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenKind {
    // Symbols
    LPAREN,
    RPAREN,
    LBRACE,
    RBRACE,
    LBRACKET,
    RBRACKET,
    COMMA,
    SEMICOLON,
    // Operators
    ASSIGN,
    BANG,
    MINUS,
    PLUS,
    SLASH,
    ASTERISK,
    // Comparisons
    EQ,
    NOT_EQ,
    LT,
    GT,
    // Literals
    IDENT,
    INT,
    STRING,
    // Keywords
    LET,
    FUNCTION,
    TRUE,
    FALSE,
    IF,
    ELSE,
    RETURN,
    // Sentinels
    EOF,
    ILLEGAL,
}

impl TokenKind {
    pub fn from_char(c: char) -> Option<Self> {
        let token = match c {
            '(' => Self::LPAREN,
            ')' => Self::RPAREN,
            '{' => Self::LBRACE,
            '}' => Self::RBRACE,
            '[' => Self::LBRACKET,
            ']' => Self::RBRACKET,
            ',' => Self::COMMA,
            ';' => Self::SEMICOLON,
            '=' => Self::ASSIGN,
            '!' => Self::BANG,
            '-' => Self::MINUS,
            '+' => Self::PLUS,
            '/' => Self::SLASH,
            '*' => Self::ASTERISK,
            '<' => Self::LT,
            '>' => Self::GT,
            _ => return None,
        };
        Some(token)
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        let token = match kw {
            "let" => Self::LET,
            "fn" => Self::FUNCTION,
            "true" => Self::TRUE,
            "false" => Self::FALSE,
            "if" => Self::IF,
            "else" => Self::ELSE,
            "return" => Self::RETURN,
            _ => return None,
        };
        Some(token)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub lexeme: String,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lexeme)
    }
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, lexeme: String) -> Self {
        Self {
            kind,
            line,
            lexeme,
        }
    }
}
