use std::fmt::Display;

pub type Error = String;

#[derive(Debug)]
pub enum ErrorMsg {
    // Parse errors
    UnexpectedToken,
    InvalidIdent,
    InvalidInteger,
    MissingAssign,
    MissingOpeningParen,
    MissingClosingParen,
    MissingOpeningBrace,
    MissingClosingBrace,
    MissingClosingBracket,
    TooDeeplyNested,
    // EOF
    EndOfStream,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UnexpectedToken => "no prefix parse rule for",
            Self::InvalidIdent => "expected identifier, found",
            Self::InvalidInteger => "integer literal out of range",
            Self::MissingAssign => "expected `=`, found",
            Self::MissingOpeningParen => "expected `(`, found",
            Self::MissingClosingParen => "expected `)`, found",
            Self::MissingOpeningBrace => "expected `{`, found",
            Self::MissingClosingBrace => "expected `}`, found",
            Self::MissingClosingBracket => "expected `]`, found",
            Self::TooDeeplyNested => "too deeply nested at",
            Self::EndOfStream => "end of stream",
        })
    }
}
