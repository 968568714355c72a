use std::fmt::{Display, Error, Formatter};

use full_moon::ast::AstError;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseErrorKind {
    /// Rejected by the full_moon tokenizer or parser.
    Syntax(String),
    InvalidEscape(String),
    MalformedNumber(String),
    UnknownAttribute(String),
    VarargOutsideVarargFunction,
    /// Grammar only the Luau dialect accepts.
    Unsupported(String),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
}

impl ParseError {
    pub const fn new(kind: ParseErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}

impl From<full_moon::Error> for ParseError {
    fn from(error: full_moon::Error) -> Self {
        let line = match &error {
            full_moon::Error::AstError(AstError::UnexpectedToken { token, .. }) => {
                token.start_position().line()
            }
            full_moon::Error::TokenizerError(error) => error.position().line(),
            _ => 0,
        };
        Self::new(ParseErrorKind::Syntax(error.to_string()), line)
    }
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Self::Syntax(message) => write!(f, "{message}"),
            Self::InvalidEscape(sequence) => write!(f, "invalid escape sequence '{sequence}'"),
            Self::MalformedNumber(raw) => write!(f, "malformed number near '{raw}'"),
            Self::UnknownAttribute(name) => write!(f, "unknown attribute '{name}'"),
            Self::VarargOutsideVarargFunction => {
                write!(f, "cannot use '...' outside a vararg function")
            }
            Self::Unsupported(what) => write!(f, "unsupported syntax: {what}"),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "[{}] {}", self.line, self.kind)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;
