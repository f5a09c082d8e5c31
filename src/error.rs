use std::fmt;

use crate::lexer::Token;

/// Lexical failure, tagged with the 1-based line it was detected on.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("line {line}: {kind}")]
pub struct LexError {
    pub line: usize,
    pub kind: LexErrorKind,
}

impl LexError {
    pub fn new(line: usize, kind: LexErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LexErrorKind {
    /// `advance` was called with no input left.
    Exhausted,
    UnexpectedCharacter(char),
    UnterminatedString,
    NewlineInString,
    UnterminatedComment,
    IntegerOutOfRange(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LexErrorKind::*;
        match self {
            Exhausted => write!(f, "no more tokens"),
            UnexpectedCharacter(c) => write!(f, "unexpected character '{}'", c),
            UnterminatedString => write!(f, "unterminated string constant"),
            NewlineInString => write!(f, "newline in string constant"),
            UnterminatedComment => write!(f, "unterminated block comment"),
            IntegerOutOfRange(s) => write!(f, "integer constant {} is out of range 0..=32767", s),
        }
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum SymbolError {
    #[error("symbol not found: {0}")]
    NotFound(String),
    #[error("{0} is already defined in this scope")]
    AlreadyDefined(String),
}

/// Syntax or declaration failure raised while compiling a class.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            line: e.line,
            kind: ParseErrorKind::Lex(e),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseErrorKind {
    Expected { expected: String, found: Token },
    UnexpectedEof { expected: String },
    DuplicateElse,
    NestingTooDeep { limit: usize },
    Lex(LexError),
    Symbol(SymbolError),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParseErrorKind::*;
        match self {
            Expected { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            UnexpectedEof { expected } => {
                write!(f, "expected {}, however reached end of input", expected)
            }
            DuplicateElse => write!(f, "an if statement can have only one else clause"),
            NestingTooDeep { limit } => {
                write!(f, "nesting exceeds the limit of {} levels", limit)
            }
            Lex(e) => write!(f, "{}", e.kind),
            Symbol(e) => write!(f, "{}", e),
        }
    }
}
