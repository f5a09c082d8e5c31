//! Front end for the Jack teaching language: a pull-based lexer, a
//! recursive-descent parser that builds a parse tree, and the class and
//! subroutine symbol tables filled in while parsing.

pub mod analyzer;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod xml;

pub use error::{LexError, ParseError, SymbolError};

use parser::{CompiledClass, ErrorMode, Parser};

/// Parses one class from `source`.
pub fn compile(source: &str, mode: ErrorMode) -> Result<CompiledClass, ParseError> {
    let parser = Parser::with_mode(source, mode)?;
    let class = parser.compile_class()?;
    log::info!(
        "compiled class {} ({} subroutines, {} diagnostics)",
        class.name,
        class.subroutine_symbols.len(),
        class.diagnostics.len()
    );
    Ok(class)
}
