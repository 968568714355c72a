//! A Lua 5.4 parser producing a luaparse-shaped syntax tree.
//!
//! ```
//! let chunk = lua_parser::parse("local m = require('util.helper')").unwrap();
//! assert_eq!(chunk.body.len(), 1);
//! assert!(chunk.globals.contains("require"));
//! ```

pub mod ast;
pub mod error;
pub mod literal;
pub mod parser;
pub mod text;
pub mod transformer;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use text::SourceEncoding;
pub use transformer::Transformer;

/// Parses a complete chunk of Lua source text.
pub fn parse(source: &str) -> ParseResult<ast::Chunk> {
    parser::parse_chunk(source, SourceEncoding::Utf8)
}

/// Parses a chunk read from disk. Any byte sequence is accepted; identifiers and string
/// `raw` text hold one char per byte, see [`text::decode`].
pub fn parse_bytes(source: &[u8]) -> ParseResult<ast::Chunk> {
    parser::parse_chunk(&text::decode(source), SourceEncoding::Bytes)
}
