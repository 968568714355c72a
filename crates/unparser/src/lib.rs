pub mod unparser;
pub use crate::unparser::{Style, Unparser};

use lua_parser::ast::Chunk;

/// Prints `chunk` as Lua source in the given style.
pub fn unparse(chunk: &Chunk, style: Style) -> String {
    let mut unparser = Unparser::new(style);
    unparser.unparse_chunk(chunk);
    unparser.source
}
