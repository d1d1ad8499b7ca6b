//! pointercore-ast
//!
//! The AST source interface consumed by the constraint extractor (spec §6),
//! plus a partial tree-sitter-backed producer for C/C++ sufficient to drive
//! the end-to-end scenarios and the CLI demo.

pub mod ast;
pub mod parallel;
pub mod treesitter;

pub use ast::{AstSource, TranslationUnit};
pub use treesitter::TreeSitterAstSource;
