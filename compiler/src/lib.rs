// fcc — Formula Compiler Core
//
// Library root. Source rewriting and static dependency analysis for the
// formula scripting dialect.

pub mod ast;
pub mod diag;
pub mod flatten;
pub mod lexer;
pub mod macros;
pub mod node;
pub mod parser;
pub mod pipeline;
pub mod replace;
pub mod simplify;
pub mod text;
pub mod transpile;
pub mod tree;
