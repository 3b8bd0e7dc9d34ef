mod ast;
mod compiler;
mod parser;

pub use ast::{CombinatorOp, Leaf, LeafOp, Sqon};
pub use compiler::{compile, SqonCompiler, DEFAULT_MAX_DEPTH};
pub use parser::ROOT_PATH;
