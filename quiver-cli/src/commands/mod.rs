pub mod lint;
pub mod search;

pub use lint::run_lint;
pub use search::{run_compile, run_search};
