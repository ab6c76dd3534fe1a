//! Concrete node kinds. Each kind owns its connector lists and kind-specific attributes.

mod constant;
mod elementwise;
mod io;
mod memory_copy;
mod reduce;

pub use constant::Constant;
pub use elementwise::{Binary, BinaryOp, Unary, UnaryOp};
pub use io::{InputNode, OutputNode};
pub use memory_copy::MemoryCopy;
pub use reduce::{Reduce, ReduceOp};
