pub mod bytecode;
pub mod compiler;
pub mod error;
pub mod midi;

pub use compiler::Compiler;
pub use error::Error;
