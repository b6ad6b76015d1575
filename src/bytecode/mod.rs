pub mod commands;
pub mod freq;
pub mod json;
pub mod wait;
pub mod writer;

pub use commands::Instruction;
pub use freq::FrequencyTable;
pub use json::ProgramJson;
pub use writer::HeaderWriter;
