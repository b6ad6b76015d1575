use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not a Standard MIDI File (missing MThd header)")]
    InvalidHeader,

    #[error("Unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("Invalid time division: {0} ticks per beat")]
    InvalidTimeDivision(u16),

    #[error("Bytecode error at offset {offset}: {message}")]
    Bytecode { offset: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
