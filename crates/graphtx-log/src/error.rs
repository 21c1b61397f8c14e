use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("logical log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown command type during decode")]
    UnknownCommand,
}
