use thiserror::Error;

/// Errors the coordinator can surface (spec.md §7).
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] graphtx_engine::EngineError),
}
