use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
