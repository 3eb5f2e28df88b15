use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Root path error: {0}")]
    Root(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Resource pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, TreeDiffError>;
