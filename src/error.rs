use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Balancer protocol error: {0}")]
    Protocol(String),

    #[error("Balancer transport error: {0}")]
    Transport(String),

    #[error("No backends available")]
    NoAvailableBackends,

    #[error("Policy has been disposed")]
    Disposed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),
}

impl PolicyError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PolicyError::InvalidArgument(_))
    }
}

impl From<tonic::Status> for PolicyError {
    fn from(status: tonic::Status) -> Self {
        PolicyError::Transport(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for PolicyError {
    fn from(err: tonic::transport::Error) -> Self {
        PolicyError::Transport(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, PolicyError>;
