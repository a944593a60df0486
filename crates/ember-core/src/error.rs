use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmberError {
    #[error("GPU device error: {0}")]
    GpuDevice(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Shader error: {0}")]
    Shader(String),
}

pub type Result<T> = std::result::Result<T, EmberError>;
