#[allow(clippy::single_component_path_imports)]
use serde_yaml;

#[derive(Debug, thiserror::Error)]
pub enum GrowthError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid reference data: {0}")]
    ReferenceData(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to (de)serialize cached value: {0}")]
    Serialization(serde_json::Error),

    #[error(transparent)]
    Types(#[from] growth_types::TypeError),
}

/// Coarse error classes that API surfaces map onto client/server status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    Internal,
}

impl GrowthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrowthError::NotFound(_) => ErrorKind::NotFound,
            GrowthError::Forbidden(_) => ErrorKind::Forbidden,
            GrowthError::InvalidInput(_) | GrowthError::Types(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Internal,
        }
    }
}

pub type GrowthResult<T> = std::result::Result<T, GrowthError>;
