use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("shape '{0}' is not defined in the service definition")]
    MissingShape(String),

    #[error("shape '{0}' has an unsupported type: {1}")]
    UnsupportedShapeType(String, String),

    #[error("service does not contain operation: {0}")]
    OperationNotFound(String),

    #[error("map shape '{0}' is missing key.locationName")]
    MapKeyLocationName(String),

    #[error("map shape '{0}' has a complex key")]
    ComplexMapKey(String),

    #[error("operation '{0}' declares pagination without a result_key")]
    PaginationMissingResultKey(String),

    #[error("pagination result key '{0}' does not resolve to a list shape")]
    PaginationNotIterable(String),

    #[error("documentation contains unsupported html: {0}")]
    UnsupportedDocumentation(String),

    #[error("invalid service definition: {0}")]
    InvalidDefinition(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::InvalidDefinition(e.to_string())
    }
}
