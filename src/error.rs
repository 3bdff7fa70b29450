use thiserror::Error;

/// Errors raised by observable containers.
#[derive(Debug, Error)]
pub enum Error {
    /// A key was defined twice on the same observable object.
    #[error("property `{0}` is already defined")]
    DuplicateProperty(String),
}

pub type Result<T> = std::result::Result<T, Error>;
