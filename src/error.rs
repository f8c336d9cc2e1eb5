use thiserror::Error;

/// Failure of a single upstream call or extraction step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("unrecognized payload shape: {0}")]
    Shape(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

pub trait Degrade<T> {
    fn or_degrade(self, default: T, what: &str) -> T;
}

impl<T> Degrade<T> for FetchResult<T> {
    fn or_degrade(self, default: T, what: &str) -> T {
        match self {
            Ok(value) => value,
            Err(FetchError::Shape(detail)) => {
                log::debug!("{what}: shape mismatch ({detail}), using default");
                default
            }
            Err(err) => {
                log::warn!("{what}: {err}, using default");
                default
            }
        }
    }
}
